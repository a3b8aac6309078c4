// Extension System Module
//
// Handles:
// - Resolving extension points to extension resources
// - Importing executable extensions and activating them
// - Building and injecting markup for markup extensions
// - Plugin directory discovery for the listing endpoint

pub mod activation;
pub mod loader;
pub mod module;
pub mod plugins;
pub mod resolver;
pub mod runtime;
pub mod source;
pub mod types;

pub use activation::{ActivationOutcome, ActivationReport, ActivationStatus};
pub use loader::ExtensionLoader;
pub use module::{ExecutableExtension, ExtensionModule, ModuleLoader};
pub use plugins::{Plugin, PluginDirResolver};
pub use resolver::{ExtensionResolver, HttpResolver};
pub use runtime::QuickJsModuleLoader;
pub use source::{DirModuleSource, HttpModuleSource, ModuleSource};
pub use types::{
    normalize_path, ExtensionKind, ExtensionResource, LoadExtensionsRequest,
    LoadExtensionsResponse,
};
