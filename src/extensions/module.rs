// Executable extension modules
//
// Capability interfaces for dynamically importing a module by path and
// invoking its default activation entry point.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A loaded module exposing a default activation entry point
#[async_trait]
pub trait ExtensionModule: Send + Sync {
    /// Invoke the entry point with `payload`, waiting for any asynchronous result.
    /// The returned value of the entry point is ignored.
    async fn activate(&self, payload: &Value) -> Result<()>;
}

/// Imports modules by normalized path
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, path: &str) -> Result<Arc<dyn ExtensionModule>>;
}

/// A module imported for an extension point, paired with its normalized path
#[derive(Clone)]
pub struct ExecutableExtension {
    pub path: String,
    pub module: Arc<dyn ExtensionModule>,
}

impl fmt::Debug for ExecutableExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableExtension")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
