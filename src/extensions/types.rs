// Extension System Data Types
//
// Defines the wire types exchanged with the extension-listing endpoint,
// the kinds of extensions the loader understands, and path normalization.

use serde::{Deserialize, Serialize};

/// A resource reported by the extension-listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtensionResource {
    /// File path, relative to the web root; may or may not start with `/`
    pub path: String,
    /// Plugin that contributed the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
}

impl ExtensionResource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            plugin_id: None,
        }
    }

    pub fn with_plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = Some(plugin_id.into());
        self
    }

    /// The resource path with a guaranteed leading separator
    pub fn normalized_path(&self) -> String {
        normalize_path(&self.path)
    }
}

/// Request body for the extension-listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadExtensionsRequest {
    #[serde(default)]
    pub extension_point: String,
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Response body of the extension-listing endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadExtensionsResponse {
    #[serde(default)]
    pub extensions: Vec<ExtensionResource>,
}

/// Kind of extension a resolution is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    /// Importable modules with a default activation entry point
    Executable,
    /// HTML fragments rendered through component tags
    Markup,
}

impl ExtensionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionKind::Executable => "executable",
            ExtensionKind::Markup => "markup",
        }
    }
}

/// Prepend `/` to a path that lacks it. Already-normalized paths are returned unchanged.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
