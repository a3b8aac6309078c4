// Loader Configuration
//
// Settings shared by the resolver, the loaders and the DOM components.
// Every field has a default matching the stock web UI, so a partial JSON
// document only needs to override what differs.

use crate::extensions::ExtensionKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default path of the extension-listing endpoint
pub const DEFAULT_ENDPOINT: &str = "/api/load_webui_extensions";

/// Client-side loader settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Origin the endpoint and module paths are resolved against
    pub base_url: String,
    pub endpoint: String,
    pub executable_filters: Vec<String>,
    pub markup_filters: Vec<String>,
    /// Tag marking an extension attachment point in the DOM
    pub placeholder_tag: String,
    /// Attribute on the placeholder holding the extension point name
    pub placeholder_attribute: String,
    /// Tag emitted for each markup resource
    pub component_tag: String,
    pub component_attribute: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:50001".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            executable_filters: vec!["*.js".to_string(), "*.mjs".to_string()],
            markup_filters: vec![
                "*.html".to_string(),
                "*.htm".to_string(),
                "*.xhtml".to_string(),
            ],
            placeholder_tag: "x-extension".to_string(),
            placeholder_attribute: "id".to_string(),
            component_tag: "x-component".to_string(),
            component_attribute: "path".to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse loader config")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read loader config: {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// File filters sent to the resolver for `kind`
    pub fn filters(&self, kind: ExtensionKind) -> &[String] {
        match kind {
            ExtensionKind::Executable => &self.executable_filters,
            ExtensionKind::Markup => &self.markup_filters,
        }
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("Invalid base_url: {}", self.base_url))
    }

    /// Absolute URL of the extension-listing endpoint
    pub fn endpoint_url(&self) -> Result<Url> {
        let base = self.base_url()?;
        base.join(&self.endpoint)
            .with_context(|| format!("Invalid endpoint: {}", self.endpoint))
    }
}

/// Settings for the embedded extension server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory that reported paths are relative to and static files are served from
    pub base_dir: PathBuf,
    /// Plugin root directories, highest priority first
    pub plugin_roots: Vec<PathBuf>,
    pub endpoint: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            plugin_roots: vec![PathBuf::from("usr/plugins"), PathBuf::from("plugins")],
            endpoint: DEFAULT_ENDPOINT.to_string(),
            port: 50001,
        }
    }
}

impl ServerConfig {
    /// Plugin roots resolved against `base_dir` when relative
    pub fn resolved_plugin_roots(&self) -> Vec<PathBuf> {
        self.plugin_roots
            .iter()
            .map(|root| {
                if root.is_absolute() {
                    root.clone()
                } else {
                    self.base_dir.join(root)
                }
            })
            .collect()
    }
}
