// Module Sources
//
// Where executable extension source text comes from: the web server the
// page was loaded from, or a local directory laid out the same way.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use url::Url;

/// Fetches module source text by normalized path
#[async_trait]
pub trait ModuleSource: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<String>;
}

/// Fetches modules over HTTP relative to a base URL
pub struct HttpModuleSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpModuleSource {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl ModuleSource for HttpModuleSource {
    async fn fetch(&self, path: &str) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("Invalid module path: {}", path))?;

        log::debug!("Fetching module: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Module {} returned {}", url, status));
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read module body: {}", url))
    }
}

/// Reads modules from a directory standing in for the web root
pub struct DirModuleSource {
    base_dir: PathBuf,
}

impl DirModuleSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl ModuleSource for DirModuleSource {
    async fn fetch(&self, path: &str) -> Result<String> {
        let file = self.base_dir.join(path.trim_start_matches('/'));
        tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("Failed to read module: {}", file.display()))
    }
}
