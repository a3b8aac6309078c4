// Extension Resolver
//
// Turns an extension point name plus file filters into the ordered list of
// resources registered under it. The HTTP implementation talks to the
// extension-listing endpoint; errors are returned untouched so the calling
// loader decides how to degrade.

use super::types::{ExtensionResource, LoadExtensionsRequest, LoadExtensionsResponse};
use crate::config::LoaderConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use url::Url;

/// Source of extension resources for an extension point
#[async_trait]
pub trait ExtensionResolver: Send + Sync {
    /// Resolve `extension_point` to resources matching any of `filters`, in reported order
    async fn resolve(
        &self,
        extension_point: &str,
        filters: &[String],
    ) -> Result<Vec<ExtensionResource>>;
}

/// Resolver backed by the extension-listing HTTP endpoint
pub struct HttpResolver {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpResolver {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn from_config(config: &LoaderConfig) -> Result<Self> {
        Ok(Self::new(config.endpoint_url()?))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ExtensionResolver for HttpResolver {
    async fn resolve(
        &self,
        extension_point: &str,
        filters: &[String],
    ) -> Result<Vec<ExtensionResource>> {
        if extension_point.is_empty() {
            return Err(anyhow!("Missing extension_point"));
        }

        log::debug!(
            "Resolving extensions: point={}, filters={:?}",
            extension_point,
            filters
        );

        let request = LoadExtensionsRequest {
            extension_point: extension_point.to_string(),
            filters: filters.to_vec(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Extension endpoint returned {}: {}",
                status,
                body
            ));
        }

        let response: LoadExtensionsResponse = response
            .json()
            .await
            .context("Failed to parse extension listing")?;

        log::debug!(
            "Resolved {} extension(s) for {}",
            response.extensions.len(),
            extension_point
        );

        Ok(response.extensions)
    }
}
