// Extension Loader
//
// The service page code talks to. Owns both caches and wires the resolver
// and module loader together:
// - Executable extensions: resolve, import concurrently, cache, activate in order
// - Markup extensions: resolve, build component tags, cache, inject
//
// Public operations never return errors. Failures are logged and degrade to
// a no-op for the affected extension point or placeholder.

use super::activation::ActivationReport;
use super::module::{ExecutableExtension, ModuleLoader};
use super::resolver::{ExtensionResolver, HttpResolver};
use super::runtime::QuickJsModuleLoader;
use super::source::HttpModuleSource;
use super::types::{ExtensionKind, ExtensionResource};
use crate::cache::ExtensionCache;
use crate::config::LoaderConfig;
use crate::dom::{escape_html, DomElement, ElementRef};
use anyhow::{anyhow, Context, Result};
use futures_util::future::join_all;
use futures_util::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

pub struct ExtensionLoader {
    config: LoaderConfig,
    resolver: Arc<dyn ExtensionResolver>,
    modules: Arc<dyn ModuleLoader>,
    cache: ExtensionCache,
    document: Option<ElementRef>,
}

impl ExtensionLoader {
    pub fn new(
        config: LoaderConfig,
        resolver: Arc<dyn ExtensionResolver>,
        modules: Arc<dyn ModuleLoader>,
    ) -> Self {
        Self {
            config,
            resolver,
            modules,
            cache: ExtensionCache::new(),
            document: None,
        }
    }

    /// Loader talking to the extension endpoint over HTTP and running modules in QuickJS
    pub fn from_config(config: LoaderConfig) -> Result<Self> {
        let resolver = HttpResolver::from_config(&config)?;
        let source = HttpModuleSource::new(config.base_url()?);
        let modules = QuickJsModuleLoader::new(Arc::new(source))?;

        Ok(Self::new(config, Arc::new(resolver), Arc::new(modules)))
    }

    /// Attach the document root scanned when no roots are given
    pub fn with_document(mut self, root: ElementRef) -> Self {
        self.document = Some(root);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn document(&self) -> Option<&ElementRef> {
        self.document.as_ref()
    }

    /// Forget every resolved extension point, executable and markup alike
    pub fn invalidate_cache(&self) {
        self.cache.clear();
        log::debug!("Extension caches invalidated");
    }

    /// Activate every executable extension of `extension_point` with `payload`.
    ///
    /// Extensions run one after another in discovery order. A failing
    /// extension is logged and recorded in the report; the rest still run.
    pub async fn call_executable_extensions(
        &self,
        extension_point: &str,
        payload: &Value,
    ) -> ActivationReport {
        let extensions = self.load_executable_extensions(extension_point).await;
        let mut report = ActivationReport::new(extension_point);

        for extension in extensions {
            let result = AssertUnwindSafe(extension.module.activate(payload))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(anyhow!("extension panicked")));

            if let Err(e) = &result {
                log::error!("Error calling extension: {}: {:#}", extension.path, e);
            }
            report.record(&extension.path, result);
        }

        report
    }

    /// Resolve and import the executable extensions of `extension_point`.
    ///
    /// Cached points return without touching the network. Any failure yields
    /// an empty list and leaves the point uncached.
    pub async fn load_executable_extensions(&self, extension_point: &str) -> Vec<ExecutableExtension> {
        if let Some(cached) = self.cache.executables(extension_point) {
            log::debug!("Executable extensions cache hit: {}", extension_point);
            return cached;
        }

        match self.try_load_executable_extensions(extension_point).await {
            Ok(imports) => imports,
            Err(e) => {
                log::error!("Error loading executable extensions for {}: {:#}", extension_point, e);
                Vec::new()
            }
        }
    }

    async fn try_load_executable_extensions(
        &self,
        extension_point: &str,
    ) -> Result<Vec<ExecutableExtension>> {
        let resources = self.resolve(extension_point, ExtensionKind::Executable).await?;

        let total = resources.len();
        let results = join_all(resources.iter().map(|resource| async move {
            let path = resource.normalized_path();
            let module = self
                .modules
                .load(&path)
                .await
                .with_context(|| format!("Failed to import {}", path))?;
            Ok::<_, anyhow::Error>(ExecutableExtension { path, module })
        }))
        .await;

        let mut imports = Vec::with_capacity(total);
        let mut failed = 0;
        for result in results {
            match result {
                Ok(import) => imports.push(import),
                Err(e) => {
                    log::error!("{:#}", e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(anyhow!("{} of {} extension(s) failed to import", failed, total));
        }

        self.cache.store_executables(extension_point, imports.clone());
        log::info!(
            "Loaded {} executable extension(s) for {}",
            imports.len(),
            extension_point
        );

        Ok(imports)
    }

    /// Inject the markup extensions of `extension_point` into `target`.
    ///
    /// On failure the target is left untouched.
    pub async fn import_html_extensions(&self, extension_point: &str, target: &dyn DomElement) {
        if let Err(e) = self.try_import_html_extensions(extension_point, target).await {
            log::error!("Error importing HTML extensions for {}: {:#}", extension_point, e);
        }
    }

    async fn try_import_html_extensions(
        &self,
        extension_point: &str,
        target: &dyn DomElement,
    ) -> Result<()> {
        if let Some(html) = self.cache.markup(extension_point) {
            log::debug!("Markup extensions cache hit: {}", extension_point);
            target.set_inner_html(&html);
            return Ok(());
        }

        let resources = self.resolve(extension_point, ExtensionKind::Markup).await?;

        let html = self.component_markup(&resources);
        self.cache.store_markup(extension_point, html.clone());
        target.set_inner_html(&html);

        Ok(())
    }

    async fn resolve(
        &self,
        extension_point: &str,
        kind: ExtensionKind,
    ) -> Result<Vec<ExtensionResource>> {
        log::debug!("Resolving {} extensions for {}", kind.as_str(), extension_point);

        self.resolver
            .resolve(extension_point, self.config.filters(kind))
            .await
            .with_context(|| format!("Failed to resolve {} extensions", kind.as_str()))
    }

    /// One component tag per resource, carrying its normalized path
    pub fn component_markup(&self, resources: &[ExtensionResource]) -> String {
        let tag = &self.config.component_tag;
        let attribute = &self.config.component_attribute;

        resources
            .iter()
            .map(|resource| {
                format!(
                    "<{tag} {attribute}=\"{}\"></{tag}>",
                    escape_html(&resource.normalized_path())
                )
            })
            .collect()
    }
}
