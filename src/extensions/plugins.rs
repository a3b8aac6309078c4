// Plugin Directory Resolver
//
// Backend-side discovery of web UI extensions. Plugins are directories
// under one or more plugin roots; each contributes files for an extension
// point under `extensions/webui/<point>/`.

use super::resolver::ExtensionResolver;
use super::types::ExtensionResource;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use glob::Pattern;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension points name a single directory under `extensions/webui`
pub fn validate_extension_point(extension_point: &str) -> Result<()> {
    if extension_point.is_empty() {
        return Err(anyhow!("Missing extension_point"));
    }
    if extension_point == "."
        || extension_point == ".."
        || extension_point.contains(['/', '\\'])
    {
        return Err(anyhow!("Invalid extension_point: {}", extension_point));
    }
    Ok(())
}

/// A discovered plugin directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub id: String,
    pub path: PathBuf,
}

/// Resolver that scans plugin directories on disk
#[derive(Debug, Clone)]
pub struct PluginDirResolver {
    base_dir: PathBuf,
    roots: Vec<PathBuf>,
}

impl PluginDirResolver {
    /// `roots` are ordered by priority; reported paths are relative to `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>, roots: Vec<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            roots,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// List plugins across all roots. The first root wins on id conflict.
    pub fn list_plugins(&self) -> Vec<Plugin> {
        let mut seen = HashSet::new();
        let mut plugins = Vec::new();

        for root in &self.roots {
            let entries = match std::fs::read_dir(root) {
                Ok(entries) => entries,
                Err(_) => continue,
            };

            let mut dirs: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            dirs.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));

            for dir in dirs {
                let id = match dir.file_name().and_then(|name| name.to_str()) {
                    Some(name) if !name.starts_with('.') => name.to_string(),
                    _ => continue,
                };
                if seen.insert(id.clone()) {
                    plugins.push(Plugin { id, path: dir });
                }
            }
        }

        plugins
    }

    pub fn find_plugin(&self, plugin_id: &str) -> Option<Plugin> {
        if plugin_id.is_empty() {
            return None;
        }
        self.list_plugins().into_iter().find(|p| p.id == plugin_id)
    }

    /// Collect extension files for `extension_point` matching any of `filters`
    pub fn webui_extensions(
        &self,
        extension_point: &str,
        filters: &[String],
    ) -> Result<Vec<ExtensionResource>> {
        validate_extension_point(extension_point)?;

        let default_filters = ["*".to_string()];
        let filters = if filters.is_empty() {
            &default_filters[..]
        } else {
            filters
        };
        let patterns = filters
            .iter()
            .map(|filter| {
                Pattern::new(filter).with_context(|| format!("Invalid filter: {}", filter))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut entries = Vec::new();
        for plugin in self.list_plugins() {
            let frontend_dir = plugin
                .path
                .join("extensions")
                .join("webui")
                .join(extension_point);
            if !frontend_dir.is_dir() {
                continue;
            }

            let mut matched: Vec<PathBuf> = WalkDir::new(&frontend_dir)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    let name = entry.file_name().to_string_lossy();
                    patterns.iter().any(|pattern| pattern.matches(&name))
                })
                .map(|entry| entry.into_path())
                .collect();

            matched.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));

            for file in matched {
                match self.relative_path(&file) {
                    Some(path) => entries.push(ExtensionResource {
                        path,
                        plugin_id: Some(plugin.id.clone()),
                    }),
                    None => {
                        log::error!("Failed to load frontend extension file {}", file.display())
                    }
                }
            }
        }

        Ok(entries)
    }

    fn relative_path(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.base_dir).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ExtensionResolver for PluginDirResolver {
    async fn resolve(
        &self,
        extension_point: &str,
        filters: &[String],
    ) -> Result<Vec<ExtensionResource>> {
        let resolver = self.clone();
        let extension_point = extension_point.to_string();
        let filters = filters.to_vec();

        tokio::task::spawn_blocking(move || resolver.webui_extensions(&extension_point, &filters))
            .await
            .context("Plugin scan task failed")?
    }
}
