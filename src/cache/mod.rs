// Cache Module - Resolved extensions per extension point
//
// Handles:
// - Executable imports cached per extension point
// - Combined markup cached per extension point
// - Whole-cache invalidation
//
// Entries are only ever written fully resolved, and locks are never held
// across an await, so readers see either nothing or a complete entry.

use crate::extensions::ExecutableExtension;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Two independent stores keyed by extension point
#[derive(Default)]
pub struct ExtensionCache {
    executables: RwLock<HashMap<String, Vec<ExecutableExtension>>>,
    markup: RwLock<HashMap<String, String>>,
}

impl ExtensionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executables(&self, extension_point: &str) -> Option<Vec<ExecutableExtension>> {
        self.executables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(extension_point)
            .cloned()
    }

    pub fn store_executables(&self, extension_point: &str, imports: Vec<ExecutableExtension>) {
        self.executables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(extension_point.to_string(), imports);
    }

    pub fn markup(&self, extension_point: &str) -> Option<String> {
        self.markup
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(extension_point)
            .cloned()
    }

    pub fn store_markup(&self, extension_point: &str, html: String) {
        self.markup
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(extension_point.to_string(), html);
    }

    /// Drop every entry in both stores
    pub fn clear(&self) {
        self.executables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.markup
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
