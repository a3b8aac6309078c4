// In-memory doubles for the resolver and module loader, plus a log
// capture, shared by unit tests.

use crate::extensions::{ExtensionModule, ExtensionResolver, ExtensionResource, ModuleLoader};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Activations recorded as (module path, payload), in call order
pub type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

pub struct RecordingModule {
    path: String,
    calls: CallLog,
    fail: bool,
}

impl RecordingModule {
    pub fn new(path: &str) -> Self {
        Self::with_log(path, CallLog::default())
    }

    pub fn with_log(path: &str, calls: CallLog) -> Self {
        Self {
            path: path.to_string(),
            calls,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl ExtensionModule for RecordingModule {
    async fn activate(&self, payload: &Value) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((self.path.clone(), payload.clone()));
        if self.fail {
            Err(anyhow!("{} failed", self.path))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct StaticResolver {
    points: Mutex<HashMap<String, Vec<ExtensionResource>>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, Vec<String>)>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, extension_point: &str, paths: &[&str]) -> Self {
        self.set(extension_point, paths);
        self
    }

    pub fn set(&self, extension_point: &str, paths: &[&str]) {
        let resources = paths.iter().map(|p| ExtensionResource::new(*p)).collect();
        self.points
            .lock()
            .unwrap()
            .insert(extension_point.to_string(), resources);
        self.failing.lock().unwrap().remove(extension_point);
    }

    pub fn fail(&self, extension_point: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(extension_point.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, Vec<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtensionResolver for StaticResolver {
    async fn resolve(
        &self,
        extension_point: &str,
        filters: &[String],
    ) -> Result<Vec<ExtensionResource>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((extension_point.to_string(), filters.to_vec()));

        if self.failing.lock().unwrap().contains(extension_point) {
            return Err(anyhow!("backend unavailable for {}", extension_point));
        }

        Ok(self
            .points
            .lock()
            .unwrap()
            .get(extension_point)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct StaticModuleLoader {
    modules: Mutex<HashMap<String, Arc<dyn ExtensionModule>>>,
    loads: AtomicUsize,
    calls: CallLog,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module that records its activations
    pub fn with_module(self, path: &str) -> Self {
        self.add_module(path);
        self
    }

    /// Register a module whose activation fails after recording the call
    pub fn with_failing_module(self, path: &str) -> Self {
        let module = RecordingModule::with_log(path, self.calls.clone()).failing();
        self.modules
            .lock()
            .unwrap()
            .insert(path.to_string(), Arc::new(module));
        self
    }

    pub fn add_module(&self, path: &str) {
        let module = RecordingModule::with_log(path, self.calls.clone());
        self.modules
            .lock()
            .unwrap()
            .insert(path.to_string(), Arc::new(module));
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModuleLoader for StaticModuleLoader {
    async fn load(&self, path: &str) -> Result<Arc<dyn ExtensionModule>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.modules
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("Cannot find module {}", path))
    }
}

thread_local! {
    static RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Records every log line on the thread that emitted it.
/// `#[tokio::test]` runs on a current-thread runtime, so each test sees only its own records.
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Start capturing log records emitted on the current thread
pub fn capture_logs() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Trace);
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Error-level messages captured since [`capture_logs`]
pub fn logged_errors() -> Vec<String> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(level, _)| *level == log::Level::Error)
            .map(|(_, message)| message.clone())
            .collect()
    })
}
