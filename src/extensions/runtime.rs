// Extension Runtime - QuickJS module execution
//
// Provides the JavaScript environment executable extensions run in:
// - One runtime and context shared by every module a loader imports
// - ES modules declared under their normalized path, static imports
//   resolved against the importing module and fetched ahead of evaluation
// - Default exports registered in a global table for later activation
// - console.* forwarded to the `log` crate

use super::module::{ExtensionModule, ModuleLoader};
use super::source::ModuleSource;
use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use regex::Regex;
use rquickjs::loader::{Loader, Resolver};
use rquickjs::{CatchResultExt, Context, Ctx, Function, Module, Object, Runtime};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Global object holding each module's default export, keyed by path
const REGISTRY: &str = "__webuiExtensions";

/// Log target for messages written by extensions through `console`
const JS_LOG_TARGET: &str = "webui_extensions::js";

/// Static `import ... from "x"`, `import "x"` and `export ... from "x"` forms
const STATIC_IMPORT: &str =
    r#"(?m)(?:^|[;\s])(?:import|export)\s*(?:[\w*{}\s,$]*?\s*from\s*)?["']([^"'\n]+)["']"#;

/// Convert a QuickJS result, pulling the pending exception text out of the context
fn js<'js, T>(ctx: &Ctx<'js>, result: rquickjs::Result<T>) -> Result<T> {
    result.catch(ctx).map_err(|e| anyhow!("{}", e))
}

/// Resolve an import specifier against the path of the importing module.
///
/// Absolute and relative specifiers resolve to a normalized path; bare
/// specifiers have nothing to resolve against and yield `None`.
fn resolve_specifier(base: &str, name: &str) -> Option<String> {
    let joined = if name.starts_with('/') {
        name.to_string()
    } else if name.starts_with("./") || name.starts_with("../") {
        let dir = base.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        format!("{}/{}", dir, name)
    } else {
        return None;
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    Some(format!("/{}", segments.join("/")))
}

/// Module text fetched ahead of evaluation
#[derive(Default)]
struct ModuleSources {
    /// Fetched but not yet handed to QuickJS
    pending: HashMap<String, String>,
    /// Already declared in the runtime's module map
    declared: HashSet<String>,
}

type SharedSources = Arc<Mutex<ModuleSources>>;

fn lock(sources: &SharedSources) -> MutexGuard<'_, ModuleSources> {
    sources.lock().unwrap_or_else(PoisonError::into_inner)
}

struct PathResolver;

impl Resolver for PathResolver {
    fn resolve<'js>(&mut self, _ctx: &Ctx<'js>, base: &str, name: &str) -> rquickjs::Result<String> {
        resolve_specifier(base, name).ok_or_else(|| rquickjs::Error::new_resolving(base, name))
    }
}

/// Serves module text prefetched by [`QuickJsModuleLoader`]
struct PrefetchedLoader {
    sources: SharedSources,
}

impl Loader for PrefetchedLoader {
    fn load<'js>(&mut self, ctx: &Ctx<'js>, name: &str) -> rquickjs::Result<Module<'js>> {
        let source = lock(&self.sources)
            .pending
            .remove(name)
            .ok_or_else(|| rquickjs::Error::new_loading(name))?;

        let module = Module::declare(ctx.clone(), name, source)?;
        lock(&self.sources).declared.insert(name.to_string());

        Ok(module)
    }
}

struct JsHost {
    runtime: Runtime,
    context: Context,
}

impl JsHost {
    /// Run queued promise jobs left behind by a module
    fn drain_jobs(&self) {
        while self.runtime.is_job_pending() {
            if self.runtime.execute_pending_job().is_err() {
                log::warn!("Pending job raised an uncaught exception");
            }
        }
    }
}

/// Module loader that evaluates ES modules in QuickJS
pub struct QuickJsModuleLoader {
    host: Arc<JsHost>,
    source: Arc<dyn ModuleSource>,
    sources: SharedSources,
    imports: Regex,
}

impl QuickJsModuleLoader {
    /// Create a new runtime reading module text from `source`
    pub fn new(source: Arc<dyn ModuleSource>) -> Result<Self> {
        let runtime = Runtime::new()?;
        let sources = SharedSources::default();
        runtime.set_loader(
            PathResolver,
            PrefetchedLoader {
                sources: sources.clone(),
            },
        );
        let context = Context::full(&runtime)?;

        let loader = Self {
            host: Arc::new(JsHost { runtime, context }),
            source,
            sources,
            imports: Regex::new(STATIC_IMPORT)?,
        };

        loader.setup_globals()?;

        Ok(loader)
    }

    /// Install the module registry and the console bridge
    fn setup_globals(&self) -> Result<()> {
        self.host.context.with(|ctx| {
            let log_fn = Function::new(ctx.clone(), |level: String, message: String| {
                match level.as_str() {
                    "error" => log::error!(target: JS_LOG_TARGET, "{}", message),
                    "warn" => log::warn!(target: JS_LOG_TARGET, "{}", message),
                    "debug" => log::debug!(target: JS_LOG_TARGET, "{}", message),
                    _ => log::info!(target: JS_LOG_TARGET, "{}", message),
                }
            })?;

            ctx.globals().set("__log", log_fn)?;
            ctx.globals().set(REGISTRY, Object::new(ctx.clone())?)?;

            ctx.eval::<(), _>(
                r#"
                globalThis.console = (() => {
                    const format = (args) => args
                        .map((arg) => typeof arg === "string" ? arg : JSON.stringify(arg))
                        .join(" ");
                    return {
                        log: (...args) => __log("info", format(args)),
                        info: (...args) => __log("info", format(args)),
                        warn: (...args) => __log("warn", format(args)),
                        error: (...args) => __log("error", format(args)),
                        debug: (...args) => __log("debug", format(args)),
                    };
                })();
            "#,
            )?;

            Ok::<(), rquickjs::Error>(())
        })?;

        Ok(())
    }

    fn is_registered(&self, path: &str) -> Result<bool> {
        self.host.context.with(|ctx| {
            let registry: Object = js(&ctx, ctx.globals().get(REGISTRY))?;
            js(&ctx, registry.contains_key(path))
        })
    }

    /// Fetch `entry` and everything it statically imports that the runtime has not seen yet
    async fn prefetch(&self, entry: &str) -> Result<()> {
        let mut queue = vec![entry.to_string()];

        while let Some(path) = queue.pop() {
            let known = {
                let sources = lock(&self.sources);
                sources.declared.contains(&path) || sources.pending.contains_key(&path)
            };
            if known {
                continue;
            }

            let source = match self.source.fetch(&path).await {
                Ok(source) => source,
                Err(e) if path == entry => {
                    return Err(e.context(format!("Failed to fetch module: {}", path)))
                }
                // left for QuickJS to report at link time
                Err(e) => {
                    log::warn!("Failed to prefetch {} for {}: {:#}", path, entry, e);
                    continue;
                }
            };

            for captures in self.imports.captures_iter(&source) {
                if let Some(dependency) = resolve_specifier(&path, &captures[1]) {
                    queue.push(dependency);
                }
            }

            lock(&self.sources).pending.insert(path, source);
        }

        Ok(())
    }

    /// Import the module through the module map, then register its default export
    fn instantiate(&self, path: &str) -> Result<()> {
        self.host.context.with(|ctx| {
            let promise = js(&ctx, Module::import(&ctx, path))?;
            let namespace: Object = js(&ctx, promise.finish())?;

            let entry: rquickjs::Value = js(&ctx, namespace.get("default"))?;
            if entry.is_undefined() {
                return Err(anyhow!("Module {} has no default export", path));
            }
            if !entry.is_function() {
                return Err(anyhow!("Default export of {} is not callable", path));
            }

            let registry: Object = js(&ctx, ctx.globals().get(REGISTRY))?;
            js(&ctx, registry.set(path, entry))
        })?;

        self.host.drain_jobs();
        Ok(())
    }

/// Read a global variable as JSON. `undefined` reads as null.
    pub fn global_json(&self, name: &str) -> Result<serde_json::Value> {
        self.host.context.with(|ctx| {
            let value: rquickjs::Value = js(&ctx, ctx.globals().get(name))?;
            let json_str = match js(&ctx, ctx.json_stringify(value))? {
                Some(s) => js(&ctx, s.to_string())?,
                None => return Ok(serde_json::Value::Null),
            };

            Ok(serde_json::from_str(&json_str)?)
        })
    }
}

#[async_trait]
impl ModuleLoader for QuickJsModuleLoader {
    async fn load(&self, path: &str) -> Result<Arc<dyn ExtensionModule>> {
        if !self.is_registered(path)? {
            self.prefetch(path).await?;

            let declared = lock(&self.sources).declared.clone();
            if let Err(e) = self.instantiate(path) {
                // modules from a failed link are dropped from the runtime
                lock(&self.sources).declared = declared;
                return Err(e.context(format!("Failed to import module: {}", path)));
            }
            log::debug!("Imported module: {}", path);
        }

        Ok(Arc::new(QuickJsModule {
            path: path.to_string(),
            host: self.host.clone(),
        }))
    }
}

/// Handle to a module evaluated by [`QuickJsModuleLoader`]
struct QuickJsModule {
    path: String,
    host: Arc<JsHost>,
}

#[async_trait]
impl ExtensionModule for QuickJsModule {
    async fn activate(&self, payload: &serde_json::Value) -> Result<()> {
        let payload = serde_json::to_string(payload)?;

        self.host.context.with(|ctx| {
            let registry: Object = js(&ctx, ctx.globals().get(REGISTRY))?;
            let entry: Function = js(&ctx, registry.get(self.path.as_str()))?;
            let arg = js(&ctx, ctx.json_parse(payload))?;

            let result: rquickjs::Value = js(&ctx, entry.call((arg,)))?;
            if let Some(promise) = result.as_promise() {
                js(&ctx, promise.finish::<rquickjs::Value>())?;
            }

            Ok::<(), anyhow::Error>(())
        })?;

        self.host.drain_jobs();
        Ok(())
    }
}
