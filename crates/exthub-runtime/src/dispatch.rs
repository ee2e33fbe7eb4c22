//! Dispatch tables — the routes, hooks, and middleware of running
//! extensions, rebuilt on every enable/disable and swapped atomically.
//!
//! Readers clone the current `Arc` snapshot and never observe a partially
//! updated table; writers build a fresh table outside the lock and commit it
//! with a single swap.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use tokio::sync::RwLock;

use exthub_core::AppError;
use exthub_core::AppResult;
use exthub_core::hooks::{HookCallback, HookType};
use exthub_core::traits::{Extension, ExtensionHandler, ExtensionMiddleware};
use exthub_core::types::AuthRequirement;

/// A route mounted into the active dispatch table.
#[derive(Clone)]
pub struct MountedRoute {
    /// Owning extension.
    pub extension: String,
    /// HTTP method.
    pub method: Method,
    /// Path pattern inside the extension namespace.
    pub pattern: String,
    /// Auth gate.
    pub auth: AuthRequirement,
    /// The handler.
    pub handler: Arc<dyn ExtensionHandler>,
}

/// Middleware mounted into the active dispatch table.
#[derive(Clone)]
pub struct MountedMiddleware {
    /// Owning extension.
    pub extension: String,
    /// Execution priority.
    pub priority: i32,
    /// Enable order, for tie-breaking.
    pub enable_order: u64,
    /// Path pattern the middleware applies to.
    pub pattern: String,
    /// The middleware.
    pub middleware: Arc<dyn ExtensionMiddleware>,
}

/// One hook callback in a merged, ordered chain.
#[derive(Clone)]
pub struct HookEntry {
    /// Owning extension.
    pub extension: String,
    /// Execution priority.
    pub priority: i32,
    /// Enable order, for tie-breaking.
    pub enable_order: u64,
    /// The callback.
    pub callback: Arc<dyn HookCallback>,
}

/// Immutable snapshot of everything reachable from a live request path.
///
/// Reflects only currently running extensions.
pub struct DispatchTable {
    routes: Vec<MountedRoute>,
    middleware: Vec<MountedMiddleware>,
    hooks: HashMap<HookType, Vec<HookEntry>>,
    mounted: HashMap<String, u64>,
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .field("hooks", &self.hooks.len())
            .field("mounted", &self.mounted.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DispatchTable {
    /// An empty table with nothing mounted.
    pub fn empty() -> Self {
        Self {
            routes: Vec::new(),
            middleware: Vec::new(),
            hooks: HashMap::new(),
            mounted: HashMap::new(),
        }
    }

    /// Build a table from the given running extensions.
    ///
    /// `entries` pairs each extension with its enable order. Fails with a
    /// `RouteConflict` error when two mount prefixes collide or an
    /// extension declares the same route twice.
    pub fn build(entries: &[(Arc<dyn Extension>, u64)]) -> AppResult<Self> {
        let mut table = Self::empty();

        for (ext, enable_order) in entries {
            let meta = ext.metadata();
            let name = meta.name.clone();

            // Mount prefixes derive from unique names, but guard against
            // case-variant collisions all the same.
            for existing in table.mounted.keys() {
                if existing != &name && existing.eq_ignore_ascii_case(&name) {
                    return Err(AppError::route_conflict(format!(
                        "extensions '{existing}' and '{name}' both mount '{}'",
                        meta.mount_prefix().to_lowercase()
                    )));
                }
            }

            if let Some(provider) = ext.as_route_provider() {
                for route in provider.routes() {
                    if !route.path.starts_with('/') || route.path.contains("..") {
                        return Err(AppError::route_conflict(format!(
                            "extension '{name}' declares route '{}' outside its namespace",
                            route.path
                        )));
                    }
                    // Routes are namespaced under the extension's mount
                    // prefix, so only the extension itself can collide.
                    if table.routes.iter().any(|r| {
                        r.extension == name
                            && r.method == route.method
                            && r.pattern == route.path
                    }) {
                        return Err(AppError::route_conflict(format!(
                            "extension '{name}' registers {} {}{} twice",
                            route.method,
                            meta.mount_prefix(),
                            route.path
                        )));
                    }
                    table.routes.push(MountedRoute {
                        extension: name.clone(),
                        method: route.method,
                        pattern: route.path,
                        auth: route.auth,
                        handler: route.handler,
                    });
                }
                for mw in provider.middleware() {
                    table.middleware.push(MountedMiddleware {
                        extension: name.clone(),
                        priority: mw.priority,
                        enable_order: *enable_order,
                        pattern: mw.path_pattern,
                        middleware: mw.middleware,
                    });
                }
            }

            if let Some(provider) = ext.as_hook_provider() {
                for reg in provider.hooks() {
                    table.hooks.entry(reg.hook).or_default().push(HookEntry {
                        extension: name.clone(),
                        priority: reg.priority,
                        enable_order: *enable_order,
                        callback: reg.callback,
                    });
                }
            }

            table.mounted.insert(name, *enable_order);
        }

        for chain in table.hooks.values_mut() {
            chain.sort_by_key(|e| (e.priority, e.enable_order));
        }
        table
            .middleware
            .sort_by_key(|m| (m.priority, m.enable_order));

        Ok(table)
    }

    /// Whether the extension is mounted in this snapshot.
    pub fn is_mounted(&self, extension: &str) -> bool {
        self.mounted.contains_key(extension)
    }

    /// Names of all mounted extensions.
    pub fn mounted_extensions(&self) -> Vec<String> {
        self.mounted.keys().cloned().collect()
    }

    /// Find the route matching a request inside an extension's namespace,
    /// capturing path parameters.
    pub fn match_route(
        &self,
        extension: &str,
        method: &Method,
        path: &str,
    ) -> Option<(&MountedRoute, HashMap<String, String>)> {
        self.routes
            .iter()
            .filter(|r| r.extension == extension && &r.method == method)
            .find_map(|r| match_pattern(&r.pattern, path).map(|params| (r, params)))
    }

    /// The ordered hook chain for a hook type.
    pub fn hooks_for(&self, hook: HookType) -> &[HookEntry] {
        self.hooks.get(&hook).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Middleware applying to a path inside an extension's namespace,
    /// already in execution order.
    pub fn middleware_for(&self, extension: &str, path: &str) -> Vec<&MountedMiddleware> {
        self.middleware
            .iter()
            .filter(|m| m.extension == extension && pattern_covers(&m.pattern, path))
            .collect()
    }

    /// Total mounted route count.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

/// The shared, atomically-swappable dispatch table slot.
///
/// Route lookups, hook-list lookups, and status queries read the current
/// snapshot without blocking each other; enable/disable replace it wholesale.
pub struct SharedDispatch {
    inner: RwLock<Arc<DispatchTable>>,
}

impl SharedDispatch {
    /// A slot holding an empty table.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arc::new(DispatchTable::empty())),
        }
    }

    /// The current snapshot.
    pub async fn current(&self) -> Arc<DispatchTable> {
        self.inner.read().await.clone()
    }

    /// Atomically replace the snapshot.
    pub async fn swap(&self, table: DispatchTable) {
        *self.inner.write().await = Arc::new(table);
    }
}

impl Default for SharedDispatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Match a concrete path against a pattern with `:param` segments.
fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_segs: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path_segs: Vec<&str> = path.trim_matches('/').split('/').collect();

    if pattern_segs.len() != path_segs.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (pat, seg) in pattern_segs.iter().zip(&path_segs) {
        if let Some(name) = pat.strip_prefix(':') {
            if seg.is_empty() {
                return None;
            }
            params.insert(name.to_string(), (*seg).to_string());
        } else if pat != seg {
            return None;
        }
    }
    Some(params)
}

/// Whether a middleware pattern covers a path. A trailing `*` matches any
/// suffix; otherwise segments must match exactly (with `:param` wildcards).
fn pattern_covers(pattern: &str, path: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        let prefix = prefix.trim_end_matches('/');
        path.trim_end_matches('/').starts_with(prefix)
    } else {
        match_pattern(pattern, path).is_some()
    }
}
