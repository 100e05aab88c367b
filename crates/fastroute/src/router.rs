use crate::dispatch::{self, TableView};
use crate::error::RouteError;
use crate::handler::{
    Handler, HandlerRef, Middleware, PanicHandler, Request, RequestIdFn, ResponseWriter,
};
use crate::host;
use crate::path;
use crate::table::{self, MethodSet};
use crate::trie::{RouteEntry, TrieNode};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

/// Default path length ceiling, in bytes.
pub const DEFAULT_MAX_PATH_LENGTH: usize = 4096;
/// Default segment depth ceiling.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Router configuration, fixed at construction.
///
/// Because the flags cannot change after `Router::new`, the case-folding
/// mode used for inserted patterns always agrees with the one used for
/// request paths.
#[derive(Clone)]
pub struct RouterConfig {
    /// Lowercase registered literals and request paths before matching.
    pub ignore_case: bool,
    /// Redirect between `/p` and `/p/` toward the registered form. When
    /// false both forms match the same handler transparently.
    pub strict_slash: bool,
    /// Match against the encoded path when the request carries a valid one.
    pub use_raw_path: bool,
    /// Path length ceiling; longer requests answer `414`.
    pub max_path_length: usize,
    /// Segment depth ceiling for patterns and lookups.
    pub max_depth: usize,
    /// Replaces the built-in `404` response.
    pub not_found: Option<HandlerRef>,
    /// Replaces the built-in `405` response (not consulted for OPTIONS).
    pub method_not_allowed: Option<HandlerRef>,
    /// Receives handler panics caught during dispatch.
    pub panic_handler: Option<PanicHandler>,
    /// Request-id generation hook for middleware that wants one.
    pub request_id: Option<RequestIdFn>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// The stock configuration: strict slashes, case-sensitive, decoded
    /// paths, default limits.
    pub fn new() -> Self {
        Self {
            ignore_case: false,
            strict_slash: true,
            use_raw_path: false,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            max_depth: DEFAULT_MAX_DEPTH,
            not_found: None,
            method_not_allowed: None,
            panic_handler: None,
            request_id: None,
        }
    }
}

pub(crate) struct RouterState {
    pub default_set: MethodSet<TrieNode>,
    pub hosts: HashMap<Box<str>, MethodSet<TrieNode>>,
    middleware: Vec<Middleware>,
    routes_registered: bool,
}

/// The mutable router: registration under a writer lock, dispatch under a
/// reader lock. Freeze it into a [`FrozenRouter`](crate::FrozenRouter) for
/// lock-free read-only serving.
pub struct Router {
    config: RouterConfig,
    state: RwLock<RouterState>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::new())
    }
}

impl Router {
    /// Creates a router with the given configuration.
    pub fn new(config: RouterConfig) -> Self {
        // Zero limits would reject every pattern; treat them as "default".
        let mut config = config;
        if config.max_path_length == 0 {
            config.max_path_length = DEFAULT_MAX_PATH_LENGTH;
        }
        if config.max_depth == 0 {
            config.max_depth = DEFAULT_MAX_DEPTH;
        }
        Self {
            config,
            state: RwLock::new(RouterState {
                default_set: MethodSet::default(),
                hosts: HashMap::new(),
                middleware: Vec::new(),
                routes_registered: false,
            }),
        }
    }

    /// The construction-time configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub(crate) fn state_read(&self) -> RwLockReadGuard<'_, RouterState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append handler-wrapping middleware. Must happen before the first
    /// route so every stored handler carries the full chain.
    pub fn use_middleware(&self, mw: Middleware) -> Result<(), RouteError> {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.routes_registered {
            return Err(RouteError::MiddlewareAfterRoutes);
        }
        state.middleware.push(mw);
        Ok(())
    }

    /// Register `handler` for `method` and `pattern` on the default host.
    pub fn handle(
        &self,
        method: &str,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), RouteError> {
        self.register(None, method, pattern, Arc::new(handler), &[])
    }

    /// Register a route consulted only for requests whose Host header
    /// normalizes to `host`.
    pub fn handle_host(
        &self,
        host: &str,
        method: &str,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), RouteError> {
        self.register(Some(host), method, pattern, Arc::new(handler), &[])
    }

    pub fn get(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("GET", pattern, handler)
    }

    pub fn post(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("POST", pattern, handler)
    }

    pub fn put(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("PUT", pattern, handler)
    }

    pub fn patch(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("PATCH", pattern, handler)
    }

    pub fn delete(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("DELETE", pattern, handler)
    }

    pub fn head(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("HEAD", pattern, handler)
    }

    pub fn options(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("OPTIONS", pattern, handler)
    }

    /// A registration scope with a path prefix and its own middleware,
    /// both baked into each route at registration time.
    pub fn group(&self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup {
            router: self,
            prefix: prefix.to_string(),
            middleware: Vec::new(),
        }
    }

    /// Dispatch one request. Holds the reader lock for the duration of the
    /// handler, so registration waits for in-flight requests.
    pub fn serve(&self, w: &mut dyn ResponseWriter, req: &Request<'_>) {
        let state = self.state_read();
        let view = TableView {
            default_set: &state.default_set,
            hosts: &state.hosts,
        };
        dispatch::serve(&view, &self.config, w, req);
    }

    pub(crate) fn register(
        &self,
        host: Option<&str>,
        method: &str,
        pattern: &str,
        handler: HandlerRef,
        group_middleware: &[Middleware],
    ) -> Result<(), RouteError> {
        validate_method(method)?;
        if pattern.len() > self.config.max_path_length {
            return Err(RouteError::PatternTooLong {
                max: self.config.max_path_length,
            });
        }
        if pattern.bytes().any(|b| matches!(b, 0 | b'\r' | b'\n')) {
            return Err(RouteError::InvalidPath);
        }
        let cleaned = path::clean_path(pattern);
        if cleaned != pattern {
            return Err(RouteError::NonCanonicalPattern {
                found: pattern.to_string(),
                expected: cleaned.into_owned(),
            });
        }

        let match_pattern = match_form(pattern, self.config.ignore_case);
        let segments: Vec<&str> = match_pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let has_params = segments
            .iter()
            .any(|s| s.starts_with(':') || s.starts_with('*'));
        if segments.len() > self.config.max_depth {
            return Err(RouteError::RouteTooDeep {
                max: self.config.max_depth,
            });
        }

        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Bake the middleware chain now: first-registered runs outermost,
        // group middleware sits inside the router-wide chain.
        let mut composed = handler;
        for mw in state
            .middleware
            .iter()
            .chain(group_middleware.iter())
            .rev()
        {
            composed = mw(composed);
        }
        let entry = RouteEntry {
            handler: composed,
            pattern: Arc::from(pattern),
            has_params,
        };

        let set = match host {
            None => &mut state.default_set,
            Some(h) => state
                .hosts
                .entry(host::normalize_host(h).into_owned().into_boxed_str())
                .or_default(),
        };

        if has_params {
            let max_depth = self.config.max_depth;
            let table = set.table_mut(method);
            table.root.insert(&segments, entry, max_depth)?;
            table.has_param_routes = true;
            set.any_param_routes = true;
        } else {
            let table = set.table_mut(method);
            if table.static_routes.contains_key(match_pattern.as_ref()) {
                return Err(RouteError::DuplicateRoute);
            }
            table
                .static_routes
                .insert(match_pattern.as_ref().into(), entry);
            table::refresh_static_allow(set, &match_pattern);
        }

        if pattern.len() > 1 && pattern.ends_with('/') {
            set.has_trailing_slash_routes = true;
        }
        state.routes_registered = true;
        Ok(())
    }
}

/// Registration scope created by [`Router::group`].
pub struct RouteGroup<'r> {
    router: &'r Router,
    prefix: String,
    middleware: Vec<Middleware>,
}

impl RouteGroup<'_> {
    /// Add middleware applying only to routes registered through this
    /// group (and its sub-groups created afterwards).
    pub fn use_middleware(&mut self, mw: Middleware) {
        self.middleware.push(mw);
    }

    /// A nested scope inheriting this group's prefix and middleware.
    pub fn group(&self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup {
            router: self.router,
            prefix: join_prefix(&self.prefix, prefix),
            middleware: self.middleware.clone(),
        }
    }

    /// Register a route under the group's prefix.
    pub fn handle(
        &self,
        method: &str,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), RouteError> {
        let joined = join_prefix(&self.prefix, pattern);
        self.router
            .register(None, method, &joined, Arc::new(handler), &self.middleware)
    }

    pub fn get(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("GET", pattern, handler)
    }

    pub fn post(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("POST", pattern, handler)
    }

    pub fn put(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("PUT", pattern, handler)
    }

    pub fn delete(&self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle("DELETE", pattern, handler)
    }
}

fn validate_method(method: &str) -> Result<(), RouteError> {
    if method.is_empty() || !method.bytes().all(|b| (0x21..=0x7e).contains(&b)) {
        return Err(RouteError::InvalidMethod(method.to_string()));
    }
    Ok(())
}

/// The form a pattern is inserted and matched under: lowercased literals
/// when case folding is on, with `:name`/`*name` tokens left intact.
fn match_form(pattern: &str, ignore_case: bool) -> Cow<'_, str> {
    if !ignore_case {
        return Cow::Borrowed(pattern);
    }
    let mut out = String::with_capacity(pattern.len());
    for (i, seg) in pattern.split('/').enumerate() {
        if i > 0 {
            out.push('/');
        }
        if seg.starts_with(':') || seg.starts_with('*') {
            out.push_str(seg);
        } else {
            out.extend(seg.chars().map(|c| c.to_ascii_lowercase()));
        }
    }
    Cow::Owned(out)
}

fn join_prefix(prefix: &str, pattern: &str) -> String {
    if prefix.is_empty() {
        return pattern.to_string();
    }
    let mut out = prefix.trim_end_matches('/').to_string();
    if !pattern.starts_with('/') {
        out.push('/');
    }
    out.push_str(pattern);
    out
}
