//! Router core module - hot path for request routing.
//!
//! The registry keeps two tiers per HTTP method: an exact-match index for
//! templates without variables, and the templated routes in registration order.
//! Lookups read an immutable [`RouteTable`] snapshot through [`ArcSwap`] and
//! never take a lock; registration clones the table under a writer mutex and
//! publishes the new snapshot.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use super::pattern::{normalize_path, ParamVec};
use crate::error::RegistrationError;
use crate::route::Route;
use arc_swap::ArcSwap;
use http::Method;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Matches slower than this are logged at warn level.
const SLOW_MATCH_THRESHOLD: Duration = Duration::from_millis(1);

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route (Arc to avoid expensive clones)
    pub route: Arc<Route>,
    /// Path variables extracted from the URL in declaration order
    /// (e.g., `{id}` → `("id", "123")`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths (e.g., `/org/{id}/user/{id}`), returns the last
    /// occurrence.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to a HashMap.
    /// Note: This allocates - use get_path_param() in hot paths instead
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Immutable routing snapshot.
#[derive(Clone, Default)]
pub struct RouteTable {
    exact: HashMap<Method, HashMap<Box<str>, Arc<Route>>>,
    templated: HashMap<Method, Vec<Arc<Route>>>,
    order: Vec<Arc<Route>>,
}

impl RouteTable {
    fn contains(&self, method: &Method, template: &str) -> bool {
        if let Some(exact) = self.exact.get(method) {
            if exact.contains_key(template) {
                return true;
            }
        }
        self.templated
            .get(method)
            .is_some_and(|routes| routes.iter().any(|r| r.pattern.template() == template))
    }

    fn insert(&mut self, route: Arc<Route>) {
        if route.pattern.is_literal() {
            self.exact
                .entry(route.method.clone())
                .or_default()
                .insert(route.pattern.template().into(), Arc::clone(&route));
        } else {
            self.templated
                .entry(route.method.clone())
                .or_default()
                .push(Arc::clone(&route));
        }
        self.order.push(route);
    }

    fn find(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        if let Some(route) = self.exact.get(method).and_then(|m| m.get(path)) {
            return Some(RouteMatch {
                route: Arc::clone(route),
                path_params: ParamVec::new(),
            });
        }

        self.templated.get(method)?.iter().find_map(|route| {
            route.pattern.matches(path).map(|path_params| RouteMatch {
                route: Arc::clone(route),
                path_params,
            })
        })
    }
}

/// Two-tier route store shared by every connection.
pub struct RouteRegistry {
    table: ArcSwap<RouteTable>,
    writer: Mutex<()>,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::default()),
            writer: Mutex::new(()),
        }
    }

    /// Register a route.
    ///
    /// Fails with [`RegistrationError::DuplicateRoute`] when the same method and
    /// template are already present. The same template under a different
    /// method is a distinct route.
    pub fn register(&self, route: Route) -> Result<Arc<Route>, RegistrationError> {
        // A poisoned writer only means another registration panicked; the
        // published snapshot is still consistent.
        let _guard = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let current = self.table.load_full();
        if current.contains(&route.method, route.pattern.template()) {
            warn!(
                method = %route.method,
                template = %route.pattern,
                handler_name = %route.handler_name,
                "Duplicate route rejected"
            );
            return Err(RegistrationError::DuplicateRoute {
                method: route.method.clone(),
                template: route.pattern.template().to_string(),
            });
        }

        let route = Arc::new(route);
        let mut next = RouteTable::clone(&current);
        next.insert(Arc::clone(&route));
        self.table.store(Arc::new(next));

        info!(
            method = %route.method,
            template = %route.pattern,
            handler_name = %route.handler_name,
            literal = route.pattern.is_literal(),
            params = route.descriptors.len(),
            "Route registered"
        );
        Ok(route)
    }

    /// Match a request method and raw path.
    ///
    /// The query string and trailing slash are stripped first. Literal routes
    /// are looked up in O(1); templated routes are scanned in registration order
    /// and the first match wins.
    #[must_use]
    pub fn lookup(&self, method: &Method, raw_path: &str) -> Option<RouteMatch> {
        let path = normalize_path(raw_path);
        debug!(method = %method, path = %path, "Route match attempt");

        let match_start = Instant::now();
        let result = self.table.load().find(method, path);
        let match_duration = match_start.elapsed();

        match &result {
            Some(m) => {
                if match_duration > SLOW_MATCH_THRESHOLD {
                    warn!(
                        method = %method,
                        path = %path,
                        handler_name = %m.route.handler_name,
                        route_pattern = %m.route.pattern,
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %method,
                        path = %path,
                        handler_name = %m.route.handler_name,
                        route_pattern = %m.route.pattern,
                        path_params = ?m.path_params,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
            }
            None => {
                debug!(
                    method = %method,
                    path = %path,
                    duration_us = match_duration.as_micros(),
                    "No route matched"
                );
            }
        }
        result
    }

    /// Routes in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.table.load().order.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.load().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        let table = self.table.load();
        println!("[routes] count={}", table.order.len());
        for route in &table.order {
            println!(
                "[route] {} {} -> {}",
                route.method, route.pattern, route.handler_name
            );
        }
    }
}
