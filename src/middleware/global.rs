//! Process-wide middleware, ordered by priority.
//!
//! Global middleware are attached to the router before any controller route
//! exists, independently of controller-scoped middleware. Lower priority
//! runs earlier; equal priorities keep registration order.

use std::sync::Arc;

use tracing::debug;

use super::{BoxedMiddleware, Middleware};
use crate::router::Router;

/// A middleware instance registered for every route under a path prefix.
pub trait GlobalMiddleware: Send + Sync + 'static {
    fn middleware(&self) -> BoxedMiddleware;

    /// `""` or `"/"` covers every request.
    fn path_prefix(&self) -> &str;

    fn priority(&self) -> i32;
}

/// The plain-data [`GlobalMiddleware`]: a handler, a prefix, a priority.
///
/// ```rust
/// use photon::{GlobalMiddlewareEntry, Next, Registry, Request};
///
/// let mut registry = Registry::new();
/// registry.register_global_middleware(GlobalMiddlewareEntry::new(
///     "/api",
///     10,
///     |req: Request, next: Next| next.run(req),
/// ));
/// ```
#[derive(Clone)]
pub struct GlobalMiddlewareEntry {
    handler: BoxedMiddleware,
    path_prefix: String,
    priority: i32,
}

impl GlobalMiddlewareEntry {
    pub fn new(path_prefix: impl Into<String>, priority: i32, handler: impl Middleware) -> Self {
        Self { handler: Arc::new(handler), path_prefix: path_prefix.into(), priority }
    }
}

impl GlobalMiddleware for GlobalMiddlewareEntry {
    fn middleware(&self) -> BoxedMiddleware {
        Arc::clone(&self.handler)
    }

    fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// Sorts `registrations` by ascending priority and attaches each one to
/// `router` in that order. The sort is stable.
pub fn order_and_attach(registrations: &[Arc<dyn GlobalMiddleware>], router: &mut Router) {
    let mut ordered: Vec<&Arc<dyn GlobalMiddleware>> = registrations.iter().collect();
    ordered.sort_by_key(|m| m.priority());

    for m in ordered {
        debug!(prefix = m.path_prefix(), priority = m.priority(), "attaching global middleware");
        router.use_at(m.path_prefix(), m.middleware());
    }
}

/// Whether a global middleware mounted at `prefix` covers `path`.
///
/// Matching is per segment: `/api` covers `/api` and `/api/users`, not
/// `/apis`.
pub(crate) fn covers(prefix: &str, path: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::Method;

    use super::*;
    use crate::middleware::Next;
    use crate::request::Request;

    fn entry(log: &Arc<Mutex<Vec<i32>>>, prefix: &str, priority: i32, id: i32) -> Arc<dyn GlobalMiddleware> {
        let log = Arc::clone(log);
        Arc::new(GlobalMiddlewareEntry::new(prefix, priority, move |req: Request, next: Next| {
            log.lock().unwrap().push(id);
            next.run(req)
        }))
    }

    #[test]
    fn prefix_coverage_is_segment_aware() {
        assert!(covers("", "/anything"));
        assert!(covers("/", "/anything"));
        assert!(covers("/api", "/api"));
        assert!(covers("/api", "/api/users"));
        assert!(covers("/api/", "/api/users"));
        assert!(!covers("/api", "/apis"));
        assert!(!covers("/api", "/"));
    }

    #[tokio::test]
    async fn attaches_in_ascending_priority() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registrations = vec![
            entry(&log, "/", 30, 30),
            entry(&log, "/", 10, 10),
            entry(&log, "/", 20, 20),
        ];
        let mut router = Router::new();
        order_and_attach(&registrations, &mut router);

        router.dispatch(Request::new(Method::GET, "/missing".parse().unwrap())).await;
        assert_eq!(*log.lock().unwrap(), [10, 20, 30]);
    }

    #[tokio::test]
    async fn equal_priorities_keep_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registrations = vec![
            entry(&log, "/", 5, 1),
            entry(&log, "/", 1, 0),
            entry(&log, "/", 5, 2),
            entry(&log, "/", 5, 3),
        ];
        let mut router = Router::new();
        order_and_attach(&registrations, &mut router);

        router.dispatch(Request::new(Method::GET, "/".parse().unwrap())).await;
        assert_eq!(*log.lock().unwrap(), [0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn prefix_limits_which_requests_run_it() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registrations = vec![entry(&log, "/admin", 0, 1), entry(&log, "", 1, 2)];
        let mut router = Router::new();
        order_and_attach(&registrations, &mut router);

        router.dispatch(Request::new(Method::GET, "/public".parse().unwrap())).await;
        router.dispatch(Request::new(Method::GET, "/admin/users".parse().unwrap())).await;
        assert_eq!(*log.lock().unwrap(), [2, 1, 2]);
    }
}
