//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. The router receives the
//! finished [`RouteTable`] at startup and is read-only afterwards; every
//! connection task shares it through an `Arc`.
//!
//! Route parameters use matchit's `{name}` syntax: a route `/users/{id}`
//! matches `/users/42` and binds `id = "42"`.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use matchit::Router as MatchitRouter;
use tracing::{debug, warn};

use crate::error::{HttpError, RequestError, StartupError};
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::global::covers;
use crate::middleware::{BoxedMiddleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::route::{RouteEntry, RouteTable};

/// Turns a failed request into the response the client sees.
pub type ErrorHandler = fn(&RequestError) -> Response;

/// The generic translation: `500` with the error text, unless the handler
/// returned an [`HttpError`], whose status is used instead.
pub fn default_error_handler(err: &RequestError) -> Response {
    let status = err
        .handler_error()
        .and_then(|e| e.downcast_ref::<HttpError>())
        .map_or(StatusCode::INTERNAL_SERVER_ERROR, HttpError::status);
    warn!(status = status.as_u16(), error = %err, "request failed");
    Response::builder().status(status).text(err.to_string())
}

struct Route {
    middleware: Arc<[BoxedMiddleware]>,
    handler: BoxedHandler,
}

struct Mounted {
    prefix: String,
    middleware: BoxedMiddleware,
}

enum Lookup<'a> {
    Found(&'a Route, Vec<(String, String)>),
    MethodNotAllowed,
    NotFound,
}

/// The application router.
///
/// Built by [`Registry::assemble`](crate::Registry::assemble): global
/// middleware first, then every route of the table.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
    global: Vec<Mounted>,
    error_handler: ErrorHandler,
    not_found: BoxedHandler,
    method_not_allowed: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            global: Vec::new(),
            error_handler: default_error_handler,
            not_found: status_handler(StatusCode::NOT_FOUND),
            method_not_allowed: status_handler(StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    /// Replaces the error translation.
    pub fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.error_handler = handler;
    }

    /// Mounts a global middleware under `prefix`. Call order is run order.
    pub fn use_at(&mut self, prefix: &str, middleware: BoxedMiddleware) {
        self.global.push(Mounted { prefix: prefix.to_owned(), middleware });
    }

    /// Registers every entry of `table`, in order.
    pub fn install(&mut self, table: RouteTable) -> Result<(), StartupError> {
        for entry in table.into_entries() {
            self.register(entry)?;
        }
        Ok(())
    }

    /// Registers one route: its middleware chain followed by its handler.
    pub fn register(&mut self, entry: RouteEntry) -> Result<(), StartupError> {
        let route = Route {
            middleware: entry.middleware().to_vec().into(),
            handler: Arc::clone(entry.handler()),
        };
        self.routes
            .entry(entry.method())
            .or_default()
            .insert(entry.path(), route)
            .map_err(|source| StartupError::Route { path: entry.path().to_owned(), source })
    }

    /// Routes one request through global middleware, route middleware and
    /// handler, and translates any error into a response.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let path = req.path().to_owned();

        let (route_middleware, endpoint) = match self.lookup(&req, &path) {
            Lookup::Found(route, params) => {
                req.set_params(params);
                (Some(&route.middleware), Arc::clone(&route.handler))
            }
            Lookup::MethodNotAllowed => (None, Arc::clone(&self.method_not_allowed)),
            Lookup::NotFound => (None, Arc::clone(&self.not_found)),
        };

        let chain: Arc<[BoxedMiddleware]> = self.global.iter()
            .filter(|m| covers(&m.prefix, &path))
            .map(|m| Arc::clone(&m.middleware))
            .chain(route_middleware.into_iter().flat_map(|c| c.iter().cloned()))
            .collect();

        match Next::new(chain, endpoint).run(req).await {
            Ok(res) => res,
            Err(err) => (self.error_handler)(&err),
        }
    }

    fn lookup(&self, req: &Request, path: &str) -> Lookup<'_> {
        let found = Method::try_from(req.method()).ok()
            .and_then(|m| self.routes.get(&m))
            .and_then(|tree| tree.at(path).ok());

        if let Some(matched) = found {
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Lookup::Found(matched.value, params);
        }

        if self.routes.values().any(|tree| tree.at(path).is_ok()) {
            debug!(method = %req.method(), path, "method not allowed");
            Lookup::MethodNotAllowed
        } else {
            Lookup::NotFound
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn status_handler(status: StatusCode) -> BoxedHandler {
    (move |_req: Request| async move { Ok::<_, RequestError>(status) }).into_boxed_handler()
}
