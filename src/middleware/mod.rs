//! Middleware layer.
//!
//! Middleware intercepts a request on its way to the handler and the outcome
//! on its way back: authentication, request ids, tracing, timing. There are
//! two scopes:
//!
//! - **controller-scoped**: a `kind:"middleware"` field on a
//!   [`Controller`](crate::Controller), attached to that controller's routes by
//!   exact path, prefix or regex when the route table is built;
//! - **global**: a [`GlobalMiddleware`] registered on the
//!   [`Registry`](crate::Registry), run for every request under its path
//!   prefix, ordered by priority (see [`global`]).
//!
//! For one request the chain is: matching global middleware in priority
//! order, then the route's middleware in field order, then the handler.
//!
//! ```rust,no_run
//! use photon::{Next, Request, RequestError, Response};
//!
//! async fn timing(req: Request, next: Next) -> Result<Response, RequestError> {
//!     let started = std::time::Instant::now();
//!     let res = next.run(req).await;
//!     tracing::debug!(elapsed = ?started.elapsed(), "handled");
//!     res
//! }
//! ```

pub mod global;

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, Outcome};
use crate::request::Request;

pub use global::{order_and_attach, GlobalMiddleware, GlobalMiddlewareEntry};

/// A middleware function.
///
/// Automatically implemented for `Fn(Request, Next) -> impl Future<Output =
/// Result<Response, RequestError>>`. Call [`Next::run`] to continue the chain,
/// or return without calling it to short-circuit.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self)(req, next))
    }
}

/// A type-erased middleware shared across routes and requests.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The rest of the chain after the current middleware.
pub struct Next {
    chain: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(chain: Arc<[BoxedMiddleware]>, endpoint: BoxedHandler) -> Self {
        Self { chain, index: 0, endpoint }
    }

    /// Runs the remaining middleware and, at the end, the route handler.
    pub fn run(self, req: Request) -> BoxFuture {
        match self.chain.get(self.index) {
            Some(middleware) => {
                let middleware = Arc::clone(middleware);
                let next = Next {
                    chain: self.chain,
                    index: self.index + 1,
                    endpoint: self.endpoint,
                };
                middleware.handle(req, next)
            }
            None => self.endpoint.call(req),
        }
    }
}
