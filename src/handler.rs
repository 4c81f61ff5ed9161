//! Raw route handlers.
//!
//! A route table mixes hand-written `Fn(Request)` handlers with the closures
//! generated for typed API functions, so both are stored the same way: as a
//! [`BoxedHandler`], an `Arc<dyn ErasedHandler>` that returns a boxed
//! [`Outcome`] future.
//!
//! ```text
//! Field::handler(ping)  ->  ping.into_boxed_handler()  ->  Arc<FnHandler<_>>
//! Field::function(f)    ->  ApiFn::into_function()     ->  Arc<FnHandler<_>>
//! ```
//!
//! An `Err` outcome travels back through the middleware chain to the
//! router's error handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::RequestError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// What every handler and middleware resolves to.
pub type Outcome = Result<Response, RequestError>;

pub type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A handler as stored in the route table.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// A raw route handler: `async fn(Request) -> Result<impl IntoResponse,
/// impl Into<RequestError>>`. Sealed; the blanket impl is the only one.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R, E> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: IntoResponse,
    E: Into<RequestError>,
{
}

impl<F, Fut, R, E> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: IntoResponse,
    E: Into<RequestError>,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R, E> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: IntoResponse,
    E: Into<RequestError>,
{
    fn call(&self, req: Request) -> BoxFuture {
        let outcome = (self.0)(req);
        Box::pin(async move {
            match outcome.await {
                Ok(res) => Ok(res.into_response()),
                Err(e) => Err(e.into()),
            }
        })
    }
}
