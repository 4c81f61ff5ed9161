//! Typed API functions.
//!
//! Any `async fn` whose parameters all implement
//! [`FromRequest`](crate::FromRequest) and which returns `Result<T, E>` with
//! `T: Serialize` can be mounted as an API field. The generated handler:
//!
//! 1. assembles every parameter, in order; the first binding failure ends
//!    the request;
//! 2. validates them, in order; the first invalid parameter ends the
//!    request, later ones stay unchecked;
//! 3. calls the function;
//! 4. serialises `Ok(value)` as a JSON `200`, or hands `Err(e)` unchanged to
//!    the error handler.
//!
//! Functions take up to eight parameters.

use std::future::Future;

use serde::Serialize;

use crate::bind::{FromRequest, ParamDescriptor};
use crate::error::{BoxError, RequestError};
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// A typed function turned into a route handler plus its parameter bindings.
#[derive(Clone)]
pub struct ApiFunction {
    pub(crate) endpoint: BoxedHandler,
    pub(crate) params: Vec<ParamDescriptor>,
}

impl ApiFunction {
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }
}

/// Implemented for every async function usable as an API field. `Args` is
/// the tuple of its parameter types; you never name it.
pub trait ApiFn<Args>: Clone + Send + Sync + 'static {
    fn into_function(self) -> ApiFunction;
}

macro_rules! api_fn {
    ($($param:ident),*) => {
        impl<F, Fut, T, E, $($param,)*> ApiFn<($($param,)*)> for F
        where
            F: Fn($($param),*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Result<T, E>> + Send + 'static,
            T: Serialize,
            E: Into<BoxError>,
            $($param: FromRequest,)*
        {
            #[allow(non_snake_case, unused_variables)]
            fn into_function(self) -> ApiFunction {
                let params = vec![$(<$param as FromRequest>::describe(),)*];
                let endpoint = move |req: Request| {
                    let f = self.clone();
                    async move {
                        $(let $param = <$param as FromRequest>::assemble(&req)?;)*
                        $($param.validate()?;)*
                        let value = f($($param),*)
                            .await
                            .map_err(|e| RequestError::Handler(e.into()))?;
                        Response::to_json(&value)
                    }
                };
                ApiFunction { endpoint: endpoint.into_boxed_handler(), params }
            }
        }
    };
}

api_fn!();
api_fn!(P1);
api_fn!(P1, P2);
api_fn!(P1, P2, P3);
api_fn!(P1, P2, P3, P4);
api_fn!(P1, P2, P3, P4, P5);
api_fn!(P1, P2, P3, P4, P5, P6);
api_fn!(P1, P2, P3, P4, P5, P6, P7);
api_fn!(P1, P2, P3, P4, P5, P6, P7, P8);
