//! # photon
//!
//! Declarative controller routing for HTTP services, on top of hyper.
//!
//! A controller is a base path plus a list of fields. Each field carries a
//! tag string of space-separated `key:"value"` pairs that says what the
//! field is:
//!
//! - `kind:"api"` with `method` and `path` declares a route;
//! - `kind:"middleware"` with one of `path`, `prefix` or `regex` attaches a
//!   middleware to the controller's routes that match.
//!
//! Everything is checked once, at startup. A malformed tag, an unknown
//! method, a broken regex or a duplicate route stops the server before it
//! binds, with a [`StartupError`] naming the field.
//!
//! Typed API functions take their inputs as parameters. Types implementing
//! [`Bind`] are deserialised from the body, query, path or headers; wrapping
//! one in [`Valid`] runs its `validator` rules before the function is called.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use photon::{Bind, BindFrom, BoxError, Config, Controller, Field, Registry, Server, Valid};
//! use serde::{Deserialize, Serialize};
//! use validator::Validate;
//!
//! #[derive(Deserialize, Validate)]
//! struct NewUser {
//!     #[validate(length(min = 1))]
//!     name: String,
//! }
//!
//! impl Bind for NewUser {
//!     const FROM: BindFrom = BindFrom::Body;
//! }
//!
//! #[derive(Serialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! async fn create(Valid(user): Valid<NewUser>) -> Result<User, BoxError> {
//!     Ok(User { id: 1, name: user.name })
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), photon::Error> {
//!     let users = Controller::new("/users")
//!         .field(Field::new("Create", r#"kind:"api" method:"post" path:"/""#).function(create));
//!
//!     let mut registry = Registry::new();
//!     registry.register_controller(users);
//!
//!     let config = Config::from_toml("[server]\nport = \"3000\"").unwrap_or_default();
//!     Server::new(config.server).serve(registry).await
//! }
//! ```

mod api;
mod bind;
mod config;
mod controller;
mod error;
mod handler;
mod method;
mod registry;
mod request;
mod response;
mod route;
mod router;
mod server;
mod validate;

pub mod middleware;

pub use api::{ApiFn, ApiFunction};
pub use bind::{inject, Bind, BindFrom, FromRequest, ParamDescriptor, Valid};
pub use config::{Config, ConfigError, ServerConfig};
pub use controller::{Controller, Field, FieldValue, MalformedTag, Tags};
pub use error::{BindingError, BoxError, Error, HttpError, RequestError, StartupError, ValidationError};
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, Outcome};
pub use method::{Method, UnknownMethod};
pub use middleware::{BoxedMiddleware, GlobalMiddleware, GlobalMiddlewareEntry, Middleware, Next};
pub use registry::Registry;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use route::{check_path, RouteEntry, RouteTable};
pub use router::{default_error_handler, ErrorHandler, Router};
pub use server::{Server, ServerHandle};
