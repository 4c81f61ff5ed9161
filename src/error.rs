//! Error types.
//!
//! Two tiers, never mixed:
//!
//! - [`StartupError`]: the controllers describe something that cannot be
//!   served (bad path, duplicate route, broken selector). Raised while the
//!   route table is assembled, before the listener accepts a single
//!   connection. The application is expected to abort on it.
//! - [`RequestError`]: one request failed (body would not parse, a
//!   parameter was invalid, the handler returned an error). It travels back
//!   through the middleware chain to the router's error handler, which turns
//!   it into a response. The server keeps running.
//!
//! [`Error`] covers the infrastructure around both: binding the port,
//! joining the accept loop, draining connections on shutdown.

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// A boxed, thread-safe error returned by application handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by photon's fallible lifecycle operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("invalid listen address `{0}`")]
    Address(String),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("in-flight connections did not drain within {0:?}")]
    DrainTimeout(Duration),
}

/// A controller description that cannot be turned into a route table.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("context path is invalid, path: {0}")]
    InvalidContextPath(String),

    #[error("controller path is invalid, path: {0}")]
    InvalidControllerPath(String),

    #[error("field {field}: malformed tag `{tag}`")]
    MalformedTag { field: String, tag: String },

    #[error("function {field}: unknown http method `{method}`")]
    UnknownMethod { field: String, method: String },

    #[error("function {field}: handler should not be nil")]
    NilHandler { field: String },

    #[error("function {field}: function should not be nil")]
    NilFunction { field: String },

    #[error("function {field}: handler type `{found}` is unknown, not supported")]
    UnknownHandlerType { field: String, found: &'static str },

    #[error("middleware {field}: value of type `{found}` is not a middleware")]
    MiddlewareType { field: String, found: &'static str },

    #[error("middleware {field}: path, prefix or regex should not all be empty")]
    MissingSelector { field: String },

    #[error("middleware {field}: regex is invalid, regex pattern: {pattern}")]
    InvalidSelector {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("api path {0} is duplicated")]
    DuplicatePath(String),

    #[error("route `{path}` rejected by the router: {source}")]
    Route {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

/// Failure to populate a handler parameter from the request.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("unsupported content type `{0}`")]
    UnsupportedMediaType(String),

    #[error("invalid json body: {0}")]
    Json(#[source] serde_json::Error),

    #[error("invalid form body: {0}")]
    Form(#[source] serde_urlencoded::de::Error),

    #[error("invalid query string: {0}")]
    Query(#[source] serde_urlencoded::de::Error),

    #[error("invalid path parameters: {0}")]
    Path(#[source] serde_urlencoded::de::Error),

    #[error("invalid headers: {0}")]
    Header(#[source] serde_urlencoded::de::Error),

    #[error("failed to encode {0} pairs: {1}")]
    Encode(&'static str, #[source] serde_urlencoded::ser::Error),
}

/// A parameter that opted into validation did not pass it.
///
/// The message is already formatted for the client: one
/// `[Field]: 'value' | Needs to implement 'rule'` item per failing rule, or
/// the text of the self-validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An error carrying its own HTTP status.
///
/// Return it from a handler when the default 500 is the wrong answer:
///
/// ```rust
/// use photon::HttpError;
/// use http::StatusCode;
///
/// let err = HttpError::new(StatusCode::NOT_FOUND, "no such user");
/// assert_eq!(err.status(), StatusCode::NOT_FOUND);
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// A single request failed; handed to the router's error handler.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to serialize response body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Returned by the application handler, passed through untouched.
    #[error("{0}")]
    Handler(BoxError),
}

impl RequestError {
    /// The application error behind [`RequestError::Handler`], if any.
    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Handler(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<HttpError> for RequestError {
    fn from(e: HttpError) -> Self {
        Self::Handler(Box::new(e))
    }
}
