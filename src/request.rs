//! Incoming HTTP request type.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri};

#[derive(Clone, Debug)]
struct Head {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

/// An incoming HTTP request with its body fully buffered.
///
/// Cloning is cheap: head and route parameters sit behind an `Arc`, the body
/// is reference-counted [`Bytes`]. Handlers that declare a `Request`
/// parameter receive the live request this way.
#[derive(Clone, Debug)]
pub struct Request {
    head: Arc<Head>,
    body: Bytes,
    params: Arc<Vec<(String, String)>>,
}

impl Request {
    /// Builds a request by hand. Mostly useful in tests together with
    /// [`Router::dispatch`](crate::Router::dispatch).
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            head: Arc::new(Head { method, uri, headers: HeaderMap::new() }),
            body: Bytes::new(),
            params: Arc::default(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            head: Arc::new(Head { method: parts.method, uri: parts.uri, headers: parts.headers }),
            body,
            params: Arc::default(),
        }
    }

    /// Appends a header. Returns `self` for chaining.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.head).headers.append(name, value);
        self
    }

    /// Replaces the body. Returns `self` for chaining.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub(crate) fn set_params(&mut self, params: Vec<(String, String)>) {
        self.params = Arc::new(params);
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn path(&self) -> &str { self.head.uri.path() }
    pub fn query(&self) -> Option<&str> { self.head.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All path parameters matched by the route, in pattern order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}
