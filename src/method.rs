//! HTTP method as a typed enum.
//!
//! A controller field names its method in the `method` tag, in any case
//! (`method:"get"`). The tag is upper-cased and parsed into a [`Method`] when
//! the route table is built; an unknown name is a startup error, not a
//! silently dead route.
//!
//! Requests whose method is not in this list never match a route and are
//! answered with `405 Method Not Allowed`.

use std::fmt;
use std::str::FromStr;

/// A known HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    // RFC 9110 ─────────────────────────────────────────────────────────────────
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
    // WebDAV RFC 4918 ──────────────────────────────────────────────────────────
    Copy,
    Lock,
    Mkcol,
    Move,
    Propfind,
    Proppatch,
    Unlock,
    // Cache invalidation ───────────────────────────────────────────────────────
    Purge, // nginx / Varnish
}

const ALL: [(Method, &str); 17] = [
    (Method::Connect,   "CONNECT"),
    (Method::Copy,      "COPY"),
    (Method::Delete,    "DELETE"),
    (Method::Get,       "GET"),
    (Method::Head,      "HEAD"),
    (Method::Lock,      "LOCK"),
    (Method::Mkcol,     "MKCOL"),
    (Method::Move,      "MOVE"),
    (Method::Options,   "OPTIONS"),
    (Method::Patch,     "PATCH"),
    (Method::Post,      "POST"),
    (Method::Propfind,  "PROPFIND"),
    (Method::Proppatch, "PROPPATCH"),
    (Method::Purge,     "PURGE"),
    (Method::Put,       "PUT"),
    (Method::Trace,     "TRACE"),
    (Method::Unlock,    "UNLOCK"),
];

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        ALL.iter()
            .find(|(m, _)| *m == self)
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    /// Parses a controller tag value: case-insensitive, surrounding
    /// whitespace ignored.
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.trim().to_ascii_uppercase().parse().ok()
    }
}

/// Returned when a string names no known method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod;

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .find(|(_, name)| *name == s)
            .map(|(m, _)| *m)
            .ok_or(UnknownMethod)
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = UnknownMethod;

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        m.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
