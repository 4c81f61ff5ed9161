//! Parameter binding.
//!
//! A typed API function declares what it needs by its parameter types. Each
//! parameter is one of:
//!
//! - [`Request`]: the live request, passed through as-is;
//! - a type implementing [`Bind`]: deserialised from the request facet named
//!   by [`Bind::FROM`];
//! - [`Valid<T>`]: as above, then validated before the function runs.
//!
//! ```rust
//! use photon::{Bind, BindFrom, Valid};
//! use serde::Deserialize;
//! use validator::Validate;
//!
//! #[derive(Deserialize, Validate)]
//! struct CreateUser {
//!     #[validate(length(min = 1))]
//!     name: String,
//! }
//!
//! impl Bind for CreateUser {
//!     const FROM: BindFrom = BindFrom::Body;
//! }
//!
//! async fn create(Valid(user): Valid<CreateUser>) -> Result<String, photon::BoxError> {
//!     Ok(user.name)
//! }
//! ```
//!
//! Every call deserialises a fresh value; nothing is cached across requests.
//!
//! A field missing from the request fails the bind with a [`BindingError`]
//! before any validation rule runs. Put `#[serde(default)]` on the container
//! (and derive `Default`) to start from a zero-valued struct instead: missing
//! fields then come out empty and are reported by the validation rules.
//!
//! Query strings, forms, path parameters and headers are flat `key=value`
//! pairs. A key may appear once; repeated keys (`?tag=a&tag=b`) cannot be
//! read into a `Vec` and fail the bind. Take a comma-separated `String` and
//! split it in the handler when a list is needed.

use std::any::type_name;
use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{BindingError, BoxError, ValidationError};
use crate::request::Request;
use crate::validate;

/// The request facet a parameter type is populated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindFrom {
    /// The body, decoded according to its `content-type`.
    Body,
    /// The query string. Each key at most once; no sequences.
    Query,
    /// Named route parameters, e.g. `{id}` in `/users/{id}`.
    Path,
    /// Request headers, keyed by lower-case header name.
    Header,
}

impl fmt::Display for BindFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Body => "body",
            Self::Query => "query",
            Self::Path => "path",
            Self::Header => "header",
        })
    }
}

/// A parameter type populated from one request facet.
pub trait Bind: DeserializeOwned + Send + 'static {
    const FROM: BindFrom;

    /// Cross-field checks run after the field rules pass. Only invoked when
    /// the parameter is wrapped in [`Valid`].
    fn self_validate(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Opts a parameter into validation: `validator` field rules first, then
/// [`Bind::self_validate`].
///
/// Rules only see values that were bound. For a missing field to be reported
/// as a rule failure rather than a binding error, mark the type
/// `#[serde(default)]` so it starts out zero-valued.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Valid<T>(pub T);

impl<T> Valid<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Valid<T> {
    type Target = T;
    fn deref(&self) -> &T { &self.0 }
}

impl<T> DerefMut for Valid<T> {
    fn deref_mut(&mut self) -> &mut T { &mut self.0 }
}

/// How one handler parameter is bound, known when the route is registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub type_name: &'static str,
    /// `None` for the request context itself.
    pub source: Option<BindFrom>,
    pub validated: bool,
}

/// A value a typed API function can take as a parameter.
///
/// Implemented for [`Request`], every [`Bind`] type and [`Valid<T>`].
pub trait FromRequest: Sized + Send + 'static {
    fn describe() -> ParamDescriptor;

    fn assemble(req: &Request) -> Result<Self, BindingError>;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl FromRequest for Request {
    fn describe() -> ParamDescriptor {
        ParamDescriptor { type_name: type_name::<Self>(), source: None, validated: false }
    }

    fn assemble(req: &Request) -> Result<Self, BindingError> {
        Ok(req.clone())
    }
}

impl<T: Bind> FromRequest for T {
    fn describe() -> ParamDescriptor {
        ParamDescriptor { type_name: type_name::<T>(), source: Some(T::FROM), validated: false }
    }

    fn assemble(req: &Request) -> Result<Self, BindingError> {
        inject(req, T::FROM)
    }
}

impl<T: Bind + Validate> FromRequest for Valid<T> {
    fn describe() -> ParamDescriptor {
        ParamDescriptor { type_name: type_name::<T>(), source: Some(T::FROM), validated: true }
    }

    fn assemble(req: &Request) -> Result<Self, BindingError> {
        inject(req, T::FROM).map(Valid)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate::check(&self.0)
    }
}

/// Deserialises a `T` from the facet of `req` named by `from`.
pub fn inject<T: DeserializeOwned>(req: &Request, from: BindFrom) -> Result<T, BindingError> {
    match from {
        BindFrom::Body => body(req),
        BindFrom::Query => {
            serde_urlencoded::from_str(req.query().unwrap_or_default()).map_err(BindingError::Query)
        }
        BindFrom::Path => {
            let pairs: Vec<(&str, &str)> = req.params().iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            from_pairs(&pairs, "path").map_err(|e| e.into_binding(BindingError::Path))
        }
        BindFrom::Header => {
            let pairs: Vec<(&str, &str)> = req.headers().keys()
                .filter_map(|name| {
                    let value = req.headers().get(name)?.to_str().ok()?;
                    Some((name.as_str(), value))
                })
                .collect();
            from_pairs(&pairs, "header").map_err(|e| e.into_binding(BindingError::Header))
        }
    }
}

fn body<T: DeserializeOwned>(req: &Request) -> Result<T, BindingError> {
    let content_type = req.header("content-type").unwrap_or_default();
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "application/json" => serde_json::from_slice(req.body()).map_err(BindingError::Json),
        m if m.ends_with("+json") => serde_json::from_slice(req.body()).map_err(BindingError::Json),
        "application/x-www-form-urlencoded" => {
            serde_urlencoded::from_bytes(req.body()).map_err(BindingError::Form)
        }
        _ => Err(BindingError::UnsupportedMediaType(content_type.to_owned())),
    }
}

enum PairsError {
    Encode(&'static str, serde_urlencoded::ser::Error),
    Decode(serde_urlencoded::de::Error),
}

impl PairsError {
    fn into_binding(self, decode: fn(serde_urlencoded::de::Error) -> BindingError) -> BindingError {
        match self {
            Self::Encode(facet, e) => BindingError::Encode(facet, e),
            Self::Decode(e) => decode(e),
        }
    }
}

// Round-trips through the urlencoded form so scalar fields (`u64`, `bool`)
// are parsed from their string values the same way the query string is.
fn from_pairs<T: DeserializeOwned>(pairs: &[(&str, &str)], facet: &'static str) -> Result<T, PairsError> {
    let encoded = serde_urlencoded::to_string(pairs).map_err(|e| PairsError::Encode(facet, e))?;
    serde_urlencoded::from_str(&encoded).map_err(PairsError::Decode)
}
