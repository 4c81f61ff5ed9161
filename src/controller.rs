//! Controller descriptions.
//!
//! A controller is a mount path plus a list of tagged fields. The tags say
//! what a field is and where it goes; the value is what runs.
//!
//! ```rust
//! use photon::{BoxError, Controller, Field, Next, Request};
//!
//! async fn list() -> Result<Vec<String>, BoxError> {
//!     Ok(vec!["ann".into()])
//! }
//!
//! let users = Controller::new("/users")
//!     .field(Field::new("List", r#"kind:"api" method:"get" path:"/list""#).function(list))
//!     .field(
//!         Field::new("Audit", r#"kind:"middleware" prefix:"/""#)
//!             .middleware(|req: Request, next: Next| next.run(req)),
//!     );
//! assert_eq!(users.path(), "/users");
//! ```
//!
//! | tag | on | meaning |
//! |---|---|---|
//! | `kind` | any | `api` or `middleware`, any case; other fields are ignored |
//! | `path` | api | route path below the controller |
//! | `method` | api | HTTP method, any case |
//! | `path` | middleware | attach to the route with exactly this path |
//! | `prefix` | middleware | attach to routes matching `^prefix` |
//! | `regex` | middleware | attach to routes matching the pattern |
//!
//! An api field without `path` or `method` is disabled, not an error.

use std::sync::Arc;

use crate::api::{ApiFn, ApiFunction};
use crate::error::StartupError;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{BoxedMiddleware, Middleware};

/// A mount path and its tagged fields.
#[derive(Clone)]
pub struct Controller {
    path: String,
    fields: Vec<Field>,
}

impl Controller {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), fields: Vec::new() }
    }

    /// Appends a field. Returns `self` for chaining.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// What a field holds. `None` is a nil value.
#[derive(Clone)]
pub enum FieldValue {
    /// A pre-built handler, mounted without parameter injection.
    Handler(Option<BoxedHandler>),
    /// A typed API function.
    Function(Option<ApiFunction>),
    Middleware(Option<BoxedMiddleware>),
    /// Anything else; carries the type name for error messages.
    Other(&'static str),
}

impl FieldValue {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::Handler(_) => "Handler",
            Self::Function(_) => "Function",
            Self::Middleware(_) => "Middleware",
            Self::Other(name) => *name,
        }
    }
}

/// One tagged member of a controller.
#[derive(Clone)]
pub struct Field {
    name: String,
    raw_tags: String,
    extra_tags: Vec<(String, String)>,
    value: FieldValue,
}

impl Field {
    /// A field with struct-tag style tags, e.g.
    /// `kind:"api" method:"post" path:"/users"`.
    pub fn new(name: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_tags: tags.into(),
            extra_tags: Vec::new(),
            value: FieldValue::Other("()"),
        }
    }

    /// Adds one tag. Tags from [`Field::new`] take precedence on conflict.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_tags.push((key.into(), value.into()));
        self
    }

    pub fn handler(self, handler: impl Handler) -> Self {
        self.value(FieldValue::Handler(Some(handler.into_boxed_handler())))
    }

    pub fn function<Args>(self, f: impl ApiFn<Args>) -> Self {
        self.value(FieldValue::Function(Some(f.into_function())))
    }

    pub fn middleware(self, middleware: impl Middleware) -> Self {
        self.value(FieldValue::Middleware(Some(Arc::new(middleware))))
    }

    pub fn value(mut self, value: FieldValue) -> Self {
        self.value = value;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn field_value(&self) -> &FieldValue {
        &self.value
    }

    /// Parses the field's tags.
    pub fn tags(&self) -> Result<Tags, StartupError> {
        let mut tags = Tags::parse(&self.raw_tags).map_err(|_| StartupError::MalformedTag {
            field: self.name.clone(),
            tag: self.raw_tags.clone(),
        })?;
        tags.pairs.extend(self.extra_tags.iter().cloned());
        Ok(tags)
    }
}

/// Parsed `key:"value"` tags. Lookups return the first occurrence; an empty
/// value reads the same as a missing key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags {
    pairs: Vec<(String, String)>,
}

/// The tag string is not a sequence of `key:"value"` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedTag;

impl Tags {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Parses space-separated `key:"value"` pairs, with backslash escapes
    /// inside the quotes.
    pub fn parse(input: &str) -> Result<Self, MalformedTag> {
        let mut pairs = Vec::new();
        let mut rest = input.trim_start();

        while !rest.is_empty() {
            let colon = rest.find(':').ok_or(MalformedTag)?;
            let key = &rest[..colon];
            if key.is_empty() || key.contains(|c: char| c == '"' || c.is_whitespace() || c.is_control()) {
                return Err(MalformedTag);
            }

            let quoted = rest[colon + 1..].strip_prefix('"').ok_or(MalformedTag)?;
            let mut value = String::new();
            let mut chars = quoted.char_indices();
            let end = loop {
                match chars.next() {
                    Some((i, '"')) => break i,
                    Some((_, '\\')) => match chars.next() {
                        Some((_, c)) => value.push(unescape(c)),
                        None => return Err(MalformedTag),
                    },
                    Some((_, c)) => value.push(c),
                    None => return Err(MalformedTag),
                }
            };

            pairs.push((key.to_owned(), value));
            rest = quoted[end + 1..].trim_start();
        }

        Ok(Self { pairs })
    }
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}
