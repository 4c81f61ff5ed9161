//! Route table assembly.
//!
//! Turns registered [`Controller`]s into a flat, ordered list of
//! [`RouteEntry`]s:
//!
//! 1. check the context path and each controller path;
//! 2. per controller, build one entry per enabled api field, then attach
//!    each middleware field to the entries it selects;
//! 3. prefix the controller's entries with `context path + controller path`;
//! 4. reject the table if two entries share a path, whatever their methods.
//!
//! Middleware selectors are matched before step 3, so they are written
//! relative to their own controller and never see other controllers'
//! routes.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::bind::ParamDescriptor;
use crate::controller::{Controller, Field, FieldValue, Tags};
use crate::error::StartupError;
use crate::handler::BoxedHandler;
use crate::method::Method;
use crate::middleware::BoxedMiddleware;

static PATH_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/.+[^/]$").expect("path syntax regex should be valid")
});

const API: &str = "api";
const MIDDLEWARE: &str = "middleware";

/// One route: where it lives, what runs before it, and what answers it.
#[derive(Clone)]
pub struct RouteEntry {
    name: String,
    path: String,
    method: Method,
    middleware: Vec<BoxedMiddleware>,
    handler: BoxedHandler,
    params: Vec<ParamDescriptor>,
}

impl RouteEntry {
    /// The controller field this route came from.
    pub fn name(&self) -> &str { &self.name }
    pub fn path(&self) -> &str { &self.path }
    pub fn method(&self) -> Method { self.method }
    pub fn middleware(&self) -> &[BoxedMiddleware] { &self.middleware }
    pub fn handler(&self) -> &BoxedHandler { &self.handler }

    /// Parameter bindings of a typed API function; empty for raw handlers.
    pub fn params(&self) -> &[ParamDescriptor] { &self.params }
}

/// The assembled, duplicate-free route list, in registration order.
#[derive(Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn build(context_path: &str, controllers: &[Controller]) -> Result<Self, StartupError> {
        if !check_path(context_path) {
            return Err(StartupError::InvalidContextPath(context_path.to_owned()));
        }

        let mut entries = Vec::new();
        for controller in controllers {
            entries.extend(build_controller(context_path, controller)?);
        }

        let mut seen = HashSet::new();
        if let Some(dup) = entries.iter().find(|e| !seen.insert(e.path.as_str())) {
            return Err(StartupError::DuplicatePath(dup.path.clone()));
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<RouteEntry> {
        self.entries
    }
}

fn build_controller(context_path: &str, controller: &Controller) -> Result<Vec<RouteEntry>, StartupError> {
    let controller_path = controller.path();
    info!(path = controller_path, "registering controller");
    if !check_path(controller_path) {
        return Err(StartupError::InvalidControllerPath(controller_path.to_owned()));
    }

    let mut apis = Vec::new();
    let mut middlewares = Vec::new();
    for field in controller.fields() {
        let tags = field.tags()?;
        match tags.get("kind").map(str::to_ascii_lowercase).as_deref() {
            Some(API) => apis.push((field, tags)),
            Some(MIDDLEWARE) => middlewares.push((field, tags)),
            _ => {}
        }
    }

    let mut entries = Vec::new();
    for (field, tags) in &apis {
        if let Some(entry) = setup_api(field, tags)? {
            entries.push(entry);
        }
    }
    for (field, tags) in &middlewares {
        setup_middleware(&mut entries, field, tags)?;
    }

    let root = root_path(context_path, controller_path);
    for entry in &mut entries {
        entry.path.insert_str(0, &root);
        debug!(method = %entry.method, path = %entry.path, field = %entry.name, "mapped route");
    }
    Ok(entries)
}

fn setup_api(field: &Field, tags: &Tags) -> Result<Option<RouteEntry>, StartupError> {
    let (Some(path), Some(method)) = (tags.get("path"), tags.get("method")) else {
        debug!(field = field.name(), "api field without path or method, skipped");
        return Ok(None);
    };
    let method = Method::from_tag(method).ok_or_else(|| StartupError::UnknownMethod {
        field: field.name().to_owned(),
        method: method.to_owned(),
    })?;

    let (handler, params) = match field.field_value() {
        FieldValue::Handler(Some(handler)) => (Arc::clone(handler), Vec::new()),
        FieldValue::Handler(None) => {
            return Err(StartupError::NilHandler { field: field.name().to_owned() });
        }
        FieldValue::Function(Some(function)) => {
            (Arc::clone(&function.endpoint), function.params.clone())
        }
        FieldValue::Function(None) => {
            return Err(StartupError::NilFunction { field: field.name().to_owned() });
        }
        other => {
            return Err(StartupError::UnknownHandlerType {
                field: field.name().to_owned(),
                found: other.type_name(),
            });
        }
    };

    Ok(Some(RouteEntry {
        name: field.name().to_owned(),
        path: path.to_owned(),
        method,
        middleware: Vec::new(),
        handler,
        params,
    }))
}

/// Which routes a middleware field applies to.
enum Selector {
    Exact(String),
    Pattern(Regex),
}

impl Selector {
    /// `path` beats `prefix`, which beats `regex`.
    fn from_tags(field: &Field, tags: &Tags) -> Result<Self, StartupError> {
        if let Some(path) = tags.get("path") {
            return Ok(Self::Exact(path.to_owned()));
        }
        let pattern = match (tags.get("prefix"), tags.get("regex")) {
            (Some(prefix), _) => format!("^{prefix}"),
            (None, Some(regex)) => regex.to_owned(),
            (None, None) => {
                return Err(StartupError::MissingSelector { field: field.name().to_owned() });
            }
        };
        Regex::new(&pattern)
            .map(Self::Pattern)
            .map_err(|source| StartupError::InvalidSelector {
                field: field.name().to_owned(),
                pattern,
                source,
            })
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == path,
            Self::Pattern(re) => re.is_match(path),
        }
    }
}

fn setup_middleware(entries: &mut [RouteEntry], field: &Field, tags: &Tags) -> Result<(), StartupError> {
    let middleware = match field.field_value() {
        FieldValue::Middleware(Some(m)) => m,
        FieldValue::Middleware(None) => {
            debug!(field = field.name(), "nil middleware field, skipped");
            return Ok(());
        }
        other => {
            return Err(StartupError::MiddlewareType {
                field: field.name().to_owned(),
                found: other.type_name(),
            });
        }
    };

    let selector = Selector::from_tags(field, tags)?;
    for entry in entries.iter_mut().filter(|e| selector.matches(&e.path)) {
        debug!(middleware = field.name(), route = %entry.path, "attaching middleware");
        entry.middleware.push(Arc::clone(middleware));
    }
    Ok(())
}

/// Empty and `/` are the root; anything else must start with `/`, have at
/// least one more character and not end with `/`.
pub fn check_path(path: &str) -> bool {
    path.is_empty() || path == "/" || PATH_SYNTAX.is_match(path)
}

/// `context + controller`, with root components contributing nothing.
fn root_path(context_path: &str, controller_path: &str) -> String {
    [context_path, controller_path]
        .into_iter()
        .filter(|p| !p.is_empty() && *p != "/")
        .collect()
}
