//! Two-stage parameter validation.
//!
//! Runs only for parameters wrapped in [`Valid`](crate::Valid):
//!
//! 1. the `validator` field rules derived on the type; every failing rule
//!    of the value is reported in one message;
//! 2. if those pass, [`Bind::self_validate`].
//!
//! A handler's parameters are checked in declaration order and the first
//! invalid one wins: parameters after it are never checked.

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::bind::Bind;
use crate::error::ValidationError;

/// Validates one value: field rules, then the self-check.
pub fn check<T: Validate + Bind>(value: &T) -> Result<(), ValidationError> {
    if let Err(errors) = value.validate() {
        return Err(ValidationError::new(describe(&errors)));
    }
    value.self_validate().map_err(|e| ValidationError::new(e.to_string()))
}

/// Formats `errors` as `[Field]: 'value' | Needs to implement 'rule'`,
/// comma-joined, fields in name order.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut items = Vec::new();
    collect(errors, "", &mut items);
    items.join(", ")
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (field, kind) in fields {
        let name = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(rules) => {
                out.extend(rules.iter().map(|rule| item(&name, rule)));
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &name, out),
            ValidationErrorsKind::List(entries) => {
                for (index, inner) in entries {
                    collect(inner, &format!("{name}[{index}]"), out);
                }
            }
        }
    }
}

fn item(field: &str, rule: &validator::ValidationError) -> String {
    let actual = rule.params.get("value").map(plain).unwrap_or_default();

    let mut params: Vec<String> = rule.params.iter()
        .filter(|(k, _)| &***k != "value")
        .map(|(k, v)| format!("{k}:{}", plain(v)))
        .collect();
    params.sort();

    let requirement = if params.is_empty() {
        rule.code.to_string()
    } else {
        format!("{}={}", rule.code, params.join(","))
    };
    format!("[{field}]: '{actual}' | Needs to implement '{requirement}'")
}

// Strings unquoted, null as empty.
fn plain(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
