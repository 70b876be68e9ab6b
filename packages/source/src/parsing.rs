//! Shared parsing utilities for raw upstream values.
//!
//! Upstream open-data APIs serialize numbers inconsistently: sometimes as
//! JSON numbers, sometimes as strings with thousands separators, sometimes as
//! empty strings. Everything funnels through [`coerce_number`].

/// Outcome of coercing one raw value to a number.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// A finite number.
    Value(f64),
    /// Absent, `null`, or an empty string.
    Missing,
    /// Present but unparseable. Holds the raw value rendered as JSON text.
    Invalid(String),
}

impl Coerced {
    /// Returns the number, if any.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Missing | Self::Invalid(_) => None,
        }
    }
}

/// Coerces a raw JSON value to a finite `f64`.
///
/// Non-finite results (`"NaN"`, `"inf"`, overflowing literals) count as
/// invalid rather than leaking into sums.
#[must_use]
pub fn coerce_number(value: &serde_json::Value) -> Coerced {
    match value {
        serde_json::Value::Null => Coerced::Missing,
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(v) if v.is_finite() => Coerced::Value(v),
            _ => Coerced::Invalid(value.to_string()),
        },
        serde_json::Value::String(s) => match parse_numeric_str(s) {
            Some(Some(v)) => Coerced::Value(v),
            Some(None) => Coerced::Invalid(value.to_string()),
            None => Coerced::Missing,
        },
        serde_json::Value::Bool(_)
        | serde_json::Value::Array(_)
        | serde_json::Value::Object(_) => Coerced::Invalid(value.to_string()),
    }
}

/// Parses a possibly comma-formatted numeric string.
///
/// Thousands separators, whitespace, and a trailing `%` are stripped.
/// Returns `None` when nothing is left, `Some(None)` when the remainder is
/// not a finite number.
fn parse_numeric_str(s: &str) -> Option<Option<f64>> {
    let cleaned: String = s
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Some(cleaned.parse::<f64>().ok().filter(|v| v.is_finite()))
}

/// Renders a raw value as a label, trimming whitespace.
///
/// Numbers are rendered with their JSON text. Returns `None` for empty
/// strings and non-scalar values.
#[must_use]
pub fn label_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
