//! Response unwrapping.
//!
//! Locates the record array inside an arbitrarily-shaped upstream payload.
//! Matchers run in a fixed priority order and the first one that recognizes
//! the payload wins; results from different matchers are never merged.

use serde_json::Value;
use shelter_stats_source_models::{ItemsPath, PayloadShape};

/// Records located in a payload, borrowed from it, plus the shape that
/// matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Unwrapped<'a> {
    /// Which extraction strategy matched.
    pub shape: PayloadShape,
    /// Raw records in payload order.
    pub records: Vec<&'a Value>,
}

impl Unwrapped<'_> {
    const fn unrecognized() -> Self {
        Self {
            shape: PayloadShape::Unrecognized,
            records: Vec::new(),
        }
    }
}

type Matcher = for<'a> fn(&'a Value) -> Option<Unwrapped<'a>>;

/// Extraction strategies in priority order.
const MATCHERS: &[Matcher] = &[
    response_body_items,
    top_level_items,
    bare_array,
    block_rows,
];

/// Extracts the raw record sequence from `payload`.
///
/// Never fails: a payload no matcher recognizes (including `null`, scalars,
/// and `{}`) yields [`PayloadShape::Unrecognized`] with no records.
#[must_use]
pub fn unwrap_payload(payload: &Value) -> Unwrapped<'_> {
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(payload))
        .unwrap_or_else(Unwrapped::unrecognized)
}

/// Navigates a dot-separated path into a [`Value`].
pub(crate) fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn response_body_items(payload: &Value) -> Option<Unwrapped<'_>> {
    resolve_path(payload, "response.body.items")
        .map(|items| classify_items(items, ItemsPath::ResponseBody))
}

fn top_level_items(payload: &Value) -> Option<Unwrapped<'_>> {
    payload
        .get("items")
        .map(|items| classify_items(items, ItemsPath::TopLevel))
}

fn bare_array(payload: &Value) -> Option<Unwrapped<'_>> {
    payload.as_array().map(|rows| Unwrapped {
        shape: PayloadShape::BareArray,
        records: rows.iter().collect(),
    })
}

/// Matches `{ "<Key>": [ { "head": [...] }, { "row": [...] } ] }`.
fn block_rows(payload: &Value) -> Option<Unwrapped<'_>> {
    payload.as_object()?.iter().find_map(|(key, value)| {
        let rows = value.as_array()?.iter().find_map(|block| block.get("row"))?;
        Some(Unwrapped {
            shape: PayloadShape::BlockRowArray { key: key.clone() },
            records: record_list(rows),
        })
    })
}

/// Interprets an `items` container.
///
/// XML-to-JSON converted APIs emit `items: { item: {...} }` for a single
/// record and `items: ""` when there are none.
fn classify_items(items: &Value, path: ItemsPath) -> Unwrapped<'_> {
    match items {
        Value::Array(rows) => Unwrapped {
            shape: PayloadShape::ArrayItems { path },
            records: rows.iter().collect(),
        },
        Value::Object(map) => match map.get("item") {
            Some(item @ (Value::Array(_) | Value::Object(_))) => Unwrapped {
                shape: PayloadShape::SingletonWrappedItems { path },
                records: record_list(item),
            },
            _ => empty_items(path),
        },
        _ => empty_items(path),
    }
}

const fn empty_items<'a>(path: ItemsPath) -> Unwrapped<'a> {
    Unwrapped {
        shape: PayloadShape::EmptyItems { path },
        records: Vec::new(),
    }
}

/// An array yields its elements, a lone object yields itself.
fn record_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(rows) => rows.iter().collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}
