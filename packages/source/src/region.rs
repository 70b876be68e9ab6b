//! Region label resolution and nationwide-total detection.

use serde_json::{Map, Value};

use crate::parsing::label_text;
use crate::source_def::FieldMapping;

/// The canonical region key, always consulted first.
pub const REGION_KEY: &str = "region";

/// Resolves the region label of a raw record.
///
/// Lookup order: the literal [`REGION_KEY`], then each configured fallback
/// key, then any key whose name contains one of the configured patterns
/// (case-insensitive, in the record's key order). The first key yielding a
/// non-empty label wins.
#[must_use]
pub fn resolve_region(record: &Map<String, Value>, mapping: &FieldMapping) -> Option<String> {
    std::iter::once(REGION_KEY)
        .chain(mapping.region.iter().map(String::as_str))
        .find_map(|key| record.get(key).and_then(label_text))
        .or_else(|| {
            record
                .iter()
                .filter(|(key, _)| contains_any(&key.to_lowercase(), &mapping.region_patterns))
                .find_map(|(_, value)| label_text(value))
        })
}

/// Returns `true` if `region` is one of the labels upstream datasets use for
/// a precomputed nationwide rollup row.
#[must_use]
pub fn is_total_label(region: &str, total_labels: &[String]) -> bool {
    let region = region.trim();
    total_labels
        .iter()
        .any(|label| label.trim().eq_ignore_ascii_case(region))
}

/// Case-insensitive substring test against a list of patterns.
fn contains_any(haystack: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|p| !p.is_empty() && haystack.contains(&p.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn literal_region_key_wins() {
        let record = object(json!({"region": "Seoul", "regi": "Busan"}));
        assert_eq!(
            resolve_region(&record, &FieldMapping::default()),
            Some("Seoul".to_string())
        );
    }

    #[test]
    fn falls_back_to_configured_key() {
        let record = object(json!({"regi": " 서울특별시 종로구 ", "target_popl": 1}));
        assert_eq!(
            resolve_region(&record, &FieldMapping::default()),
            Some("서울특별시 종로구".to_string())
        );
    }

    #[test]
    fn empty_literal_region_does_not_block_fallback() {
        let record = object(json!({"region": "", "regi": "Daegu"}));
        assert_eq!(
            resolve_region(&record, &FieldMapping::default()),
            Some("Daegu".to_string())
        );
    }

    #[test]
    fn matches_locale_pattern_in_key_name() {
        let record = object(json!({"시도지역명": "경기도", "target_popl": 10}));
        assert_eq!(
            resolve_region(&record, &FieldMapping::default()),
            Some("경기도".to_string())
        );

        let record = object(json!({"RegionName": "Incheon"}));
        assert_eq!(
            resolve_region(&record, &FieldMapping::default()),
            Some("Incheon".to_string())
        );
    }

    #[test]
    fn unresolvable_region_is_none() {
        let record = object(json!({"target_popl": "100", "accpt_rt": "50"}));
        assert_eq!(resolve_region(&record, &FieldMapping::default()), None);
    }

    #[test]
    fn detects_total_labels() {
        let labels = FieldMapping::default_total_labels();
        assert!(is_total_label("합계", &labels));
        assert!(is_total_label(" 전국 ", &labels));
        assert!(is_total_label("TOTAL", &labels));
        assert!(!is_total_label("서울특별시", &labels));
    }
}
