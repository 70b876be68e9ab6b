//! Built-in sample payload.
//!
//! Used when the upstream API cannot be reached and the caller opted in to
//! a fallback, and for offline demos. The rows use the upstream key names so
//! they exercise the same alias mapping as live data.

use serde_json::{Value, json};

/// Returns a two-region sample payload in the bare-array shape.
#[must_use]
pub fn sample_payload() -> Value {
    json!([
        {
            "regi": "서울특별시 종로구",
            "target_popl": 45000,
            "shell_abl_popl_smry": 52000,
            "accpt_rt": 115.6,
            "gov_shells_shells": 12,
            "gov_shells_area": 8500,
            "pub_shells_shells": 8,
            "pub_shells_area": 5200
        },
        {
            "regi": "부산광역시 중구",
            "target_popl": 31000,
            "shell_abl_popl_smry": 28000,
            "accpt_rt": 90.3,
            "gov_shells_shells": 7,
            "gov_shells_area": 4800,
            "pub_shells_shells": 5,
            "pub_shells_area": 3200
        }
    ])
}

#[cfg(test)]
mod tests {
    use shelter_stats_shelter_models::CapacityLevel;
    use shelter_stats_source_models::PayloadShape;

    use super::*;
    use crate::{NormalizeConfig, process_payload};

    #[test]
    fn sample_normalizes_cleanly() {
        let out = process_payload(&sample_payload(), &NormalizeConfig::default());

        assert_eq!(out.shape, PayloadShape::BareArray);
        assert_eq!(out.records.len(), 2);
        assert!(out.report.dropped.is_empty());
        assert!(out.report.coercion_failures.is_empty());

        let seoul = &out.records[0];
        assert_eq!(seoul.capacity_level, Some(CapacityLevel::Sufficient));
        assert!((seoul.total_facility_count - 20.0).abs() < 1e-9);
        assert!((seoul.total_facility_area - 13_700.0).abs() < 1e-9);
        assert_eq!(out.records[1].capacity_level, Some(CapacityLevel::Good));
    }
}
