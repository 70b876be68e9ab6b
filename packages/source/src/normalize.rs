//! Record normalization.
//!
//! Turns raw upstream rows into [`ShelterRecord`]s. Every row is handled
//! independently: region resolution, numeric coercion, the optional
//! zero-fill, the occupancy-rate fallback, capacity bucketing, and facility
//! totals. Rows that cannot be assigned a region are dropped and recorded in
//! the [`NormalizationReport`]; bad numeric values only blank the field they
//! belong to.

use serde_json::{Map, Value};
use shelter_stats_shelter_models::{CapacityLevel, NumericField, ShelterRecord};
use shelter_stats_source_models::{
    DropReason, DroppedRow, FieldCoercionFailure, MissingValuePolicy, NormalizationReport,
};

use crate::parsing::{Coerced, coerce_number};
use crate::region::{is_total_label, resolve_region};
use crate::source_def::FieldMapping;

/// Caller-supplied normalization settings.
#[derive(Debug, Clone, Default)]
pub struct NormalizeConfig {
    /// What to do with absent or unparseable numbers.
    pub missing_values: MissingValuePolicy,
    /// Raw key names for each canonical field.
    pub fields: FieldMapping,
}

impl NormalizeConfig {
    /// Default mapping with the given missing-value policy.
    #[must_use]
    pub fn with_policy(missing_values: MissingValuePolicy) -> Self {
        Self {
            missing_values,
            ..Self::default()
        }
    }
}

/// Result of normalizing one raw record sequence.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Regional records in input order.
    pub records: Vec<ShelterRecord>,
    /// The first nationwide total row, split out of `records`.
    pub summary: Option<ShelterRecord>,
    /// Drops and field-level problems.
    pub report: NormalizationReport,
}

/// Normalizes raw rows into shelter records.
///
/// Pure: the same input always yields the same output, and surviving rows
/// keep their input order.
#[must_use]
pub fn normalize_records(rows: &[&Value], config: &NormalizeConfig) -> Normalized {
    let mut out = Normalized {
        report: NormalizationReport {
            rows_seen: rows.len(),
            ..NormalizationReport::default()
        },
        ..Normalized::default()
    };

    for (index, row) in rows.iter().enumerate() {
        let Some(object) = row.as_object() else {
            log::debug!("Row {index}: not an object, dropped");
            out.report.dropped.push(DroppedRow {
                index,
                reason: DropReason::NotAnObject,
            });
            continue;
        };

        let Some(record) = normalize_row(index, object, config, &mut out.report) else {
            log::debug!("Row {index}: no region label, dropped");
            out.report.dropped.push(DroppedRow {
                index,
                reason: DropReason::MissingRegion,
            });
            continue;
        };

        if is_total_label(&record.region, &config.fields.total_labels) {
            if out.summary.is_none() {
                log::debug!("Row {index}: nationwide total '{}'", record.region);
                out.summary = Some(record);
            } else {
                log::debug!("Row {index}: additional total row '{}', dropped", record.region);
                out.report.dropped.push(DroppedRow {
                    index,
                    reason: DropReason::DuplicateSummary,
                });
            }
            continue;
        }

        out.records.push(record);
    }

    log::info!(
        "Normalized {} rows: {} records, {} dropped, {} blanked fields{}",
        out.report.rows_seen,
        out.records.len(),
        out.report.dropped_count(),
        out.report.coercion_failures.len(),
        if out.summary.is_some() {
            ", total row split out"
        } else {
            ""
        },
    );

    out
}

/// Normalizes a single object row. Returns `None` when no region label
/// resolves.
fn normalize_row(
    index: usize,
    object: &Map<String, Value>,
    config: &NormalizeConfig,
    report: &mut NormalizationReport,
) -> Option<ShelterRecord> {
    let region = resolve_region(object, &config.fields)?;
    let mut record = ShelterRecord::new(region);
    let zero_fill = config.missing_values == MissingValuePolicy::ZeroFill;

    for &field in NumericField::all() {
        let value = match lookup(object, config.fields.aliases(field)) {
            Coerced::Value(v) => Some(v),
            Coerced::Missing => None,
            Coerced::Invalid(raw_value) => {
                log::debug!("Row {index}: {field} has unparseable value {raw_value}");
                report.coercion_failures.push(FieldCoercionFailure {
                    index,
                    field,
                    raw_value,
                });
                None
            }
        };

        // The rate is filled only after the fallback has had a chance.
        let value = if zero_fill && field != NumericField::OccupancyRate {
            value.or(Some(0.0))
        } else {
            value
        };
        record.set_value(field, value);
    }

    if record.occupancy_rate.is_none() {
        record.occupancy_rate = fallback_rate(&record, report);
    }
    if zero_fill && record.occupancy_rate.is_none() {
        record.occupancy_rate = Some(0.0);
    }

    record.capacity_level = record.occupancy_rate.and_then(CapacityLevel::from_rate);
    record.total_facility_count = record.government_facility_count.unwrap_or(0.0)
        + record.public_facility_count.unwrap_or(0.0);
    record.total_facility_area = record.government_facility_area.unwrap_or(0.0)
        + record.public_facility_area.unwrap_or(0.0);

    Some(record)
}

/// Computes the occupancy rate from the population columns.
///
/// Defined as 0 when the target population is not positive.
fn fallback_rate(record: &ShelterRecord, report: &mut NormalizationReport) -> Option<f64> {
    match (record.target_population, record.shelter_capable_population) {
        (Some(target), _) if target <= 0.0 => {
            report.division_guards += 1;
            Some(0.0)
        }
        (Some(target), Some(capable)) => {
            Some(capable / target * 100.0).filter(|rate| rate.is_finite())
        }
        _ => None,
    }
}

/// Coerces the first alias present with a non-empty value.
fn lookup(object: &Map<String, Value>, aliases: &[String]) -> Coerced {
    aliases
        .iter()
        .filter_map(|key| object.get(key))
        .find(|value| !is_blank(value))
        .map_or(Coerced::Missing, coerce_number)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn normalize(rows: &[Value], config: &NormalizeConfig) -> Normalized {
        let refs: Vec<&Value> = rows.iter().collect();
        normalize_records(&refs, config)
    }

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|v| (v - expected).abs() < 1e-9)
    }

    #[test]
    fn coerces_formatted_and_blank_numbers() {
        let out = normalize(
            &[json!({
                "regi": "Seoul",
                "target_popl": "1,234",
                "shelt_abl_popl_smry": "",
                "gov_shells_shells": "abc",
            })],
            &NormalizeConfig::default(),
        );

        let record = &out.records[0];
        assert!(close(record.target_population, 1234.0));
        assert_eq!(record.shelter_capable_population, None);
        assert_eq!(record.government_facility_count, None);
        assert_eq!(out.report.coercion_failures.len(), 1);
        assert_eq!(
            out.report.coercion_failures[0].field,
            NumericField::GovernmentFacilityCount
        );
        assert_eq!(out.report.coercion_failures[0].raw_value, "\"abc\"");
    }

    #[test]
    fn zero_target_population_yields_zero_rate() {
        let out = normalize(
            &[json!({"regi": "A", "target_popl": 0, "shelt_abl_popl_smry": 500})],
            &NormalizeConfig::default(),
        );

        let record = &out.records[0];
        assert!(close(record.occupancy_rate, 0.0));
        assert_eq!(record.capacity_level, Some(CapacityLevel::Insufficient));
        assert_eq!(out.report.division_guards, 1);
    }

    #[test]
    fn computes_rate_when_column_absent() {
        let out = normalize(
            &[json!({"regi": "A", "target_popl": "400", "shelt_abl_popl_smry": "200"})],
            &NormalizeConfig::default(),
        );
        assert!(close(out.records[0].occupancy_rate, 50.0));
        assert_eq!(out.records[0].capacity_level, Some(CapacityLevel::Moderate));
    }

    #[test]
    fn supplied_rate_is_not_recomputed() {
        let out = normalize(
            &[json!({
                "regi": "A",
                "target_popl": 100,
                "shelt_abl_popl_smry": 10,
                "accpt_rt": "115.6",
            })],
            &NormalizeConfig::default(),
        );
        assert!(close(out.records[0].occupancy_rate, 115.6));
        assert_eq!(out.records[0].capacity_level, Some(CapacityLevel::Sufficient));
        assert_eq!(out.report.division_guards, 0);
    }

    #[test]
    fn unknown_rate_has_no_bucket() {
        let out = normalize(
            &[json!({"regi": "A", "target_popl": "100"})],
            &NormalizeConfig::default(),
        );
        assert_eq!(out.records[0].occupancy_rate, None);
        assert_eq!(out.records[0].capacity_level, None);
    }

    #[test]
    fn negative_rate_is_kept_without_bucket() {
        let out = normalize(
            &[json!({"regi": "A", "accpt_rt": -5})],
            &NormalizeConfig::default(),
        );
        assert!(close(out.records[0].occupancy_rate, -5.0));
        assert_eq!(out.records[0].capacity_level, None);
    }

    #[test]
    fn facility_totals_ignore_missing_parts() {
        let out = normalize(
            &[json!({"regi": "A", "pub_shells_shells": 7, "gov_shells_area": "8,500"})],
            &NormalizeConfig::default(),
        );
        let record = &out.records[0];
        assert_eq!(record.government_facility_count, None);
        assert!((record.total_facility_count - 7.0).abs() < 1e-9);
        assert!((record.total_facility_area - 8500.0).abs() < 1e-9);
    }

    #[test]
    fn rows_without_region_are_dropped_and_counted() {
        let out = normalize(
            &[
                json!({"target_popl": "100"}),
                json!({"regi": "Busan", "target_popl": "100"}),
                json!("not a row"),
            ],
            &NormalizeConfig::default(),
        );

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].region, "Busan");
        assert_eq!(out.report.rows_seen, 3);
        assert_eq!(
            out.report.dropped,
            vec![
                DroppedRow {
                    index: 0,
                    reason: DropReason::MissingRegion,
                },
                DroppedRow {
                    index: 2,
                    reason: DropReason::NotAnObject,
                },
            ]
        );
    }

    #[test]
    fn total_row_is_split_out_once() {
        let out = normalize(
            &[
                json!({"regi": "합계", "target_popl": "1000", "shelt_abl_popl_smry": "900"}),
                json!({"regi": "Seoul", "target_popl": "10"}),
                json!({"regi": "합계", "target_popl": "1"}),
            ],
            &NormalizeConfig::default(),
        );

        assert_eq!(out.records.len(), 1);
        let summary = out.summary.unwrap();
        assert_eq!(summary.region, "합계");
        assert!(close(summary.occupancy_rate, 90.0));
        assert_eq!(out.report.dropped_for(DropReason::DuplicateSummary), 1);
    }

    #[test]
    fn zero_fill_applies_before_rate_fallback() {
        let out = normalize(
            &[json!({"regi": "A", "shelt_abl_popl_smry": "abc"})],
            &NormalizeConfig::with_policy(MissingValuePolicy::ZeroFill),
        );

        let record = &out.records[0];
        assert!(close(record.target_population, 0.0));
        assert!(close(record.shelter_capable_population, 0.0));
        assert!(close(record.occupancy_rate, 0.0));
        assert!(close(record.public_facility_area, 0.0));
        assert_eq!(record.capacity_level, Some(CapacityLevel::Insufficient));
        assert_eq!(out.report.coercion_failures.len(), 1);
        assert_eq!(out.report.division_guards, 1);
    }

    #[test]
    fn first_non_empty_alias_wins() {
        let out = normalize(
            &[json!({
                "regi": "A",
                "target_population": "",
                "target_popl": "250",
                "shelter_capable_population": null,
                "shell_abl_popl_smry": "500",
            })],
            &NormalizeConfig::default(),
        );
        assert!(close(out.records[0].target_population, 250.0));
        assert!(close(out.records[0].shelter_capable_population, 500.0));
        assert!(close(out.records[0].occupancy_rate, 200.0));
    }

    #[test]
    fn preserves_input_order() {
        let out = normalize(
            &[
                json!({"regi": "C"}),
                json!({"regi": "A"}),
                json!({"junk": 1}),
                json!({"regi": "B"}),
            ],
            &NormalizeConfig::default(),
        );
        let regions: Vec<&str> = out.records.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(regions, vec!["C", "A", "B"]);
    }
}
