#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard aggregates over normalized shelter records.
//!
//! Everything here is a pure function of a record slice: headline sums and
//! rate statistics, top-N rankings, filters, and per-region grouping.
//! Missing values are skipped, never treated as zero; callers that want
//! zeros choose the zero-fill policy during normalization.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr as _;

use shelter_stats_analytics_models::{
    DashboardSummary, LevelCount, RankMetric, RecordFilter, RegionRank, SortOrder,
};
use shelter_stats_shelter_models::{CapacityLevel, NumericField, ShelterRecord};
use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A percentile outside `[0, 100]` was requested.
    #[error("Percentile must be within 0..=100, got {p}")]
    InvalidPercentile {
        /// The rejected percentile.
        p: f64,
    },

    /// A ranking metric name was not recognized.
    #[error("Unknown metric '{name}'")]
    UnknownMetric {
        /// The rejected name.
        name: String,
    },
}

/// Parses a ranking metric name.
///
/// # Errors
///
/// Returns [`AnalyticsError::UnknownMetric`] if `name` is not a
/// [`RankMetric`].
pub fn parse_metric(name: &str) -> Result<RankMetric, AnalyticsError> {
    RankMetric::from_str(name.trim()).map_err(|_| AnalyticsError::UnknownMetric {
        name: name.to_string(),
    })
}

/// Computes the headline aggregates for a record set.
#[must_use]
pub fn summarize(records: &[ShelterRecord]) -> DashboardSummary {
    let total_target_population: f64 = records.iter().filter_map(|r| r.target_population).sum();
    let total_shelter_capable_population: f64 = records
        .iter()
        .filter_map(|r| r.shelter_capable_population)
        .sum();

    let rates: Vec<f64> = records
        .iter()
        .filter_map(|r| r.occupancy_rate)
        .filter(|v| v.is_finite())
        .collect();

    let level_distribution = CapacityLevel::all()
        .iter()
        .map(|&level| LevelCount {
            level,
            count: records
                .iter()
                .filter(|r| r.capacity_level == Some(level))
                .count(),
        })
        .collect();

    let regions: BTreeSet<&str> = records.iter().map(|r| r.region.as_str()).collect();

    DashboardSummary {
        record_count: records.len(),
        region_count: regions.len(),
        total_target_population,
        total_shelter_capable_population,
        total_facility_count: records.iter().map(|r| r.total_facility_count).sum(),
        total_facility_area: records.iter().map(|r| r.total_facility_area).sum(),
        overall_occupancy_rate: ratio_percent(
            total_shelter_capable_population,
            total_target_population,
        ),
        mean_occupancy_rate: mean(&rates),
        median_occupancy_rate: quantile(&rates, 50.0),
        p25_occupancy_rate: quantile(&rates, 25.0),
        p75_occupancy_rate: quantile(&rates, 75.0),
        level_distribution,
        undefined_level_count: records.iter().filter(|r| r.capacity_level.is_none()).count(),
    }
}

/// Returns the `p`th percentile of `values` using linear interpolation
/// between closest ranks. Non-finite values are ignored.
///
/// Returns `Ok(None)` when there are no finite values.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidPercentile`] if `p` is outside
/// `[0, 100]` or `NaN`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn percentile(values: &[f64], p: f64) -> Result<Option<f64>, AnalyticsError> {
    if !(0.0..=100.0).contains(&p) {
        return Err(AnalyticsError::InvalidPercentile { p });
    }

    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Ok(None);
    }
    sorted.sort_by(f64::total_cmp);

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - rank.floor();

    Ok(Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight))
}

/// Ranks records by `metric`, keeping at most `limit` rows.
///
/// Records without a finite value for the metric are skipped. Ties keep
/// their input order.
#[must_use]
pub fn top_regions(
    records: &[ShelterRecord],
    metric: RankMetric,
    limit: usize,
    order: SortOrder,
) -> Vec<RegionRank> {
    let mut ranked: Vec<(&ShelterRecord, f64)> = records
        .iter()
        .filter_map(|r| metric.value(r).filter(|v| v.is_finite()).map(|v| (r, v)))
        .collect();

    ranked.sort_by(|(_, a), (_, b)| match order {
        SortOrder::Descending => b.total_cmp(a),
        SortOrder::Ascending => a.total_cmp(b),
    });
    ranked.truncate(limit);

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (record, value))| RegionRank {
            rank: i + 1,
            region: record.region.clone(),
            value,
            occupancy_rate: record.occupancy_rate,
            capacity_level: record.capacity_level,
        })
        .collect()
}

/// Returns the records matching every criterion of `filter`.
///
/// A rate bound excludes records without a rate; a non-empty level set
/// excludes records with an undefined level.
#[must_use]
pub fn filter_records(records: &[ShelterRecord], filter: &RecordFilter) -> Vec<ShelterRecord> {
    let needle = filter
        .region_contains
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let kept: Vec<ShelterRecord> = records
        .iter()
        .filter(|r| {
            needle
                .as_deref()
                .is_none_or(|n| r.region.to_lowercase().contains(n))
        })
        .filter(|r| {
            filter.levels.is_empty()
                || r.capacity_level.is_some_and(|l| filter.levels.contains(&l))
        })
        .filter(|r| {
            if filter.min_rate.is_none() && filter.max_rate.is_none() {
                return true;
            }
            r.occupancy_rate.is_some_and(|rate| {
                filter.min_rate.is_none_or(|min| rate >= min)
                    && filter.max_rate.is_none_or(|max| rate <= max)
            })
        })
        .cloned()
        .collect();

    log::debug!("Filter kept {} of {} records", kept.len(), records.len());
    kept
}

/// Sums records that share a region label into one record per region, in
/// first-seen order.
///
/// Input fields are summed over the rows that report them (a field no row
/// reports stays missing). A single-row region keeps its own occupancy
/// rate. A merged region's rate is recomputed from the summed populations,
/// or, when those cannot produce one, is the mean of the rates its rows
/// carry.
#[must_use]
pub fn group_by_region(records: &[ShelterRecord]) -> Vec<ShelterRecord> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(ShelterRecord, usize, Vec<f64>)> = Vec::new();

    for record in records {
        if let Some(&i) = index.get(record.region.as_str()) {
            let (merged, rows, rates) = &mut groups[i];
            merge_into(merged, record);
            *rows += 1;
            rates.extend(record.occupancy_rate);
        } else {
            index.insert(record.region.as_str(), groups.len());
            groups.push((record.clone(), 1, record.occupancy_rate.into_iter().collect()));
        }
    }

    groups
        .into_iter()
        .map(|(mut merged, rows, rates)| {
            if rows > 1 {
                merged.occupancy_rate = match (
                    merged.target_population,
                    merged.shelter_capable_population,
                ) {
                    (Some(target), Some(capable)) => Some(ratio_percent(capable, target)),
                    (Some(target), None) if target <= 0.0 => Some(0.0),
                    _ => mean(&rates),
                };
                merged.capacity_level = merged.occupancy_rate.and_then(CapacityLevel::from_rate);
            }
            merged
        })
        .collect()
}

fn merge_into(merged: &mut ShelterRecord, record: &ShelterRecord) {
    for &field in NumericField::all() {
        if field == NumericField::OccupancyRate {
            continue;
        }
        let sum = match (merged.value(field), record.value(field)) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        merged.set_value(field, sum);
    }
    merged.total_facility_count += record.total_facility_count;
    merged.total_facility_area += record.total_facility_area;
}

/// `part / whole * 100`, or 0 when `whole` is not positive.
fn ratio_percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn quantile(values: &[f64], p: f64) -> Option<f64> {
    percentile(values, p).ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(region: &str, target: Option<f64>, capable: Option<f64>, rate: Option<f64>) -> ShelterRecord {
        let mut r = ShelterRecord::new(region);
        r.target_population = target;
        r.shelter_capable_population = capable;
        r.occupancy_rate = rate;
        r.capacity_level = rate.and_then(CapacityLevel::from_rate);
        r
    }

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|v| (v - expected).abs() < 1e-9)
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values = [40.0, 10.0, 30.0, 20.0];
        assert!(close(percentile(&values, 0.0).unwrap(), 10.0));
        assert!(close(percentile(&values, 50.0).unwrap(), 25.0));
        assert!(close(percentile(&values, 25.0).unwrap(), 17.5));
        assert!(close(percentile(&values, 100.0).unwrap(), 40.0));
        assert_eq!(percentile(&[], 50.0).unwrap(), None);
        assert_eq!(percentile(&[f64::NAN], 50.0).unwrap(), None);
    }

    #[test]
    fn percentile_rejects_out_of_range() {
        assert!(matches!(
            percentile(&[1.0], 101.0),
            Err(AnalyticsError::InvalidPercentile { .. })
        ));
        assert!(percentile(&[1.0], -0.1).is_err());
        assert!(percentile(&[1.0], f64::NAN).is_err());
    }

    #[test]
    fn summary_skips_missing_values() {
        let records = vec![
            record("A", Some(100.0), Some(120.0), Some(120.0)),
            record("B", Some(300.0), Some(60.0), Some(20.0)),
            record("C", None, None, None),
        ];
        let summary = summarize(&records);

        assert_eq!(summary.record_count, 3);
        assert_eq!(summary.region_count, 3);
        assert!((summary.total_target_population - 400.0).abs() < 1e-9);
        assert!((summary.overall_occupancy_rate - 45.0).abs() < 1e-9);
        assert!(close(summary.mean_occupancy_rate, 70.0));
        assert!(close(summary.median_occupancy_rate, 70.0));
        assert_eq!(summary.undefined_level_count, 1);

        let counts: Vec<usize> = summary.level_distribution.iter().map(|l| l.count).collect();
        assert_eq!(counts, vec![1, 0, 0, 1]);
    }

    #[test]
    fn summary_of_empty_set_has_zero_rate() {
        let summary = summarize(&[]);
        assert_eq!(summary.record_count, 0);
        assert!(summary.overall_occupancy_rate.abs() < f64::EPSILON);
        assert_eq!(summary.mean_occupancy_rate, None);
        assert_eq!(summary.level_distribution.len(), 4);
    }

    #[test]
    fn summary_serializes_camel_case() {
        let value = serde_json::to_value(summarize(&[record("A", None, None, Some(50.0))])).unwrap();
        assert_eq!(value["regionCount"], 1);
        assert_eq!(value["levelDistribution"][1]["level"], "moderate");
    }

    #[test]
    fn top_regions_skips_missing_and_keeps_tie_order() {
        let records = vec![
            record("A", None, None, Some(80.0)),
            record("B", None, None, None),
            record("C", None, None, Some(95.0)),
            record("D", None, None, Some(80.0)),
        ];

        let top = top_regions(&records, RankMetric::OccupancyRate, 10, SortOrder::Descending);
        let regions: Vec<&str> = top.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(regions, vec!["C", "A", "D"]);
        assert_eq!(top[0].rank, 1);

        let bottom = top_regions(&records, RankMetric::OccupancyRate, 2, SortOrder::Ascending);
        let regions: Vec<&str> = bottom.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(regions, vec!["A", "D"]);
    }

    #[test]
    fn filters_by_region_level_and_rate() {
        let records = vec![
            record("서울특별시 종로구", None, None, Some(115.6)),
            record("부산광역시 중구", None, None, Some(90.3)),
            record("Seoul Jung-gu", None, None, None),
        ];

        let by_region = filter_records(
            &records,
            &RecordFilter {
                region_contains: Some("seoul".to_string()),
                ..RecordFilter::default()
            },
        );
        assert_eq!(by_region.len(), 1);

        let by_level = filter_records(
            &records,
            &RecordFilter {
                levels: vec![CapacityLevel::Good],
                ..RecordFilter::default()
            },
        );
        assert_eq!(by_level[0].region, "부산광역시 중구");

        let by_rate = filter_records(
            &records,
            &RecordFilter {
                min_rate: Some(100.0),
                ..RecordFilter::default()
            },
        );
        assert_eq!(by_rate.len(), 1);
        assert_eq!(filter_records(&records, &RecordFilter::default()).len(), 3);
    }

    #[test]
    fn groups_repeated_regions() {
        let mut a1 = record("A", Some(100.0), Some(40.0), Some(40.0));
        a1.public_facility_count = Some(2.0);
        a1.total_facility_count = 2.0;
        let b = record("B", Some(10.0), None, Some(150.0));
        let mut a2 = record("A", Some(100.0), Some(160.0), Some(160.0));
        a2.government_facility_count = Some(3.0);
        a2.total_facility_count = 3.0;

        let grouped = group_by_region(&[a1, b, a2]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].region, "A");
        assert!(close(grouped[0].target_population, 200.0));
        assert!(close(grouped[0].occupancy_rate, 100.0));
        assert_eq!(grouped[0].capacity_level, Some(CapacityLevel::Sufficient));
        assert!(close(grouped[0].public_facility_count, 2.0));
        assert!(close(grouped[0].government_facility_count, 3.0));
        assert!((grouped[0].total_facility_count - 5.0).abs() < 1e-9);
        assert!(close(grouped[1].occupancy_rate, 150.0));
    }

    #[test]
    fn grouping_keeps_supplied_rates_without_populations() {
        let grouped = group_by_region(&[
            record("A", None, None, Some(80.0)),
            record("A", None, None, Some(120.0)),
            record("A", None, None, None),
        ]);
        assert_eq!(grouped.len(), 1);
        assert!(close(grouped[0].occupancy_rate, 100.0));
        assert_eq!(grouped[0].capacity_level, Some(CapacityLevel::Sufficient));

        let grouped = group_by_region(&[record("B", None, None, None), record("B", None, None, None)]);
        assert_eq!(grouped[0].occupancy_rate, None);
        assert_eq!(grouped[0].capacity_level, None);
    }

    #[test]
    fn parses_metric_or_reports_unknown() {
        assert_eq!(parse_metric(" occupancy_rate ").unwrap(), RankMetric::OccupancyRate);
        assert!(matches!(
            parse_metric("crime_rate"),
            Err(AnalyticsError::UnknownMetric { ref name }) if name == "crime_rate"
        ));
    }
}
