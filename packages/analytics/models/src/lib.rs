#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard aggregate, ranking, and filter types.
//!
//! These are the shapes the presentation layer renders: the headline
//! [`DashboardSummary`], ranked [`RegionRank`] rows, and the
//! [`RecordFilter`] a user narrows the record set with.

use serde::{Deserialize, Serialize};
use shelter_stats_shelter_models::{CapacityLevel, ShelterRecord};
use strum_macros::{AsRefStr, Display, EnumString};

/// A per-record metric that regions can be ranked by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RankMetric {
    /// Occupancy rate in percent.
    OccupancyRate,
    /// Target population.
    TargetPopulation,
    /// Shelter-capable population.
    ShelterCapablePopulation,
    /// Government plus public facility count.
    TotalFacilityCount,
    /// Government plus public facility area.
    TotalFacilityArea,
}

impl RankMetric {
    /// Reads this metric from a record.
    #[must_use]
    pub const fn value(self, record: &ShelterRecord) -> Option<f64> {
        match self {
            Self::OccupancyRate => record.occupancy_rate,
            Self::TargetPopulation => record.target_population,
            Self::ShelterCapablePopulation => record.shelter_capable_population,
            Self::TotalFacilityCount => Some(record.total_facility_count),
            Self::TotalFacilityArea => Some(record.total_facility_area),
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::OccupancyRate,
            Self::TargetPopulation,
            Self::ShelterCapablePopulation,
            Self::TotalFacilityCount,
            Self::TotalFacilityArea,
        ]
    }
}

/// Ranking direction.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SortOrder {
    /// Highest value first.
    #[default]
    Descending,
    /// Lowest value first.
    Ascending,
}

/// Number of records in one capacity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCount {
    /// The capacity level.
    pub level: CapacityLevel,
    /// Records classified into it.
    pub count: usize,
}

/// Headline aggregates over a record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Number of records.
    pub record_count: usize,
    /// Number of distinct region labels.
    pub region_count: usize,
    /// Sum of reported target populations.
    pub total_target_population: f64,
    /// Sum of reported shelter-capable populations.
    pub total_shelter_capable_population: f64,
    /// Sum of facility counts.
    pub total_facility_count: f64,
    /// Sum of facility areas.
    pub total_facility_area: f64,
    /// Capable population as a percent of target population across all
    /// records. 0 when the target sum is not positive.
    pub overall_occupancy_rate: f64,
    /// Mean occupancy rate over records that have one.
    pub mean_occupancy_rate: Option<f64>,
    /// Median occupancy rate.
    pub median_occupancy_rate: Option<f64>,
    /// 25th percentile occupancy rate.
    pub p25_occupancy_rate: Option<f64>,
    /// 75th percentile occupancy rate.
    pub p75_occupancy_rate: Option<f64>,
    /// Record counts per capacity level, in ordinal order.
    pub level_distribution: Vec<LevelCount>,
    /// Records whose capacity level is undefined.
    pub undefined_level_count: usize,
}

/// One row of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRank {
    /// 1-based position.
    pub rank: usize,
    /// Region label.
    pub region: String,
    /// Value of the ranked metric.
    pub value: f64,
    /// Occupancy rate, for context.
    pub occupancy_rate: Option<f64>,
    /// Capacity level, for context.
    pub capacity_level: Option<CapacityLevel>,
}

/// Narrows a record set. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    /// Case-insensitive substring of the region label.
    pub region_contains: Option<String>,
    /// Allowed capacity levels. Empty allows all, including undefined.
    #[serde(default)]
    pub levels: Vec<CapacityLevel>,
    /// Inclusive lower bound on the occupancy rate.
    pub min_rate: Option<f64>,
    /// Inclusive upper bound on the occupancy rate.
    pub max_rate: Option<f64>,
}

impl RecordFilter {
    /// Returns `true` when no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.region_contains.is_none()
            && self.levels.is_empty()
            && self.min_rate.is_none()
            && self.max_rate.is_none()
    }
}
