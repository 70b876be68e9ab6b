#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shelter statistics record types and capacity level definitions.
//!
//! This crate defines the canonical [`ShelterRecord`] produced by the
//! normalization pipeline, the [`NumericField`] set every upstream record is
//! coerced through, and the ordinal [`CapacityLevel`] buckets used to
//! classify occupancy rates.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Ordinal bucket classifying a region's occupancy rate.
///
/// Intervals are right-open: a rate sitting exactly on a boundary belongs to
/// the higher bucket (50.0 is [`CapacityLevel::Moderate`]).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CapacityLevel {
    /// `[0, 50)` percent
    Insufficient,
    /// `[50, 80)` percent
    Moderate,
    /// `[80, 100)` percent
    Good,
    /// `[100, ∞)` percent
    Sufficient,
}

impl CapacityLevel {
    /// Lower bound (inclusive) of [`CapacityLevel::Moderate`].
    pub const MODERATE_FROM: f64 = 50.0;
    /// Lower bound (inclusive) of [`CapacityLevel::Good`].
    pub const GOOD_FROM: f64 = 80.0;
    /// Lower bound (inclusive) of [`CapacityLevel::Sufficient`].
    pub const SUFFICIENT_FROM: f64 = 100.0;

    /// Classifies an occupancy rate (percent).
    ///
    /// Returns `None` for `NaN` and negative rates, which fall outside every
    /// bucket.
    #[must_use]
    pub fn from_rate(rate: f64) -> Option<Self> {
        if rate.is_nan() || rate < 0.0 {
            return None;
        }
        Some(if rate < Self::MODERATE_FROM {
            Self::Insufficient
        } else if rate < Self::GOOD_FROM {
            Self::Moderate
        } else if rate < Self::SUFFICIENT_FROM {
            Self::Good
        } else {
            Self::Sufficient
        })
    }

    /// Returns the label used by the upstream dashboard locale.
    #[must_use]
    pub const fn local_label(self) -> &'static str {
        match self {
            Self::Insufficient => "부족",
            Self::Moderate => "보통",
            Self::Good => "양호",
            Self::Sufficient => "충분",
        }
    }

    /// Returns all variants in ordinal order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Insufficient,
            Self::Moderate,
            Self::Good,
            Self::Sufficient,
        ]
    }
}

/// The numeric columns every upstream record is coerced through.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NumericField {
    /// Population the shelter capacity is meant to serve
    TargetPopulation,
    /// Population that can be accommodated
    ShelterCapablePopulation,
    /// Shelter-capable population as a percent of target population
    OccupancyRate,
    /// Number of government-provided facilities
    GovernmentFacilityCount,
    /// Floor area of government-provided facilities
    GovernmentFacilityArea,
    /// Number of public-use facilities
    PublicFacilityCount,
    /// Floor area of public-use facilities
    PublicFacilityArea,
}

impl NumericField {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::TargetPopulation,
            Self::ShelterCapablePopulation,
            Self::OccupancyRate,
            Self::GovernmentFacilityCount,
            Self::GovernmentFacilityArea,
            Self::PublicFacilityCount,
            Self::PublicFacilityArea,
        ]
    }
}

/// A regional shelter statistics row after normalization.
///
/// Numeric inputs stay `None` when the upstream value was absent or could
/// not be parsed (unless the caller chose to zero-fill). The facility totals
/// are always present because missing parts count as zero for the sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelterRecord {
    /// Administrative region label. Not unique across a dataset.
    pub region: String,
    /// Population the shelter capacity is meant to serve.
    pub target_population: Option<f64>,
    /// Population that can be accommodated.
    pub shelter_capable_population: Option<f64>,
    /// Occupancy rate in percent, supplied upstream or computed.
    pub occupancy_rate: Option<f64>,
    /// Number of government-provided facilities.
    pub government_facility_count: Option<f64>,
    /// Floor area of government-provided facilities.
    pub government_facility_area: Option<f64>,
    /// Number of public-use facilities.
    pub public_facility_count: Option<f64>,
    /// Floor area of public-use facilities.
    pub public_facility_area: Option<f64>,
    /// Government plus public facility count.
    pub total_facility_count: f64,
    /// Government plus public facility area.
    pub total_facility_area: f64,
    /// Bucket of [`Self::occupancy_rate`]; `None` when the rate is unknown.
    pub capacity_level: Option<CapacityLevel>,
}

impl ShelterRecord {
    /// Creates a record for `region` with every metric unset.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            target_population: None,
            shelter_capable_population: None,
            occupancy_rate: None,
            government_facility_count: None,
            government_facility_area: None,
            public_facility_count: None,
            public_facility_area: None,
            total_facility_count: 0.0,
            total_facility_area: 0.0,
            capacity_level: None,
        }
    }

    /// Returns the value of a numeric input field.
    #[must_use]
    pub const fn value(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::TargetPopulation => self.target_population,
            NumericField::ShelterCapablePopulation => self.shelter_capable_population,
            NumericField::OccupancyRate => self.occupancy_rate,
            NumericField::GovernmentFacilityCount => self.government_facility_count,
            NumericField::GovernmentFacilityArea => self.government_facility_area,
            NumericField::PublicFacilityCount => self.public_facility_count,
            NumericField::PublicFacilityArea => self.public_facility_area,
        }
    }

    /// Sets the value of a numeric input field.
    pub const fn set_value(&mut self, field: NumericField, value: Option<f64>) {
        let slot = match field {
            NumericField::TargetPopulation => &mut self.target_population,
            NumericField::ShelterCapablePopulation => &mut self.shelter_capable_population,
            NumericField::OccupancyRate => &mut self.occupancy_rate,
            NumericField::GovernmentFacilityCount => &mut self.government_facility_count,
            NumericField::GovernmentFacilityArea => &mut self.government_facility_area,
            NumericField::PublicFacilityCount => &mut self.public_facility_count,
            NumericField::PublicFacilityArea => &mut self.public_facility_area,
        };
        *slot = value;
    }
}
