#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Payload shape, normalization report, and pipeline output types.
//!
//! Every upstream payload is classified into a [`PayloadShape`] by the
//! unwrapper and every normalization pass produces a [`NormalizationReport`]
//! so that dropped rows and blanked fields are never silently lost.

use serde::{Deserialize, Serialize};
use shelter_stats_shelter_models::{NumericField, ShelterRecord};
use strum_macros::{AsRefStr, Display, EnumString};

/// Where an `items` container was found in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemsPath {
    /// `response.body.items`
    ResponseBody,
    /// Top-level `items`
    TopLevel,
}

/// The upstream payload shape that records were extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadShape {
    /// `items` holds an array of records.
    ArrayItems {
        /// Where the `items` container sits.
        path: ItemsPath,
    },
    /// `items` is an object whose `item` key holds the records (a single
    /// object or an array).
    SingletonWrappedItems {
        /// Where the `items` container sits.
        path: ItemsPath,
    },
    /// `items` is present but holds no records (empty string, `null`, a
    /// scalar, or an object without `item`).
    EmptyItems {
        /// Where the `items` container sits.
        path: ItemsPath,
    },
    /// The payload itself is an array of records.
    BareArray,
    /// A top-level key holds an array of blocks, one of which carries a
    /// `row` array.
    BlockRowArray {
        /// The top-level key holding the blocks.
        key: String,
    },
    /// No extraction strategy matched.
    Unrecognized,
}

impl PayloadShape {
    /// Returns `true` when no extraction strategy matched the payload.
    #[must_use]
    pub const fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized)
    }
}

/// Whether unparseable or absent numeric values are zero-filled after
/// coercion.
///
/// [`MissingValuePolicy::KeepMissing`] leaves them as `None`, so means and
/// sums downstream only see values the upstream actually reported.
/// [`MissingValuePolicy::ZeroFill`] turns them into `0.0`, which pulls means
/// toward zero and lets the occupancy fallback treat an absent target
/// population as `0`.
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
pub enum MissingValuePolicy {
    /// Keep missing values as `None`.
    #[default]
    #[strum(to_string = "keep_missing", serialize = "keep-missing")]
    KeepMissing,
    /// Replace missing values with `0.0`.
    #[strum(to_string = "zero_fill", serialize = "zero-fill")]
    ZeroFill,
}

/// Why a raw row was excluded from the record set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// No field resolved to a non-empty region label.
    MissingRegion,
    /// The row was not a JSON object.
    NotAnObject,
    /// A second nationwide total row appeared after the first one.
    DuplicateSummary,
}

/// A raw row that did not make it into the record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRow {
    /// Zero-based position of the row in the raw record sequence.
    pub index: usize,
    /// Why it was dropped.
    pub reason: DropReason,
}

/// A numeric field whose raw value was present but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCoercionFailure {
    /// Zero-based position of the row in the raw record sequence.
    pub index: usize,
    /// The field that failed.
    pub field: NumericField,
    /// The raw value, rendered as JSON text.
    pub raw_value: String,
}

/// Diagnostics collected while normalizing one raw record sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Number of raw rows inspected.
    pub rows_seen: usize,
    /// Rows excluded from the output.
    pub dropped: Vec<DroppedRow>,
    /// Fields blanked because their raw value could not be parsed.
    pub coercion_failures: Vec<FieldCoercionFailure>,
    /// Rows whose occupancy rate was forced to 0 because the target
    /// population was not positive.
    pub division_guards: usize,
}

impl NormalizationReport {
    /// Total number of dropped rows.
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Number of dropped rows with the given reason.
    #[must_use]
    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.iter().filter(|d| d.reason == reason).count()
    }
}

/// Everything the pipeline hands to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// The shape the records were extracted from. For multi-page fetches
    /// this is the shape of the first page.
    pub shape: PayloadShape,
    /// Regional records in input order.
    pub records: Vec<ShelterRecord>,
    /// The nationwide total row, when the upstream emitted one.
    pub summary: Option<ShelterRecord>,
    /// Dropped rows and field-level problems.
    pub report: NormalizationReport,
}

impl PipelineOutput {
    /// Returns `true` when neither regional records nor a summary survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.summary.is_none()
    }
}
