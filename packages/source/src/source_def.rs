//! Config-driven shelter statistics source definition.
//!
//! [`SourceDefinition`] captures everything unique about an upstream API in a
//! serializable config struct: where to fetch from, how to page, and which
//! raw keys map onto each canonical [`NumericField`]. Every list in
//! [`FieldMapping`] has a default, so a minimal TOML only needs the
//! endpoint.

use serde::Deserialize;
use shelter_stats_shelter_models::NumericField;
use shelter_stats_source_models::MissingValuePolicy;

use crate::SourceError;
use crate::normalize::NormalizeConfig;

/// Default records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Default cap on pages fetched per run.
pub const DEFAULT_MAX_PAGES: u32 = 20;
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ── Top-level source definition ──────────────────────────────────────────

/// A complete, config-driven shelter statistics source.
///
/// Loaded from TOML files embedded at compile time.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"air_raid_shelter_region"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Endpoint URL. Query parameters are appended per page.
    pub api_url: String,
    /// Environment variable holding the API service key.
    pub service_key_env: String,
    /// Optional URL to the human-readable data portal page.
    #[serde(default)]
    pub portal_url: Option<String>,
    /// Records requested per page (`numOfRows`).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Maximum pages fetched per run.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Raw key names for each canonical field.
    #[serde(default)]
    pub fields: FieldMapping,
    /// Normalization defaults for this source.
    #[serde(default)]
    pub normalize: NormalizeSettings,
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl SourceDefinition {
    /// Builds the normalization config for this source, optionally
    /// overriding its missing-value policy.
    #[must_use]
    pub fn normalize_config(&self, missing_values: Option<MissingValuePolicy>) -> NormalizeConfig {
        NormalizeConfig {
            missing_values: missing_values.unwrap_or(self.normalize.missing_values),
            fields: self.fields.clone(),
        }
    }

    /// Reads the service key from [`Self::service_key_env`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingServiceKey`] if the variable is unset or
    /// blank.
    pub fn service_key(&self) -> Result<String, SourceError> {
        std::env::var(&self.service_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SourceError::MissingServiceKey {
                env_var: self.service_key_env.clone(),
            })
    }
}

/// Per-source normalization defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NormalizeSettings {
    /// What to do with absent or unparseable numbers.
    #[serde(default)]
    pub missing_values: MissingValuePolicy,
}

// ── Field mapping ────────────────────────────────────────────────────────

/// Maps source-specific JSON keys to canonical record fields.
///
/// Each list is tried in order; the first key that is present with a
/// non-empty value decides the field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldMapping {
    /// Fallback keys for the region label, tried after the literal
    /// `region` key.
    #[serde(default = "default_region")]
    pub region: Vec<String>,
    /// Substrings that mark a key as a region label when no fallback key
    /// matched (case-insensitive).
    #[serde(default = "default_region_patterns")]
    pub region_patterns: Vec<String>,
    /// Region labels that identify a nationwide rollup row.
    #[serde(default = "FieldMapping::default_total_labels")]
    pub total_labels: Vec<String>,
    /// Keys for [`NumericField::TargetPopulation`].
    #[serde(default = "default_target_population")]
    pub target_population: Vec<String>,
    /// Keys for [`NumericField::ShelterCapablePopulation`].
    #[serde(default = "default_shelter_capable_population")]
    pub shelter_capable_population: Vec<String>,
    /// Keys for [`NumericField::OccupancyRate`].
    #[serde(default = "default_occupancy_rate")]
    pub occupancy_rate: Vec<String>,
    /// Keys for [`NumericField::GovernmentFacilityCount`].
    #[serde(default = "default_government_facility_count")]
    pub government_facility_count: Vec<String>,
    /// Keys for [`NumericField::GovernmentFacilityArea`].
    #[serde(default = "default_government_facility_area")]
    pub government_facility_area: Vec<String>,
    /// Keys for [`NumericField::PublicFacilityCount`].
    #[serde(default = "default_public_facility_count")]
    pub public_facility_count: Vec<String>,
    /// Keys for [`NumericField::PublicFacilityArea`].
    #[serde(default = "default_public_facility_area")]
    pub public_facility_area: Vec<String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            region: default_region(),
            region_patterns: default_region_patterns(),
            total_labels: Self::default_total_labels(),
            target_population: default_target_population(),
            shelter_capable_population: default_shelter_capable_population(),
            occupancy_rate: default_occupancy_rate(),
            government_facility_count: default_government_facility_count(),
            government_facility_area: default_government_facility_area(),
            public_facility_count: default_public_facility_count(),
            public_facility_area: default_public_facility_area(),
        }
    }
}

impl FieldMapping {
    /// Returns the key aliases for a numeric field.
    #[must_use]
    pub fn aliases(&self, field: NumericField) -> &[String] {
        match field {
            NumericField::TargetPopulation => &self.target_population,
            NumericField::ShelterCapablePopulation => &self.shelter_capable_population,
            NumericField::OccupancyRate => &self.occupancy_rate,
            NumericField::GovernmentFacilityCount => &self.government_facility_count,
            NumericField::GovernmentFacilityArea => &self.government_facility_area,
            NumericField::PublicFacilityCount => &self.public_facility_count,
            NumericField::PublicFacilityArea => &self.public_facility_area,
        }
    }

    /// Default nationwide rollup labels.
    #[must_use]
    pub fn default_total_labels() -> Vec<String> {
        strings(&["합계", "총계", "전국", "total"])
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

fn default_region() -> Vec<String> {
    strings(&["regi"])
}

fn default_region_patterns() -> Vec<String> {
    strings(&["지역", "region"])
}

fn default_target_population() -> Vec<String> {
    strings(&["target_population", "target_popl"])
}

fn default_shelter_capable_population() -> Vec<String> {
    strings(&[
        "shelter_capable_population",
        "shelt_abl_popl_smry",
        "shell_abl_popl_smry",
    ])
}

fn default_occupancy_rate() -> Vec<String> {
    strings(&["occupancy_rate", "accpt_rt"])
}

fn default_government_facility_count() -> Vec<String> {
    strings(&["government_facility_count", "gov_shells_shells"])
}

fn default_government_facility_area() -> Vec<String> {
    strings(&["government_facility_area", "gov_shells_area"])
}

fn default_public_facility_count() -> Vec<String> {
    strings(&["public_facility_count", "pub_shells_shells"])
}

fn default_public_facility_area() -> Vec<String> {
    strings(&["public_facility_area", "pub_shells_area"])
}

/// Parses a TOML string into a [`SourceDefinition`].
///
/// # Errors
///
/// Returns [`SourceError::Config`] if the TOML is invalid or a required
/// key is missing.
pub fn parse_source_toml(name: &str, toml_str: &str) -> Result<SourceDefinition, SourceError> {
    toml::de::from_str(toml_str).map_err(|e| SourceError::Config {
        name: name.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_gets_defaults() {
        let def = parse_source_toml(
            "minimal",
            r#"
id = "minimal"
name = "Minimal"
api_url = "http://example.invalid/stats"
service_key_env = "MINIMAL_KEY"
"#,
        )
        .unwrap();

        assert_eq!(def.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(def.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(def.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(def.normalize.missing_values, MissingValuePolicy::KeepMissing);
        assert_eq!(def.fields.region, vec!["regi".to_string()]);
        assert!(
            def.fields
                .aliases(NumericField::ShelterCapablePopulation)
                .contains(&"shell_abl_popl_smry".to_string())
        );
    }

    #[test]
    fn overrides_field_lists_and_policy() {
        let def = parse_source_toml(
            "custom",
            r#"
id = "custom"
name = "Custom"
api_url = "http://example.invalid/stats"
service_key_env = "CUSTOM_KEY"
page_size = 100

[fields]
target_population = ["pop"]

[normalize]
missing_values = "zero_fill"
"#,
        )
        .unwrap();

        assert_eq!(def.page_size, 100);
        assert_eq!(def.fields.target_population, vec!["pop".to_string()]);
        assert_eq!(def.fields.occupancy_rate, default_occupancy_rate());
        assert_eq!(
            def.normalize_config(None).missing_values,
            MissingValuePolicy::ZeroFill
        );
        assert_eq!(
            def.normalize_config(Some(MissingValuePolicy::KeepMissing))
                .missing_values,
            MissingValuePolicy::KeepMissing
        );
    }

    #[test]
    fn missing_required_key_is_config_error() {
        let err = parse_source_toml("broken", "id = \"broken\"").unwrap_err();
        assert!(matches!(err, SourceError::Config { ref name, .. } if name == "broken"));
    }

    #[test]
    fn every_numeric_field_has_aliases() {
        let mapping = FieldMapping::default();
        for field in NumericField::all() {
            assert!(!mapping.aliases(*field).is_empty(), "{field}");
        }
    }
}
