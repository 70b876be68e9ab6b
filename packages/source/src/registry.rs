//! Source registry. Loads all source definitions from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a new upstream API is a
//! matter of creating a new TOML file and adding it to the list below.

use crate::source_def::{SourceDefinition, parse_source_toml};

/// Environment variable holding a comma-separated list of enabled source
/// IDs.
pub const SOURCES_ENV_VAR: &str = "SHELTER_STATS_SOURCES";

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[(
    "air_raid_shelter_region",
    include_str!("../sources/air_raid_shelter_region.toml"),
)];

/// Returns all configured source definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded and covered by tests).
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(name, toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a source definition by ID.
#[must_use]
pub fn find_source(id: &str) -> Option<SourceDefinition> {
    all_sources().into_iter().find(|s| s.id == id)
}

/// Returns the sources selected by `cli_filter`, falling back to the
/// [`SOURCES_ENV_VAR`] environment variable. If neither is set, all sources
/// are returned.
#[must_use]
pub fn enabled_sources(cli_filter: Option<String>) -> Vec<SourceDefinition> {
    let filter = cli_filter.or_else(|| std::env::var(SOURCES_ENV_VAR).ok());
    let all = all_sources();

    let Some(filter_str) = filter else {
        return all;
    };

    let filtered = filter_by_ids(all, &filter_str);
    if filtered.is_empty() {
        log::warn!(
            "No matching sources found for filter {filter_str:?}. Available: {}",
            all_sources()
                .iter()
                .map(|s| s.id.clone())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    filtered
}

/// Keeps the sources whose ID appears in a comma-separated list.
fn filter_by_ids(sources: Vec<SourceDefinition>, filter: &str) -> Vec<SourceDefinition> {
    let ids: Vec<&str> = filter
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    sources
        .into_iter()
        .filter(|s| ids.contains(&s.id.as_str()))
        .collect()
}
