#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Shelter statistics source definitions, response unwrapping, and
//! normalization.
//!
//! Raw payloads flow one way through the pipeline:
//!
//! ```text
//! fetch ──► unwrap ──► normalize ──► PipelineOutput
//! ```
//!
//! [`unwrap`] and [`normalize`] are pure and never perform I/O. [`fetch`] is
//! the only module that touches the network.

pub mod fetch;
pub mod normalize;
pub mod parsing;
pub mod pipeline;
pub mod progress;
pub mod region;
pub mod registry;
pub mod retry;
pub mod sample;
pub mod source_def;
pub mod unwrap;

pub use normalize::NormalizeConfig;
pub use pipeline::{decode_payload, process_bytes, process_pages, process_payload};

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The payload could not be decoded as JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source definition could not be parsed.
    #[error("Invalid source config {name}: {message}")]
    Config {
        /// Which config failed.
        name: String,
        /// Parser message.
        message: String,
    },

    /// The environment variable holding the API service key is not set.
    #[error("Service key not set: export {env_var}")]
    MissingServiceKey {
        /// Name of the expected environment variable.
        env_var: String,
    },

    /// The upstream API answered with an error envelope or status.
    #[error("Upstream error: {message}")]
    Upstream {
        /// Description of what went wrong.
        message: String,
    },
}

/// Runtime options for fetching data from a source.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// API service key sent as the `serviceKey` query parameter.
    pub service_key: String,
    /// Overrides the source definition's page limit.
    pub max_pages: Option<u32>,
}
