//! Unwrap-then-normalize entry points.
//!
//! These are the functions the presentation layer calls. None of them
//! perform I/O; fetching lives in [`crate::fetch`].

use serde_json::Value;
use shelter_stats_source_models::{PayloadShape, PipelineOutput};

use crate::SourceError;
use crate::normalize::{NormalizeConfig, Normalized, normalize_records};
use crate::unwrap::unwrap_payload;

/// Unwraps and normalizes one decoded payload.
#[must_use]
pub fn process_payload(payload: &Value, config: &NormalizeConfig) -> PipelineOutput {
    let unwrapped = unwrap_payload(payload);
    if unwrapped.shape.is_unrecognized() {
        log::warn!("Payload matched no known response shape; no records extracted");
    } else {
        log::debug!(
            "Payload shape {:?}: {} raw rows",
            unwrapped.shape,
            unwrapped.records.len()
        );
    }

    let normalized = normalize_records(&unwrapped.records, config);
    into_output(unwrapped.shape, normalized)
}

/// Unwraps every page and normalizes the concatenated rows in one pass.
///
/// The reported shape is the first recognized page's. Row indices in the report refer
/// to positions in the concatenated sequence.
#[must_use]
pub fn process_pages(pages: &[Value], config: &NormalizeConfig) -> PipelineOutput {
    let mut shape = None;
    let mut rows = Vec::new();

    for (page_num, page) in pages.iter().enumerate() {
        let unwrapped = unwrap_payload(page);
        if unwrapped.shape.is_unrecognized() {
            log::warn!("Page {}: payload matched no known response shape", page_num + 1);
        } else {
            shape.get_or_insert(unwrapped.shape);
        }
        rows.extend(unwrapped.records);
    }

    let normalized = normalize_records(&rows, config);
    into_output(shape.unwrap_or(PayloadShape::Unrecognized), normalized)
}

/// Decodes raw bytes as a JSON document.
///
/// # Errors
///
/// Returns [`SourceError::Json`] if the bytes are not valid JSON. This is
/// the only hard failure in the pipeline.
pub fn decode_payload(bytes: &[u8]) -> Result<Value, SourceError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decodes raw bytes and runs them through [`process_payload`].
///
/// # Errors
///
/// Returns [`SourceError::Json`] if the bytes are not valid JSON.
pub fn process_bytes(bytes: &[u8], config: &NormalizeConfig) -> Result<PipelineOutput, SourceError> {
    let payload = decode_payload(bytes)?;
    Ok(process_payload(&payload, config))
}

fn into_output(shape: PayloadShape, normalized: Normalized) -> PipelineOutput {
    PipelineOutput {
        shape,
        records: normalized.records,
        summary: normalized.summary,
        report: normalized.report,
    }
}
