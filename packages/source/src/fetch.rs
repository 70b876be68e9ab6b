//! Paginated fetching from an open-data shelter statistics API.
//!
//! Pages are requested with the portal's standard query parameters
//! (`serviceKey`, `pageNo`, `numOfRows`, `type=json`) until a page comes back
//! empty, the reported `totalCount` has been collected, or the page limit is
//! reached. Each raw page is returned as-is; unwrapping and normalization
//! happen in [`crate::pipeline`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::parsing::label_text;
use crate::progress::ProgressCallback;
use crate::retry::{self, RetryPolicy};
use crate::source_def::SourceDefinition;
use crate::unwrap::{resolve_path, unwrap_payload};
use crate::{FetchOptions, SourceError};

/// Result codes the portal uses for a successful call.
const OK_RESULT_CODES: &[&str] = &["00", "0"];

/// Why the page loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageStop {
    /// The last page held no records.
    EmptyPage,
    /// Every record the upstream reported has been collected.
    TotalReached,
    /// The configured page limit was hit.
    PageLimit,
}

/// Fetches raw pages from `def`.
///
/// The service key is sent verbatim as a query parameter, so it must be the
/// decoded form of the key (reqwest percent-encodes it).
///
/// # Errors
///
/// Returns [`SourceError`] if the client cannot be built, any page request
/// fails after retries, or the upstream answers with an error envelope.
pub async fn fetch_pages(
    def: &SourceDefinition,
    options: &FetchOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<Value>, SourceError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(def.timeout_secs))
        .build()?;
    let policy = RetryPolicy::default();
    let max_pages = options.max_pages.unwrap_or(def.max_pages).max(1);

    log::info!(
        "[{}] Fetching from {} (page size {}, up to {max_pages} pages)",
        def.id,
        def.api_url,
        def.page_size
    );

    let mut pages = Vec::new();
    let mut collected: u64 = 0;

    for page_no in 1..=max_pages {
        progress.set_message(format!("{}: page {page_no}", def.id));

        let params = [
            ("serviceKey", options.service_key.clone()),
            ("pageNo", page_no.to_string()),
            ("numOfRows", def.page_size.to_string()),
            ("type", "json".to_string()),
        ];
        let payload = retry::send_json(&policy, || client.get(&def.api_url).query(&params)).await?;
        check_envelope(&payload)?;

        let count = page_record_count(&payload);
        let total = total_count(&payload);
        if page_no == 1
            && let Some(total) = total
        {
            progress.set_total(pages_needed(total, def.page_size).min(u64::from(max_pages)));
        }

        collected += count;
        pages.push(payload);
        progress.inc(1);

        log::info!(
            "[{}] Page {page_no}: {count} records (total: {collected}{})",
            def.id,
            total.map_or_else(String::new, |t| format!("/{t}"))
        );

        if let Some(stop) = page_stop(count, collected, total, page_no, max_pages) {
            if stop == PageStop::PageLimit {
                log::warn!("[{}] Stopped at page limit {max_pages}", def.id);
            }
            break;
        }
    }

    progress.finish(format!("{}: {collected} records", def.id));
    Ok(pages)
}

/// Records a page yields once unwrapped. Empty `items` count as zero.
fn page_record_count(payload: &Value) -> u64 {
    unwrap_payload(payload).records.len() as u64
}

/// Decides whether the loop stops after `page_no`, which yielded `count`
/// records for `collected` so far.
fn page_stop(
    count: u64,
    collected: u64,
    total: Option<u64>,
    page_no: u32,
    max_pages: u32,
) -> Option<PageStop> {
    if count == 0 {
        Some(PageStop::EmptyPage)
    } else if total.is_some_and(|total| collected >= total) {
        Some(PageStop::TotalReached)
    } else if page_no >= max_pages {
        Some(PageStop::PageLimit)
    } else {
        None
    }
}

/// Rejects upstream error envelopes.
///
/// Two envelope styles are understood: `response.header.resultCode` (where
/// `"00"` means success) and a `head` block carrying
/// `RESULT.resultCode` (where codes starting with `INFO` mean success).
///
/// # Errors
///
/// Returns [`SourceError::Upstream`] with the upstream code and message.
pub fn check_envelope(payload: &Value) -> Result<(), SourceError> {
    if let Some(header) = resolve_path(payload, "response.header")
        && let Some(code) = header.get("resultCode").and_then(label_text)
        && !OK_RESULT_CODES.contains(&code.as_str())
    {
        return Err(upstream_error(&code, header.get("resultMsg")));
    }

    for entry in head_entries(payload) {
        if let Some(result) = entry.get("RESULT")
            && let Some(code) = result
                .get("resultCode")
                .or_else(|| result.get("CODE"))
                .and_then(label_text)
            && !code.starts_with("INFO")
        {
            let message = result.get("resultMsg").or_else(|| result.get("MESSAGE"));
            return Err(upstream_error(&code, message));
        }
    }

    Ok(())
}

/// Reads the total record count the upstream reports, if any.
#[must_use]
pub fn total_count(payload: &Value) -> Option<u64> {
    resolve_path(payload, "response.body.totalCount")
        .into_iter()
        .chain(head_entries(payload).filter_map(|entry| entry.get("totalCount")))
        .find_map(|value| label_text(value)?.parse().ok())
}

/// Pages of `page_size` needed to cover `total` records.
#[must_use]
pub fn pages_needed(total: u64, page_size: u32) -> u64 {
    total.div_ceil(u64::from(page_size.max(1)))
}

/// Entries of every top-level `head` block.
fn head_entries(payload: &Value) -> impl Iterator<Item = &Value> {
    payload
        .as_object()
        .into_iter()
        .flat_map(|map| map.values())
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|block| block.get("head").and_then(Value::as_array))
        .flatten()
}

fn upstream_error(code: &str, message: Option<&Value>) -> SourceError {
    let message = message.and_then(label_text).unwrap_or_default();
    SourceError::Upstream {
        message: format!("result code {code}: {message}"),
    }
}
