//! HTTP retry helpers for transient errors.
//!
//! Fetchers call [`send_json`] instead of `reqwest::RequestBuilder::send()`
//! so that every request gets bounded retry with exponential backoff on
//! timeouts, connection resets, HTTP 429, and 5xx responses.
//!
//! ```ignore
//! let body = retry::send_json(&RetryPolicy::default(), || {
//!     client.get(&url).query(&params)
//! })
//! .await?;
//! ```

use std::time::Duration;

use reqwest::StatusCode;

use crate::SourceError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after a transient connection or status failure.
    pub max_retries: u32,
    /// Full re-fetches after a body that could not be decoded as JSON.
    pub max_body_retries: u32,
    /// Delay before the first retry. Doubles on every further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// Three retries at 1s, 2s, 4s; one re-fetch for a garbled body.
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_body_retries: 1,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// `build_request` is called on each attempt because request builders are
/// consumed by `.send()`.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the connection keeps failing,
/// [`SourceError::Upstream`] for a non-retryable or exhausted HTTP status,
/// and [`SourceError::Json`] if the body still cannot be decoded after all
/// body retries.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(policy: &RetryPolicy, build_request: F) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 0;
    loop {
        let response = send_inner(policy, &build_request).await?;
        let url = response.url().to_string();
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let text = response.text().await?;
        match serde_json::from_str(&text) {
            Ok(value) => return Ok(value),
            Err(json_err) if body_attempt < policy.max_body_retries => {
                body_attempt += 1;
                let delay = policy.delay_for(body_attempt);
                log::warn!(
                    "JSON parse failed (body retry {body_attempt}/{}), re-fetching in {delay:?}\n  \
                     url: {url}\n  \
                     status: {status}\n  \
                     content-type: {content_type:?}\n  \
                     parse error: {json_err}\n  \
                     body preview: {}",
                    policy.max_body_retries,
                    preview(&text),
                );
                tokio::time::sleep(delay).await;
            }
            Err(json_err) => {
                log::error!(
                    "JSON parse failed, giving up.\n  \
                     url: {url}\n  \
                     status: {status}\n  \
                     content-type: {content_type:?}\n  \
                     received: {} bytes\n  \
                     body preview: {}",
                    text.len(),
                    preview(&text),
                );
                return Err(SourceError::Json(json_err));
            }
        }
    }
}

/// Retry loop for the connection and status layer.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(policy: &RetryPolicy, build_request: &F) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < policy.max_retries;
        attempt += 1;

        match build_request().send().await {
            Err(e) if can_retry && is_transient(&e) => {
                log::warn!("  transient error: {e}");
            }
            Err(e) => return Err(SourceError::Http(e)),
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    return Ok(response);
                }
                if can_retry && is_retryable_status(status) {
                    log::warn!("  HTTP {status}");
                    continue;
                }
                return Err(SourceError::Upstream {
                    message: format!("HTTP {status} from {}", response.url()),
                });
            }
        }
    }
}

/// HTTP 429 and 5xx are worth retrying; other 4xx are permanent.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn only_rate_limits_and_server_errors_are_retried() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let text = "가".repeat(200);
        let shown = preview(&text);
        assert!(shown.ends_with("..."));
        assert!(shown.len() <= BODY_PREVIEW_LEN + 3);
        assert_eq!(preview("short"), "short");
    }
}
