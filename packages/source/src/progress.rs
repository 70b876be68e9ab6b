//! Progress reporting for multi-page fetches.
//!
//! [`ProgressCallback`] decouples the page loop from any rendering backend.
//! The CLI provides an `indicatif` implementation; library callers and tests
//! use [`NullProgress`].

use std::sync::Arc;

/// Receives page-level progress from [`crate::fetch::fetch_pages`].
pub trait ProgressCallback: Send + Sync {
    /// Sets the expected number of pages once the upstream reports it.
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` pages.
    fn inc(&self, delta: u64);

    /// Updates the message displayed alongside the indicator.
    fn set_message(&self, msg: String);

    /// Marks progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
