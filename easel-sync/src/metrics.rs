//! Metrics for auto-save.

use metrics::counter;

const SAVES_TOTAL: &str = "easel_autosave_saves_total";
const SAVE_RETRIES_TOTAL: &str = "easel_autosave_retries_total";
const ASSET_RESOLUTIONS_TOTAL: &str = "easel_asset_resolutions_total";

/// Record a save outcome ("saved", "conflict", "failed" or "stale").
pub fn record_save(outcome: &'static str) {
    counter!(SAVES_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a retried save attempt.
pub fn record_retry() {
    counter!(SAVE_RETRIES_TOTAL).increment(1);
}

/// Record an asset resolution outcome ("resolved" or "failed").
pub fn record_asset_resolution(outcome: &'static str) {
    counter!(ASSET_RESOLUTIONS_TOTAL, "outcome" => outcome).increment(1);
}
