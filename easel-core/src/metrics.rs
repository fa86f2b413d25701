//! Metrics for the editing pipeline.
//!
//! Only the `metrics` facade is used here; the host installs a recorder.

use metrics::{counter, gauge};

// Metric names as constants for consistency
const COMMANDS_TOTAL: &str = "easel_commands_total";
const HISTORY_STEPS_TOTAL: &str = "easel_history_steps_total";
const SCENE_RELOADS_TOTAL: &str = "easel_scene_reloads_total";
const SCENE_PATCH_OPS_TOTAL: &str = "easel_scene_patch_ops_total";
const INVARIANT_REPAIRS_TOTAL: &str = "easel_invariant_repairs_total";
const DOCUMENT_VERSION: &str = "easel_document_version";

/// Record a command outcome.
///
/// # Arguments
///
/// * `kind` - Action name (e.g. "setFill")
/// * `outcome` - "applied" or "rejected"
pub fn record_command(kind: &'static str, outcome: &'static str) {
    counter!(COMMANDS_TOTAL, "kind" => kind, "outcome" => outcome).increment(1);
}

/// Record an undo or redo step.
pub fn record_history_step(direction: &'static str) {
    counter!(HISTORY_STEPS_TOTAL, "direction" => direction).increment(1);
}

/// Record a full scene render triggered by reconciliation.
pub fn record_scene_reload(engine: &'static str) {
    counter!(SCENE_RELOADS_TOTAL, "engine" => engine).increment(1);
}

/// Record targeted patch operations sent to an adapter.
pub fn record_patch_ops(engine: &'static str, ops: usize) {
    counter!(SCENE_PATCH_OPS_TOTAL, "engine" => engine).increment(ops as u64);
}

/// Record ids regenerated by the release-mode invariant repair.
pub fn record_invariant_repairs(count: usize) {
    counter!(INVARIANT_REPAIRS_TOTAL).increment(count as u64);
}

/// Publish the current document version.
#[allow(clippy::cast_precision_loss)] // Versions stay far below 2^52
pub fn set_document_version(version: u64) {
    gauge!(DOCUMENT_VERSION).set(version as f64);
}
