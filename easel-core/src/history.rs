//! Bounded undo/redo stacks.
//!
//! Entries are inverse-based wherever the executor can express a command as
//! primitive [`Edit`]s. Snapshot entries are reserved for wholesale document
//! replacement.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::document::{Document, Edit};
use crate::error::ValidationError;

/// Default maximum number of undoable entries.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One undoable step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HistoryEntry {
    /// Forward edits plus their inverses (already in undo order).
    Inverse {
        /// Action name of the command that produced the entry.
        label: String,
        /// Edits that redo the step.
        op: Vec<Edit>,
        /// Edits that undo the step.
        inverse: Vec<Edit>,
    },
    /// Whole-document states before and after a non-invertible step.
    Snapshot {
        /// What produced the entry.
        label: String,
        /// State before the step.
        before: Box<Document>,
        /// State after the step.
        after: Box<Document>,
    },
}

impl HistoryEntry {
    /// Short description of the step.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Inverse { label, .. } | Self::Snapshot { label, .. } => label,
        }
    }

    /// Whether the entry stores whole-document snapshots.
    #[must_use]
    pub const fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot { .. })
    }

    /// Build the document as it was before this step.
    ///
    /// The returned document keeps `current`'s version; the caller bumps it.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the inverse no longer applies.
    pub fn revert(&self, current: &Document) -> Result<Document, ValidationError> {
        match self {
            Self::Inverse { inverse, .. } => replay(current, inverse),
            Self::Snapshot { before, .. } => Ok(restore(before, current)),
        }
    }

    /// Build the document as it was after this step.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the forward edits no longer apply.
    pub fn reapply(&self, current: &Document) -> Result<Document, ValidationError> {
        match self {
            Self::Inverse { op, .. } => replay(current, op),
            Self::Snapshot { after, .. } => Ok(restore(after, current)),
        }
    }
}

fn replay(current: &Document, edits: &[Edit]) -> Result<Document, ValidationError> {
    let mut working = current.clone();
    for edit in edits {
        working.apply_edit(edit)?;
    }
    Ok(working)
}

fn restore(snapshot: &Document, current: &Document) -> Document {
    let mut doc = snapshot.clone();
    doc.set_version(current.version());
    doc
}

/// Past and future stacks.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<HistoryEntry>,
    future: Vec<HistoryEntry>,
    limit: usize,
}

impl History {
    /// Create an empty history with the default limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create an empty history keeping at most `limit` entries.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record a newly committed step. Any redoable steps are discarded.
    pub fn record(&mut self, entry: HistoryEntry) {
        if !self.future.is_empty() {
            tracing::debug!(discarded = self.future.len(), "Discarding redo stack");
            self.future.clear();
        }
        self.push_past(entry);
    }

    /// Take the most recent step for undoing.
    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.past.pop_back()
    }

    /// Take the most recently undone step for redoing.
    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.future.pop()
    }

    /// Park an undone step on the redo stack.
    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.future.push(entry);
    }

    /// Put a redone step back on the undo stack, keeping the redo stack.
    pub fn push_undo(&mut self, entry: HistoryEntry) {
        self.push_past(entry);
    }

    fn push_past(&mut self, entry: HistoryEntry) {
        // Drop oldest if at capacity
        if self.past.len() >= self.limit {
            self.past.pop_front();
        }
        self.past.push_back(entry);
    }

    /// Whether there is anything to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Whether there is anything to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undoable steps.
    #[must_use]
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Number of redoable steps.
    #[must_use]
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// Maximum number of undoable steps.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Labels of undoable steps, oldest first.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.past.iter().map(HistoryEntry::label).collect()
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    fn entry(label: &str) -> HistoryEntry {
        HistoryEntry::Inverse {
            label: label.to_string(),
            op: Vec::new(),
            inverse: Vec::new(),
        }
    }

    #[test]
    fn test_history_creation() {
        let history = History::new();
        assert_eq!(history.limit(), DEFAULT_HISTORY_LIMIT);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit(3);
        for label in ["a", "b", "c", "d"] {
            history.record(entry(label));
        }
        assert_eq!(history.labels(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_record_clears_future() {
        let mut history = History::new();
        history.record(entry("a"));
        let undone = history.pop_undo().expect("entry");
        history.push_redo(undone);
        assert_eq!(history.future_len(), 1);

        history.record(entry("b"));
        assert_eq!(history.future_len(), 0);
        assert_eq!(history.past_len(), 1);
    }

    #[test]
    fn test_push_undo_keeps_future() {
        let mut history = History::new();
        history.record(entry("a"));
        history.record(entry("b"));
        let b = history.pop_undo().expect("b");
        let a = history.pop_undo().expect("a");
        history.push_redo(b);
        history.push_redo(a);

        let a = history.pop_redo().expect("a");
        history.push_undo(a);
        assert_eq!(history.past_len(), 1);
        assert_eq!(history.future_len(), 1);
    }

    #[test]
    fn test_inverse_entry_reverts_and_reapplies() {
        let mut doc = Document::new("History");
        let page = doc.first_page_id().expect("page").clone();
        let before = doc.clone();
        let edit = Edit::Insert {
            page: page.clone(),
            parent: None,
            index: 0,
            object: Object::text("x").with_id("x"),
        };
        let inverse = doc.apply_edit(&edit).expect("insert");
        let step = HistoryEntry::Inverse {
            label: "insert".to_string(),
            op: vec![edit],
            inverse: vec![inverse],
        };

        let reverted = step.revert(&doc).expect("revert");
        assert!(reverted.same_content(&before));
        let redone = step.reapply(&reverted).expect("reapply");
        assert!(redone.find_object(&"x".into()).is_some());
    }

    #[test]
    fn test_snapshot_entry_keeps_current_version() {
        let before = Document::new("Before");
        let mut after = Document::new("After");
        after.set_version(7);
        let step = HistoryEntry::Snapshot {
            label: "replace".to_string(),
            before: Box::new(before.clone()),
            after: Box::new(after.clone()),
        };
        assert!(step.is_snapshot());
        let reverted = step.revert(&after).expect("revert");
        assert_eq!(reverted.version(), 7);
        assert!(reverted.same_content(&before));
    }
}
