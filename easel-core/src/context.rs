//! The editor as one explicit state value.
//!
//! [`EditorContext`] owns the canonical document, its history, the live
//! adapter and the reconciler. Every mutation follows the same order: the
//! document is replaced by the executor's working copy, the reconciler diffs
//! it, the adapter is patched, listeners are told, and history is recorded.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::adapter::SceneAdapter;
use crate::command::Command;
use crate::document::{Document, Edit, PageId};
use crate::error::{EditorResult, ValidationError};
use crate::event::EngineEvent;
use crate::executor;
use crate::history::{History, HistoryEntry, DEFAULT_HISTORY_LIMIT};
use crate::metrics;
use crate::object::{ImageStatus, Object, ObjectId, ObjectProps};
use crate::parser::{CommandParser, ParseContext};
use crate::reconcile::{Reconciler, Reconciliation};

/// Editor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of undoable steps.
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Why the document changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeCause {
    /// A command was executed.
    Command,
    /// A step was undone.
    Undo,
    /// A step was redone.
    Redo,
    /// A new document was loaded; history was cleared.
    Loaded,
    /// The document was replaced wholesale as an undoable step.
    Replaced,
}

/// An image placeholder waiting for its asset to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAsset {
    /// Placeholder object.
    pub id: ObjectId,
    /// Reference to hand to the asset resolver.
    pub asset_ref: String,
}

/// Result of a committed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReceipt {
    /// Document version after the command.
    pub version: u64,
    /// Objects the command touched.
    pub affected: Vec<ObjectId>,
    /// Action name.
    pub kind: &'static str,
}

type Listener = Box<dyn FnMut(&Document, ChangeCause) + Send>;

/// Document, history, adapter handle, reconciler, selection and active page.
pub struct EditorContext {
    document: Document,
    history: History,
    adapter: Box<dyn SceneAdapter>,
    reconciler: Reconciler,
    parser: CommandParser,
    active_page: PageId,
    listeners: Vec<Listener>,
    pending_assets: Vec<PendingAsset>,
    config: EditorConfig,
}

impl EditorContext {
    /// Create a context and render `document` into `adapter`.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::Validation` if the document is invalid.
    pub fn new(
        document: Document,
        adapter: Box<dyn SceneAdapter>,
        config: EditorConfig,
    ) -> EditorResult<Self> {
        document.validate()?;
        let active_page = document.first_page_id()?.clone();
        let mut context = Self {
            document,
            history: History::with_limit(config.history_limit),
            adapter,
            reconciler: Reconciler::new(),
            parser: CommandParser::new(),
            active_page,
            listeners: Vec::new(),
            pending_assets: Vec::new(),
            config,
        };
        context.render_all();
        context.queue_all_pending();
        tracing::info!(
            document = %context.document.id,
            engine = context.adapter.engine_name(),
            "Editor context created"
        );
        Ok(context)
    }

    /// The canonical document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Current document version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.document.version()
    }

    /// Undo/redo stacks.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The live adapter.
    #[must_use]
    pub fn adapter(&self) -> &dyn SceneAdapter {
        self.adapter.as_ref()
    }

    /// Page that role and type selectors resolve against.
    #[must_use]
    pub fn active_page(&self) -> &PageId {
        &self.active_page
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The instruction parser.
    #[must_use]
    pub const fn parser(&self) -> &CommandParser {
        &self.parser
    }

    /// Parser context for the current document, page and selection.
    #[must_use]
    pub fn parse_context(&self) -> ParseContext {
        ParseContext::from_document(&self.document, &self.active_page, &self.adapter.selection())
    }

    /// Register a change listener.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&Document, ChangeCause) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Execute one command.
    ///
    /// # Errors
    ///
    /// Returns the executor's error; the document, version and history are
    /// left untouched.
    pub fn execute(&mut self, command: Command) -> EditorResult<CommandReceipt> {
        let kind = command.kind();
        let execution = match executor::execute(&self.document, &self.active_page, &command) {
            Ok(execution) => execution,
            Err(e) => {
                metrics::record_command(kind, "rejected");
                tracing::debug!(action = kind, target = %command.target, error = %e, "Command rejected");
                return Err(e);
            }
        };
        self.queue_pending(&execution.op);
        self.commit(execution.document, ChangeCause::Command);
        self.history.record(HistoryEntry::Inverse {
            label: kind.to_string(),
            op: execution.op,
            inverse: execution.inverse,
        });
        metrics::record_command(kind, "applied");
        tracing::debug!(
            action = kind,
            version = self.document.version(),
            affected = execution.affected.len(),
            "Command applied"
        );
        Ok(CommandReceipt {
            version: self.document.version(),
            affected: execution.affected,
            kind,
        })
    }

    /// Execute commands in order, stopping at the first rejection.
    ///
    /// Commands before the rejected one stay committed.
    ///
    /// # Errors
    ///
    /// Returns the first rejection.
    pub fn execute_all(
        &mut self,
        commands: impl IntoIterator<Item = Command>,
    ) -> EditorResult<Vec<CommandReceipt>> {
        commands
            .into_iter()
            .map(|command| self.execute(command))
            .collect()
    }

    /// Parse a free-text instruction and execute the resulting commands.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::UnsupportedCommand` if the instruction does not
    /// parse, or the first command rejection.
    pub fn run_instruction(&mut self, instruction: &str) -> EditorResult<Vec<CommandReceipt>> {
        let commands = self.parser.parse(instruction, &self.parse_context())?;
        self.execute_all(commands)
    }

    /// Undo the most recent step. Returns `false` if there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::Validation` if the stored inverse no longer
    /// applies; the entry stays on the undo stack.
    pub fn undo(&mut self) -> EditorResult<bool> {
        let Some(entry) = self.history.pop_undo() else {
            return Ok(false);
        };
        let reverted = match entry.revert(&self.document) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(step = entry.label(), error = %e, "Undo failed");
                self.history.push_undo(entry);
                return Err(e.into());
            }
        };
        if let HistoryEntry::Inverse { inverse, .. } = &entry {
            self.queue_pending(inverse);
        }
        self.commit(reverted, ChangeCause::Undo);
        tracing::debug!(step = entry.label(), version = self.document.version(), "Undone");
        self.history.push_redo(entry);
        metrics::record_history_step("undo");
        Ok(true)
    }

    /// Redo the most recently undone step. Returns `false` if there is nothing
    /// to redo.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::Validation` if the stored edits no longer
    /// apply; the entry stays on the redo stack.
    pub fn redo(&mut self) -> EditorResult<bool> {
        let Some(entry) = self.history.pop_redo() else {
            return Ok(false);
        };
        let reapplied = match entry.reapply(&self.document) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(step = entry.label(), error = %e, "Redo failed");
                self.history.push_redo(entry);
                return Err(e.into());
            }
        };
        if let HistoryEntry::Inverse { op, .. } = &entry {
            self.queue_pending(op);
        }
        self.commit(reapplied, ChangeCause::Redo);
        tracing::debug!(step = entry.label(), version = self.document.version(), "Redone");
        self.history.push_undo(entry);
        metrics::record_history_step("redo");
        Ok(true)
    }

    /// Replace the document wholesale (e.g. from a generator) and clear
    /// history. The version never goes backwards.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::Validation` if the document is invalid.
    pub fn load_document(&mut self, mut document: Document) -> EditorResult<()> {
        document.validate()?;
        let version = document.version().max(self.document.version() + 1);
        document.set_version(version);
        self.active_page = document.first_page_id()?.clone();
        self.document = document;
        self.history.clear();
        self.render_all();
        self.pending_assets.clear();
        self.queue_all_pending();
        metrics::set_document_version(version);
        tracing::info!(document = %self.document.id, version, "Document loaded");
        self.notify(ChangeCause::Loaded);
        Ok(())
    }

    /// Replace the document as one undoable snapshot step.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::Validation` if the document is invalid.
    pub fn replace_document(&mut self, document: Document, label: &str) -> EditorResult<()> {
        document.validate()?;
        let before = self.document.clone();
        let mut next = document;
        next.set_version(self.document.version());
        self.commit(next, ChangeCause::Replaced);
        self.queue_all_pending();
        self.history.record(HistoryEntry::Snapshot {
            label: label.to_string(),
            before: Box::new(before),
            after: Box::new(self.document.clone()),
        });
        Ok(())
    }

    /// Show another page.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownPage`] if the page does not exist.
    pub fn set_active_page(&mut self, page: &PageId) -> EditorResult<()> {
        if self.document.page(page).is_none() {
            return Err(ValidationError::UnknownPage(page.clone()).into());
        }
        self.active_page = page.clone();
        self.adapter.show_page(&self.document, page);
        self.reconciler.prime(&self.document);
        Ok(())
    }

    /// Current selection.
    #[must_use]
    pub fn selection(&self) -> Vec<ObjectId> {
        self.adapter.selection()
    }

    /// Replace the selection, ignoring unknown ids.
    pub fn set_selection(&mut self, ids: &[ObjectId]) {
        let known: Vec<ObjectId> = ids
            .iter()
            .filter(|id| self.document.find_object(id).is_some())
            .cloned()
            .collect();
        self.adapter.set_selection(&known);
    }

    /// Feed a raw native engine event to the adapter.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::Translation` if the payload is malformed.
    pub fn handle_native_event(&mut self, raw: &serde_json::Value) -> EditorResult<()> {
        self.adapter.handle_native_event(raw)?;
        Ok(())
    }

    /// Re-enter edits captured by the engine as ordinary commands.
    ///
    /// A rejected edit snaps the native node back to its canonical state.
    pub fn sync_engine_events(&mut self) -> Vec<EditorResult<CommandReceipt>> {
        let events = self.adapter.drain_events();
        let mut results = Vec::new();
        for event in events {
            let Some(command) = event.to_command() else {
                continue;
            };
            let result = self.execute(command);
            if result.is_err() {
                self.snap_back(&event);
            }
            results.push(result);
        }
        results
    }

    /// Take the image placeholders that still need resolving.
    pub fn take_pending_assets(&mut self) -> Vec<PendingAsset> {
        std::mem::take(&mut self.pending_assets)
    }

    fn snap_back(&mut self, event: &EngineEvent) {
        let Some(id) = event.object_id() else {
            return;
        };
        let Some(patch) = self.reconciler.resync(&self.document, id) else {
            return;
        };
        tracing::debug!(object = %id, "Reverting rejected engine edit");
        if let Err(e) = self.adapter.apply_patch(&patch) {
            tracing::warn!(error = %e, "Snap-back failed, reloading scene");
            self.render_all();
        }
    }

    /// Swap in `next`, bump the version and bring the scene up to date.
    fn commit(&mut self, mut next: Document, cause: ChangeCause) {
        next.set_version(self.document.version());
        next.bump_version();
        enforce_unique_ids(&mut next);
        self.document = next;
        if self.document.page(&self.active_page).is_none() {
            if let Ok(first) = self.document.first_page_id() {
                self.active_page = first.clone();
            }
        }
        self.sync_scene();
        metrics::set_document_version(self.document.version());
        self.notify(cause);
    }

    fn sync_scene(&mut self) {
        let engine = self.adapter.engine_name();
        match self.reconciler.diff(&self.document) {
            Reconciliation::Patch(patch) if patch.is_empty() => {}
            Reconciliation::Patch(patch) => {
                metrics::record_patch_ops(engine, patch.len());
                if let Err(e) = self.adapter.apply_patch(&patch) {
                    tracing::warn!(engine, error = %e, "Scene patch failed, reloading");
                    self.render_all();
                }
            }
            Reconciliation::Reload => {
                metrics::record_scene_reload(engine);
                self.adapter.load(&self.document, &self.active_page);
            }
        }
    }

    fn render_all(&mut self) {
        self.adapter.load(&self.document, &self.active_page);
        self.reconciler.prime(&self.document);
    }

    fn notify(&mut self, cause: ChangeCause) {
        for listener in &mut self.listeners {
            listener(&self.document, cause);
        }
    }

    fn queue_pending(&mut self, edits: &[Edit]) {
        for edit in edits {
            if let Edit::Insert { object, .. } | Edit::Replace { object, .. } = edit {
                collect_pending(object, &mut self.pending_assets);
            }
        }
    }

    fn queue_all_pending(&mut self) {
        for page in self.document.pages() {
            for object in &page.objects {
                collect_pending(object, &mut self.pending_assets);
            }
        }
    }
}

impl fmt::Debug for EditorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorContext")
            .field("document", &self.document.id)
            .field("version", &self.document.version())
            .field("engine", &self.adapter.engine_name())
            .field("active_page", &self.active_page)
            .field("past", &self.history.past_len())
            .field("future", &self.history.future_len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

fn collect_pending(object: &Object, pending: &mut Vec<PendingAsset>) {
    object.walk(&mut |o| {
        if let ObjectProps::Image(image) = &o.props {
            if image.status == ImageStatus::Pending && !pending.iter().any(|p| p.id == o.id) {
                pending.push(PendingAsset {
                    id: o.id.clone(),
                    asset_ref: image.asset_ref.clone(),
                });
            }
        }
    });
}

/// Regenerate colliding ids. Collisions only arise when the document was
/// mutated around the executor, so debug builds fail loudly.
fn enforce_unique_ids(doc: &mut Document) {
    let repaired = doc.repair_duplicate_ids();
    if repaired.is_empty() {
        return;
    }
    assert!(
        !cfg!(debug_assertions),
        "duplicate object ids after commit: {repaired:?}"
    );
    metrics::record_invariant_repairs(repaired.len());
    for (old, new) in &repaired {
        tracing::error!(%old, %new, "Regenerated colliding object id");
    }
}

impl From<&EditorContext> for ParseContext {
    fn from(context: &EditorContext) -> Self {
        context.parse_context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::EngineAdapter;
    use crate::command::{Action, Selector};
    use crate::error::EditorError;
    use crate::headless::HeadlessEngine;
    use std::sync::{Arc, Mutex};

    fn context() -> EditorContext {
        let mut doc = Document::new("Context");
        let page = doc.first_page_id().expect("page").clone();
        doc.add_object(&page, Object::text("Hello").with_id("t1"))
            .expect("t1");
        EditorContext::new(
            doc,
            Box::new(EngineAdapter::new(HeadlessEngine)),
            EditorConfig::default(),
        )
        .expect("context")
    }

    fn blue() -> Command {
        Command::new(
            Action::SetFill {
                color: "#0000FF".to_string(),
            },
            Selector::Id("t1".into()),
        )
    }

    #[test]
    fn test_execute_bumps_version_and_records() {
        let mut ctx = context();
        let receipt = ctx.execute(blue()).expect("execute");
        assert_eq!(receipt.version, 1);
        assert_eq!(receipt.kind, "setFill");
        assert_eq!(ctx.history().past_len(), 1);
    }

    #[test]
    fn test_listeners_see_each_change() {
        let mut ctx = context();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        ctx.subscribe(move |doc, cause| {
            sink.lock().expect("lock").push((doc.version(), cause));
        });
        ctx.execute(blue()).expect("execute");
        ctx.undo().expect("undo");
        let seen = seen.lock().expect("lock").clone();
        assert_eq!(
            seen,
            vec![(1, ChangeCause::Command), (2, ChangeCause::Undo)]
        );
    }

    #[test]
    fn test_undo_on_empty_history() {
        let mut ctx = context();
        assert!(!ctx.undo().expect("undo"));
        assert!(!ctx.redo().expect("redo"));
        assert_eq!(ctx.version(), 0);
    }

    #[test]
    fn test_load_document_clears_history_and_keeps_version_monotonic() {
        let mut ctx = context();
        ctx.execute(blue()).expect("execute");
        ctx.execute(blue()).expect("execute");
        ctx.load_document(Document::new("Fresh")).expect("load");
        assert_eq!(ctx.version(), 3);
        assert_eq!(ctx.history().past_len(), 0);
    }

    #[test]
    fn test_replace_document_is_undoable_snapshot() {
        let mut ctx = context();
        let original = ctx.document().clone();
        ctx.replace_document(Document::new("Other"), "generate")
            .expect("replace");
        assert_eq!(ctx.history().labels(), vec!["generate"]);
        ctx.undo().expect("undo");
        assert!(ctx.document().same_content(&original));
        assert_eq!(ctx.version(), 2);
    }

    #[test]
    fn test_pending_assets_are_queued_once() {
        let mut ctx = context();
        let insert = Command::page(Action::Insert {
            object: Box::new(Object::image("asset-7").with_id("i1")),
        });
        ctx.execute(insert).expect("insert");
        let pending = ctx.take_pending_assets();
        assert_eq!(
            pending,
            vec![PendingAsset {
                id: "i1".into(),
                asset_ref: "asset-7".to_string()
            }]
        );
        assert!(ctx.take_pending_assets().is_empty());
    }

    #[test]
    fn test_set_selection_filters_unknown_ids() {
        let mut ctx = context();
        ctx.set_selection(&["t1".into(), "ghost".into()]);
        assert_eq!(ctx.selection(), vec![ObjectId::from("t1")]);
    }

    #[test]
    fn test_unknown_page_rejected() {
        let mut ctx = context();
        let result = ctx.set_active_page(&"nope".into());
        assert!(matches!(
            result,
            Err(EditorError::Validation(ValidationError::UnknownPage(_)))
        ));
    }
}
