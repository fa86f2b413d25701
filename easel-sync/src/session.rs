//! An editor wired to auto-save and asset resolution.
//!
//! Asynchronous work never touches the document directly. Asset resolution
//! runs in spawned tasks whose only effect is a [`Command`] sent back over an
//! mpsc channel; the session drains that channel through the same executor as
//! every other edit.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use easel_core::{
    Action, Command, CommandReceipt, Document, EditorContext, EditorResult, PendingAsset, Selector,
};

use crate::autosave::AutosaveHandle;
use crate::error::AssetError;
use crate::metrics;

/// Turns asset references into URLs.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Resolve `asset_ref`.
    ///
    /// # Errors
    ///
    /// Returns an [`AssetError`] if the asset cannot be found or fetched.
    async fn resolve(&self, asset_ref: &str) -> Result<String, AssetError>;
}

/// Resolves every reference against a base URL.
#[derive(Debug, Clone)]
pub struct UrlPrefixResolver {
    prefix: String,
}

impl UrlPrefixResolver {
    /// Create a resolver producing `{prefix}{asset_ref}`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl AssetResolver for UrlPrefixResolver {
    async fn resolve(&self, asset_ref: &str) -> Result<String, AssetError> {
        if asset_ref.is_empty() {
            return Err(AssetError {
                asset_ref: String::new(),
                reason: "empty reference".to_string(),
            });
        }
        Ok(format!("{}{asset_ref}", self.prefix))
    }
}

/// Editor context plus its asynchronous collaborators.
///
/// Must be used inside a Tokio runtime.
pub struct EditorSession {
    context: EditorContext,
    autosave: Option<AutosaveHandle>,
    resolver: Option<Arc<dyn AssetResolver>>,
    commands_tx: mpsc::UnboundedSender<Command>,
    commands_rx: mpsc::UnboundedReceiver<Command>,
}

impl EditorSession {
    /// Wrap a context.
    #[must_use]
    pub fn new(context: EditorContext) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Self {
            context,
            autosave: None,
            resolver: None,
            commands_tx,
            commands_rx,
        }
    }

    /// Save every committed change through `autosave`.
    #[must_use]
    pub fn with_autosave(mut self, autosave: AutosaveHandle) -> Self {
        self.context.subscribe(autosave.notifier().listener());
        self.autosave = Some(autosave);
        self
    }

    /// Resolve image placeholders through `resolver`.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.resolver = Some(resolver);
        self.resolve_pending();
        self
    }

    /// The wrapped context.
    #[must_use]
    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    /// The auto-save handle, if attached.
    #[must_use]
    pub fn autosave(&self) -> Option<&AutosaveHandle> {
        self.autosave.as_ref()
    }

    /// Sender for commands produced outside the session.
    #[must_use]
    pub fn command_sender(&self) -> mpsc::UnboundedSender<Command> {
        self.commands_tx.clone()
    }

    /// Execute a command.
    ///
    /// # Errors
    ///
    /// Returns the executor's rejection.
    pub fn execute(&mut self, command: Command) -> EditorResult<CommandReceipt> {
        let receipt = self.context.execute(command);
        self.resolve_pending();
        receipt
    }

    /// Parse and execute an instruction.
    ///
    /// # Errors
    ///
    /// Returns a parse failure or the first rejection.
    pub fn run_instruction(&mut self, instruction: &str) -> EditorResult<Vec<CommandReceipt>> {
        let receipts = self.context.run_instruction(instruction);
        self.resolve_pending();
        receipts
    }

    /// Undo one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored inverse no longer applies.
    pub fn undo(&mut self) -> EditorResult<bool> {
        let undone = self.context.undo();
        self.resolve_pending();
        undone
    }

    /// Redo one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored edits no longer apply.
    pub fn redo(&mut self) -> EditorResult<bool> {
        let redone = self.context.redo();
        self.resolve_pending();
        redone
    }

    /// Replace the document and clear history.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid document.
    pub fn load_document(&mut self, document: Document) -> EditorResult<()> {
        self.context.load_document(document)?;
        self.resolve_pending();
        Ok(())
    }

    /// Feed native engine events and re-enter the edits they carry.
    ///
    /// # Errors
    ///
    /// Returns a translation error for a malformed payload.
    pub fn handle_native_event(
        &mut self,
        raw: &serde_json::Value,
    ) -> EditorResult<Vec<EditorResult<CommandReceipt>>> {
        self.context.handle_native_event(raw)?;
        Ok(self.context.sync_engine_events())
    }

    /// Execute every command already queued, without waiting.
    pub fn drain_commands(&mut self) -> Vec<EditorResult<CommandReceipt>> {
        let mut results = Vec::new();
        while let Ok(command) = self.commands_rx.try_recv() {
            results.push(self.execute_queued(command));
        }
        results
    }

    /// Wait for the next queued command and execute it.
    pub async fn next_command(&mut self) -> Option<EditorResult<CommandReceipt>> {
        let command = self.commands_rx.recv().await?;
        Some(self.execute_queued(command))
    }

    /// Flush auto-save and stop it.
    pub async fn shutdown(self) {
        if let Some(autosave) = self.autosave {
            autosave.flush().await;
            autosave.shutdown().await;
        }
    }

    fn execute_queued(&mut self, command: Command) -> EditorResult<CommandReceipt> {
        let kind = command.kind();
        let result = self.execute(command);
        if let Err(e) = &result {
            // A placeholder deleted before its asset arrived lands here.
            tracing::debug!(action = kind, error = %e, "Queued command rejected");
        }
        result
    }

    fn resolve_pending(&mut self) {
        let Some(resolver) = self.resolver.clone() else {
            return;
        };
        for PendingAsset { id, asset_ref } in self.context.take_pending_assets() {
            let resolver = Arc::clone(&resolver);
            let tx = self.commands_tx.clone();
            tokio::spawn(async move {
                let action = match resolver.resolve(&asset_ref).await {
                    Ok(src) => {
                        metrics::record_asset_resolution("resolved");
                        Action::ResolveImage { src }
                    }
                    Err(e) => {
                        metrics::record_asset_resolution("failed");
                        tracing::warn!(object = %id, error = %e, "Asset resolution failed");
                        Action::ImageFailed
                    }
                };
                if tx.send(Command::new(action, Selector::Id(id))).is_err() {
                    tracing::debug!("Session closed before asset resolved");
                }
            });
        }
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("context", &self.context)
            .field("autosave", &self.autosave.is_some())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prefix_resolver() {
        let resolver = UrlPrefixResolver::new("https://cdn.example/");
        assert_eq!(
            resolver.resolve("logo.png").await.expect("resolve"),
            "https://cdn.example/logo.png"
        );
        assert!(resolver.resolve("").await.is_err());
    }
}
