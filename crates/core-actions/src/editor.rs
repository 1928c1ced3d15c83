use std::future::Future;
use std::sync::Arc;

use core_config::Config;
use core_events::{LayoutNotifier, NoopLayoutNotifier};
use core_state::{DocumentState, DocumentStore, EditorState};
use core_text::DocumentBody;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::dispatcher::{CommandContext, CommandOutput, CommandRegistry};
use crate::ime::ImeCompositionManager;
use crate::{CommandError, ids};

/// Editor facade: state, composition manager and command registry.
pub struct Editor {
    state: EditorState,
    ime: ImeCompositionManager,
    registry: CommandRegistry,
    layout: Arc<dyn LayoutNotifier>,
}

impl Editor {
    pub fn new(undo_capacity: usize) -> Self {
        Self {
            state: EditorState::new(undo_capacity),
            ime: ImeCompositionManager::new(),
            registry: CommandRegistry::with_builtin(),
            layout: Arc::new(NoopLayoutNotifier),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        info!(target: "actions.command", undo_capacity = config.effective_undo_capacity, "editor_init");
        Self::new(config.effective_undo_capacity)
    }

    pub fn with_layout(mut self, layout: Arc<dyn LayoutNotifier>) -> Self {
        self.layout = layout;
        self
    }

    pub fn open(&mut self, doc: DocumentState) {
        debug!(target: "actions.command", unit = %doc.unit_id(), len = doc.body().len(), "unit_opened");
        self.state.open(doc);
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EditorState {
        &mut self.state
    }

    pub fn ime(&self) -> &ImeCompositionManager {
        &self.ime
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    /// Main body of an open unit.
    pub fn body(&self, unit_id: &str) -> Option<&DocumentBody> {
        self.state.documents.get(unit_id).map(DocumentStore::body)
    }

    pub fn try_execute(&mut self, id: &str, params: Value) -> Result<CommandOutput, CommandError> {
        let mut ctx = CommandContext {
            state: &mut self.state,
            ime: &mut self.ime,
            layout: self.layout.as_ref(),
        };
        self.registry.try_execute(&mut ctx, id, params)
    }

    /// Run a command; `false` when it failed (the failure is logged).
    pub fn execute(&mut self, id: &str, params: Value) -> bool {
        let mut ctx = CommandContext {
            state: &mut self.state,
            ime: &mut self.ime,
            layout: self.layout.as_ref(),
        };
        self.registry.execute(&mut ctx, id, params)
    }

    /// Await the clipboard, then paste at the focused selection.
    /// An empty clipboard is a successful no-op.
    pub async fn paste_from<F>(&mut self, clipboard: F) -> bool
    where
        F: Future<Output = Option<DocumentBody>>,
    {
        let Some(body) = clipboard.await else {
            debug!(target: "actions.command", "clipboard_empty");
            return true;
        };
        self.execute(ids::PASTE, json!({ "body": body }))
    }
}
