use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use core_ops::ApplyError;
use tracing::{trace, warn};

use crate::document::{MutationExecutor, MutationRecord};

/// Default per-unit bound on the undo stack.
pub const UNDO_CAPACITY_DEFAULT: usize = 100;

/// Custom replay for items whose effect is not expressed by their mutation lists.
pub trait UndoHooks: Send + Sync {
    fn undo(&self, executor: &mut dyn MutationExecutor) -> Result<(), ApplyError>;
    fn redo(&self, executor: &mut dyn MutationExecutor) -> Result<(), ApplyError>;
}

/// One undoable edit: the records that revert it and the records that replay it.
#[derive(Clone)]
pub struct UndoRedoItem {
    pub unit_id: String,
    pub undo_mutations: Vec<MutationRecord>,
    pub redo_mutations: Vec<MutationRecord>,
    pub hooks: Option<Arc<dyn UndoHooks>>,
}

impl UndoRedoItem {
    pub fn new(
        unit_id: impl Into<String>,
        undo_mutations: Vec<MutationRecord>,
        redo_mutations: Vec<MutationRecord>,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            undo_mutations,
            redo_mutations,
            hooks: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn UndoHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    fn run_undo(&self, executor: &mut dyn MutationExecutor) -> Result<(), ApplyError> {
        match &self.hooks {
            Some(h) => h.undo(executor),
            None => executor.execute_all(&self.undo_mutations),
        }
    }

    fn run_redo(&self, executor: &mut dyn MutationExecutor) -> Result<(), ApplyError> {
        match &self.hooks {
            Some(h) => h.redo(executor),
            None => executor.execute_all(&self.redo_mutations),
        }
    }
}

impl fmt::Debug for UndoRedoItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoRedoItem")
            .field("unit_id", &self.unit_id)
            .field("undo_mutations", &self.undo_mutations)
            .field("redo_mutations", &self.redo_mutations)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct UnitHistory {
    undo_stack: Vec<UndoRedoItem>,
    redo_stack: Vec<UndoRedoItem>,
}

/// Per-unit undo/redo stacks with a bounded undo depth.
pub struct UndoRedoService {
    capacity: usize,
    units: HashMap<String, UnitHistory>,
    evicted: AtomicU64,
}

impl Default for UndoRedoService {
    fn default() -> Self {
        Self::new(UNDO_CAPACITY_DEFAULT)
    }
}

impl UndoRedoService {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            units: HashMap::new(),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn undo_depth(&self, unit_id: &str) -> usize {
        self.units.get(unit_id).map_or(0, |h| h.undo_stack.len())
    }
    pub fn redo_depth(&self, unit_id: &str) -> usize {
        self.units.get(unit_id).map_or(0, |h| h.redo_stack.len())
    }
    /// Items dropped off the bottom of any undo stack so far.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub fn peek_undo(&self, unit_id: &str) -> Option<&UndoRedoItem> {
        self.units.get(unit_id).and_then(|h| h.undo_stack.last())
    }
    pub fn peek_redo(&self, unit_id: &str) -> Option<&UndoRedoItem> {
        self.units.get(unit_id).and_then(|h| h.redo_stack.last())
    }

    /// Record a fresh edit. The unit's redo stack no longer applies and is cleared.
    pub fn push_undo(&mut self, item: UndoRedoItem) {
        let history = self.units.entry(item.unit_id.clone()).or_default();
        history.redo_stack.clear();
        history.undo_stack.push(item);
        trace!(target: "state.undo", undo_depth = history.undo_stack.len(), "push_undo");
        if history.undo_stack.len() > self.capacity {
            let _ = history.undo_stack.remove(0);
            self.evicted.fetch_add(1, Ordering::Relaxed);
            trace!(target: "state.undo", "undo_stack_trimmed");
        }
    }

    /// Move the top undo item to the redo stack without replaying it.
    pub fn pop_undo_to_redo(&mut self, unit_id: &str) -> bool {
        let Some(history) = self.units.get_mut(unit_id) else {
            return false;
        };
        match history.undo_stack.pop() {
            Some(item) => {
                history.redo_stack.push(item);
                trace!(target: "state.undo", undo_depth = history.undo_stack.len(), redo_depth = history.redo_stack.len(), "undo_to_redo");
                true
            }
            None => false,
        }
    }

    /// Move the top redo item back to the undo stack without replaying it.
    pub fn pop_redo_to_undo(&mut self, unit_id: &str) -> bool {
        let Some(history) = self.units.get_mut(unit_id) else {
            return false;
        };
        match history.redo_stack.pop() {
            Some(item) => {
                history.undo_stack.push(item);
                trace!(target: "state.undo", undo_depth = history.undo_stack.len(), redo_depth = history.redo_stack.len(), "redo_to_undo");
                true
            }
            None => false,
        }
    }

    /// Revert the unit's latest edit. On failure the item stays where it was.
    pub fn undo(&mut self, unit_id: &str, executor: &mut dyn MutationExecutor) -> bool {
        let Some(item) = self.peek_undo(unit_id) else {
            return false;
        };
        if let Err(err) = item.run_undo(executor) {
            warn!(target: "state.undo", unit = %unit_id, error = %err, "undo_failed");
            return false;
        }
        self.pop_undo_to_redo(unit_id)
    }

    /// Replay the unit's latest undone edit. On failure the item stays where it was.
    pub fn redo(&mut self, unit_id: &str, executor: &mut dyn MutationExecutor) -> bool {
        let Some(item) = self.peek_redo(unit_id) else {
            return false;
        };
        if let Err(err) = item.run_redo(executor) {
            warn!(target: "state.undo", unit = %unit_id, error = %err, "redo_failed");
            return false;
        }
        self.pop_redo_to_undo(unit_id)
    }

    /// Forget a unit's history (the unit was disposed).
    pub fn clear(&mut self, unit_id: &str) {
        if self.units.remove(unit_id).is_some() {
            trace!(target: "state.undo", unit = %unit_id, "history_cleared");
        }
    }
}
