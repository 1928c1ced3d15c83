//! Editor state: open document units, their selections, and undo/redo history.
//!
//! The edit algebra itself lives in `core-ops` and holds no state. This crate
//! owns the mutable parts:
//!
//! - [`Documents`]: unit id -> [`DocumentState`] (main body, named segments,
//!   selection). It is the [`MutationExecutor`] that undo/redo replays through.
//! - [`UndoRedoService`]: per-unit bounded stacks of [`UndoRedoItem`]s.
//! - [`EditorState`]: both of the above plus the focused unit.
//!
//! Single-writer contract: callers never run two mutations against the same
//! unit concurrently. Nothing here locks.

use core_text::TextStyle;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod document;
pub mod undo;

pub use document::{DocumentState, DocumentStore, Documents, MutationExecutor, MutationRecord};
pub use undo::{UNDO_CAPACITY_DEFAULT, UndoHooks, UndoRedoItem, UndoRedoService};

/// A caret or span in one segment's data stream (character offsets).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start_offset: usize,
    pub end_offset: usize,
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub segment_id: String,
    /// Style to give text typed at this range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
}

impl TextRange {
    pub fn caret(offset: usize) -> Self {
        Self {
            start_offset: offset,
            end_offset: offset,
            collapsed: true,
            ..Self::default()
        }
    }

    /// Span between two offsets in either order.
    pub fn span(a: usize, b: usize) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self {
            start_offset: start,
            end_offset: end,
            collapsed: start == end,
            ..Self::default()
        }
    }

    pub fn in_segment(mut self, segment_id: impl Into<String>) -> Self {
        self.segment_id = segment_id.into();
        self
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn len(&self) -> usize {
        self.end_offset.saturating_sub(self.start_offset)
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed || self.start_offset == self.end_offset
    }

    /// Copy with `start <= end` and `collapsed` consistent with the offsets.
    pub fn normalized(&self) -> Self {
        let mut out = Self::span(self.start_offset, self.end_offset);
        out.segment_id = self.segment_id.clone();
        out.style = self.style.clone();
        out
    }
}

/// Cursor state supplier/consumer.
pub trait SelectionProvider {
    fn active_range(&self) -> Option<&TextRange>;
    fn selections(&self) -> &[TextRange];
    fn replace_text_ranges(&mut self, ranges: Vec<TextRange>);
}

/// The ranges of one unit. The last range is the active one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionModel {
    ranges: Vec<TextRange>,
}

impl SelectionModel {
    pub fn clear(&mut self) {
        self.ranges.clear();
    }
    pub fn is_active(&self) -> bool {
        !self.ranges.is_empty()
    }
}

impl SelectionProvider for SelectionModel {
    fn active_range(&self) -> Option<&TextRange> {
        self.ranges.last()
    }

    fn selections(&self) -> &[TextRange] {
        &self.ranges
    }

    fn replace_text_ranges(&mut self, ranges: Vec<TextRange>) {
        self.ranges = ranges.iter().map(TextRange::normalized).collect();
    }
}

/// Everything the command layer reads and writes.
#[derive(Default)]
pub struct EditorState {
    pub documents: Documents,
    pub history: UndoRedoService,
    focused: Option<String>,
}

impl EditorState {
    pub fn new(undo_capacity: usize) -> Self {
        Self {
            documents: Documents::new(),
            history: UndoRedoService::new(undo_capacity),
            focused: None,
        }
    }

    /// Open a unit. The first unit opened takes focus.
    pub fn open(&mut self, doc: DocumentState) {
        if self.focused.is_none() {
            self.focused = Some(doc.unit_id().to_string());
        }
        self.documents.open(doc);
    }

    /// Dispose of a unit together with its history.
    pub fn close(&mut self, unit_id: &str) -> Option<DocumentState> {
        self.history.clear(unit_id);
        if self.focused.as_deref() == Some(unit_id) {
            self.focused = None;
        }
        self.documents.close(unit_id)
    }

    pub fn focus(&mut self, unit_id: &str) -> bool {
        if !self.documents.contains(unit_id) {
            return false;
        }
        debug!(target: "state", unit = %unit_id, "focus_changed");
        self.focused = Some(unit_id.to_string());
        true
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    pub fn focused_document(&self) -> Option<&DocumentState> {
        self.focused.as_deref().and_then(|u| self.documents.get(u))
    }

    /// Revert the focused unit's latest edit.
    pub fn undo(&mut self) -> bool {
        let Some(unit) = self.focused.clone() else {
            return false;
        };
        self.history.undo(&unit, &mut self.documents)
    }

    /// Replay the focused unit's latest undone edit.
    pub fn redo(&mut self) -> bool {
        let Some(unit) = self.focused.clone() else {
            return false;
        };
        self.history.redo(&unit, &mut self.documents)
    }
}
