//! Input-method composition sessions.
//!
//! While composing, every intermediate edit is applied to the body right away
//! (so the pre-edit text is visible) but its undo item is held here instead of
//! reaching the history. Ending the session folds the held items into one
//! item: the composed redo lists in order, the composed undo lists in reverse
//! order, with the undo side restoring the selection captured at session start.

use core_ops::{ActionList, MalformedActionError, compose_all};
use core_state::{MutationRecord, TextRange, UndoRedoItem};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImeState {
    #[default]
    Idle,
    Composing,
}

/// Outcome of closing a session.
#[derive(Debug)]
pub enum SessionEnd {
    /// No session was open, or nothing was typed during it.
    Empty,
    /// The whole session as a single undo item.
    Committed(UndoRedoItem),
    /// An intermediate edit failed. Applying `revert` restores the body as it was
    /// before the session; nothing may be pushed to the history.
    Failed { revert: MutationRecord },
}

#[derive(Debug)]
struct Session {
    unit_id: String,
    snapshot: Vec<TextRange>,
    anchor: TextRange,
    preedit_len: usize,
    buffer: Vec<UndoRedoItem>,
    failed: bool,
}

#[derive(Debug, Default)]
pub struct ImeCompositionManager {
    session: Option<Session>,
}

impl ImeCompositionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ImeState {
        match self.session {
            Some(_) => ImeState::Composing,
            None => ImeState::Idle,
        }
    }

    pub fn is_composing(&self) -> bool {
        self.session.is_some()
    }

    pub fn composing_unit(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.unit_id.as_str())
    }

    /// Number of intermediate items held by the open session.
    pub fn buffered(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.buffer.len())
    }

    /// Enter `Composing`. The active range of `selection` becomes the span the
    /// first pre-edit replaces.
    pub fn begin_session(&mut self, unit_id: &str, selection: Vec<TextRange>) {
        if let Some(old) = self.session.take() {
            warn!(target: "actions.ime", unit = %old.unit_id, dropped = old.buffer.len(), "ime_session_replaced");
        }
        let anchor = selection
            .last()
            .map(TextRange::normalized)
            .unwrap_or_else(|| TextRange::caret(0));
        debug!(target: "actions.ime", unit = %unit_id, start = anchor.start_offset, len = anchor.len(), "ime_begin");
        self.session = Some(Session {
            unit_id: unit_id.to_string(),
            preedit_len: anchor.len(),
            anchor,
            snapshot: selection,
            buffer: Vec::new(),
            failed: false,
        });
    }

    /// Span currently occupied by the pre-edit text.
    pub fn preedit_range(&self) -> Option<TextRange> {
        self.session.as_ref().map(|s| {
            let start = s.anchor.start_offset;
            let mut r = TextRange::span(start, start + s.preedit_len).in_segment(&s.anchor.segment_id);
            r.style = s.anchor.style.clone();
            r
        })
    }

    pub fn set_preedit_len(&mut self, len: usize) {
        if let Some(s) = self.session.as_mut() {
            s.preedit_len = len;
        }
    }

    /// Hold an intermediate edit's undo item. Returns false when idle.
    pub fn on_intermediate_edit(&mut self, item: UndoRedoItem) -> bool {
        let Some(s) = self.session.as_mut() else {
            return false;
        };
        s.buffer.push(item);
        trace!(target: "actions.ime", unit = %s.unit_id, buffered = s.buffer.len(), "ime_buffered");
        true
    }

    pub fn mark_failed(&mut self) {
        if let Some(s) = self.session.as_mut() {
            s.failed = true;
        }
    }

    /// Leave `Composing` and fold the held items.
    pub fn end_session(&mut self) -> Result<SessionEnd, MalformedActionError> {
        let Some(session) = self.session.take() else {
            return Ok(SessionEnd::Empty);
        };
        let Some(last) = session.buffer.last() else {
            debug!(target: "actions.ime", unit = %session.unit_id, "ime_end_empty");
            return Ok(SessionEnd::Empty);
        };

        let undo = session.revert()?;
        if session.failed {
            warn!(target: "actions.ime", unit = %session.unit_id, steps = session.buffer.len(), "ime_end_reverting");
            return Ok(SessionEnd::Failed { revert: undo });
        }

        let redo_ranges = last
            .redo_mutations
            .last()
            .map(|m| m.text_ranges.clone())
            .unwrap_or_default();
        let redo = compose_all(
            session
                .buffer
                .iter()
                .flat_map(|item| item.redo_mutations.iter())
                .map(|m| &m.actions),
        )?;
        let redo = MutationRecord::new(&session.unit_id, redo).with_ranges(redo_ranges);
        debug!(target: "actions.ime", unit = %session.unit_id, steps = session.buffer.len(), "ime_end_committed");
        Ok(SessionEnd::Committed(UndoRedoItem::new(
            &session.unit_id,
            vec![undo],
            vec![redo],
        )))
    }

    /// Drop the session. The returned record, when there is one, takes the
    /// body back to how it was when the session began; applying it keeps the
    /// history's offsets valid.
    pub fn reset(&mut self) -> Result<Option<MutationRecord>, MalformedActionError> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };
        if session.buffer.is_empty() {
            return Ok(None);
        }
        debug!(target: "actions.ime", unit = %session.unit_id, dropped = session.buffer.len(), "ime_reset");
        session.revert().map(Some)
    }
}

impl Session {
    /// Undo lists of every held item, newest first, composed into one record
    /// that restores the selection captured at session start.
    fn revert(&self) -> Result<MutationRecord, MalformedActionError> {
        let undo: ActionList = compose_all(
            self.buffer
                .iter()
                .rev()
                .flat_map(|item| item.undo_mutations.iter().rev())
                .map(|m| &m.actions),
        )?;
        Ok(MutationRecord::new(&self.unit_id, undo).with_ranges(self.snapshot.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_ops::Insert;
    use core_text::DocumentBody;
    use pretty_assertions::assert_eq;

    fn step(redo: ActionList, undo: ActionList, caret: usize) -> UndoRedoItem {
        UndoRedoItem::new(
            "doc",
            vec![MutationRecord::new("doc", undo)],
            vec![MutationRecord::new("doc", redo).with_ranges(vec![TextRange::caret(caret)])],
        )
    }

    #[test]
    fn idle_manager_ignores_edits() {
        let mut ime = ImeCompositionManager::new();
        assert_eq!(ime.state(), ImeState::Idle);
        assert!(!ime.on_intermediate_edit(step(ActionList::new(), ActionList::new(), 0)));
        assert!(matches!(ime.end_session(), Ok(SessionEnd::Empty)));
    }

    #[test]
    fn session_folds_to_one_item() {
        let mut ime = ImeCompositionManager::new();
        ime.begin_session("doc", vec![TextRange::caret(0)]);
        assert_eq!(ime.state(), ImeState::Composing);
        ime.on_intermediate_edit(step(
            ActionList::new().insert_text("a"),
            ActionList::new().delete(1),
            1,
        ));
        ime.on_intermediate_edit(step(
            ActionList::new().insert_text("ab").delete(1),
            ActionList::new()
                .insert(Insert::new(DocumentBody::from_text("a")).unwrap())
                .delete(2),
            2,
        ));
        let SessionEnd::Committed(item) = ime.end_session().unwrap() else {
            panic!("expected a committed session");
        };
        assert_eq!(item.redo_mutations[0].actions, ActionList::new().insert_text("ab"));
        assert_eq!(item.redo_mutations[0].text_ranges, vec![TextRange::caret(2)]);
        assert_eq!(item.undo_mutations[0].actions, ActionList::new().delete(2));
        assert_eq!(item.undo_mutations[0].text_ranges, vec![TextRange::caret(0)]);
        assert!(!ime.is_composing());
    }

    #[test]
    fn failed_session_returns_revert_only() {
        let mut ime = ImeCompositionManager::new();
        ime.begin_session("doc", vec![TextRange::caret(0)]);
        ime.on_intermediate_edit(step(
            ActionList::new().insert_text("a"),
            ActionList::new().delete(1),
            1,
        ));
        ime.mark_failed();
        match ime.end_session().unwrap() {
            SessionEnd::Failed { revert } => {
                assert_eq!(revert.actions, ActionList::new().delete(1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn begin_clears_previous_buffer() {
        let mut ime = ImeCompositionManager::new();
        ime.begin_session("doc", vec![TextRange::caret(0)]);
        ime.on_intermediate_edit(step(ActionList::new().insert_text("a"), ActionList::new().delete(1), 1));
        ime.begin_session("doc", vec![TextRange::span(1, 3)]);
        assert_eq!(ime.buffered(), 0);
        assert_eq!(ime.preedit_range(), Some(TextRange::span(1, 3)));
        assert_eq!(ime.reset().unwrap(), None);
        assert_eq!(ime.state(), ImeState::Idle);
    }

    #[test]
    fn reset_hands_back_the_revert() {
        let mut ime = ImeCompositionManager::new();
        ime.begin_session("doc", vec![TextRange::caret(0)]);
        ime.on_intermediate_edit(step(ActionList::new().insert_text("z"), ActionList::new().delete(1), 1));
        ime.on_intermediate_edit(step(
            ActionList::new().insert_text("zz").delete(1),
            ActionList::new()
                .insert(Insert::new(DocumentBody::from_text("z")).unwrap())
                .delete(2),
            2,
        ));
        let revert = ime.reset().unwrap().unwrap();
        assert_eq!(revert.actions, ActionList::new().delete(2));
        assert_eq!(revert.text_ranges, vec![TextRange::caret(0)]);
        assert_eq!(ime.state(), ImeState::Idle);
        assert_eq!(ime.reset().unwrap(), None);
    }
}
