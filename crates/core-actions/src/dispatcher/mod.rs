//! Command registry and the handlers behind each command id.
//!
//! Handlers are plain functions taking a [`CommandContext`] and JSON params.
//! Every handler that edits text follows the same path: resolve the unit and
//! ranges, ask [`crate::commands`] for an [`EditPlan`], then [`submit`] it.
//! `submit` applies the forward list, records the inverse with the pre-edit
//! selection, routes the undo item to the IME buffer or the history, and
//! notifies layout.
//!
//! Sub-modules:
//! * `edit`      - insert, delete left/right, break line, merge paragraphs
//! * `format`    - update formatting
//! * `clipboard` - cut, paste
//! * `ime`       - composition start/input/end/reset
//! * `undo`      - undo / redo
//! * `mutation`  - the raw rich-text-editing mutation

use std::collections::HashMap;

use core_events::{EditorEvent, LayoutNotifier};
use core_ops::ActionList;
use core_state::{
    DocumentStore, EditorState, MutationRecord, SelectionProvider, TextRange, UndoRedoItem,
};
use core_text::DocumentBody;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::commands::EditPlan;
use crate::ime::ImeCompositionManager;
use crate::{CommandError, ids};

mod clipboard;
mod edit;
mod format;
mod ime;
mod mutation;
mod undo;

/// Mutable surroundings of one command invocation.
pub struct CommandContext<'a> {
    pub state: &'a mut EditorState,
    pub ime: &'a mut ImeCompositionManager,
    pub layout: &'a dyn LayoutNotifier,
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// A mutation was applied and recorded.
    Applied,
    /// Nothing to do (e.g. backspace at the start of the document).
    NoOp,
    /// The raw mutation ran; this list reverts it.
    Inverse(ActionList),
}

pub type CommandHandler =
    fn(&mut CommandContext<'_>, Value) -> Result<CommandOutput, CommandError>;

/// Command id -> handler.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in command and the rich-text mutation.
    pub fn with_builtin() -> Self {
        let builtin: [(&str, CommandHandler); 16] = [
            (ids::RICH_TEXT_EDITING, mutation::handle_rich_text_editing),
            (ids::INSERT_TEXT, edit::handle_insert_text),
            (ids::DELETE_LEFT, edit::handle_delete_left),
            (ids::DELETE_RIGHT, edit::handle_delete_right),
            (ids::DELETE_TEXT, edit::handle_delete_text),
            (ids::BREAK_LINE, edit::handle_break_line),
            (ids::MERGE_TWO_PARAGRAPH, edit::handle_merge_two_paragraph),
            (ids::UPDATE_FORMATTING, format::handle_update_formatting),
            (ids::CUT_CONTENT, clipboard::handle_cut),
            (ids::PASTE, clipboard::handle_paste),
            (ids::IME_START, ime::handle_ime_start),
            (ids::IME_INPUT, ime::handle_ime_input),
            (ids::IME_END, ime::handle_ime_end),
            (ids::IME_RESET, ime::handle_ime_reset),
            (ids::UNDO, undo::handle_undo),
            (ids::REDO, undo::handle_redo),
        ];
        Self {
            handlers: builtin
                .into_iter()
                .map(|(id, h)| (id.to_string(), h))
                .collect(),
        }
    }

    pub fn register(&mut self, id: &str, handler: CommandHandler) -> Result<(), CommandError> {
        if self.handlers.contains_key(id) {
            return Err(CommandError::DuplicateCommand(id.to_string()));
        }
        self.handlers.insert(id.to_string(), handler);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn try_execute(
        &self,
        ctx: &mut CommandContext<'_>,
        id: &str,
        params: Value,
    ) -> Result<CommandOutput, CommandError> {
        let handler = self
            .handlers
            .get(id)
            .ok_or_else(|| CommandError::UnknownCommand(id.to_string()))?;
        trace!(target: "actions.command", command = id, "execute");
        handler(ctx, params)
    }

    /// Run a command; failures are logged and reported as `false`.
    pub fn execute(&self, ctx: &mut CommandContext<'_>, id: &str, params: Value) -> bool {
        match self.try_execute(ctx, id, params) {
            Ok(_) => true,
            Err(e) => {
                warn!(target: "actions.command", command = id, error = %e, "command_failed");
                false
            }
        }
    }
}

/// Unit and range most commands accept; both default to the focused unit's selection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TargetParams {
    pub unit_id: Option<String>,
    pub range: Option<TextRange>,
}

pub(crate) fn parse<P: DeserializeOwned>(id: &str, params: Value) -> Result<P, CommandError> {
    let params = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|source| CommandError::InvalidParams {
        id: id.to_string(),
        source,
    })
}

pub(crate) fn resolve_unit(state: &EditorState, unit_id: Option<String>) -> Result<String, CommandError> {
    match unit_id {
        Some(u) if state.documents.contains(&u) => Ok(u),
        Some(u) => Err(CommandError::UnknownUnit(u)),
        None => state
            .focused()
            .map(str::to_string)
            .ok_or(CommandError::NoFocusedUnit),
    }
}

pub(crate) fn resolve_range(
    state: &EditorState,
    unit_id: &str,
    range: Option<TextRange>,
) -> Result<TextRange, CommandError> {
    if let Some(r) = range {
        return Ok(r);
    }
    state
        .documents
        .get(unit_id)
        .and_then(|d| d.selection.active_range().cloned())
        .ok_or(CommandError::NoSelection)
}

pub(crate) fn resolve_ranges(
    state: &EditorState,
    unit_id: &str,
    ranges: Option<Vec<TextRange>>,
) -> Result<Vec<TextRange>, CommandError> {
    if let Some(r) = ranges {
        return Ok(r);
    }
    let current = state
        .documents
        .get(unit_id)
        .map(|d| d.selection.selections().to_vec())
        .unwrap_or_default();
    if current.is_empty() {
        return Err(CommandError::NoSelection);
    }
    Ok(current)
}

pub(crate) fn segment_body<'s>(
    state: &'s EditorState,
    unit_id: &str,
    segment_id: &str,
) -> Result<&'s DocumentBody, CommandError> {
    let doc = state
        .documents
        .get(unit_id)
        .ok_or_else(|| CommandError::UnknownUnit(unit_id.to_string()))?;
    doc.segment_body(segment_id)
        .ok_or_else(|| CommandError::UnknownSegment(segment_id.to_string()))
}

/// Apply `plan` to `unit_id` and record it for undo.
pub(crate) fn submit(
    ctx: &mut CommandContext<'_>,
    command: &str,
    unit_id: &str,
    plan: EditPlan,
) -> Result<CommandOutput, CommandError> {
    let before = ctx
        .state
        .documents
        .get(unit_id)
        .ok_or_else(|| CommandError::UnknownUnit(unit_id.to_string()))?
        .selection
        .selections()
        .to_vec();
    let segment_id = plan.actions.segment()?.to_string();
    let composing = ctx.ime.composing_unit() == Some(unit_id);

    let forward = MutationRecord::new(unit_id, plan.actions).with_ranges(plan.ranges);
    let applied = match ctx.state.documents.apply_mutation(&forward) {
        Ok(applied) => applied,
        Err(e) => {
            if composing {
                ctx.ime.mark_failed();
            }
            return Err(e.into());
        }
    };
    let undo = MutationRecord::new(unit_id, applied.inverse).with_ranges(before);
    let redo = MutationRecord {
        actions: applied.effective,
        ..forward
    };
    let item = UndoRedoItem::new(unit_id, vec![undo], vec![redo]);
    if composing {
        ctx.ime.on_intermediate_edit(item);
    } else {
        ctx.state.history.push_undo(item);
    }

    debug!(target: "actions.command", command, unit = %unit_id, segment = %segment_id, composing, "mutation_committed");
    ctx.layout.notify(EditorEvent::MutationCommitted {
        unit_id: unit_id.to_string(),
        segment_id,
        command: command.to_string(),
    });
    Ok(CommandOutput::Applied)
}

/// `submit` when the builder produced a plan, `NoOp` otherwise.
pub(crate) fn submit_some(
    ctx: &mut CommandContext<'_>,
    command: &str,
    unit_id: &str,
    plan: Option<EditPlan>,
) -> Result<CommandOutput, CommandError> {
    match plan {
        Some(plan) => submit(ctx, command, unit_id, plan),
        None => {
            trace!(target: "actions.command", command, unit = %unit_id, "no_op");
            Ok(CommandOutput::NoOp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::NoopLayoutNotifier;
    use core_state::DocumentState;
    use serde_json::json;

    fn no_op(_: &mut CommandContext<'_>, _: Value) -> Result<CommandOutput, CommandError> {
        Ok(CommandOutput::NoOp)
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = CommandRegistry::with_builtin();
        assert!(registry.contains(ids::INSERT_TEXT));
        assert!(matches!(
            registry.register(ids::INSERT_TEXT, no_op),
            Err(CommandError::DuplicateCommand(_))
        ));
        registry.register("doc.command.custom", no_op).unwrap();
        assert!(registry.contains("doc.command.custom"));
    }

    #[test]
    fn unknown_command_reports_false() {
        let registry = CommandRegistry::new();
        let mut state = EditorState::new(10);
        let mut ime = ImeCompositionManager::new();
        let mut ctx = CommandContext {
            state: &mut state,
            ime: &mut ime,
            layout: &NoopLayoutNotifier,
        };
        assert!(!registry.execute(&mut ctx, "doc.command.nope", Value::Null));
        assert!(matches!(
            registry.try_execute(&mut ctx, "doc.command.nope", Value::Null),
            Err(CommandError::UnknownCommand(_))
        ));
    }

    #[test]
    fn failed_composition_reverts_and_records_nothing() {
        let registry = CommandRegistry::with_builtin();
        let mut state = EditorState::new(10);
        let mut doc = DocumentState::new("doc", DocumentBody::from_text("xy\r"));
        doc.selection.replace_text_ranges(vec![TextRange::caret(2)]);
        state.open(doc);
        let mut ime = ImeCompositionManager::new();
        let mut ctx = CommandContext {
            state: &mut state,
            ime: &mut ime,
            layout: &NoopLayoutNotifier,
        };
        registry.try_execute(&mut ctx, ids::IME_START, Value::Null).unwrap();
        registry
            .try_execute(&mut ctx, ids::IME_INPUT, json!({"text": "ab"}))
            .unwrap();
        assert_eq!(ctx.state.documents.get("doc").unwrap().body().data_stream, "xyab\r");

        ctx.ime.mark_failed();
        let out = registry.try_execute(&mut ctx, ids::IME_END, Value::Null).unwrap();
        assert_eq!(out, CommandOutput::Applied);
        let doc = ctx.state.documents.get("doc").unwrap();
        assert_eq!(doc.body().data_stream, "xy\r");
        assert_eq!(doc.selection.active_range(), Some(&TextRange::caret(2)));
        assert_eq!(ctx.state.history.undo_depth("doc"), 0);
        assert!(!ctx.ime.is_composing());
    }

    #[test]
    fn history_records_the_widened_list() {
        let text = format!(
            "a{}bc{}d\r",
            core_text::token::CUSTOM_RANGE_START,
            core_text::token::CUSTOM_RANGE_END
        );
        let mut body = DocumentBody::from_text(&text);
        body.custom_ranges.push(core_text::CustomRange {
            start_index: 1,
            end_index: 4,
            range_id: "link".into(),
            range_type: core_text::CustomRangeType::Hyperlink,
        });
        let mut state = EditorState::new(10);
        state.open(DocumentState::new("doc", body));
        let mut ime = ImeCompositionManager::new();
        let mut ctx = CommandContext {
            state: &mut state,
            ime: &mut ime,
            layout: &NoopLayoutNotifier,
        };
        let plan = EditPlan {
            actions: ActionList::new().retain(1).delete(1),
            ranges: vec![TextRange::caret(1)],
        };
        submit(&mut ctx, ids::DELETE_RIGHT, "doc", plan).unwrap();
        assert_eq!(ctx.state.documents.get("doc").unwrap().body().data_stream, "ad\r");
        let item = ctx.state.history.peek_undo("doc").unwrap();
        assert_eq!(item.redo_mutations[0].actions, ActionList::new().retain(1).delete(4));
        assert_eq!(item.redo_mutations[0].text_ranges, vec![TextRange::caret(1)]);
    }

    #[test]
    fn targets_fall_back_to_focus_and_selection() {
        let mut state = EditorState::new(10);
        assert!(matches!(resolve_unit(&state, None), Err(CommandError::NoFocusedUnit)));
        state.open(DocumentState::new("doc", DocumentBody::from_text("ab\r")));
        assert_eq!(resolve_unit(&state, None).unwrap(), "doc");
        assert!(matches!(
            resolve_unit(&state, Some("other".into())),
            Err(CommandError::UnknownUnit(_))
        ));
        assert!(matches!(resolve_range(&state, "doc", None), Err(CommandError::NoSelection)));

        let p: TargetParams = parse("x", json!({"range": {"startOffset": 1, "endOffset": 1, "collapsed": true}})).unwrap();
        assert_eq!(resolve_range(&state, "doc", p.range).unwrap(), TextRange::caret(1));
        assert!(matches!(
            parse::<TargetParams>("x", json!({"range": 3})),
            Err(CommandError::InvalidParams { .. })
        ));
    }
}
