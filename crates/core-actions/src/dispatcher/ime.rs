//! Composition commands. Input replaces the current pre-edit text in place;
//! the undo items of each step are held by the [`ImeCompositionManager`]
//! until the session ends.
//!
//! [`ImeCompositionManager`]: crate::ime::ImeCompositionManager

use core_events::EditorEvent;
use core_state::SelectionProvider;
use core_text::{DocumentBody, char_len};
use serde::Deserialize;
use serde_json::Value;

use super::{
    CommandContext, CommandOutput, TargetParams, parse, resolve_unit, segment_body, submit,
};
use crate::ime::SessionEnd;
use crate::{CommandError, ids};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImeInputParams {
    unit_id: Option<String>,
    text: String,
}

pub(crate) fn handle_ime_start(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: TargetParams = parse(ids::IME_START, params)?;
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    abandon_session(ctx)?;
    let selection = match p.range {
        Some(r) => vec![r],
        None => ctx
            .state
            .documents
            .get(&unit)
            .map(|d| d.selection.selections().to_vec())
            .unwrap_or_default(),
    };
    if selection.is_empty() {
        return Err(CommandError::NoSelection);
    }
    ctx.ime.begin_session(&unit, selection);
    Ok(CommandOutput::Applied)
}

pub(crate) fn handle_ime_input(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: ImeInputParams = parse(ids::IME_INPUT, params)?;
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    if ctx.ime.composing_unit() != Some(unit.as_str()) {
        return Err(CommandError::NotComposing(unit));
    }
    let Some(range) = ctx.ime.preedit_range() else {
        return Err(CommandError::NotComposing(unit));
    };
    if p.text.is_empty() && range.is_collapsed() {
        return Ok(CommandOutput::NoOp);
    }
    let plan = match segment_body(ctx.state, &unit, &range.segment_id).and_then(|body| {
        crate::commands::insert(body, &range, DocumentBody::from_text(&p.text))
    }) {
        Ok(plan) => plan,
        Err(e) => {
            ctx.ime.mark_failed();
            return Err(e);
        }
    };
    let out = submit(ctx, ids::IME_INPUT, &unit, plan)?;
    ctx.ime.set_preedit_len(char_len(&p.text));
    Ok(out)
}

pub(crate) fn handle_ime_end(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: TargetParams = parse(ids::IME_END, params)?;
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    if ctx.ime.composing_unit() != Some(unit.as_str()) {
        return Err(CommandError::NotComposing(unit));
    }
    match ctx.ime.end_session()? {
        SessionEnd::Empty => Ok(CommandOutput::NoOp),
        SessionEnd::Committed(item) => {
            ctx.state.history.push_undo(item);
            ctx.layout.notify(EditorEvent::CompositionEnded {
                unit_id: unit,
                committed: true,
            });
            Ok(CommandOutput::Applied)
        }
        SessionEnd::Failed { revert } => {
            ctx.state.documents.apply_mutation(&revert)?;
            ctx.layout.notify(EditorEvent::CompositionEnded {
                unit_id: unit,
                committed: false,
            });
            Ok(CommandOutput::Applied)
        }
    }
}

/// Abandon the session and take back whatever it typed.
pub(crate) fn handle_ime_reset(
    ctx: &mut CommandContext<'_>,
    _params: Value,
) -> Result<CommandOutput, CommandError> {
    match abandon_session(ctx)? {
        true => Ok(CommandOutput::Applied),
        false => Ok(CommandOutput::NoOp),
    }
}

/// Revert an open session's edits, if any. Returns true when the body changed.
fn abandon_session(ctx: &mut CommandContext<'_>) -> Result<bool, CommandError> {
    let Some(revert) = ctx.ime.reset()? else {
        return Ok(false);
    };
    ctx.state.documents.apply_mutation(&revert)?;
    ctx.layout.notify(EditorEvent::CompositionEnded {
        unit_id: revert.unit_id,
        committed: false,
    });
    Ok(true)
}
