use core_events::EditorEvent;
use serde_json::Value;

use super::{CommandContext, CommandOutput, TargetParams, parse, resolve_unit};
use crate::{CommandError, ids};

pub(crate) fn handle_undo(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: TargetParams = parse(ids::UNDO, params)?;
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    if ctx.ime.composing_unit() == Some(unit.as_str()) {
        tracing::debug!(target: "actions.command", op = "undo", unit = %unit, "ignored_while_composing");
        return Ok(CommandOutput::NoOp);
    }
    let state = &mut *ctx.state;
    if state.history.undo(&unit, &mut state.documents) {
        tracing::trace!(target: "actions.command", op = "undo", unit = %unit, "undo");
        ctx.layout.notify(EditorEvent::UndoApplied { unit_id: unit });
        Ok(CommandOutput::Applied)
    } else {
        Ok(CommandOutput::NoOp)
    }
}

pub(crate) fn handle_redo(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: TargetParams = parse(ids::REDO, params)?;
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    if ctx.ime.composing_unit() == Some(unit.as_str()) {
        tracing::debug!(target: "actions.command", op = "redo", unit = %unit, "ignored_while_composing");
        return Ok(CommandOutput::NoOp);
    }
    let state = &mut *ctx.state;
    if state.history.redo(&unit, &mut state.documents) {
        tracing::trace!(target: "actions.command", op = "redo", unit = %unit, "redo");
        ctx.layout.notify(EditorEvent::RedoApplied { unit_id: unit });
        Ok(CommandOutput::Applied)
    } else {
        Ok(CommandOutput::NoOp)
    }
}
