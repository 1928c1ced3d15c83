//! The one mutation every command reduces to: apply an action list to a unit.
//! It bypasses the history; callers wanting undo go through a command.

use core_events::EditorEvent;
use core_state::MutationRecord;
use serde_json::Value;

use super::{CommandContext, CommandOutput, parse};
use crate::{CommandError, ids};

pub(crate) fn handle_rich_text_editing(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let record: MutationRecord = parse(ids::RICH_TEXT_EDITING, params)?;
    let segment_id = record.actions.segment()?.to_string();
    let inverse = ctx.state.documents.apply_mutation(&record)?.inverse;
    tracing::debug!(target: "actions.command", unit = %record.unit_id, segment = %segment_id, actions = record.actions.len(), "mutation_applied");
    ctx.layout.notify(EditorEvent::MutationCommitted {
        unit_id: record.unit_id,
        segment_id,
        command: ids::RICH_TEXT_EDITING.to_string(),
    });
    Ok(CommandOutput::Inverse(inverse))
}
