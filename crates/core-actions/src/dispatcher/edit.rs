//! Text edit commands: insert, delete left/right, break line, merge paragraphs.

use core_state::TextRange;
use core_text::DocumentBody;
use serde::Deserialize;
use serde_json::Value;

use super::{
    CommandContext, CommandOutput, TargetParams, parse, resolve_range, resolve_unit, segment_body,
    submit, submit_some,
};
use crate::{CommandError, commands, ids};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertTextParams {
    unit_id: Option<String>,
    range: Option<TextRange>,
    text: Option<String>,
    body: Option<DocumentBody>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Direction {
    Left,
    Right,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteTextParams {
    unit_id: Option<String>,
    range: Option<TextRange>,
    direction: Direction,
}

pub(crate) fn handle_insert_text(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: InsertTextParams = parse(ids::INSERT_TEXT, params)?;
    let content = match (p.body, p.text) {
        (Some(body), _) => body,
        (None, Some(text)) => DocumentBody::from_text(&text),
        (None, None) => {
            return Err(CommandError::MissingParam {
                id: ids::INSERT_TEXT.to_string(),
                field: "text",
            });
        }
    };
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    let range = resolve_range(ctx.state, &unit, p.range)?;
    if content.is_empty() && range.is_collapsed() {
        return Ok(CommandOutput::NoOp);
    }
    let plan = commands::insert(segment_body(ctx.state, &unit, &range.segment_id)?, &range, content)?;
    tracing::trace!(target: "actions.command", op = "insert_text", unit = %unit, at = range.start_offset, "edit");
    submit(ctx, ids::INSERT_TEXT, &unit, plan)
}

fn delete(
    ctx: &mut CommandContext<'_>,
    command: &str,
    unit_id: Option<String>,
    range: Option<TextRange>,
    direction: Direction,
) -> Result<CommandOutput, CommandError> {
    let unit = resolve_unit(ctx.state, unit_id)?;
    let range = resolve_range(ctx.state, &unit, range)?;
    let body = segment_body(ctx.state, &unit, &range.segment_id)?;
    let plan = match direction {
        Direction::Left => commands::delete_left(body, &range)?,
        Direction::Right => commands::delete_right(body, &range)?,
    };
    tracing::trace!(target: "actions.command", op = ?direction, unit = %unit, at = range.start_offset, "delete");
    submit_some(ctx, command, &unit, plan)
}

pub(crate) fn handle_delete_left(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: TargetParams = parse(ids::DELETE_LEFT, params)?;
    delete(ctx, ids::DELETE_LEFT, p.unit_id, p.range, Direction::Left)
}

pub(crate) fn handle_delete_right(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: TargetParams = parse(ids::DELETE_RIGHT, params)?;
    delete(ctx, ids::DELETE_RIGHT, p.unit_id, p.range, Direction::Right)
}

pub(crate) fn handle_delete_text(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: DeleteTextParams = parse(ids::DELETE_TEXT, params)?;
    delete(ctx, ids::DELETE_TEXT, p.unit_id, p.range, p.direction)
}

pub(crate) fn handle_break_line(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: TargetParams = parse(ids::BREAK_LINE, params)?;
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    let range = resolve_range(ctx.state, &unit, p.range)?;
    let plan = commands::break_line(segment_body(ctx.state, &unit, &range.segment_id)?, &range)?;
    submit(ctx, ids::BREAK_LINE, &unit, plan)
}

/// Merge the paragraph holding the caret into the one before it.
pub(crate) fn handle_merge_two_paragraph(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: TargetParams = parse(ids::MERGE_TWO_PARAGRAPH, params)?;
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    let range = resolve_range(ctx.state, &unit, p.range)?.normalized();
    let body = segment_body(ctx.state, &unit, &range.segment_id)?;
    let plan = body
        .previous_paragraph_marker(range.start_offset)
        .and_then(|prev| commands::merge_paragraphs(body, prev + 1, &range.segment_id, prev));
    submit_some(ctx, ids::MERGE_TWO_PARAGRAPH, &unit, plan)
}
