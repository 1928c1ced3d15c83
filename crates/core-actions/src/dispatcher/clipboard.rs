//! Cut and paste. Reading the system clipboard happens outside; paste receives the body.

use core_state::TextRange;
use core_text::DocumentBody;
use serde::Deserialize;
use serde_json::Value;

use super::{
    CommandContext, CommandOutput, parse, resolve_range, resolve_ranges, resolve_unit,
    segment_body, submit, submit_some,
};
use crate::{CommandError, commands, ids};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CutParams {
    unit_id: Option<String>,
    ranges: Option<Vec<TextRange>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasteParams {
    unit_id: Option<String>,
    range: Option<TextRange>,
    body: DocumentBody,
}

pub(crate) fn handle_cut(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: CutParams = parse(ids::CUT_CONTENT, params)?;
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    let ranges = resolve_ranges(ctx.state, &unit, p.ranges)?;
    let segment_id = ranges
        .first()
        .map(|r| r.segment_id.clone())
        .unwrap_or_default();
    let plan = commands::cut(segment_body(ctx.state, &unit, &segment_id)?, &ranges)?;
    submit_some(ctx, ids::CUT_CONTENT, &unit, plan)
}

pub(crate) fn handle_paste(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: PasteParams = parse(ids::PASTE, params)?;
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    let range = resolve_range(ctx.state, &unit, p.range)?;
    if p.body.is_empty() && range.is_collapsed() {
        return Ok(CommandOutput::NoOp);
    }
    let plan = commands::insert(segment_body(ctx.state, &unit, &range.segment_id)?, &range, p.body)?;
    tracing::trace!(target: "actions.command", op = "paste", unit = %unit, at = range.start_offset, "clipboard");
    submit(ctx, ids::PASTE, &unit, plan)
}
