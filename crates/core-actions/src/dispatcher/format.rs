use core_ops::CoverType;
use core_state::{SelectionProvider, TextRange};
use core_text::{Bullet, ParagraphStyle, TextStyle};
use serde::Deserialize;
use serde_json::Value;

use super::{
    CommandContext, CommandOutput, parse, resolve_ranges, resolve_unit, segment_body, submit_some,
};
use crate::commands::{self, FormatRequest};
use crate::{CommandError, ids};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateFormattingParams {
    unit_id: Option<String>,
    ranges: Option<Vec<TextRange>>,
    #[serde(default)]
    cover_type: CoverType,
    style: Option<TextStyle>,
    paragraph_style: Option<ParagraphStyle>,
    bullet: Option<Bullet>,
}

pub(crate) fn handle_update_formatting(
    ctx: &mut CommandContext<'_>,
    params: Value,
) -> Result<CommandOutput, CommandError> {
    let p: UpdateFormattingParams = parse(ids::UPDATE_FORMATTING, params)?;
    let unit = resolve_unit(ctx.state, p.unit_id)?;
    let ranges = resolve_ranges(ctx.state, &unit, p.ranges)?;
    let request = FormatRequest {
        cover_type: p.cover_type,
        style: p.style,
        paragraph_style: p.paragraph_style,
        bullet: p.bullet,
    };
    let segment_id = ranges
        .first()
        .map(|r| r.segment_id.clone())
        .unwrap_or_default();
    let plan = commands::update_formatting(
        segment_body(ctx.state, &unit, &segment_id)?,
        &ranges,
        &request,
    )?;

    // A bare caret cannot carry text formatting; remember it for the next insertion.
    if plan.is_none()
        && let Some(style) = request.style
        && ranges.iter().all(TextRange::is_collapsed)
        && let Some(doc) = ctx.state.documents.get_mut(&unit)
    {
        let styled = ranges
            .into_iter()
            .map(|r| {
                let base = r.style.clone().unwrap_or_default();
                let merged = match request.cover_type {
                    CoverType::Merge => base.merged(&style),
                    CoverType::Replace => style.clone(),
                };
                r.with_style(merged)
            })
            .collect();
        doc.selection.replace_text_ranges(styled);
        tracing::trace!(target: "actions.command", op = "caret_style", unit = %unit, "format");
        return Ok(CommandOutput::NoOp);
    }
    submit_some(ctx, ids::UPDATE_FORMATTING, &unit, plan)
}
