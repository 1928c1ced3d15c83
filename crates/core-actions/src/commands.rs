//! Pure builders: (selection, body, payload) -> action list + post-edit selection.
//!
//! Nothing here touches editor state. The dispatcher handlers resolve the
//! unit, segment body and ranges, call a builder, then submit the plan.

use core_ops::{ActionList, Bias, CoverType, FormatPatch, Insert, compose};
use core_state::TextRange;
use core_text::{
    Bullet, DocumentBody, Paragraph, ParagraphStyle, TextRun, TextStyle, grapheme, token,
};

use crate::CommandError;

/// Actions for one mutation plus the selection to install after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan {
    pub actions: ActionList,
    pub ranges: Vec<TextRange>,
}

/// Formatting request of the update-formatting command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatRequest {
    pub cover_type: CoverType,
    pub style: Option<TextStyle>,
    pub paragraph_style: Option<ParagraphStyle>,
    pub bullet: Option<Bullet>,
}

fn caret_in(segment_id: &str, offset: usize) -> TextRange {
    TextRange::caret(offset).in_segment(segment_id)
}

fn check_bounds(body: &DocumentBody, range: &TextRange) -> Result<(), CommandError> {
    let len = body.len();
    if range.end_offset > len {
        return Err(CommandError::RangeOutOfBounds {
            end: range.end_offset,
            len,
        });
    }
    Ok(())
}

/// Widen `[start, end)` until no registered custom range has exactly one marker inside.
pub fn widen_for_custom_ranges(body: &DocumentBody, mut start: usize, mut end: usize) -> (usize, usize) {
    loop {
        let mut changed = false;
        for r in &body.custom_ranges {
            let has_start = (start..end).contains(&r.start_index);
            let has_end = (start..end).contains(&r.end_index);
            if has_start != has_end {
                start = start.min(r.start_index);
                end = end.max(r.end_index + 1);
                changed = true;
            }
        }
        if !changed {
            return (start, end);
        }
    }
}

/// Text style a plain insertion at `range` should carry.
fn inherited_style(body: &DocumentBody, range: &TextRange) -> Option<TextStyle> {
    range
        .style
        .clone()
        .or_else(|| {
            range
                .start_offset
                .checked_sub(1)
                .and_then(|prev| body.style_at(prev).cloned())
        })
        .filter(|s| !s.is_empty())
}

/// Replace `range` with `content`. Unstyled content takes the inherited style.
pub fn insert(
    body: &DocumentBody,
    range: &TextRange,
    mut content: DocumentBody,
) -> Result<EditPlan, CommandError> {
    let range = range.normalized();
    check_bounds(body, &range)?;
    let len = content.len();
    if content.text_runs.is_empty()
        && len > 0
        && let Some(style) = inherited_style(body, &range)
    {
        content.text_runs.push(TextRun::new(0, len, style));
    }
    let (start, end) = if range.is_collapsed() {
        (range.start_offset, range.start_offset)
    } else {
        widen_for_custom_ranges(body, range.start_offset, range.end_offset)
    };
    let actions = ActionList::new()
        .retain(start)
        .insert(Insert::new(content)?)
        .delete(end - start)
        .normalized()
        .with_segment(&range.segment_id);
    Ok(EditPlan {
        actions,
        ranges: vec![caret_in(&range.segment_id, start + len)],
    })
}

/// Delete every non-collapsed range in one ascending `[Retain, Delete]*` list.
/// `None` when nothing is selected.
pub fn cut(body: &DocumentBody, ranges: &[TextRange]) -> Result<Option<EditPlan>, CommandError> {
    let Some(first) = ranges.first() else {
        return Ok(None);
    };
    let segment_id = first.segment_id.clone();
    let mut spans: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for r in ranges {
        let r = r.normalized();
        check_bounds(body, &r)?;
        if !r.is_collapsed() {
            spans.push(widen_for_custom_ranges(body, r.start_offset, r.end_offset));
        }
    }
    if spans.is_empty() {
        return Ok(None);
    }
    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (s, e) in spans {
        match merged.last_mut() {
            Some(last) if s <= last.1 => last.1 = last.1.max(e),
            _ => merged.push((s, e)),
        }
    }

    let mut cursor = 0usize;
    let mut actions = ActionList::new();
    for &(s, e) in &merged {
        actions = actions.retain(s - cursor).delete(e - s);
        cursor = e;
    }
    let actions = actions.normalized().with_segment(&segment_id);
    let carets = merged
        .iter()
        .map(|&(s, _)| caret_in(&segment_id, actions.transform_offset(s, Bias::Left)))
        .collect();
    Ok(Some(EditPlan {
        actions,
        ranges: carets,
    }))
}

/// Join the paragraph whose first character is at `next_start` onto the one before it.
///
/// Only the earlier paragraph's marker is deleted. The later paragraph's text
/// and any range markers in it stay in place; its marker takes over the
/// earlier paragraph's style and bullet.
pub fn merge_paragraphs(
    body: &DocumentBody,
    next_start: usize,
    segment_id: &str,
    caret: usize,
) -> Option<EditPlan> {
    let prev_marker = next_start.checked_sub(1)?;
    if body.char_at(prev_marker) != Some(token::PARAGRAPH) {
        return None;
    }
    let cur_marker = body.paragraph_marker_for(next_start)?;
    let kept = body.paragraph_at(prev_marker).cloned().unwrap_or_default();
    let patch = FormatPatch::paragraph_entries(
        CoverType::Replace,
        vec![Paragraph {
            start_index: 0,
            ..kept
        }],
    );
    let actions = ActionList::new()
        .retain(prev_marker)
        .delete(1)
        .retain(cur_marker - next_start)
        .retain_formatted(1, patch)
        .ok()?
        .normalized()
        .with_segment(segment_id);
    Some(EditPlan {
        actions,
        ranges: vec![caret_in(segment_id, caret)],
    })
}

/// Backspace. `None` is a no-op (start of the first paragraph).
pub fn delete_left(body: &DocumentBody, range: &TextRange) -> Result<Option<EditPlan>, CommandError> {
    let range = range.normalized();
    check_bounds(body, &range)?;
    if !range.is_collapsed() {
        return cut(body, std::slice::from_ref(&range));
    }
    let seg = range.segment_id.as_str();
    let mut end = range.start_offset;
    while end > 0 && body.char_at(end - 1).is_some_and(token::is_custom_range_marker) {
        end -= 1;
    }
    if end == 0 {
        return Ok(None);
    }
    if body.char_at(end - 1) == Some(token::PARAGRAPH) {
        return Ok(merge_paragraphs(body, end, seg, end - 1));
    }
    let mut start = grapheme::prev_boundary(&body.data_stream, end);
    let cluster: Vec<char> = body.text(start, end).chars().collect();
    if let Some(i) = cluster.iter().rposition(|&c| c == token::PARAGRAPH) {
        start += i + 1;
    }
    let (start, stop) = widen_for_custom_ranges(body, start, end);
    let actions = ActionList::new()
        .retain(start)
        .delete(stop - start)
        .with_segment(seg);
    Ok(Some(EditPlan {
        actions,
        ranges: vec![caret_in(seg, start)],
    }))
}

/// Forward delete. `None` at the final paragraph marker.
pub fn delete_right(body: &DocumentBody, range: &TextRange) -> Result<Option<EditPlan>, CommandError> {
    let range = range.normalized();
    check_bounds(body, &range)?;
    if !range.is_collapsed() {
        return cut(body, std::slice::from_ref(&range));
    }
    let seg = range.segment_id.as_str();
    let caret = range.start_offset;
    let len = body.len();
    let mut at = caret;
    while at < len && body.char_at(at).is_some_and(token::is_custom_range_marker) {
        at += 1;
    }
    match body.char_at(at) {
        None => Ok(None),
        Some(token::PARAGRAPH) if at + 1 >= len => Ok(None),
        Some(token::PARAGRAPH) => Ok(merge_paragraphs(body, at + 1, seg, caret)),
        Some(_) => {
            let mut end = grapheme::next_boundary(&body.data_stream, at);
            if let Some(i) = body.text(at, end).chars().position(|c| c == token::PARAGRAPH) {
                end = at + i;
            }
            let (start, stop) = widen_for_custom_ranges(body, at, end);
            let actions = ActionList::new()
                .retain(start)
                .delete(stop - start)
                .with_segment(seg);
            Ok(Some(EditPlan {
                actions,
                ranges: vec![caret_in(seg, caret.min(start))],
            }))
        }
    }
}

/// Split the paragraph at `range`. The new paragraph copies the current one's style and bullet.
pub fn break_line(body: &DocumentBody, range: &TextRange) -> Result<EditPlan, CommandError> {
    let range = range.normalized();
    check_bounds(body, &range)?;
    let mut content = DocumentBody::from_text(&token::PARAGRAPH.to_string());
    if let Some(current) = body
        .paragraph_marker_for(range.start_offset)
        .and_then(|m| body.paragraph_at(m))
        && let Some(fresh) = content.paragraphs.first_mut()
    {
        *fresh = Paragraph {
            start_index: 0,
            ..current.clone()
        };
    }
    insert(body, &range, content)
}

/// Overwrite formatting over each range. Collapsed ranges contribute nothing.
pub fn update_formatting(
    body: &DocumentBody,
    ranges: &[TextRange],
    request: &FormatRequest,
) -> Result<Option<EditPlan>, CommandError> {
    let mut actions = ActionList::new();
    let mut segment_id = String::new();
    for r in ranges {
        let r = r.normalized();
        check_bounds(body, &r)?;
        segment_id.clone_from(&r.segment_id);
        let (start, end) = (r.start_offset, r.end_offset);

        if let Some(style) = &request.style
            && !r.is_collapsed()
        {
            let patch = FormatPatch::text_style(request.cover_type, style.clone(), end - start);
            let step = ActionList::new().retain(start).retain_formatted(end - start, patch)?;
            actions = compose(&actions, &step)?;
        }

        if request.paragraph_style.is_some() || request.bullet.is_some() {
            let last = if r.is_collapsed() { start } else { end - 1 };
            let Some(first_marker) = body.paragraph_marker_for(start) else {
                continue;
            };
            let last_marker = body.paragraph_marker_for(last).unwrap_or(first_marker);
            let para_start = body
                .previous_paragraph_marker(start)
                .map_or(0, |m| m + 1)
                .min(first_marker);
            let entries = body
                .paragraphs
                .iter()
                .filter(|p| (first_marker..=last_marker).contains(&p.start_index))
                .map(|p| Paragraph {
                    start_index: p.start_index - para_start,
                    paragraph_style: request.paragraph_style.clone(),
                    bullet: request.bullet.clone(),
                })
                .collect();
            let span = last_marker + 1 - para_start;
            let patch = FormatPatch::paragraph_entries(request.cover_type, entries);
            let step = ActionList::new().retain(para_start).retain_formatted(span, patch)?;
            actions = compose(&actions, &step)?;
        }
    }
    if actions.is_identity() {
        return Ok(None);
    }
    Ok(Some(EditPlan {
        actions: actions.with_segment(&segment_id),
        ranges: ranges.iter().map(TextRange::normalized).collect(),
    }))
}
