//! Symmetric deletion of custom-range markers.
//!
//! Deleting one marker of a registered custom range would leave its partner
//! orphaned. Such a delete is widened to the whole range, marker to marker,
//! and widening repeats until every registered range loses both markers or
//! neither. Marker characters that no range claims are ordinary text.

use core_text::DocumentBody;
use tracing::trace;

use crate::action::{Action, ActionList, Delete, Retain};
use crate::error::LengthMismatchError;

/// Return `actions` with deletes widened over partially deleted custom ranges.
pub fn expand_custom_range_deletes(
    body: &DocumentBody,
    actions: &ActionList,
) -> Result<ActionList, LengthMismatchError> {
    let len = body.len();
    let consumed = actions.consumed_len();
    if consumed > len {
        return Err(LengthMismatchError { consumed, len });
    }
    if body.custom_ranges.is_empty() {
        return Ok(actions.clone());
    }

    let mut deleted = vec![false; len];
    let mut cursor = 0usize;
    for action in actions {
        match action {
            Action::Retain(r) => cursor += r.len,
            Action::Delete(d) => {
                deleted[cursor..cursor + d.len].fill(true);
                cursor += d.len;
            }
            Action::Insert(_) => {}
        }
    }

    let mut widened = false;
    loop {
        let mut changed = false;
        for range in &body.custom_ranges {
            let (s, e) = (range.start_index, range.end_index);
            if e >= len || deleted[s] == deleted[e] {
                continue;
            }
            trace!(
                target: "ops.apply",
                range_id = %range.range_id,
                start = s,
                end = e,
                "delete widened over custom range"
            );
            deleted[s..=e].fill(true);
            changed = true;
        }
        if !changed {
            break;
        }
        widened = true;
    }
    if !widened {
        return Ok(actions.clone());
    }

    let segment = actions.segment().unwrap_or_default().to_string();
    let mut out = ActionList::new();
    let mut cursor = 0usize;
    for action in actions {
        match action {
            Action::Insert(_) => out.push(action.clone()),
            Action::Delete(d) => {
                out.push(d.clone());
                cursor += d.len;
            }
            Action::Retain(r) => {
                push_split_retain(&mut out, r, cursor, &deleted);
                cursor += r.len;
            }
        }
    }
    if cursor < len {
        let tail = Retain::new(len - cursor).in_segment(segment.as_str());
        push_split_retain(&mut out, &tail, cursor, &deleted);
    }
    Ok(out.normalized())
}

/// Push `retain` (which starts at source offset `at`) split into kept and deleted pieces.
fn push_split_retain(out: &mut ActionList, retain: &Retain, at: usize, deleted: &[bool]) {
    let mut start = 0usize;
    while start < retain.len {
        let flag = deleted[at + start];
        let mut end = start + 1;
        while end < retain.len && deleted[at + end] == flag {
            end += 1;
        }
        if flag {
            out.push(Delete {
                len: end - start,
                segment_id: retain.segment_id.clone(),
            });
        } else if start == 0 && end == retain.len {
            out.push(retain.clone());
        } else {
            out.push(retain.slice(start, end));
        }
        start = end;
    }
}
