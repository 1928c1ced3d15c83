//! Inverse of an action list against the body it was applied to.

use core_text::DocumentBody;

use crate::action::{Action, ActionList, Delete, Insert, Retain};
use crate::error::{ApplyError, LengthMismatchError};
use crate::expand::expand_custom_range_deletes;
use crate::format::FormatPatch;

/// The list that takes `apply(original, actions)` back to `original`.
///
/// `original` must be the body as it was before `actions` ran.
pub fn invert(actions: &ActionList, original: &DocumentBody) -> Result<ActionList, ApplyError> {
    actions.segment()?;
    let expanded = expand_custom_range_deletes(original, actions)?;
    Ok(invert_expanded(&expanded, original)?)
}

/// Invert a list whose deletes are already widened over custom ranges.
pub(crate) fn invert_expanded(
    actions: &ActionList,
    original: &DocumentBody,
) -> Result<ActionList, LengthMismatchError> {
    let len = original.len();
    let consumed = actions.consumed_len();
    if consumed > len {
        return Err(LengthMismatchError { consumed, len });
    }

    let mut out = ActionList::new();
    let mut cursor = 0usize;
    for action in actions {
        match action {
            Action::Retain(r) => {
                let inverse = match &r.format {
                    Some(format) => Retain {
                        len: r.len,
                        segment_id: r.segment_id.clone(),
                        format: Some(FormatPatch::capture(original, cursor, r.len, format)),
                    },
                    None => r.clone(),
                };
                out.push(inverse);
                cursor += r.len;
            }
            Action::Insert(i) => out.push(Delete {
                len: i.len(),
                segment_id: i.segment_id.clone(),
            }),
            Action::Delete(d) => {
                let removed = original.slice(cursor, cursor + d.len);
                out.push(Insert::from_valid(removed).in_segment(d.segment_id.as_str()));
                cursor += d.len;
            }
        }
    }
    Ok(out.normalized())
}
