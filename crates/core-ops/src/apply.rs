//! Mutation applier.

use core_text::DocumentBody;
use tracing::trace;

use crate::action::{Action, ActionList};
use crate::error::{ApplyError, LengthMismatchError};
use crate::expand::expand_custom_range_deletes;
use crate::invert::invert_expanded;

/// Result of a successful [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub body: DocumentBody,
    /// Applying this to `body` restores the input body.
    pub inverse: ActionList,
    /// The list that actually ran, after custom-range widening.
    pub effective: ActionList,
}

/// Apply `actions` to `body`, leaving `body` untouched.
///
/// The work happens on a copy, so a failure never exposes a half-edited
/// body. Fails with a length mismatch when the list consumes more than
/// `body` holds; the unconsumed tail is retained.
pub fn apply(body: &DocumentBody, actions: &ActionList) -> Result<Applied, ApplyError> {
    actions.segment()?;
    let len = body.len();
    let consumed = actions.consumed_len();
    if consumed > len {
        return Err(LengthMismatchError { consumed, len }.into());
    }

    let effective = expand_custom_range_deletes(body, actions)?;
    let inverse = invert_expanded(&effective, body)?;

    let mut next = body.clone();
    let mut cursor = 0usize;
    for action in &effective {
        match action {
            Action::Retain(r) => {
                if let Some(format) = &r.format {
                    format.apply_to(&mut next, cursor, r.len);
                }
                cursor += r.len;
            }
            Action::Insert(i) => {
                next.insert_body(cursor, i.body());
                cursor += i.len();
            }
            Action::Delete(d) => next.delete_range(cursor, cursor + d.len),
        }
    }

    trace!(
        target: "ops.apply",
        before = len,
        after = next.len(),
        actions = effective.len(),
        "applied action list"
    );
    Ok(Applied {
        body: next,
        inverse,
        effective,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Insert;
    use crate::format::{CoverType, FormatPatch};
    use core_text::{HorizontalAlign, Paragraph, ParagraphStyle, TextRun, TextStyle};
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_insert_scenario() {
        let body = DocumentBody::from_text("ab\r");
        let list = ActionList::new().retain(1).insert_text("X");
        let applied = apply(&body, &list).unwrap();
        assert_eq!(applied.body.data_stream, "aXb\r");
        assert_eq!(applied.body.paragraphs, vec![Paragraph::at(3)]);
        assert_eq!(applied.inverse, ActionList::new().retain(1).delete(1));
        let undone = apply(&applied.body, &applied.inverse).unwrap();
        assert_eq!(undone.body, body);
    }

    #[test]
    fn length_mismatch_leaves_input_alone() {
        let body = DocumentBody::from_text("ab\r");
        let list = ActionList::new().retain(3).delete(1);
        assert_eq!(
            apply(&body, &list),
            Err(ApplyError::LengthMismatch(LengthMismatchError { consumed: 4, len: 3 }))
        );
    }

    #[test]
    fn explicit_and_implicit_tail_agree() {
        let body = DocumentBody::from_text("abc\r");
        let list = ActionList::new().retain(1).delete(1);
        let implicit = apply(&body, &list).unwrap();
        let explicit = apply(&body, &list.clone().with_trailing_retain(body.len())).unwrap();
        assert_eq!(implicit.body, explicit.body);
        assert_eq!(explicit.effective.consumed_len(), body.len());
    }

    #[test]
    fn merge_paragraphs_keeps_first_style_and_undo_restores_both() {
        let mut body = DocumentBody::from_text("ab\rcd\r");
        body.paragraphs[0].paragraph_style = Some(ParagraphStyle {
            horizontal_align: Some(HorizontalAlign::Center),
            ..ParagraphStyle::default()
        });
        body.paragraphs[1].paragraph_style = Some(ParagraphStyle {
            horizontal_align: Some(HorizontalAlign::Right),
            ..ParagraphStyle::default()
        });
        let mut tail = body.slice(3, 6);
        tail.paragraphs[0].paragraph_style = body.paragraphs[0].paragraph_style.clone();
        let list = ActionList::new()
            .retain(2)
            .insert(Insert::new(tail).unwrap())
            .delete(4);
        let applied = apply(&body, &list).unwrap();
        assert_eq!(applied.body.data_stream, "abcd\r");
        assert_eq!(
            applied.body.paragraphs[0].paragraph_style,
            body.paragraphs[0].paragraph_style
        );
        let undone = apply(&applied.body, &applied.inverse).unwrap();
        assert_eq!(undone.body, body);
    }

    #[test]
    fn replace_format_over_span_and_back() {
        let body = DocumentBody::styled("abcd\r", TextStyle::italic());
        let fmt = FormatPatch::text_style(CoverType::Replace, TextStyle::bold(), 2);
        let list = ActionList::new().retain(1).retain_formatted(2, fmt).unwrap();
        let applied = apply(&body, &list).unwrap();
        assert_eq!(
            applied.body.text_runs,
            vec![
                TextRun::new(0, 1, TextStyle::italic()),
                TextRun::new(1, 3, TextStyle::bold()),
                TextRun::new(3, 5, TextStyle::italic()),
            ]
        );
        assert_eq!(apply(&applied.body, &applied.inverse).unwrap().body, body);
    }

    #[test]
    fn mixed_segment_list_is_malformed() {
        let body = DocumentBody::from_text("ab\r");
        let mut list = ActionList::new().retain(1);
        list.push(crate::action::Delete::new(1).in_segment("header"));
        assert!(matches!(apply(&body, &list), Err(ApplyError::Malformed(_))));
    }
}
