//! Edit actions and canonical action lists.
//!
//! An [`ActionList`] walks the source stream with one cursor: `Retain` and
//! `Delete` consume source characters, `Insert` and `Retain` produce output
//! characters. Whatever the list does not consume is an implicit trailing
//! retain.
//!
//! Lists built through [`ActionList::push`] stay canonical: no zero-length
//! actions, neighbours of the same kind merged where their payloads allow
//! it, and an `Insert` always placed before an adjacent `Delete` (the two
//! orders are equivalent, so only one is kept).

use core_text::{DocumentBody, Paragraph, TextRun, char_len};
use serde::{Deserialize, Serialize};

use crate::error::MalformedActionError;
use crate::format::{CoverType, FormatPatch, ParagraphPatch, RunPatch};

/// Segment id of the main document body.
pub const MAIN_SEGMENT: &str = "";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retain {
    pub len: usize,
    pub segment_id: String,
    pub format: Option<FormatPatch>,
}

impl Retain {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            segment_id: MAIN_SEGMENT.to_string(),
            format: None,
        }
    }

    /// Retain that overwrites formatting. The patch may not reach past `len`.
    pub fn formatted(len: usize, format: FormatPatch) -> Result<Self, MalformedActionError> {
        let extent = format.extent();
        if extent > len {
            return Err(MalformedActionError::FormatOutOfSpan { extent, len });
        }
        Ok(Self {
            len,
            segment_id: MAIN_SEGMENT.to_string(),
            format: (!format.is_empty()).then_some(format),
        })
    }

    pub fn in_segment(mut self, segment_id: impl Into<String>) -> Self {
        self.segment_id = segment_id.into();
        self
    }

    pub fn is_plain(&self) -> bool {
        self.format.is_none()
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> Retain {
        Retain {
            len: end - start,
            segment_id: self.segment_id.clone(),
            format: self.format.as_ref().map(|f| f.slice(start, end)),
        }
    }

    /// The retain equivalent to `self` followed by `next` over the same span.
    pub(crate) fn then(&self, next: &Retain) -> Retain {
        let format = match (&self.format, &next.format) {
            (None, b) => b.clone(),
            (a, None) => a.clone(),
            (Some(a), Some(b)) => Some(a.then(b, self.len)),
        };
        Retain {
            len: self.len,
            segment_id: self.segment_id.clone(),
            format,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    body: DocumentBody,
    /// Cached character length of `body.data_stream`.
    len: usize,
    pub segment_id: String,
}

impl Insert {
    /// Insert `body`, checking it against the body invariants.
    pub fn new(body: DocumentBody) -> Result<Self, MalformedActionError> {
        body.validate()?;
        Ok(Self::from_valid(body))
    }

    /// Insert with a declared length that must match the body's character count.
    pub fn with_len(len: usize, body: DocumentBody) -> Result<Self, MalformedActionError> {
        let actual = char_len(&body.data_stream);
        if len != actual {
            return Err(MalformedActionError::InsertLength {
                declared: len,
                actual,
            });
        }
        Self::new(body)
    }

    /// Unstyled text; every `\r` gets a default paragraph entry.
    pub fn text(text: &str) -> Self {
        Self::from_valid(DocumentBody::from_text(text))
    }

    pub(crate) fn from_valid(body: DocumentBody) -> Self {
        Self {
            len: char_len(&body.data_stream),
            body,
            segment_id: MAIN_SEGMENT.to_string(),
        }
    }

    pub fn in_segment(mut self, segment_id: impl Into<String>) -> Self {
        self.segment_id = segment_id.into();
        self
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn body(&self) -> &DocumentBody {
        &self.body
    }

    pub fn into_body(self) -> DocumentBody {
        self.body
    }

    fn slice(&self, start: usize, end: usize) -> Insert {
        Insert {
            body: self.body.slice(start, end),
            len: end - start,
            segment_id: self.segment_id.clone(),
        }
    }

    /// The inserted content after `actions`, which walk this insert's
    /// characters as their source, have run over it.
    pub(crate) fn edited_by(&self, actions: &[Action]) -> Insert {
        let mut body = self.body.clone();
        let mut cursor = 0usize;
        for action in actions {
            match action {
                Action::Retain(r) => {
                    if let Some(format) = &r.format {
                        format.apply_to(&mut body, cursor, r.len);
                    }
                    cursor += r.len;
                }
                Action::Insert(i) => {
                    body.insert_body(cursor, &i.body);
                    cursor += i.len;
                }
                Action::Delete(d) => body.delete_range(cursor, cursor + d.len),
            }
        }
        Insert::from_valid(body).in_segment(self.segment_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub len: usize,
    pub segment_id: String,
}

impl Delete {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            segment_id: MAIN_SEGMENT.to_string(),
        }
    }

    pub fn in_segment(mut self, segment_id: impl Into<String>) -> Self {
        self.segment_id = segment_id.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAction", into = "RawAction")]
pub enum Action {
    Retain(Retain),
    Insert(Insert),
    Delete(Delete),
}

impl Action {
    pub fn len(&self) -> usize {
        match self {
            Action::Retain(r) => r.len,
            Action::Insert(i) => i.len,
            Action::Delete(d) => d.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn segment_id(&self) -> &str {
        match self {
            Action::Retain(r) => &r.segment_id,
            Action::Insert(i) => &i.segment_id,
            Action::Delete(d) => &d.segment_id,
        }
    }

    fn set_segment(&mut self, segment_id: &str) {
        let slot = match self {
            Action::Retain(r) => &mut r.segment_id,
            Action::Insert(i) => &mut i.segment_id,
            Action::Delete(d) => &mut d.segment_id,
        };
        segment_id.clone_into(slot);
    }

    /// Split into `[0, at)` and `[at, len)`. `at` must lie strictly inside.
    pub fn split_at(&self, at: usize) -> (Action, Action) {
        debug_assert!(at > 0 && at < self.len());
        match self {
            Action::Retain(r) => (
                Action::Retain(r.slice(0, at)),
                Action::Retain(r.slice(at, r.len)),
            ),
            Action::Insert(i) => (
                Action::Insert(i.slice(0, at)),
                Action::Insert(i.slice(at, i.len)),
            ),
            Action::Delete(d) => (
                Action::Delete(Delete {
                    len: at,
                    segment_id: d.segment_id.clone(),
                }),
                Action::Delete(Delete {
                    len: d.len - at,
                    segment_id: d.segment_id.clone(),
                }),
            ),
        }
    }

    fn consumes(&self) -> usize {
        match self {
            Action::Retain(r) => r.len,
            Action::Delete(d) => d.len,
            Action::Insert(_) => 0,
        }
    }

    fn produces(&self) -> usize {
        match self {
            Action::Retain(r) => r.len,
            Action::Insert(i) => i.len,
            Action::Delete(_) => 0,
        }
    }
}

impl From<Retain> for Action {
    fn from(r: Retain) -> Self {
        Action::Retain(r)
    }
}

impl From<Insert> for Action {
    fn from(i: Insert) -> Self {
        Action::Insert(i)
    }
}

impl From<Delete> for Action {
    fn from(d: Delete) -> Self {
        Action::Delete(d)
    }
}

/// Formatting payload of a retain on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatchBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_runs: Option<Vec<TextRun>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    paragraphs: Option<Vec<Paragraph>>,
}

/// JSON shape: `{"t": "retain" | "insert" | "delete", "len": .., ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "lowercase")]
enum RawAction {
    #[serde(rename_all = "camelCase")]
    Retain {
        len: usize,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        segment_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cover_type: Option<CoverType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        paragraph_cover_type: Option<CoverType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<PatchBody>,
    },
    #[serde(rename_all = "camelCase")]
    Insert {
        len: usize,
        body: DocumentBody,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        segment_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Delete {
        len: usize,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        segment_id: String,
    },
}

impl TryFrom<RawAction> for Action {
    type Error = MalformedActionError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawAction::Retain {
                len,
                segment_id,
                cover_type,
                paragraph_cover_type,
                body,
            } => {
                let retain = match body {
                    None => Retain::new(len),
                    Some(body) => {
                        let text_cover = cover_type.unwrap_or_default();
                        let para_cover = paragraph_cover_type.unwrap_or(text_cover);
                        let patch = FormatPatch {
                            text: body.text_runs.map(|mut runs| {
                                core_text::normalize_runs(&mut runs);
                                RunPatch {
                                    cover_type: text_cover,
                                    runs,
                                }
                            }),
                            paragraphs: body.paragraphs.map(|paragraphs| ParagraphPatch {
                                cover_type: para_cover,
                                paragraphs,
                            }),
                        };
                        Retain::formatted(len, patch)?
                    }
                };
                Action::Retain(retain.in_segment(segment_id))
            }
            RawAction::Insert {
                len,
                body,
                segment_id,
            } => Action::Insert(Insert::with_len(len, body)?.in_segment(segment_id)),
            RawAction::Delete { len, segment_id } => {
                Action::Delete(Delete::new(len).in_segment(segment_id))
            }
        })
    }
}

impl From<Action> for RawAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Retain(r) => {
                let (cover_type, paragraph_cover_type, body) = match r.format {
                    None => (None, None, None),
                    Some(f) => {
                        let text_cover = f.text.as_ref().map(|t| t.cover_type);
                        let para_cover = f.paragraphs.as_ref().map(|p| p.cover_type);
                        let cover = text_cover.or(para_cover);
                        let para_override = para_cover.filter(|c| Some(*c) != cover);
                        let body = PatchBody {
                            text_runs: f.text.map(|t| t.runs),
                            paragraphs: f.paragraphs.map(|p| p.paragraphs),
                        };
                        (cover, para_override, Some(body))
                    }
                };
                RawAction::Retain {
                    len: r.len,
                    segment_id: r.segment_id,
                    cover_type,
                    paragraph_cover_type,
                    body,
                }
            }
            Action::Insert(i) => RawAction::Insert {
                len: i.len,
                body: i.body,
                segment_id: i.segment_id,
            },
            Action::Delete(d) => RawAction::Delete {
                len: d.len,
                segment_id: d.segment_id,
            },
        }
    }
}

/// Which side of an insertion a mapped offset sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Left,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Action>", into = "Vec<Action>")]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain(mut self, len: usize) -> Self {
        self.push(Retain::new(len));
        self
    }

    pub fn retain_formatted(
        mut self,
        len: usize,
        format: FormatPatch,
    ) -> Result<Self, MalformedActionError> {
        self.push(Retain::formatted(len, format)?);
        Ok(self)
    }

    pub fn insert(mut self, insert: Insert) -> Self {
        self.push(insert);
        self
    }

    pub fn insert_text(self, text: &str) -> Self {
        self.insert(Insert::text(text))
    }

    pub fn delete(mut self, len: usize) -> Self {
        self.push(Delete::new(len));
        self
    }

    /// Append an action, keeping the list canonical.
    pub fn push(&mut self, action: impl Into<Action>) {
        let action = action.into();
        if action.is_empty() {
            return;
        }
        let before_delete = matches!(action, Action::Insert(_))
            && matches!(self.actions.last(), Some(Action::Delete(d)) if d.segment_id == action.segment_id());
        if before_delete && let Some(delete) = self.actions.pop() {
            self.push(action);
            self.actions.push(delete);
            return;
        }
        if !self.absorb(&action) {
            self.actions.push(action);
        }
    }

    /// Fold `next` into the last action when both can be expressed as one.
    fn absorb(&mut self, next: &Action) -> bool {
        let Some(last) = self.actions.last_mut() else {
            return false;
        };
        if last.segment_id() != next.segment_id() {
            return false;
        }
        match (last, next) {
            (Action::Delete(prev), Action::Delete(next)) => {
                prev.len += next.len;
                true
            }
            (Action::Insert(prev), Action::Insert(next)) => {
                prev.body.concat(&next.body);
                prev.len += next.len;
                true
            }
            (Action::Retain(prev), Action::Retain(next)) => match (&prev.format, &next.format) {
                (None, None) => {
                    prev.len += next.len;
                    true
                }
                (Some(a), Some(b)) => match a.concat(prev.len, b) {
                    Some(joined) => {
                        prev.format = Some(joined);
                        prev.len += next.len;
                        true
                    }
                    None => false,
                },
                _ => false,
            },
            _ => false,
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Source characters consumed by `Retain` and `Delete`.
    pub fn consumed_len(&self) -> usize {
        self.actions.iter().map(Action::consumes).sum()
    }

    /// Output characters produced by `Retain` and `Insert`, excluding the implicit tail.
    pub fn produced_len(&self) -> usize {
        self.actions.iter().map(Action::produces).sum()
    }

    /// Length of the stream after applying to a source of `source_len` characters.
    pub fn output_len(&self, source_len: usize) -> usize {
        self.produced_len() + source_len.saturating_sub(self.consumed_len())
    }

    /// True when the list leaves every stream unchanged.
    pub fn is_identity(&self) -> bool {
        self.actions
            .iter()
            .all(|a| matches!(a, Action::Retain(r) if r.is_plain()))
    }

    /// The one segment every action addresses (the main body for an empty list).
    pub fn segment(&self) -> Result<&str, MalformedActionError> {
        let mut iter = self.actions.iter().map(Action::segment_id);
        let Some(first) = iter.next() else {
            return Ok(MAIN_SEGMENT);
        };
        match iter.find(|s| *s != first) {
            Some(found) => Err(MalformedActionError::MixedSegments {
                expected: first.to_string(),
                found: found.to_string(),
            }),
            None => Ok(first),
        }
    }

    /// Re-target every action at `segment_id`.
    pub fn with_segment(mut self, segment_id: &str) -> Self {
        for action in &mut self.actions {
            action.set_segment(segment_id);
        }
        self
    }

    /// Drop trailing unformatted retains; they equal the implicit tail.
    pub fn normalized(mut self) -> Self {
        while let Some(Action::Retain(r)) = self.actions.last()
            && r.is_plain()
        {
            self.actions.pop();
        }
        self
    }

    /// Explicit form: append a retain so the list consumes exactly `source_len`.
    pub fn with_trailing_retain(mut self, source_len: usize) -> Self {
        let consumed = self.consumed_len();
        if consumed < source_len {
            let segment = self
                .actions
                .first()
                .map(|a| a.segment_id().to_string())
                .unwrap_or_default();
            self.push(Retain::new(source_len - consumed).in_segment(segment));
        }
        self
    }

    /// Map a source offset to its position in the output stream.
    ///
    /// Offsets inside a deleted span collapse to the deletion point. An
    /// offset sitting exactly where text is inserted stays before the
    /// insertion with [`Bias::Left`] and moves past it with [`Bias::Right`].
    pub fn transform_offset(&self, offset: usize, bias: Bias) -> usize {
        let mut old = 0usize;
        let mut new = 0usize;
        for action in &self.actions {
            match action {
                Action::Retain(r) => {
                    if offset < old + r.len {
                        return new + (offset - old);
                    }
                    old += r.len;
                    new += r.len;
                }
                Action::Delete(d) => {
                    if offset < old + d.len {
                        return new;
                    }
                    old += d.len;
                }
                Action::Insert(i) => {
                    if offset == old && bias == Bias::Left {
                        return new;
                    }
                    new += i.len;
                }
            }
        }
        new + offset.saturating_sub(old)
    }
}

impl From<Vec<Action>> for ActionList {
    fn from(actions: Vec<Action>) -> Self {
        actions.into_iter().collect()
    }
}

impl From<ActionList> for Vec<Action> {
    fn from(list: ActionList) -> Self {
        list.actions
    }
}

impl FromIterator<Action> for ActionList {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut list = ActionList::new();
        for action in iter {
            list.push(action);
        }
        list
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl IntoIterator for ActionList {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::TextStyle;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_length_must_match_body() {
        let err = Insert::with_len(3, DocumentBody::from_text("ab")).unwrap_err();
        assert_eq!(
            err,
            MalformedActionError::InsertLength {
                declared: 3,
                actual: 2
            }
        );
        assert!(Insert::with_len(2, DocumentBody::from_text("ab")).is_ok());
    }

    #[test]
    fn insert_rejects_invalid_body() {
        let mut body = DocumentBody::from_text("a\r");
        body.paragraphs.clear();
        assert!(matches!(
            Insert::new(body),
            Err(MalformedActionError::InvalidInsertBody(_))
        ));
    }

    #[test]
    fn push_merges_neighbours_and_drops_empty() {
        let list = ActionList::new()
            .retain(1)
            .retain(2)
            .retain(0)
            .insert_text("a")
            .insert_text("b")
            .delete(1)
            .delete(2);
        assert_eq!(
            list.actions(),
            &[
                Action::Retain(Retain::new(3)),
                Action::Insert(Insert::text("ab")),
                Action::Delete(Delete::new(3)),
            ]
        );
    }

    #[test]
    fn insert_moves_before_adjacent_delete() {
        let list = ActionList::new().insert_text("x").delete(2).insert_text("y");
        assert_eq!(
            list.actions(),
            &[
                Action::Insert(Insert::text("xy")),
                Action::Delete(Delete::new(2)),
            ]
        );
    }

    #[test]
    fn normalized_trims_plain_tail_only() {
        let list = ActionList::new().retain(1).delete(1).retain(4).normalized();
        assert_eq!(list.consumed_len(), 2);
        let fmt = FormatPatch::text_style(CoverType::Merge, TextStyle::bold(), 4);
        let kept = ActionList::new()
            .retain_formatted(4, fmt)
            .unwrap()
            .normalized();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn trailing_retain_makes_length_explicit() {
        let list = ActionList::new().retain(1).insert_text("X").with_trailing_retain(3);
        assert_eq!(list.consumed_len(), 3);
        assert_eq!(list.produced_len(), 4);
    }

    #[test]
    fn retain_format_may_not_overrun() {
        let fmt = FormatPatch::text_style(CoverType::Merge, TextStyle::bold(), 5);
        assert_eq!(
            Retain::formatted(2, fmt),
            Err(MalformedActionError::FormatOutOfSpan { extent: 5, len: 2 })
        );
    }

    #[test]
    fn mixed_segments_are_reported() {
        let mut list = ActionList::new().retain(1);
        list.push(Delete::new(1).in_segment("header-1"));
        assert!(matches!(
            list.segment(),
            Err(MalformedActionError::MixedSegments { .. })
        ));
        let list = list.with_segment("header-1");
        assert_eq!(list.segment(), Ok("header-1"));
    }

    #[test]
    fn transform_offset_through_edits() {
        let list = ActionList::new().retain(2).insert_text("XY").delete(2);
        assert_eq!(list.transform_offset(1, Bias::Left), 1);
        assert_eq!(list.transform_offset(2, Bias::Left), 2);
        assert_eq!(list.transform_offset(2, Bias::Right), 4);
        assert_eq!(list.transform_offset(3, Bias::Right), 4);
        assert_eq!(list.transform_offset(5, Bias::Right), 5);
    }

    #[test]
    fn json_shape_round_trips() {
        let fmt = FormatPatch::text_style(CoverType::Replace, TextStyle::bold(), 2);
        let list = ActionList::new()
            .retain(1)
            .insert_text("X")
            .retain_formatted(2, fmt)
            .unwrap()
            .delete(1);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json[0], serde_json::json!({"t": "retain", "len": 1}));
        assert_eq!(json[1]["t"], "insert");
        assert_eq!(json[1]["body"]["dataStream"], "X");
        assert_eq!(json[2]["coverType"], "replace");
        assert_eq!(json[2]["body"]["textRuns"][0]["end"], 2);
        let back: ActionList = serde_json::from_value(json).unwrap();
        assert_eq!(back, list);
    }

    #[test]
    fn json_insert_with_wrong_length_is_rejected() {
        let json = serde_json::json!([{"t": "insert", "len": 4, "body": {"dataStream": "ab"}}]);
        assert!(serde_json::from_value::<ActionList>(json).is_err());
    }
}
