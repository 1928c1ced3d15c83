//! Rich-text document body: a flat data stream annotated with text runs,
//! paragraph markers and custom ranges.
//!
//! Offsets and lengths throughout are counted in Unicode scalar values
//! (`char`), never bytes. Byte translation happens only at the `String`
//! boundary inside this module.
//!
//! Body invariants (checked by [`DocumentBody::validate`]):
//! - text runs are half-open `[start, end)`, non-empty, ordered, non-overlapping
//!   and inside the stream;
//! - every paragraph marker (`\r`) has exactly one paragraph entry whose
//!   `start_index` is the marker offset, and entries are strictly increasing;
//! - a custom range's `start_index`/`end_index` point at its start/end marker.
//!
//! Surgery helpers (`insert_body`, `delete_range`, `slice`) keep those
//! invariants and reindex metadata. They are the primitives the mutation
//! applier walks an action list with.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod style;
pub use style::{Bullet, HorizontalAlign, ParagraphStyle, TextStyle, merge_paragraph_style};

/// Control characters embedded in the data stream.
pub mod token {
    /// Ends a paragraph; the paragraph entry sits at this offset.
    pub const PARAGRAPH: char = '\r';
    pub const SECTION_BREAK: char = '\n';
    pub const CUSTOM_RANGE_START: char = '\u{1F}';
    pub const CUSTOM_RANGE_END: char = '\u{1E}';
    /// Placeholder for an embedded block (image, drawing).
    pub const CUSTOM_BLOCK: char = '\u{08}';

    pub fn is_custom_range_marker(c: char) -> bool {
        c == CUSTOM_RANGE_START || c == CUSTOM_RANGE_END
    }

    /// Tokens that carry structure rather than visible text.
    pub fn is_control(c: char) -> bool {
        matches!(
            c,
            PARAGRAPH | SECTION_BREAK | CUSTOM_RANGE_START | CUSTOM_RANGE_END | CUSTOM_BLOCK
        )
    }
}

/// A formatting run over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub style: TextStyle,
}

impl TextRun {
    pub fn new(start: usize, end: usize, style: TextStyle) -> Self {
        Self { start, end, style }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    fn shifted(&self, by: usize) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
            style: self.style.clone(),
        }
    }
}

/// Paragraph metadata keyed by the offset of its `\r` marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub start_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_style: Option<ParagraphStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet: Option<Bullet>,
}

impl Paragraph {
    pub fn at(start_index: usize) -> Self {
        Self {
            start_index,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomRangeType {
    Hyperlink,
    Mention,
    Comment,
    Custom,
}

/// A bracketed span; both indices point at marker characters (inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRange {
    pub start_index: usize,
    pub end_index: usize,
    pub range_id: String,
    pub range_type: CustomRangeType,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BodyError {
    #[error("text run [{start}, {end}) is outside a stream of length {len}")]
    RunOutOfBounds { start: usize, end: usize, len: usize },
    #[error("text runs are empty, overlapping or unordered at offset {at}")]
    RunOrder { at: usize },
    #[error("paragraph at {index} is outside a stream of length {len}")]
    ParagraphOutOfBounds { index: usize, len: usize },
    #[error("paragraph entry at {index} does not sit on a paragraph marker")]
    ParagraphNotOnMarker { index: usize },
    #[error("paragraph marker at {index} has no paragraph entry")]
    MissingParagraph { index: usize },
    #[error("paragraph indices are not strictly increasing at {index}")]
    ParagraphOrder { index: usize },
    #[error("custom range {range_id:?} does not point at a matching marker pair")]
    CustomRangeMarkers { range_id: String },
}

/// The document content owned by a document model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBody {
    pub data_stream: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_runs: Vec<TextRun>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_ranges: Vec<CustomRange>,
}

impl DocumentBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a body from plain text. Every `\r` receives a default paragraph entry.
    pub fn from_text(text: &str) -> Self {
        let paragraphs = text
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == token::PARAGRAPH)
            .map(|(i, _)| Paragraph::at(i))
            .collect();
        Self {
            data_stream: text.to_string(),
            paragraphs,
            ..Self::default()
        }
    }

    /// Plain text with a single run covering all of it.
    pub fn styled(text: &str, style: TextStyle) -> Self {
        let mut body = Self::from_text(text);
        let len = body.len();
        if len > 0 && !style.is_empty() {
            body.text_runs.push(TextRun::new(0, len, style));
        }
        body
    }

    /// Length of the data stream in characters.
    pub fn len(&self) -> usize {
        char_len(&self.data_stream)
    }

    pub fn is_empty(&self) -> bool {
        self.data_stream.is_empty()
    }

    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.data_stream.chars().nth(offset)
    }

    /// Text in `[start, end)` (clamped).
    pub fn text(&self, start: usize, end: usize) -> &str {
        char_slice(&self.data_stream, start, end)
    }

    /// Style of the run covering `offset`, if any.
    pub fn style_at(&self, offset: usize) -> Option<&TextStyle> {
        self.text_runs
            .iter()
            .find(|r| r.start <= offset && offset < r.end)
            .map(|r| &r.style)
    }

    /// Paragraph entry whose marker sits exactly at `index`.
    pub fn paragraph_at(&self, index: usize) -> Option<&Paragraph> {
        self.paragraphs
            .binary_search_by_key(&index, |p| p.start_index)
            .ok()
            .map(|i| &self.paragraphs[i])
    }

    pub fn paragraph_at_mut(&mut self, index: usize) -> Option<&mut Paragraph> {
        match self.paragraphs.binary_search_by_key(&index, |p| p.start_index) {
            Ok(i) => Some(&mut self.paragraphs[i]),
            Err(_) => None,
        }
    }

    /// Marker offset of the paragraph containing `offset` (first marker at or after it).
    pub fn paragraph_marker_for(&self, offset: usize) -> Option<usize> {
        self.paragraphs
            .iter()
            .map(|p| p.start_index)
            .find(|&i| i >= offset)
    }

    /// Marker offset of the paragraph that ends before `offset`.
    pub fn previous_paragraph_marker(&self, offset: usize) -> Option<usize> {
        self.paragraphs
            .iter()
            .rev()
            .map(|p| p.start_index)
            .find(|&i| i < offset)
    }

    /// Custom range owning the marker at `index` (either side).
    pub fn custom_range_with_marker(&self, index: usize) -> Option<&CustomRange> {
        self.custom_ranges
            .iter()
            .find(|r| r.start_index == index || r.end_index == index)
    }

    /// Check the body invariants listed in the module docs.
    pub fn validate(&self) -> Result<(), BodyError> {
        let chars: Vec<char> = self.data_stream.chars().collect();
        let len = chars.len();

        let mut prev_end = 0usize;
        for (i, run) in self.text_runs.iter().enumerate() {
            if run.end > len {
                return Err(BodyError::RunOutOfBounds {
                    start: run.start,
                    end: run.end,
                    len,
                });
            }
            if run.is_empty() || (i > 0 && run.start < prev_end) {
                return Err(BodyError::RunOrder { at: run.start });
            }
            prev_end = run.end;
        }

        let mut prev: Option<usize> = None;
        for p in &self.paragraphs {
            let index = p.start_index;
            if index >= len {
                return Err(BodyError::ParagraphOutOfBounds { index, len });
            }
            if prev.is_some_and(|prev| index <= prev) {
                return Err(BodyError::ParagraphOrder { index });
            }
            if chars[index] != token::PARAGRAPH {
                return Err(BodyError::ParagraphNotOnMarker { index });
            }
            prev = Some(index);
        }
        for (index, c) in chars.iter().enumerate() {
            if *c == token::PARAGRAPH && self.paragraph_at(index).is_none() {
                return Err(BodyError::MissingParagraph { index });
            }
        }

        for range in &self.custom_ranges {
            let ok = range.start_index < range.end_index
                && range.end_index < len
                && chars[range.start_index] == token::CUSTOM_RANGE_START
                && chars[range.end_index] == token::CUSTOM_RANGE_END;
            if !ok {
                return Err(BodyError::CustomRangeMarkers {
                    range_id: range.range_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Copy of `[start, end)` with all metadata offset to start at 0.
    ///
    /// Runs are clipped to the slice; paragraphs whose marker falls inside are
    /// kept; custom ranges are kept only when both markers fall inside.
    pub fn slice(&self, start: usize, end: usize) -> DocumentBody {
        let end = end.min(self.len());
        if start >= end {
            return DocumentBody::default();
        }
        let text_runs = self
            .text_runs
            .iter()
            .filter(|r| r.start < end && r.end > start)
            .map(|r| TextRun::new(r.start.max(start) - start, r.end.min(end) - start, r.style.clone()))
            .collect();
        let paragraphs = self
            .paragraphs
            .iter()
            .filter(|p| (start..end).contains(&p.start_index))
            .map(|p| Paragraph {
                start_index: p.start_index - start,
                ..p.clone()
            })
            .collect();
        let custom_ranges = self
            .custom_ranges
            .iter()
            .filter(|r| r.start_index >= start && r.end_index < end)
            .map(|r| CustomRange {
                start_index: r.start_index - start,
                end_index: r.end_index - start,
                ..r.clone()
            })
            .collect();
        DocumentBody {
            data_stream: self.text(start, end).to_string(),
            text_runs,
            paragraphs,
            custom_ranges,
        }
    }

    /// Splice `other` in at `at`, shifting metadata at or after the insertion point.
    ///
    /// A run straddling `at` is split around the inserted content; the inserted
    /// characters carry exactly `other`'s runs. A custom range with
    /// `start_index < at <= end_index` grows to enclose the insertion.
    pub fn insert_body(&mut self, at: usize, other: &DocumentBody) {
        let n = other.len();
        if n == 0 {
            return;
        }
        let byte = char_to_byte(&self.data_stream, at);
        self.data_stream.insert_str(byte, &other.data_stream);

        let mut runs = Vec::with_capacity(self.text_runs.len() + other.text_runs.len() + 1);
        for run in self.text_runs.drain(..) {
            if run.end <= at {
                runs.push(run);
            } else if run.start >= at {
                runs.push(run.shifted(n));
            } else {
                runs.push(TextRun::new(run.start, at, run.style.clone()));
                runs.push(TextRun::new(at + n, run.end + n, run.style));
            }
        }
        runs.extend(other.text_runs.iter().map(|r| r.shifted(at)));
        normalize_runs(&mut runs);
        self.text_runs = runs;

        for p in &mut self.paragraphs {
            if p.start_index >= at {
                p.start_index += n;
            }
        }
        self.paragraphs.extend(other.paragraphs.iter().map(|p| Paragraph {
            start_index: p.start_index + at,
            ..p.clone()
        }));
        self.paragraphs.sort_by_key(|p| p.start_index);

        for r in &mut self.custom_ranges {
            if r.start_index >= at {
                r.start_index += n;
                r.end_index += n;
            } else if r.end_index >= at {
                r.end_index += n;
            }
        }
        self.custom_ranges
            .extend(other.custom_ranges.iter().map(|r| CustomRange {
                start_index: r.start_index + at,
                end_index: r.end_index + at,
                ..r.clone()
            }));
        self.custom_ranges.sort_by_key(|r| r.start_index);
    }

    /// Remove `[start, end)`, dropping metadata that lived inside and shifting the rest.
    ///
    /// A custom range that loses either marker is dropped. The mutation
    /// applier expands deletes so that this only happens for both markers.
    pub fn delete_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.len());
        if start >= end {
            return;
        }
        let n = end - start;
        let b0 = char_to_byte(&self.data_stream, start);
        let b1 = char_to_byte(&self.data_stream, end);
        self.data_stream.replace_range(b0..b1, "");

        let mut runs = Vec::with_capacity(self.text_runs.len());
        for run in self.text_runs.drain(..) {
            if run.start < start {
                runs.push(TextRun::new(run.start, run.end.min(start), run.style.clone()));
            }
            if run.end > end {
                runs.push(TextRun::new(run.start.max(end) - n, run.end - n, run.style));
            }
        }
        normalize_runs(&mut runs);
        self.text_runs = runs;

        self.paragraphs
            .retain(|p| !(start..end).contains(&p.start_index));
        for p in &mut self.paragraphs {
            if p.start_index >= end {
                p.start_index -= n;
            }
        }

        self.custom_ranges.retain(|r| {
            !(start..end).contains(&r.start_index) && !(start..end).contains(&r.end_index)
        });
        for r in &mut self.custom_ranges {
            if r.start_index >= end {
                r.start_index -= n;
                r.end_index -= n;
            } else if r.end_index >= end {
                r.end_index -= n;
            }
        }
    }

    /// Append `other` at the end of this body.
    pub fn concat(&mut self, other: &DocumentBody) {
        let at = self.len();
        self.insert_body(at, other);
    }

    /// Canonicalize metadata ordering and runs (see [`normalize_runs`]).
    pub fn normalize(&mut self) {
        normalize_runs(&mut self.text_runs);
        self.paragraphs.sort_by_key(|p| p.start_index);
        self.paragraphs.dedup_by_key(|p| p.start_index);
        self.custom_ranges.sort_by_key(|r| r.start_index);
    }
}

/// Sort runs, drop empty ones (zero length or empty style) and coalesce
/// adjacent runs that carry equal styles.
pub fn normalize_runs(runs: &mut Vec<TextRun>) {
    runs.retain(|r| !r.is_empty() && !r.style.is_empty());
    runs.sort_by_key(|r| r.start);
    let mut out: Vec<TextRun> = Vec::with_capacity(runs.len());
    for run in runs.drain(..) {
        match out.last_mut() {
            Some(prev) if prev.end == run.start && prev.style == run.style => prev.end = run.end,
            _ => out.push(run),
        }
    }
    *runs = out;
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `char_idx`-th character (clamped to `s.len()`).
pub fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Substring between two character offsets (clamped).
pub fn char_slice(s: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let b0 = char_to_byte(s, start);
    let b1 = char_to_byte(s, end);
    &s[b0..b1]
}

/// Grapheme cluster boundaries expressed in character offsets.
pub mod grapheme {
    use unicode_segmentation::UnicodeSegmentation;

    /// Previous grapheme boundary (0 if already at or before the first one).
    pub fn prev_boundary(text: &str, offset: usize) -> usize {
        let mut last = 0;
        let mut at = 0;
        for g in text.graphemes(true) {
            if at >= offset {
                break;
            }
            last = at;
            at += g.chars().count();
        }
        last
    }

    /// Next grapheme boundary (the text length if at or beyond the end).
    pub fn next_boundary(text: &str, offset: usize) -> usize {
        let mut at = 0;
        for g in text.graphemes(true) {
            at += g.chars().count();
            if at > offset {
                return at;
            }
        }
        at
    }
}
