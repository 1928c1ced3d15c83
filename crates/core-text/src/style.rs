//! Character and paragraph style records.
//!
//! Every field is optional: an absent key means "not set here". Merging a
//! patch into a style overwrites only the keys the patch sets, which is what
//! the MERGE cover type of a formatting retain relies on.

use serde::{Deserialize, Serialize};

/// Character-level formatting attached to a text run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    /// Font size in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// CSS-like color string (`#rrggbb`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl TextStyle {
    pub fn bold() -> Self {
        Self {
            bold: Some(true),
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: Some(true),
            ..Self::default()
        }
    }

    /// True when no key is set. Runs carrying an empty style are dropped on normalization.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overwrite every key that `patch` sets.
    pub fn merge(&mut self, patch: &TextStyle) {
        merge_field(&mut self.bold, &patch.bold);
        merge_field(&mut self.italic, &patch.italic);
        merge_field(&mut self.underline, &patch.underline);
        merge_field(&mut self.strikethrough, &patch.strikethrough);
        merge_field(&mut self.font_size, &patch.font_size);
        merge_field(&mut self.font_family, &patch.font_family);
        merge_field(&mut self.color, &patch.color);
        merge_field(&mut self.background, &patch.background);
    }

    pub fn merged(&self, patch: &TextStyle) -> TextStyle {
        let mut out = self.clone();
        out.merge(patch);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
    Justified,
}

/// Paragraph-level formatting stored on the paragraph marker entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_align: Option<HorizontalAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent_first_line: Option<u32>,
    /// Line spacing in hundredths (100 = single).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_above: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_below: Option<u32>,
}

impl ParagraphStyle {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn merge(&mut self, patch: &ParagraphStyle) {
        merge_field(&mut self.horizontal_align, &patch.horizontal_align);
        merge_field(&mut self.indent_start, &patch.indent_start);
        merge_field(&mut self.indent_first_line, &patch.indent_first_line);
        merge_field(&mut self.line_spacing, &patch.line_spacing);
        merge_field(&mut self.space_above, &patch.space_above);
        merge_field(&mut self.space_below, &patch.space_below);
    }
}

/// List membership of a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bullet {
    pub list_type: String,
    pub list_id: String,
    #[serde(default)]
    pub nesting_level: u32,
}

/// Merge an optional paragraph style patch into an optional base.
/// An absent patch leaves the base untouched.
pub fn merge_paragraph_style(
    base: Option<&ParagraphStyle>,
    patch: Option<&ParagraphStyle>,
) -> Option<ParagraphStyle> {
    match (base, patch) {
        (base, None) => base.cloned(),
        (None, Some(p)) => Some(p.clone()),
        (Some(b), Some(p)) => {
            let mut out = b.clone();
            out.merge(p);
            Some(out)
        }
    }
}

fn merge_field<T: Clone>(slot: &mut Option<T>, patch: &Option<T>) {
    if let Some(v) = patch {
        *slot = Some(v.clone());
    }
}
