//! Formatting overwrites carried by a `Retain`.
//!
//! A patch has two independent channels, text runs and paragraphs. A channel
//! that is absent leaves that kind of formatting untouched. A present channel
//! applies with its own cover type:
//!
//! * `Replace` makes the span's formatting equal to the patch. Characters the
//!   patch runs do not cover end up unstyled; paragraphs whose marker falls in
//!   the span but has no patch entry lose their style and bullet.
//! * `Merge` overlays the keys the patch sets and leaves the rest alone.
//!
//! All offsets inside a patch are relative to the start of the retain.

use core_text::{
    DocumentBody, Paragraph, TextRun, TextStyle, merge_paragraph_style, normalize_runs,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoverType {
    #[default]
    Merge,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPatch {
    pub cover_type: CoverType,
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphPatch {
    pub cover_type: CoverType,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatPatch {
    pub text: Option<RunPatch>,
    pub paragraphs: Option<ParagraphPatch>,
}

impl FormatPatch {
    /// One style over the whole `[0, len)` span.
    pub fn text_style(cover_type: CoverType, style: TextStyle, len: usize) -> Self {
        let mut runs = vec![TextRun::new(0, len, style)];
        normalize_runs(&mut runs);
        Self {
            text: Some(RunPatch { cover_type, runs }),
            paragraphs: None,
        }
    }

    pub fn paragraph_entries(cover_type: CoverType, mut paragraphs: Vec<Paragraph>) -> Self {
        paragraphs.sort_by_key(|p| p.start_index);
        paragraphs.dedup_by_key(|p| p.start_index);
        Self {
            text: None,
            paragraphs: Some(ParagraphPatch {
                cover_type,
                paragraphs,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.paragraphs.is_none()
    }

    /// One past the largest relative offset the patch references.
    pub fn extent(&self) -> usize {
        let runs = self
            .text
            .iter()
            .flat_map(|t| t.runs.iter().map(|r| r.end));
        let paras = self
            .paragraphs
            .iter()
            .flat_map(|p| p.paragraphs.iter().map(|e| e.start_index + 1));
        runs.chain(paras).max().unwrap_or(0)
    }

    /// Sub-patch for `[start, end)`, re-based to 0.
    pub fn slice(&self, start: usize, end: usize) -> FormatPatch {
        FormatPatch {
            text: self.text.as_ref().map(|t| RunPatch {
                cover_type: t.cover_type,
                runs: clip_runs(&t.runs, start, end),
            }),
            paragraphs: self.paragraphs.as_ref().map(|p| ParagraphPatch {
                cover_type: p.cover_type,
                paragraphs: clip_paragraphs(&p.paragraphs, start, end),
            }),
        }
    }

    /// Join with a patch that continues right after `self_len` characters.
    /// Returns `None` when channels or cover types differ.
    pub fn concat(&self, self_len: usize, other: &FormatPatch) -> Option<FormatPatch> {
        let text = match (&self.text, &other.text) {
            (None, None) => None,
            (Some(a), Some(b)) if a.cover_type == b.cover_type => {
                let mut runs = a.runs.clone();
                runs.extend(b.runs.iter().map(|r| {
                    TextRun::new(r.start + self_len, r.end + self_len, r.style.clone())
                }));
                normalize_runs(&mut runs);
                Some(RunPatch {
                    cover_type: a.cover_type,
                    runs,
                })
            }
            _ => return None,
        };
        let paragraphs = match (&self.paragraphs, &other.paragraphs) {
            (None, None) => None,
            (Some(a), Some(b)) if a.cover_type == b.cover_type => {
                let mut paragraphs = a.paragraphs.clone();
                paragraphs.extend(b.paragraphs.iter().map(|p| Paragraph {
                    start_index: p.start_index + self_len,
                    ..p.clone()
                }));
                Some(ParagraphPatch {
                    cover_type: a.cover_type,
                    paragraphs,
                })
            }
            _ => return None,
        };
        Some(FormatPatch { text, paragraphs })
    }

    /// Snapshot of `body`'s formatting over `[start, start + len)` as a
    /// `Replace` patch, for the channels that `like` touches. Applying the
    /// snapshot restores exactly what `like` overwrote.
    pub fn capture(body: &DocumentBody, start: usize, len: usize, like: &FormatPatch) -> FormatPatch {
        let end = start + len;
        FormatPatch {
            text: like.text.as_ref().map(|_| RunPatch {
                cover_type: CoverType::Replace,
                runs: clip_runs(&body.text_runs, start, end),
            }),
            paragraphs: like.paragraphs.as_ref().map(|_| ParagraphPatch {
                cover_type: CoverType::Replace,
                paragraphs: clip_paragraphs(&body.paragraphs, start, end),
            }),
        }
    }

    /// Overwrite the formatting of `body` over `[start, start + len)`.
    pub fn apply_to(&self, body: &mut DocumentBody, start: usize, len: usize) {
        let end = start + len;
        if let Some(text) = &self.text {
            let inside = clip_runs(&body.text_runs, start, end);
            let mut runs: Vec<TextRun> = Vec::with_capacity(body.text_runs.len() + 2);
            for run in &body.text_runs {
                if run.start < start {
                    runs.push(TextRun::new(run.start, run.end.min(start), run.style.clone()));
                }
                if run.end > end {
                    runs.push(TextRun::new(run.start.max(end), run.end, run.style.clone()));
                }
            }
            runs.extend(
                overlay_runs(&inside, &text.runs, len, text.cover_type)
                    .into_iter()
                    .map(|r| TextRun::new(r.start + start, r.end + start, r.style)),
            );
            normalize_runs(&mut runs);
            body.text_runs = runs;
        }
        if let Some(patch) = &self.paragraphs {
            for para in body
                .paragraphs
                .iter_mut()
                .filter(|p| (start..end).contains(&p.start_index))
            {
                let rel = para.start_index - start;
                let entry = patch.paragraphs.iter().find(|e| e.start_index == rel);
                match patch.cover_type {
                    CoverType::Replace => {
                        para.paragraph_style = entry.and_then(|e| e.paragraph_style.clone());
                        para.bullet = entry.and_then(|e| e.bullet.clone());
                    }
                    CoverType::Merge => {
                        if let Some(e) = entry {
                            merge_entry(para, e);
                        }
                    }
                }
            }
        }
    }

    /// Patch equivalent to applying `self` and then `next` over the same `len` span.
    pub fn then(&self, next: &FormatPatch, len: usize) -> FormatPatch {
        let text = match (&self.text, &next.text) {
            (None, b) => b.clone(),
            (a, None) => a.clone(),
            (Some(_), Some(b)) if b.cover_type == CoverType::Replace => Some(b.clone()),
            (Some(a), Some(b)) => Some(RunPatch {
                cover_type: a.cover_type,
                runs: overlay_runs(&a.runs, &b.runs, len, CoverType::Merge),
            }),
        };
        let paragraphs = match (&self.paragraphs, &next.paragraphs) {
            (None, b) => b.clone(),
            (a, None) => a.clone(),
            (Some(_), Some(b)) if b.cover_type == CoverType::Replace => Some(b.clone()),
            (Some(a), Some(b)) => {
                let mut merged = a.paragraphs.clone();
                for e in &b.paragraphs {
                    match merged.iter_mut().find(|m| m.start_index == e.start_index) {
                        Some(m) => merge_entry(m, e),
                        None => merged.push(e.clone()),
                    }
                }
                merged.sort_by_key(|p| p.start_index);
                Some(ParagraphPatch {
                    cover_type: a.cover_type,
                    paragraphs: merged,
                })
            }
        };
        FormatPatch { text, paragraphs }
    }
}

fn merge_entry(target: &mut Paragraph, patch: &Paragraph) {
    target.paragraph_style = merge_paragraph_style(
        target.paragraph_style.as_ref(),
        patch.paragraph_style.as_ref(),
    );
    if patch.bullet.is_some() {
        target.bullet = patch.bullet.clone();
    }
}

fn clip_runs(runs: &[TextRun], start: usize, end: usize) -> Vec<TextRun> {
    runs.iter()
        .filter(|r| r.start < end && r.end > start)
        .map(|r| TextRun::new(r.start.max(start) - start, r.end.min(end) - start, r.style.clone()))
        .collect()
}

fn clip_paragraphs(paragraphs: &[Paragraph], start: usize, end: usize) -> Vec<Paragraph> {
    paragraphs
        .iter()
        .filter(|p| (start..end).contains(&p.start_index))
        .map(|p| Paragraph {
            start_index: p.start_index - start,
            ..p.clone()
        })
        .collect()
}

fn style_covering(runs: &[TextRun], at: usize) -> Option<&TextStyle> {
    runs.iter()
        .find(|r| r.start <= at && at < r.end)
        .map(|r| &r.style)
}

/// Lay `patch` over `base` within `[0, len)` using elementary intervals
/// between every run boundary.
fn overlay_runs(base: &[TextRun], patch: &[TextRun], len: usize, cover: CoverType) -> Vec<TextRun> {
    let mut cuts: Vec<usize> = vec![0, len];
    cuts.extend(base.iter().chain(patch).flat_map(|r| [r.start, r.end]));
    cuts.retain(|&c| c <= len);
    cuts.sort_unstable();
    cuts.dedup();

    let mut out = Vec::new();
    for w in cuts.windows(2) {
        let (a, b) = (w[0], w[1]);
        let existing = style_covering(base, a);
        let over = style_covering(patch, a);
        let style = match cover {
            CoverType::Replace => over.cloned(),
            CoverType::Merge => match (existing, over) {
                (Some(e), Some(o)) => Some(e.merged(o)),
                (None, Some(o)) => Some(o.clone()),
                (e, None) => e.cloned(),
            },
        };
        if let Some(style) = style {
            out.push(TextRun::new(a, b, style));
        }
    }
    normalize_runs(&mut out);
    out
}
