//! Document units and the registry that applies mutations to them.

use std::collections::{BTreeMap, HashMap};

use core_ops::{ActionList, Applied, ApplyError, MAIN_SEGMENT, apply};
use core_text::DocumentBody;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{SelectionModel, SelectionProvider, TextRange};

/// One unit of work for the applier: a list against one document unit,
/// plus the selection to install once it has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    pub unit_id: String,
    pub actions: ActionList,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_ranges: Vec<TextRange>,
}

impl MutationRecord {
    pub fn new(unit_id: impl Into<String>, actions: ActionList) -> Self {
        Self {
            unit_id: unit_id.into(),
            actions,
            text_ranges: Vec::new(),
        }
    }

    pub fn with_ranges(mut self, text_ranges: Vec<TextRange>) -> Self {
        self.text_ranges = text_ranges;
        self
    }
}

/// Read surface of a document model.
pub trait DocumentStore {
    fn unit_id(&self) -> &str;
    fn body(&self) -> &DocumentBody;
    /// Body of a named segment; the main body for [`MAIN_SEGMENT`].
    fn segment_body(&self, segment_id: &str) -> Option<&DocumentBody>;
}

/// Applies batches of mutation records, all or nothing.
pub trait MutationExecutor {
    fn execute_all(&mut self, mutations: &[MutationRecord]) -> Result<(), ApplyError>;
}

/// A document unit: main body, named segments (headers, footers) and its selection.
#[derive(Debug, Clone, Default)]
pub struct DocumentState {
    unit_id: String,
    body: DocumentBody,
    segments: BTreeMap<String, DocumentBody>,
    pub selection: SelectionModel,
}

impl DocumentState {
    pub fn new(unit_id: impl Into<String>, body: DocumentBody) -> Self {
        Self {
            unit_id: unit_id.into(),
            body,
            segments: BTreeMap::new(),
            selection: SelectionModel::default(),
        }
    }

    pub fn with_segment(mut self, segment_id: impl Into<String>, body: DocumentBody) -> Self {
        self.segments.insert(segment_id.into(), body);
        self
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = &str> {
        self.segments.keys().map(String::as_str)
    }

    fn segment_body_mut(&mut self, segment_id: &str) -> Option<&mut DocumentBody> {
        if segment_id == MAIN_SEGMENT {
            Some(&mut self.body)
        } else {
            self.segments.get_mut(segment_id)
        }
    }

    /// Apply `actions` to the segment they address and keep the result.
    pub fn apply_actions(&mut self, actions: &ActionList) -> Result<Applied, ApplyError> {
        let segment = actions.segment()?.to_string();
        let body = self
            .segment_body(&segment)
            .ok_or_else(|| ApplyError::UnknownSegment(segment.clone()))?;
        let applied = apply(body, actions)?;
        if let Some(slot) = self.segment_body_mut(&segment) {
            *slot = applied.body.clone();
        }
        trace!(target: "state.document", unit = %self.unit_id, segment = %segment, len = applied.body.len(), "body_replaced");
        Ok(applied)
    }

    /// Apply one record: run its actions, then install its text ranges if it carries any.
    pub fn apply_mutation(&mut self, record: &MutationRecord) -> Result<Applied, ApplyError> {
        if record.unit_id != self.unit_id {
            return Err(ApplyError::UnknownUnit(record.unit_id.clone()));
        }
        let applied = self.apply_actions(&record.actions)?;
        if !record.text_ranges.is_empty() {
            self.selection.replace_text_ranges(record.text_ranges.clone());
        }
        Ok(applied)
    }
}

impl DocumentStore for DocumentState {
    fn unit_id(&self) -> &str {
        &self.unit_id
    }

    fn body(&self) -> &DocumentBody {
        &self.body
    }

    fn segment_body(&self, segment_id: &str) -> Option<&DocumentBody> {
        if segment_id == MAIN_SEGMENT {
            Some(&self.body)
        } else {
            self.segments.get(segment_id)
        }
    }
}

/// Open document units keyed by unit id.
#[derive(Debug, Default)]
pub struct Documents {
    units: HashMap<String, DocumentState>,
}

impl Documents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, doc: DocumentState) {
        debug!(target: "state.document", unit = %doc.unit_id, "unit_opened");
        self.units.insert(doc.unit_id.clone(), doc);
    }

    pub fn close(&mut self, unit_id: &str) -> Option<DocumentState> {
        let closed = self.units.remove(unit_id);
        if closed.is_some() {
            debug!(target: "state.document", unit = %unit_id, "unit_closed");
        }
        closed
    }

    pub fn get(&self, unit_id: &str) -> Option<&DocumentState> {
        self.units.get(unit_id)
    }

    pub fn get_mut(&mut self, unit_id: &str) -> Option<&mut DocumentState> {
        self.units.get_mut(unit_id)
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.units.contains_key(unit_id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Apply a single record. The result carries the inverse and the list that actually ran.
    pub fn apply_mutation(&mut self, record: &MutationRecord) -> Result<Applied, ApplyError> {
        self.units
            .get_mut(&record.unit_id)
            .ok_or_else(|| ApplyError::UnknownUnit(record.unit_id.clone()))?
            .apply_mutation(record)
    }
}

impl MutationExecutor for Documents {
    /// Records run in order against staged copies; the copies replace the
    /// live units only when every record succeeded.
    fn execute_all(&mut self, mutations: &[MutationRecord]) -> Result<(), ApplyError> {
        let mut staged: HashMap<&str, DocumentState> = HashMap::new();
        for record in mutations {
            let unit = record.unit_id.as_str();
            if !staged.contains_key(unit) {
                let live = self
                    .units
                    .get(unit)
                    .ok_or_else(|| ApplyError::UnknownUnit(unit.to_string()))?;
                staged.insert(unit, live.clone());
            }
            if let Some(doc) = staged.get_mut(unit) {
                doc.apply_mutation(record)?;
            }
        }
        for (unit, doc) in staged {
            self.units.insert(unit.to_string(), doc);
        }
        Ok(())
    }
}
