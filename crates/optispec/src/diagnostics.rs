//! Diagnostics for the recompute controller.
//!
//! Provides "why did this field change?" queries for debugging.

use crate::model::{DataType, FieldValue, SpecificationField};
use crate::parser::parse_formula;
use crate::sanitize::sanitize;
use crate::sources::{SourceId, SourceKind};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// What caused a recompute.
#[derive(Debug, Clone, PartialEq)]
pub enum RecomputeTrigger {
    Loaded,
    ValueChanged { field: String },
    DataTypeChanged { field: String, data_type: DataType },
    FormulaChanged { field: String },
    FieldAdded { field: String },
    FieldRemoved { field: String },
    FieldRenamed { from: String, to: String },
    ReferenceSelected { kind: SourceKind, id: SourceId },
    ReferenceDeselected { kind: SourceKind, id: SourceId },
    TypeChanged { option_type: Option<SourceId> },
    ReferenceInserted { field: String, variable: String },
    CatalogChanged,
}

impl fmt::Display for RecomputeTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => f.write_str("load"),
            Self::ValueChanged { field } => write!(f, "value of '{field}' changed"),
            Self::DataTypeChanged { field, data_type } => {
                write!(f, "data type of '{field}' changed to {data_type:?}")
            }
            Self::FormulaChanged { field } => write!(f, "formula of '{field}' changed"),
            Self::FieldAdded { field } => write!(f, "field '{field}' added"),
            Self::FieldRemoved { field } => write!(f, "field '{field}' removed"),
            Self::FieldRenamed { from, to } => write!(f, "field '{from}' renamed to '{to}'"),
            Self::ReferenceSelected { kind, id } => write!(f, "{kind} '{id}' selected"),
            Self::ReferenceDeselected { kind, id } => write!(f, "{kind} '{id}' deselected"),
            Self::TypeChanged { option_type: Some(id) } => write!(f, "type '{id}' selected"),
            Self::TypeChanged { option_type: None } => f.write_str("type cleared"),
            Self::ReferenceInserted { field, variable } => {
                write!(f, "'{variable}' inserted into formula of '{field}'")
            }
            Self::CatalogChanged => f.write_str("catalog changed"),
        }
    }
}

/// A field whose value differs after a recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    /// `None` for a field that did not exist before.
    pub old_value: Option<FieldValue>,
    pub new_value: FieldValue,
    /// Identifiers the field's formula references.
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeEvent {
    pub sequence: u64,
    pub trigger: RecomputeTrigger,
    pub changes: Vec<FieldChange>,
}

/// A diagnostic query result showing why a field changed
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeReason {
    pub field: String,
    /// Sequence number of the recompute that changed it
    pub changed_at: u64,
    pub trigger: RecomputeTrigger,
    /// Referenced fields that changed in the same recompute
    pub triggered_by: Vec<String>,
}

/// Recorded recomputes kept before the oldest is dropped.
pub const MAX_RECORDED_RECOMPUTES: usize = 1024;

/// Diagnostics context for the controller
#[derive(Debug, Default)]
pub struct DiagnosticsContext {
    /// Enable recording
    pub enabled: bool,
    /// Recorded recomputes that changed at least one field, oldest first.
    /// Holds at most [`MAX_RECORDED_RECOMPUTES`]; `clear` empties it.
    pub recomputes: VecDeque<RecomputeEvent>,
}

impl DiagnosticsContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn clear(&mut self) {
        self.recomputes.clear();
    }

    pub fn record_recompute(
        &mut self,
        sequence: u64,
        trigger: RecomputeTrigger,
        before: &[SpecificationField],
        after: &[SpecificationField],
    ) {
        if !self.enabled {
            return;
        }
        let changes = diff_fields(before, after);
        if changes.is_empty() {
            return;
        }
        if self.recomputes.len() == MAX_RECORDED_RECOMPUTES {
            self.recomputes.pop_front();
        }
        self.recomputes.push_back(RecomputeEvent {
            sequence,
            trigger,
            changes,
        });
    }

    pub fn changes_at(&self, sequence: u64) -> Vec<&FieldChange> {
        self.recomputes
            .iter()
            .filter(|event| event.sequence == sequence)
            .flat_map(|event| &event.changes)
            .collect()
    }

    /// The latest recorded change of `field`.
    pub fn why_did_change(&self, field: &str) -> Option<ChangeReason> {
        let event = self
            .recomputes
            .iter()
            .rev()
            .find(|event| event.changes.iter().any(|change| change.field == field))?;
        Some(reason(event, field))
    }

    /// The latest change of `field` followed by the changes it was derived from.
    pub fn change_chain(&self, field: &str) -> Vec<ChangeReason> {
        let Some(first) = self.why_did_change(field) else {
            return Vec::new();
        };
        let Some(event) = self
            .recomputes
            .iter()
            .rev()
            .find(|event| event.sequence == first.changed_at)
        else {
            return Vec::new();
        };

        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = vec![field.to_string()];
        while let Some(current) = queue.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if !event.changes.iter().any(|change| change.field == current) {
                continue;
            }
            let reason = reason(event, &current);
            queue.extend(reason.triggered_by.iter().cloned());
            chain.push(reason);
        }
        chain
    }
}

fn reason(event: &RecomputeEvent, field: &str) -> ChangeReason {
    let references = event
        .changes
        .iter()
        .find(|change| change.field == field)
        .map(|change| change.references.as_slice())
        .unwrap_or_default();
    let triggered_by = event
        .changes
        .iter()
        .filter(|change| change.field != field)
        .filter(|change| {
            references
                .iter()
                .any(|reference| *reference == change.field || *reference == sanitize(&change.field))
        })
        .map(|change| change.field.clone())
        .collect();
    ChangeReason {
        field: field.to_string(),
        changed_at: event.sequence,
        trigger: event.trigger.clone(),
        triggered_by,
    }
}

/// Fields of `after` whose value differs from the same-named field of `before`.
pub fn diff_fields(before: &[SpecificationField], after: &[SpecificationField]) -> Vec<FieldChange> {
    after
        .iter()
        .filter_map(|field| {
            let old_value = before
                .iter()
                .find(|previous| previous.name == field.name)
                .map(|previous| previous.value.clone());
            if old_value.as_ref() == Some(&field.value) {
                return None;
            }
            let references = field
                .formula()
                .and_then(|formula| parse_formula(formula).ok())
                .map(|formula| formula.referenced_names().into_iter().map(str::to_string).collect())
                .unwrap_or_default();
            Some(FieldChange {
                field: field.name.clone(),
                old_value,
                new_value: field.value.clone(),
                references,
            })
        })
        .collect()
}
