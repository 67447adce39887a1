//! The editor-facing state machine.
//!
//! Every mutation of the field list or of the reference selection is followed
//! by a full recompute: the reference context is rebuilt from the selection and
//! the evaluator sweeps the complete field list, replacing it. Nothing is
//! recomputed incrementally.

use crate::config::EngineConfig;
use crate::context::{ContextBuilder, ContextEntry, EvaluationContext};
use crate::diagnostics::{DiagnosticsContext, RecomputeTrigger};
use crate::evaluator::{EvaluationReport, evaluate_with_report};
use crate::model::{DataType, FieldValue, Specification, SpecificationField};
use crate::sanitize::sanitize;
use crate::sources::{ReferenceSelection, SourceCatalog, SourceId, SourceKind};
use crate::total::{ColumnTotal, column_totals};

/// An edit the controller refused. State is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerWarning {
    #[error("there is no field {index}")]
    NoSuchField { index: usize },
    #[error("'{name}' is calculated by its formula and cannot be edited")]
    CalculatedField { name: String },
    #[error("select a formula field before inserting a variable")]
    NoActiveFormulaField,
}

pub struct Controller<C: SourceCatalog> {
    catalog: C,
    config: EngineConfig,
    specification: Specification,
    selection: ReferenceSelection,
    active_formula_field: Option<usize>,
    context: EvaluationContext,
    report: EvaluationReport,
    sequence: u64,
    diagnostics: DiagnosticsContext,
}

impl<C: SourceCatalog> Controller<C> {
    pub fn new(catalog: C, config: EngineConfig) -> Self {
        Self::from_parts(catalog, config, Specification::new(), ReferenceSelection::new())
    }

    /// Start from a loaded specification and selection; runs the first recompute.
    pub fn from_parts(
        catalog: C,
        config: EngineConfig,
        specification: Specification,
        selection: ReferenceSelection,
    ) -> Self {
        let mut controller = Self {
            catalog,
            config,
            specification,
            selection,
            active_formula_field: None,
            context: EvaluationContext::new(),
            report: EvaluationReport::default(),
            sequence: 0,
            diagnostics: DiagnosticsContext::new(),
        };
        controller.recompute(RecomputeTrigger::Loaded, None);
        controller
    }

    pub fn specification(&self) -> &Specification {
        &self.specification
    }

    pub fn fields(&self) -> &[SpecificationField] {
        self.specification.fields()
    }

    pub fn selection(&self) -> &ReferenceSelection {
        &self.selection
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Outcomes of the last recompute.
    pub fn report(&self) -> &EvaluationReport {
        &self.report
    }

    /// Number of recomputes run so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn enable_diagnostics(&mut self) {
        self.diagnostics.enable();
    }

    pub fn diagnostics(&self) -> &DiagnosticsContext {
        &self.diagnostics
    }

    pub fn active_formula_field(&self) -> Option<usize> {
        self.active_formula_field
    }

    /// Every key a formula can reference right now, with where its value came from.
    ///
    /// Includes the selection's values and every field value of the last sweep.
    pub fn available_variables(&self) -> impl Iterator<Item = (&str, &ContextEntry)> {
        self.context.iter()
    }

    /// Hand-entered values; rejected for fields with a formula.
    pub fn set_value(&mut self, index: usize, value: impl Into<FieldValue>) -> Result<(), ControllerWarning> {
        let field = self.field(index)?;
        if field.has_formula() {
            return Err(warn(ControllerWarning::CalculatedField {
                name: field.name.clone(),
            }));
        }
        let trigger = RecomputeTrigger::ValueChanged {
            field: field.name.clone(),
        };
        let before = self.snapshot();
        if let Some(field) = self.specification.field_mut(index) {
            field.value = value.into();
        }
        self.recompute(trigger, before);
        Ok(())
    }

    /// Changing the data type clears the field's value and formula.
    pub fn set_data_type(&mut self, index: usize, data_type: DataType) -> Result<(), ControllerWarning> {
        let name = self.field(index)?.name.clone();
        let before = self.snapshot();
        if let Some(field) = self.specification.field_mut(index) {
            field.data_type = data_type;
            field.value = FieldValue::Empty;
            field.clear_formula();
        }
        self.recompute(RecomputeTrigger::DataTypeChanged { field: name, data_type }, before);
        Ok(())
    }

    /// Blank text removes the formula.
    pub fn set_formula(&mut self, index: usize, formula: &str) -> Result<(), ControllerWarning> {
        let name = self.field(index)?.name.clone();
        let before = self.snapshot();
        if let Some(field) = self.specification.field_mut(index) {
            field.set_formula(formula);
        }
        self.recompute(RecomputeTrigger::FormulaChanged { field: name }, before);
        Ok(())
    }

    /// Append `field`; returns its index.
    pub fn add_field(&mut self, field: SpecificationField) -> usize {
        let trigger = RecomputeTrigger::FieldAdded {
            field: field.name.clone(),
        };
        let before = self.snapshot();
        self.specification.push(field);
        self.recompute(trigger, before);
        self.specification.len() - 1
    }

    pub fn remove_field(&mut self, index: usize) -> Result<SpecificationField, ControllerWarning> {
        let before = self.snapshot();
        let removed = self
            .specification
            .remove(index)
            .ok_or_else(|| warn(ControllerWarning::NoSuchField { index }))?;
        self.active_formula_field = match self.active_formula_field {
            Some(active) if active == index => None,
            Some(active) if active > index => Some(active - 1),
            active => active,
        };
        self.recompute(
            RecomputeTrigger::FieldRemoved {
                field: removed.name.clone(),
            },
            before,
        );
        Ok(removed)
    }

    /// Formulas naming the old name are not rewritten.
    pub fn rename_field(&mut self, index: usize, name: impl Into<String>) -> Result<(), ControllerWarning> {
        let name = name.into();
        let from = self.field(index)?.name.clone();
        let before = self.snapshot();
        if let Some(field) = self.specification.field_mut(index) {
            field.name = name.clone();
        }
        self.recompute(RecomputeTrigger::FieldRenamed { from, to: name }, before);
        Ok(())
    }

    /// Returns `false`, without recomputing, when `id` was already selected.
    pub fn select_reference(&mut self, kind: SourceKind, id: SourceId) -> bool {
        if !self.selection.select(kind, id.clone()) {
            return false;
        }
        let before = self.snapshot();
        self.recompute(RecomputeTrigger::ReferenceSelected { kind, id }, before);
        true
    }

    /// Returns `false`, without recomputing, when `id` was not selected.
    pub fn deselect_reference(&mut self, kind: SourceKind, id: &SourceId) -> bool {
        if !self.selection.deselect(kind, id) {
            return false;
        }
        let before = self.snapshot();
        self.recompute(
            RecomputeTrigger::ReferenceDeselected { kind, id: id.clone() },
            before,
        );
        true
    }

    pub fn select_specification(&mut self, id: SourceId) -> bool {
        self.select_reference(SourceKind::Specification, id)
    }

    pub fn deselect_specification(&mut self, id: &SourceId) -> bool {
        self.deselect_reference(SourceKind::Specification, id)
    }

    pub fn select_option(&mut self, id: SourceId) -> bool {
        self.select_reference(SourceKind::Option, id)
    }

    pub fn deselect_option(&mut self, id: &SourceId) -> bool {
        self.deselect_reference(SourceKind::Option, id)
    }

    /// Select the option type, or clear it with `None`.
    ///
    /// An empty specification is seeded from the type's template.
    pub fn select_type(&mut self, option_type: Option<SourceId>) -> bool {
        if !self.selection.set_option_type(option_type.clone()) {
            return false;
        }
        let before = self.snapshot();
        if self.specification.is_empty() {
            if let Some(template) = option_type.as_ref().and_then(|id| self.catalog.option_type(id)) {
                log::debug!("seeding specification from type '{}'", template.name);
                self.specification =
                    Specification::from_type_defaults(&template.defaults, &self.config.default_total_formula);
            }
        }
        self.recompute(RecomputeTrigger::TypeChanged { option_type }, before);
        true
    }

    /// Change the catalog in place, e.g. after the persistence layer reloaded a source.
    pub fn update_catalog(&mut self, update: impl FnOnce(&mut C)) {
        update(&mut self.catalog);
        let before = self.snapshot();
        self.recompute(RecomputeTrigger::CatalogChanged, before);
    }

    pub fn focus_formula(&mut self, index: usize) -> Result<(), ControllerWarning> {
        self.field(index)?;
        self.active_formula_field = Some(index);
        Ok(())
    }

    pub fn blur_formula(&mut self) {
        self.active_formula_field = None;
    }

    /// Append `variable_name`, sanitized, to the formula of `active_field`.
    pub fn insert_reference(
        &mut self,
        active_field: Option<usize>,
        variable_name: &str,
    ) -> Result<(), ControllerWarning> {
        let index = active_field.ok_or_else(|| warn(ControllerWarning::NoActiveFormulaField))?;
        let field = self.field(index)?;
        let variable = sanitize(variable_name);
        let formula = format!("{}{variable}", field.formula().unwrap_or_default());
        let trigger = RecomputeTrigger::ReferenceInserted {
            field: field.name.clone(),
            variable: variable.clone(),
        };
        let before = self.snapshot();
        if let Some(field) = self.specification.field_mut(index) {
            field.set_formula(&formula);
            field.is_calculated = true;
        }
        self.recompute(trigger, before);
        Ok(())
    }

    /// Totals over this specification followed by `rows`.
    pub fn totals<'a>(&'a self, rows: impl IntoIterator<Item = &'a Specification>) -> Vec<ColumnTotal> {
        column_totals(std::iter::once(&self.specification).chain(rows))
    }

    pub fn into_specification(self) -> Specification {
        self.specification
    }

    fn field(&self, index: usize) -> Result<&SpecificationField, ControllerWarning> {
        self.specification
            .field(index)
            .ok_or_else(|| warn(ControllerWarning::NoSuchField { index }))
    }

    fn snapshot(&self) -> Option<Vec<SpecificationField>> {
        self.diagnostics
            .enabled
            .then(|| self.specification.fields().to_vec())
    }

    fn recompute(&mut self, trigger: RecomputeTrigger, before: Option<Vec<SpecificationField>>) {
        self.sequence += 1;
        let reference_context = ContextBuilder::new(&self.config)
            .with_selection(&self.selection, &self.catalog)
            .build();
        let evaluation = evaluate_with_report(self.specification.fields(), &reference_context);
        log::debug!(
            "recompute #{} after {trigger}: {} fields, {} formulas failed",
            self.sequence,
            evaluation.fields.len(),
            evaluation.report.failure_count()
        );
        if let Some(before) = before {
            self.diagnostics
                .record_recompute(self.sequence, trigger, &before, &evaluation.fields);
        }
        self.specification.replace_fields(evaluation.fields);
        self.context = evaluation.context;
        self.report = evaluation.report;
    }
}

fn warn(warning: ControllerWarning) -> ControllerWarning {
    log::warn!("{warning}");
    warning
}
