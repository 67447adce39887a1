//! Formula evaluation over a field list.
//!
//! Fields are visited once, top to bottom. A field sees the reference context
//! plus whatever the sweep has passed so far: manually entered numbers enter
//! the context when the sweep reaches them and formula results right after
//! they are computed. A formula naming a field further down the list does not
//! resolve. There is no dependency graph. Only `number` fields are computed.

use crate::context::{EvaluationContext, Origin};
use crate::model::{DataType, FieldValue, SpecificationField};
use crate::parser::{FormulaError, parse_formula};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// No formula; the value was entered by hand.
    Manual,
    Computed(f64),
    /// The previous value was kept.
    Failed(FormulaError),
    /// Has a formula but is not a `number` field; the formula is ignored.
    NotNumeric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldReport {
    pub name: String,
    pub outcome: FieldOutcome,
}

/// Per-field outcomes of one sweep, in field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    fields: Vec<FieldReport>,
}

impl EvaluationReport {
    pub fn fields(&self) -> &[FieldReport] {
        &self.fields
    }

    /// Outcome of the first field called `name`.
    pub fn outcome(&self, name: &str) -> Option<&FieldOutcome> {
        self.fields
            .iter()
            .find(|report| report.name == name)
            .map(|report| &report.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &FormulaError)> {
        self.fields.iter().filter_map(|report| match &report.outcome {
            FieldOutcome::Failed(error) => Some((report.name.as_str(), error)),
            _ => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// Result of one sweep.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub fields: Vec<SpecificationField>,
    /// The reference context extended with every value the sweep inserted.
    pub context: EvaluationContext,
    pub report: EvaluationReport,
}

/// Compute every formula field; other fields are returned unchanged.
pub fn evaluate(fields: &[SpecificationField], context: &EvaluationContext) -> Vec<SpecificationField> {
    evaluate_with_report(fields, context).fields
}

pub fn evaluate_with_report(fields: &[SpecificationField], context: &EvaluationContext) -> Evaluation {
    let mut working = context.clone();
    let mut fields = fields.to_vec();
    let mut reports = Vec::with_capacity(fields.len());

    for field in &mut fields {
        let Some(formula) = field.formula() else {
            if let Some(value) = field.manual_number() {
                let origin = Origin::Field {
                    name: field.name.clone(),
                };
                working.insert_field(&field.name, value, origin);
            }
            reports.push(FieldReport {
                name: field.name.clone(),
                outcome: FieldOutcome::Manual,
            });
            continue;
        };
        if field.data_type != DataType::Number {
            log::debug!("formula of {:?} field '{}' ignored", field.data_type, field.name);
            field.is_calculated = false;
            reports.push(FieldReport {
                name: field.name.clone(),
                outcome: FieldOutcome::NotNumeric,
            });
            continue;
        }

        let result = parse_formula(formula)
            .map_err(|errors| errors.into_iter().next().unwrap_or(FormulaError::Empty))
            .and_then(|formula| formula.evaluate(|name| working.get(name)));

        let outcome = match result {
            Ok(value) => {
                field.value = FieldValue::Number(value);
                field.is_calculated = true;
                let origin = Origin::Computed {
                    name: field.name.clone(),
                };
                working.insert_field(&field.name, value, origin);
                FieldOutcome::Computed(value)
            }
            Err(error) => {
                log::debug!("formula of '{}' not evaluated: {error}", field.name);
                field.is_calculated = false;
                FieldOutcome::Failed(error)
            }
        };
        reports.push(FieldReport {
            name: field.name.clone(),
            outcome,
        });
    }

    Evaluation {
        fields,
        context: working,
        report: EvaluationReport { fields: reports },
    }
}
