//! Derived numeric attributes for manufacturing option specifications.
//!
//! A [`Specification`] is an ordered list of fields. Some hold hand-entered
//! values, others a formula over earlier fields and over values pulled from the
//! selected option type, saved specification records and named options. The
//! [`Controller`] recomputes the whole list on every edit.

pub mod config;
pub mod context;
pub mod controller;
pub mod diagnostics;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod sanitize;
#[cfg(feature = "cli")]
pub mod session;
pub mod sources;
pub mod total;

pub use config::EngineConfig;
pub use context::{ContextBuilder, ContextEntry, EvaluationContext, Origin, build_context};
pub use controller::{Controller, ControllerWarning};
pub use diagnostics::{ChangeReason, DiagnosticsContext, MAX_RECORDED_RECOMPUTES, RecomputeTrigger};
pub use evaluator::{EvaluationReport, FieldOutcome, evaluate, evaluate_with_report};
pub use model::{DataType, FieldValue, SavedField, Specification, SpecificationField};
pub use parser::{FormulaError, parse_formula};
pub use sanitize::sanitize;
pub use sources::{
    InMemoryCatalog, OptionType, ReferenceAttribute, ReferenceSelection, ReferenceSource, SourceCatalog, SourceId,
    SourceKind, TypeDefault,
};
pub use total::{ColumnTotal, Total, aggregate_total, column_totals, numeric_column};
