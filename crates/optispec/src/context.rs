//! The name → number mapping formulas are evaluated against.
//!
//! A context is rebuilt from scratch on every recompute and never persisted.
//! Three scopes feed it:
//!
//! - the selected option type's defaults, under `optionType_<name>` and the
//!   legacy `OT_<name>` / `ot_<lowercase name>` aliases,
//! - selected specification records and named options, under `<name>`,
//!   `<lowercase name>` and the unsanitized name,
//! - the field list's manually entered numbers, under `<name>` and the
//!   unsanitized name.
//!
//! `<name>` is always the sanitized name. Inserting an existing key replaces
//! its value: the last source written wins.

use crate::config::EngineConfig;
use crate::model::SpecificationField;
use crate::sanitize::sanitize;
use crate::sources::{OptionType, ReferenceSelection, ReferenceSource, SourceCatalog, SourceKind};
use indexmap::IndexMap;
use serde::Serialize;
use smallvec::{SmallVec, smallvec};
use std::fmt;

/// Where a context value came from. Diagnostic only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Origin {
    TypeDefault { option_type: String },
    Reference { label: String },
    Field { name: String },
    Computed { name: String },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeDefault { option_type } => write!(f, "type '{option_type}'"),
            Self::Reference { label } => write!(f, "reference '{label}'"),
            Self::Field { name } => write!(f, "field '{name}'"),
            Self::Computed { name } => write!(f, "formula of '{name}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    pub value: f64,
    pub origin: Origin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EvaluationContext {
    entries: IndexMap<String, ContextEntry>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).map(|entry| entry.value)
    }

    pub fn entry(&self, key: &str) -> Option<&ContextEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64, origin: Origin) {
        let key = key.into();
        let entry = ContextEntry { value, origin };
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            log::trace!(
                "context key '{key}' from {} overwritten by {}",
                previous.origin,
                self.entries[&key].origin
            );
        }
    }

    /// Insert `value` under every key `name` is referenced by in a formula.
    pub fn insert_field(&mut self, name: &str, value: f64, origin: Origin) {
        for key in field_keys(name) {
            self.insert(key, value, origin.clone());
        }
    }
}

/// `<sanitized>` plus the unsanitized name when it differs.
pub fn field_keys(name: &str) -> SmallVec<[String; 2]> {
    let sanitized = sanitize(name);
    let mut keys = smallvec![sanitized];
    if keys[0] != name {
        keys.push(name.to_string());
    }
    keys
}

pub fn type_default_keys(name: &str, config: &EngineConfig) -> SmallVec<[String; 3]> {
    let sanitized = sanitize(name);
    let mut keys: SmallVec<[String; 3]> = smallvec![format!("optionType_{sanitized}")];
    if config.legacy_type_aliases {
        keys.push(format!("OT_{sanitized}"));
        keys.push(format!("ot_{}", sanitized.to_lowercase()));
    }
    keys
}

pub fn reference_keys(name: &str, config: &EngineConfig) -> SmallVec<[String; 3]> {
    let sanitized = sanitize(name);
    let mut keys: SmallVec<[String; 3]> = SmallVec::new();
    if config.lowercase_aliases {
        let lowercase = sanitized.to_lowercase();
        if lowercase != sanitized {
            keys.push(lowercase);
        }
    }
    if config.original_name_aliases && sanitized != name {
        keys.push(name.to_string());
    }
    keys.insert(0, sanitized);
    keys
}

/// Collects the numeric attributes of selected sources into one context.
pub struct ContextBuilder<'a> {
    config: &'a EngineConfig,
    context: EvaluationContext,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            context: EvaluationContext::new(),
        }
    }

    pub fn with_type_defaults(mut self, option_type: &OptionType) -> Self {
        for default in &option_type.defaults {
            let Some(value) = default.numeric_value() else {
                continue;
            };
            let origin = Origin::TypeDefault {
                option_type: option_type.name.clone(),
            };
            for key in type_default_keys(&default.name, self.config) {
                self.context.insert(key, value, origin.clone());
            }
        }
        self
    }

    pub fn with_reference(mut self, source: &ReferenceSource) -> Self {
        for attribute in &source.attributes {
            let Some(value) = attribute.numeric_value() else {
                continue;
            };
            let origin = Origin::Reference {
                label: source.label.clone(),
            };
            for key in reference_keys(&attribute.name, self.config) {
                self.context.insert(key, value, origin.clone());
            }
        }
        self
    }

    /// The selected type first, then specification records, then options,
    /// each kind in selection order. Ids missing from `catalog` are skipped.
    pub fn with_selection(mut self, selection: &ReferenceSelection, catalog: &impl SourceCatalog) -> Self {
        if let Some(id) = &selection.option_type {
            match catalog.option_type(id) {
                Some(option_type) => self = self.with_type_defaults(option_type),
                None => log::warn!("selected option type '{id}' is not in the catalog"),
            }
        }
        for kind in [SourceKind::Specification, SourceKind::Option] {
            for id in selection.ids(kind) {
                match catalog.reference(kind, id) {
                    Some(source) => self = self.with_reference(source),
                    None => log::warn!("selected {kind} '{id}' is not in the catalog"),
                }
            }
        }
        self
    }

    /// Manually entered numbers of the field list; formula fields are skipped.
    pub fn with_fields(mut self, fields: &[SpecificationField]) -> Self {
        for field in fields {
            if let Some(value) = field.manual_number() {
                let origin = Origin::Field {
                    name: field.name.clone(),
                };
                self.context.insert_field(&field.name, value, origin);
            }
        }
        self
    }

    pub fn build(self) -> EvaluationContext {
        self.context
    }
}

/// Every scope at once: selected sources, then the field list.
pub fn build_context(
    selection: &ReferenceSelection,
    catalog: &impl SourceCatalog,
    fields: &[SpecificationField],
    config: &EngineConfig,
) -> EvaluationContext {
    ContextBuilder::new(config)
        .with_selection(selection, catalog)
        .with_fields(fields)
        .build()
}
