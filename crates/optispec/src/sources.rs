//! Reference sources consumed from the persistence layer.
//!
//! The engine never loads anything itself: callers hand it a [`SourceCatalog`]
//! holding the option types, saved specification records and named options
//! a user can pick from, and a [`ReferenceSelection`] naming the picked ones.

use crate::model::{DataType, FieldValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier assigned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One attribute of an option type's template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefault {
    pub name: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub default_value: FieldValue,
}

impl TypeDefault {
    pub fn new(name: impl Into<String>, data_type: DataType, default_value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            data_type,
            default_value: default_value.into(),
        }
    }

    pub fn numeric_value(&self) -> Option<f64> {
        self.default_value.as_number()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionType {
    pub id: SourceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub defaults: Vec<TypeDefault>,
}

/// One attribute of a saved specification record or named option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceAttribute {
    pub name: String,
    #[serde(default)]
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ReferenceAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            data_type: None,
            unit: None,
        }
    }

    /// Numeric attributes and text that parses as a finite number count;
    /// anything else is left out of formulas.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_number()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSource {
    pub id: SourceId,
    /// Shown in diagnostics only.
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub attributes: Vec<ReferenceAttribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Specification,
    Option,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specification => f.write_str("specification"),
            Self::Option => f.write_str("option"),
        }
    }
}

/// Sources currently picked in the editor, in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSelection {
    #[serde(default)]
    pub option_type: Option<SourceId>,
    #[serde(default)]
    specifications: Vec<SourceId>,
    #[serde(default)]
    options: Vec<SourceId>,
}

impl ReferenceSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self, kind: SourceKind) -> &[SourceId] {
        match kind {
            SourceKind::Specification => &self.specifications,
            SourceKind::Option => &self.options,
        }
    }

    fn ids_mut(&mut self, kind: SourceKind) -> &mut Vec<SourceId> {
        match kind {
            SourceKind::Specification => &mut self.specifications,
            SourceKind::Option => &mut self.options,
        }
    }

    pub fn is_selected(&self, kind: SourceKind, id: &SourceId) -> bool {
        self.ids(kind).contains(id)
    }

    /// Returns `false` when `id` was already selected.
    pub fn select(&mut self, kind: SourceKind, id: SourceId) -> bool {
        if self.is_selected(kind, &id) {
            return false;
        }
        self.ids_mut(kind).push(id);
        true
    }

    /// Returns `false` when `id` was not selected.
    pub fn deselect(&mut self, kind: SourceKind, id: &SourceId) -> bool {
        let ids = self.ids_mut(kind);
        let before = ids.len();
        ids.retain(|selected| selected != id);
        ids.len() != before
    }

    /// Returns `false` when the type did not change.
    pub fn set_option_type(&mut self, option_type: Option<SourceId>) -> bool {
        if self.option_type == option_type {
            return false;
        }
        self.option_type = option_type;
        true
    }
}

/// Access to sources loaded by the persistence layer.
pub trait SourceCatalog {
    fn option_type(&self, id: &SourceId) -> Option<&OptionType>;

    fn reference(&self, kind: SourceKind, id: &SourceId) -> Option<&ReferenceSource>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    types: IndexMap<SourceId, OptionType>,
    specifications: IndexMap<SourceId, ReferenceSource>,
    options: IndexMap<SourceId, ReferenceSource>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_type(&mut self, option_type: OptionType) {
        self.types.insert(option_type.id.clone(), option_type);
    }

    pub fn insert_reference(&mut self, kind: SourceKind, source: ReferenceSource) {
        let sources = match kind {
            SourceKind::Specification => &mut self.specifications,
            SourceKind::Option => &mut self.options,
        };
        sources.insert(source.id.clone(), source);
    }

    pub fn with_type(mut self, option_type: OptionType) -> Self {
        self.insert_type(option_type);
        self
    }

    pub fn with_reference(mut self, kind: SourceKind, source: ReferenceSource) -> Self {
        self.insert_reference(kind, source);
        self
    }
}

impl SourceCatalog for InMemoryCatalog {
    fn option_type(&self, id: &SourceId) -> Option<&OptionType> {
        self.types.get(id)
    }

    fn reference(&self, kind: SourceKind, id: &SourceId) -> Option<&ReferenceSource> {
        match kind {
            SourceKind::Specification => self.specifications.get(id),
            SourceKind::Option => self.options.get(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_keeps_order_and_ignores_duplicates() {
        let mut selection = ReferenceSelection::new();
        assert!(selection.select(SourceKind::Option, "b".into()));
        assert!(selection.select(SourceKind::Option, "a".into()));
        assert!(!selection.select(SourceKind::Option, "b".into()));
        assert_eq!(selection.ids(SourceKind::Option), &[SourceId::from("b"), SourceId::from("a")]);
        assert!(selection.ids(SourceKind::Specification).is_empty());
    }

    #[test]
    fn test_deselect() {
        let mut selection = ReferenceSelection::new();
        selection.select(SourceKind::Specification, "s1".into());
        assert!(selection.deselect(SourceKind::Specification, &"s1".into()));
        assert!(!selection.deselect(SourceKind::Specification, &"s1".into()));
        assert!(!selection.is_selected(SourceKind::Specification, &"s1".into()));
    }

    #[test]
    fn test_reference_attribute_from_json() {
        let attribute: ReferenceAttribute =
            serde_json::from_str(r#"{"name": "Net Wt", "value": "12", "unit": "kg"}"#).unwrap();
        assert_eq!(attribute.numeric_value(), Some(12.0));
        assert_eq!(attribute.data_type, None);
    }
}
