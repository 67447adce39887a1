//! Specification fields, their values, and the shape they are saved in.

use crate::config::DEFAULT_TOTAL_FORMULA;
use crate::sources::TypeDefault;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    File,
    Link,
    Dropdown,
    Refer,
}

/// Raw or computed value of a field.
///
/// On the wire this is a bare JSON `null`, boolean, number or string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    Text(String),
}

/// Standard numeric parsing: surrounding whitespace is ignored, the rest must
/// be a complete finite number. `"12"` parses, `"12abc"` and `""` do not.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|number| number.is_finite())
}

impl FieldValue {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Boolean(_) | Self::Number(_) => false,
        }
    }

    /// The value as a finite number, if it is one or parses as one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) if number.is_finite() => Some(*number),
            Self::Text(text) => parse_number(text),
            _ => None,
        }
    }

    /// Convert to the representation `data_type` is saved with.
    ///
    /// Unparseable input is kept verbatim rather than dropped. Coercing twice
    /// gives the same value as coercing once.
    pub fn coerce(&self, data_type: DataType) -> FieldValue {
        match (data_type, self) {
            (_, Self::Empty) => Self::Empty,
            (_, Self::Number(number)) if !number.is_finite() => Self::Empty,
            (DataType::Number, Self::Text(text)) => {
                if text.trim().is_empty() {
                    Self::Empty
                } else {
                    parse_number(text).map_or_else(|| self.clone(), Self::Number)
                }
            }
            (DataType::Number, _) => self.clone(),
            (DataType::Boolean, Self::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Self::Boolean(true),
                "false" => Self::Boolean(false),
                _ => self.clone(),
            },
            (DataType::Boolean, _) => self.clone(),
            (_, Self::Number(_) | Self::Boolean(_)) => Self::Text(self.to_string()),
            (_, Self::Text(_)) => self.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Boolean(boolean) => write!(f, "{boolean}"),
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(number: f64) -> Self {
        Self::Number(number)
    }
}

impl From<bool> for FieldValue {
    fn from(boolean: bool) -> Self {
        Self::Boolean(boolean)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Pass-through classification metadata. Never read by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassificationFlags {
    pub public: bool,
    pub used_for_formulas: bool,
    pub order_type_only: bool,
    pub query: bool,
}

/// One row of a specification.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecificationField {
    pub name: String,
    pub value: FieldValue,
    pub data_type: DataType,
    pub unit: Option<String>,
    formula: Option<String>,
    /// Set by the evaluator: the formula is non-empty and its last evaluation succeeded.
    pub is_calculated: bool,
    pub include_in_total: bool,
    pub total_formula: String,
    pub dropdown_options: Option<Vec<String>>,
    pub flags: ClassificationFlags,
}

impl SpecificationField {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Empty,
            data_type,
            unit: None,
            formula: None,
            is_calculated: false,
            include_in_total: true,
            total_formula: DEFAULT_TOTAL_FORMULA.to_string(),
            dropdown_options: None,
            flags: ClassificationFlags::default(),
        }
    }

    /// A manually entered number.
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, DataType::Number).with_value(value)
    }

    /// A number computed from `formula`.
    pub fn calculated(name: impl Into<String>, formula: &str) -> Self {
        Self::new(name, DataType::Number).with_formula(formula)
    }

    pub fn with_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_formula(mut self, formula: &str) -> Self {
        self.set_formula(formula);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_total_formula(mut self, total_formula: impl Into<String>) -> Self {
        self.total_formula = total_formula.into();
        self
    }

    pub fn with_include_in_total(mut self, include_in_total: bool) -> Self {
        self.include_in_total = include_in_total;
        self
    }

    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    /// Blank text removes the formula and makes the field editable again.
    pub fn set_formula(&mut self, formula: &str) {
        if formula.trim().is_empty() {
            self.formula = None;
            self.is_calculated = false;
        } else {
            self.formula = Some(formula.to_string());
        }
    }

    pub fn clear_formula(&mut self) {
        self.set_formula("");
    }

    pub fn has_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Fields without a formula are edited by hand; the rest are computed.
    pub fn is_editable(&self) -> bool {
        !self.has_formula()
    }

    /// Current value of a non-formula `number` field, if it is numeric.
    pub fn manual_number(&self) -> Option<f64> {
        if self.has_formula() || self.data_type != DataType::Number {
            return None;
        }
        self.value.as_number()
    }

    pub fn to_saved(&self) -> SavedField {
        SavedField {
            name: self.name.clone(),
            value: self.value.coerce(self.data_type),
            unit: self.unit.clone().filter(|unit| !unit.is_empty()),
            data_type: self.data_type,
            formula: self.formula.clone(),
            is_calculated: self.is_calculated && self.has_formula(),
            include_in_total: self.include_in_total,
            total_formula: self.total_formula.clone(),
            dropdown_options: self.dropdown_options.clone(),
            public: self.flags.public,
            used_for_formulas: self.flags.used_for_formulas,
            order_type_only: self.flags.order_type_only,
            query: self.flags.query,
        }
    }

    pub fn from_saved(saved: SavedField) -> Self {
        let mut field = Self::new(saved.name, saved.data_type);
        field.value = saved.value;
        field.unit = saved.unit;
        field.set_formula(saved.formula.as_deref().unwrap_or_default());
        field.is_calculated = saved.is_calculated && field.has_formula();
        field.include_in_total = saved.include_in_total;
        field.total_formula = saved.total_formula;
        field.dropdown_options = saved.dropdown_options;
        field.flags = ClassificationFlags {
            public: saved.public,
            used_for_formulas: saved.used_for_formulas,
            order_type_only: saved.order_type_only,
            query: saved.query,
        };
        field
    }
}

/// A field as handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedField {
    pub name: String,
    #[serde(default)]
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default)]
    pub is_calculated: bool,
    #[serde(default = "default_include_in_total")]
    pub include_in_total: bool,
    #[serde(default = "default_total_formula")]
    pub total_formula: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropdown_options: Option<Vec<String>>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub used_for_formulas: bool,
    #[serde(default)]
    pub order_type_only: bool,
    #[serde(default)]
    pub query: bool,
}

fn default_include_in_total() -> bool {
    true
}

fn default_total_formula() -> String {
    DEFAULT_TOTAL_FORMULA.to_string()
}

/// Ordered list of fields describing one option.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Specification {
    fields: Vec<SpecificationField>,
}

impl Specification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Vec<SpecificationField>) -> Self {
        Self { fields }
    }

    /// One field per type default, in template order.
    pub fn from_type_defaults(defaults: &[TypeDefault], total_formula: &str) -> Self {
        let fields = defaults
            .iter()
            .map(|default| {
                SpecificationField::new(default.name.clone(), default.data_type)
                    .with_value(default.default_value.clone())
                    .with_total_formula(total_formula)
            })
            .collect();
        Self { fields }
    }

    pub fn fields(&self) -> &[SpecificationField] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&SpecificationField> {
        self.fields.get(index)
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut SpecificationField> {
        self.fields.get_mut(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn push(&mut self, field: SpecificationField) {
        self.fields.push(field);
    }

    pub fn remove(&mut self, index: usize) -> Option<SpecificationField> {
        (index < self.fields.len()).then(|| self.fields.remove(index))
    }

    pub fn replace_fields(&mut self, fields: Vec<SpecificationField>) {
        self.fields = fields;
    }

    pub fn into_fields(self) -> Vec<SpecificationField> {
        self.fields
    }

    /// Save shape: blank-named rows are dropped.
    pub fn to_saved(&self) -> Vec<SavedField> {
        self.fields
            .iter()
            .filter(|field| !field.name.trim().is_empty())
            .map(SpecificationField::to_saved)
            .collect()
    }

    pub fn from_saved(saved: impl IntoIterator<Item = SavedField>) -> Self {
        Self {
            fields: saved.into_iter().map(SpecificationField::from_saved).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_number() {
        assert_eq!(FieldValue::text("12").as_number(), Some(12.0));
        assert_eq!(FieldValue::text(" 2.5 ").as_number(), Some(2.5));
        assert_eq!(FieldValue::text("12abc").as_number(), None);
        assert_eq!(FieldValue::text("").as_number(), None);
        assert_eq!(FieldValue::text("NaN").as_number(), None);
        assert_eq!(FieldValue::text("inf").as_number(), None);
        assert_eq!(FieldValue::Boolean(true).as_number(), None);
        assert_eq!(FieldValue::Number(f64::INFINITY).as_number(), None);
    }

    #[test]
    fn test_coerce_per_data_type() {
        assert_eq!(FieldValue::text("7").coerce(DataType::Number), FieldValue::Number(7.0));
        assert_eq!(FieldValue::text(" ").coerce(DataType::Number), FieldValue::Empty);
        assert_eq!(FieldValue::text("n/a").coerce(DataType::Number), FieldValue::text("n/a"));
        assert_eq!(FieldValue::text("TRUE").coerce(DataType::Boolean), FieldValue::Boolean(true));
        assert_eq!(FieldValue::Number(3.0).coerce(DataType::String), FieldValue::text("3"));
        assert_eq!(FieldValue::Boolean(false).coerce(DataType::Dropdown), FieldValue::text("false"));
    }

    #[test]
    fn test_coerce_is_idempotent() {
        let values = [
            FieldValue::Empty,
            FieldValue::text("7"),
            FieldValue::text("x"),
            FieldValue::Number(1.5),
            FieldValue::Boolean(true),
            FieldValue::text("false"),
        ];
        let data_types = [DataType::String, DataType::Number, DataType::Boolean, DataType::Date];
        for value in &values {
            for data_type in data_types {
                let once = value.coerce(data_type);
                assert_eq!(once.coerce(data_type), once);
            }
        }
    }

    #[test]
    fn test_blank_formula_is_no_formula() {
        let mut field = SpecificationField::calculated("area", "length * width");
        assert!(!field.is_editable());
        field.set_formula("   ");
        assert_eq!(field.formula(), None);
        assert!(field.is_editable());
    }

    #[test]
    fn test_save_shape_json() {
        let field = SpecificationField::calculated("Net Wt", "Gross - Tare").with_unit("kg");
        let json = serde_json::to_value(field.to_saved()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Net Wt",
                "value": null,
                "unit": "kg",
                "dataType": "number",
                "formula": "Gross - Tare",
                "isCalculated": false,
                "includeInTotal": true,
                "totalFormula": "SUM",
                "public": false,
                "usedForFormulas": false,
                "orderTypeOnly": false,
                "query": false,
            })
        );
    }

    #[test]
    fn test_saved_defaults() {
        let saved: SavedField = serde_json::from_value(serde_json::json!({
            "name": "length",
            "value": 5,
            "dataType": "number",
        }))
        .unwrap();
        let field = SpecificationField::from_saved(saved);
        assert_eq!(field.value, FieldValue::Number(5.0));
        assert!(field.include_in_total);
        assert_eq!(field.total_formula, "SUM");
        assert_eq!(field.formula(), None);
    }

    #[test]
    fn test_blank_names_are_not_saved() {
        let specification = Specification::from_fields(vec![
            SpecificationField::number("length", 5.0),
            SpecificationField::number("  ", 1.0),
        ]);
        let saved = specification.to_saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "length");
    }
}
