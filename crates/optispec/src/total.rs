//! Roll-up of a numeric column through a field's total formula.
//!
//! A total formula is either a bare aggregate keyword (`SUM`, `AVERAGE`/`AVG`,
//! `MAX`, `MIN`, `COUNT`) or an arithmetic expression over those keywords and
//! numeric literals, e.g. `SUM / COUNT * 1.2`. Keywords are matched as whole
//! words regardless of case. After substitution only digits, whitespace and
//! `+ - * / . ( )` may remain.

use crate::model::{DataType, FieldValue, Specification};
use crate::parser::parse_formula;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(SUM|AVERAGE|AVG|MAX|MIN|COUNT)\b").expect("aggregate keyword pattern")
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Total {
    Value(f64),
    /// Blank formula or no numeric values; shown as `-`.
    Empty,
    /// The expression did not parse or did not produce a finite number.
    Error,
    /// Something other than keywords, numbers and arithmetic was written.
    InvalidFormula,
}

impl Total {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Empty => f.write_str("-"),
            Self::Error => f.write_str("Error"),
            Self::InvalidFormula => f.write_str("Error: Invalid formula"),
        }
    }
}

impl Serialize for Total {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => serializer.serialize_f64(*value),
            other => serializer.collect_str(other),
        }
    }
}

struct Aggregates {
    sum: f64,
    count: f64,
    max: f64,
    min: f64,
}

impl Aggregates {
    /// `values` must be non-empty and finite.
    fn of(values: &[f64]) -> Self {
        Self {
            sum: values.iter().sum(),
            count: values.len() as f64,
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    fn keyword(&self, keyword: &str) -> Option<f64> {
        match keyword.to_ascii_uppercase().as_str() {
            "SUM" => Some(self.sum),
            "AVERAGE" | "AVG" => Some(self.sum / self.count),
            "MAX" => Some(self.max),
            "MIN" => Some(self.min),
            "COUNT" => Some(self.count),
            _ => None,
        }
    }
}

fn is_arithmetic(character: char) -> bool {
    character.is_ascii_digit() || character.is_whitespace() || "+-*/.()".contains(character)
}

/// Apply `formula` to the finite entries of `values`.
pub fn aggregate_total(formula: &str, values: &[f64]) -> Total {
    let formula = formula.trim();
    if formula.is_empty() {
        return Total::Empty;
    }
    let values: Vec<f64> = values.iter().copied().filter(|value| value.is_finite()).collect();
    if values.is_empty() {
        return Total::Empty;
    }
    let aggregates = Aggregates::of(&values);

    if let Some(value) = aggregates.keyword(formula) {
        return Total::Value(value);
    }

    let substituted = KEYWORD.replace_all(formula, |captures: &Captures| {
        aggregates
            .keyword(&captures[1])
            .map(|value| format!("({value})"))
            .unwrap_or_default()
    });
    if !substituted.chars().all(is_arithmetic) {
        log::debug!("total formula '{formula}' rejected after substitution: '{substituted}'");
        return Total::InvalidFormula;
    }

    match parse_formula(&substituted).and_then(|parsed| parsed.evaluate(|_| None).map_err(|error| vec![error])) {
        Ok(value) => Total::Value(value),
        Err(errors) => {
            log::debug!("total formula '{formula}' failed: {errors:?}");
            Total::Error
        }
    }
}

/// The numbers of a column; non-numeric cells are left out.
pub fn numeric_column<'a>(values: impl IntoIterator<Item = &'a FieldValue>) -> Vec<f64> {
    values.into_iter().filter_map(FieldValue::as_number).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnTotal {
    pub name: String,
    pub formula: String,
    pub total: Total,
}

/// One total per field name across `rows`, in order of first appearance.
///
/// Only `number` fields take part. The first row defining a name supplies its
/// total formula and whether it is totalled at all.
pub fn column_totals<'a>(rows: impl IntoIterator<Item = &'a Specification>) -> Vec<ColumnTotal> {
    let mut columns: IndexMap<&str, (&str, bool, Vec<&FieldValue>)> = IndexMap::new();
    for row in rows {
        for field in row.fields().iter().filter(|field| field.data_type == DataType::Number) {
            let column = columns
                .entry(field.name.as_str())
                .or_insert_with(|| (field.total_formula.as_str(), field.include_in_total, Vec::new()));
            column.2.push(&field.value);
        }
    }
    columns
        .into_iter()
        .filter(|(_, (_, include_in_total, _))| *include_in_total)
        .map(|(name, (formula, _, values))| ColumnTotal {
            name: name.to_string(),
            formula: formula.to_string(),
            total: aggregate_total(formula, &numeric_column(values)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpecificationField;

    #[test]
    fn test_keywords() {
        assert_eq!(aggregate_total("SUM", &[1.0, 2.0, 3.0]), Total::Value(6.0));
        assert_eq!(aggregate_total("AVERAGE", &[2.0, 4.0]), Total::Value(3.0));
        assert_eq!(aggregate_total(" avg ", &[2.0, 4.0]), Total::Value(3.0));
        assert_eq!(aggregate_total("max", &[2.0, 7.0, -1.0]), Total::Value(7.0));
        assert_eq!(aggregate_total("Min", &[2.0, 7.0, -1.0]), Total::Value(-1.0));
        assert_eq!(aggregate_total("COUNT", &[2.0, 7.0, -1.0]), Total::Value(3.0));
    }

    #[test]
    fn test_expressions_over_keywords() {
        assert_eq!(aggregate_total("SUM / COUNT", &[2.0, 4.0]), Total::Value(3.0));
        assert_eq!(aggregate_total("sum * 2 + 1", &[1.0, 2.0]), Total::Value(7.0));
        assert_eq!(aggregate_total("MAX - MIN", &[-3.0, 5.0]), Total::Value(8.0));
        assert_eq!(aggregate_total("SUM - MIN", &[-3.0, 5.0]), Total::Value(5.0));
        assert_eq!(aggregate_total("SUM * .5", &[4.0]), Total::Value(2.0));
        assert_eq!(aggregate_total("SUM * 01", &[4.0]), Total::Value(4.0));
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(aggregate_total("", &[1.0]), Total::Empty);
        assert_eq!(aggregate_total("   ", &[1.0]), Total::Empty);
        assert_eq!(aggregate_total("SUM", &[]), Total::Empty);
        assert_eq!(aggregate_total("SUM", &[f64::NAN, f64::INFINITY]), Total::Empty);
        assert_eq!(Total::Empty.to_string(), "-");
    }

    #[test]
    fn test_rejected_formulas() {
        assert_eq!(aggregate_total("SUM+1; DROP TABLE", &[1.0]), Total::InvalidFormula);
        assert_eq!(aggregate_total("SUMMARY", &[1.0]), Total::InvalidFormula);
        assert_eq!(aggregate_total("width * 2", &[1.0]), Total::InvalidFormula);
        assert_eq!(
            aggregate_total("SUM; 1", &[1.0]).to_string(),
            "Error: Invalid formula"
        );
    }

    #[test]
    fn test_evaluation_errors() {
        assert_eq!(aggregate_total("SUM +", &[1.0]), Total::Error);
        assert_eq!(aggregate_total("SUM / 0", &[1.0]), Total::Error);
        assert_eq!(Total::Error.to_string(), "Error");
    }

    #[test]
    fn test_column_totals() {
        let first = Specification::from_fields(vec![
            SpecificationField::number("Weight", 2.0),
            SpecificationField::number("Height", 10.0).with_total_formula("MAX"),
            SpecificationField::number("Code", 1.0).with_include_in_total(false),
        ]);
        let second = Specification::from_fields(vec![
            SpecificationField::number("Weight", 3.0),
            SpecificationField::number("Height", 12.0),
            SpecificationField::new("Depth", DataType::Number),
            SpecificationField::new("Label", DataType::String).with_value("n/a"),
        ]);
        let totals = column_totals([&first, &second]);
        let summary: Vec<(&str, String)> = totals
            .iter()
            .map(|column| (column.name.as_str(), column.total.to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Weight", "5".to_string()),
                ("Height", "12".to_string()),
                ("Depth", "-".to_string()),
            ]
        );
    }

    #[test]
    fn test_text_columns_are_not_totalled() {
        let rows = [
            Specification::from_fields(vec![SpecificationField::new("Code", DataType::String).with_value("7")]),
            Specification::from_fields(vec![SpecificationField::new("Code", DataType::String).with_value("8")]),
        ];
        assert!(column_totals(&rows).is_empty());
    }
}
