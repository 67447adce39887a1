mod common;

use common::{area_fields, controller};
use optispec::{FieldValue, Specification, SpecificationField, Total, aggregate_total, numeric_column};

#[test]
fn aggregate_keywords_and_sentinels() {
    assert_eq!(aggregate_total("SUM", &[1.0, 2.0, 3.0]).to_string(), "6");
    assert_eq!(aggregate_total("AVERAGE", &[2.0, 4.0]).to_string(), "3");
    assert_eq!(aggregate_total("", &[1.0]).to_string(), "-");
    assert_eq!(
        aggregate_total("SUM+1; DROP TABLE", &[1.0]).to_string(),
        "Error: Invalid formula"
    );
}

#[test]
fn numeric_column_skips_non_numbers() {
    let cells = [
        FieldValue::Number(2.0),
        FieldValue::text("3"),
        FieldValue::text("n/a"),
        FieldValue::Empty,
        FieldValue::Boolean(true),
    ];
    assert_eq!(numeric_column(&cells), vec![2.0, 3.0]);
}

#[test]
fn totals_across_specifications() {
    let controller = controller(area_fields());
    let other = Specification::from_fields(vec![
        SpecificationField::number("length", 7.0),
        SpecificationField::number("width", 1.0),
        SpecificationField::number("area", 7.0),
    ]);
    let totals = controller.totals([&other]);
    let area = totals.iter().find(|column| column.name == "area").unwrap();
    assert_eq!(area.total, Total::Value(27.0));
    assert_eq!(area.formula, "SUM");
}
