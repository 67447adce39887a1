//! Shared fixtures: a crate option type, two saved pallet records and a lid option.

#![allow(dead_code)]

use optispec::{
    Controller, DataType, EngineConfig, FieldValue, InMemoryCatalog, OptionType, ReferenceAttribute,
    ReferenceSelection, ReferenceSource, SourceId, SourceKind, Specification, SpecificationField, TypeDefault,
};

pub fn crate_type() -> OptionType {
    OptionType {
        id: SourceId::from("type-crate"),
        name: "Crate".to_string(),
        defaults: vec![
            TypeDefault::new("Length", DataType::Number, 120.0),
            TypeDefault::new("Width", DataType::Number, 80.0),
            TypeDefault::new("Material", DataType::String, "pine"),
        ],
    }
}

pub fn pallet(id: &str, net_weight: &str) -> ReferenceSource {
    ReferenceSource {
        id: SourceId::from(id),
        label: format!("Pallet {id}"),
        attributes: vec![
            ReferenceAttribute::new("Net Wt", net_weight),
            ReferenceAttribute::new("Colour", "blue"),
        ],
    }
}

pub fn lid() -> ReferenceSource {
    ReferenceSource {
        id: SourceId::from("lid"),
        label: "Lid".to_string(),
        attributes: vec![ReferenceAttribute::new("Lid Height", FieldValue::Number(5.0))],
    }
}

pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_type(crate_type())
        .with_reference(SourceKind::Specification, pallet("p1", "10"))
        .with_reference(SourceKind::Specification, pallet("p2", "12.5"))
        .with_reference(SourceKind::Option, lid())
}

pub fn controller(fields: Vec<SpecificationField>) -> Controller<InMemoryCatalog> {
    Controller::from_parts(
        catalog(),
        EngineConfig::default(),
        Specification::from_fields(fields),
        ReferenceSelection::new(),
    )
}

pub fn area_fields() -> Vec<SpecificationField> {
    vec![
        SpecificationField::number("length", 5.0),
        SpecificationField::number("width", 4.0),
        SpecificationField::calculated("area", "length * width"),
    ]
}

pub fn value(controller: &Controller<InMemoryCatalog>, name: &str) -> FieldValue {
    let index = controller
        .specification()
        .position(name)
        .unwrap_or_else(|| panic!("no field {name}"));
    controller.fields()[index].value.clone()
}

pub fn is_calculated(controller: &Controller<InMemoryCatalog>, name: &str) -> bool {
    let index = controller
        .specification()
        .position(name)
        .unwrap_or_else(|| panic!("no field {name}"));
    controller.fields()[index].is_calculated
}
