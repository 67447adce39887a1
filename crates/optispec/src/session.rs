//! Editor session files for the command-line driver.
//!
//! A session bundles everything the persistence layer would hand the editor:
//!
//! ```json
//! {
//!   "types": [{"id": "t1", "name": "Crate", "defaults": [{"name": "Depth", "dataType": "number", "defaultValue": 30}]}],
//!   "specifications": [{"id": "s1", "label": "Pallet A", "attributes": [{"name": "Net Wt", "value": "4.5"}]}],
//!   "options": [],
//!   "selection": {"optionType": "t1", "specifications": ["s1"], "options": []},
//!   "fields": [{"name": "Weight", "dataType": "number", "formula": "Net_Wt * 2"}]
//! }
//! ```

use crate::config::EngineConfig;
use crate::controller::Controller;
use crate::model::{SavedField, Specification};
use crate::sources::{InMemoryCatalog, OptionType, ReferenceSelection, ReferenceSource, SourceKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub types: Vec<OptionType>,
    #[serde(default)]
    pub specifications: Vec<ReferenceSource>,
    #[serde(default)]
    pub options: Vec<ReferenceSource>,
    #[serde(default)]
    pub selection: ReferenceSelection,
    #[serde(default)]
    pub fields: Vec<SavedField>,
}

impl Session {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn catalog(&self) -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        for option_type in &self.types {
            catalog.insert_type(option_type.clone());
        }
        for source in &self.specifications {
            catalog.insert_reference(SourceKind::Specification, source.clone());
        }
        for source in &self.options {
            catalog.insert_reference(SourceKind::Option, source.clone());
        }
        catalog
    }

    /// Load the session into a controller; the first recompute runs immediately.
    pub fn into_controller(self, config: EngineConfig) -> Controller<InMemoryCatalog> {
        let catalog = self.catalog();
        Controller::from_parts(
            catalog,
            config,
            Specification::from_saved(self.fields),
            self.selection,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;

    const SESSION: &str = r#"{
        "types": [{"id": "t1", "name": "Crate", "defaults": [{"name": "Depth", "dataType": "number", "defaultValue": 30}]}],
        "specifications": [{"id": "s1", "label": "Pallet A", "attributes": [{"name": "Net Wt", "value": "4.5"}]}],
        "selection": {"optionType": "t1", "specifications": ["s1"]},
        "fields": [
            {"name": "Weight", "dataType": "number", "formula": "Net_Wt * 2"},
            {"name": "Depth cm", "dataType": "number", "formula": "optionType_Depth / 10"}
        ]
    }"#;

    #[test]
    fn test_session_evaluates() {
        let session = Session::from_json(SESSION).unwrap();
        assert!(session.options.is_empty());
        let controller = session.into_controller(EngineConfig::default());
        assert_eq!(controller.fields()[0].value, FieldValue::Number(9.0));
        assert_eq!(controller.fields()[1].value, FieldValue::Number(3.0));
    }

    #[test]
    fn test_empty_session() {
        let session = Session::from_json("{}").unwrap();
        let controller = session.into_controller(EngineConfig::default());
        assert!(controller.fields().is_empty());
    }
}
