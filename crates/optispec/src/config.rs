//! Engine options.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TOTAL_FORMULA: &str = "SUM";

/// Which alias keys the context builder writes, and field defaults.
///
/// Every option defaults to the behavior saved specifications rely on, so an
/// empty config file is the same as no config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Write `OT_<name>` and `ot_<name>` next to `optionType_<name>`.
    pub legacy_type_aliases: bool,
    /// Write `<lowercase name>` for reference source attributes.
    pub lowercase_aliases: bool,
    /// Write the unsanitized name of reference source attributes as a key.
    pub original_name_aliases: bool,
    /// Total formula given to fields created by the engine.
    pub default_total_formula: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            legacy_type_aliases: true,
            lowercase_aliases: true,
            original_name_aliases: true,
            default_total_formula: DEFAULT_TOTAL_FORMULA.to_string(),
        }
    }
}
