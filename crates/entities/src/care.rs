//! Care status field group shared by facility and region options.

use serde::{Deserialize, Serialize};

use seniorcare_core::{Constraint, FieldValue, ValueObject};

/// Resident care flags: do-not-resuscitate, POLST on file, ambulatory,
/// and the care group the resident is assigned to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareFlags {
    #[serde(default)]
    pub dnr: bool,
    #[serde(default)]
    pub polst: bool,
    #[serde(default)]
    pub ambulatory: bool,
    #[serde(default)]
    pub care_group: Option<i64>,
}

impl ValueObject for CareFlags {}

impl CareFlags {
    /// Range accepted for `care_group`.
    pub const CARE_GROUP: Constraint = Constraint::Range {
        min: Some(1),
        max: Some(99),
    };

    pub fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "dnr" => self.dnr.into(),
            "polst" => self.polst.into(),
            "ambulatory" => self.ambulatory.into(),
            "care_group" => self.care_group.map_or(FieldValue::Null, FieldValue::Integer),
            _ => FieldValue::Unknown,
        }
    }
}
