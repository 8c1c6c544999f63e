//! Residents and where they live.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use seniorcare_core::{
    Audit, ColumnType, Constraint, EntityId, FieldValue, GridColumn, GridJoin, GridView, Gridded,
    LifecycleState, Projection, Record, Rule, SpaceId, Validate,
};
use serde_json::Value;

use crate::care::CareFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum Gender {
    Male = 1,
    Female = 2,
}

impl_coded!(Gender, "gender", { Male = 1, Female = 2 });

const RESIDENT_GROUPS: &[&str] = &["api_admin_resident_add", "api_admin_resident_edit"];

/// Person receiving care within a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resident {
    pub id: EntityId,
    pub space_id: SpaceId,
    #[serde(default)]
    pub salutation_id: Option<EntityId>,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub birthday: NaiveDate,
    pub gender: Gender,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Resident {
    pub fn new(
        space_id: SpaceId,
        first_name: &str,
        last_name: &str,
        birthday: NaiveDate,
        gender: Gender,
    ) -> Self {
        Self {
            id: EntityId::new(),
            space_id,
            salutation_id: None,
            first_name: first_name.to_string(),
            middle_name: None,
            last_name: last_name.to_string(),
            birthday,
            gender,
            audit: Audit::default(),
        }
    }

    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Whole years lived on `day`.
    pub fn age_on(&self, day: NaiveDate) -> u32 {
        day.years_since(self.birthday).unwrap_or(0)
    }
}

impl_record!(Resident, "tbl_resident", space: space_id);
impl_audited!(Resident);
impl_operations!(Resident, "api_admin_resident_add", "api_admin_resident_edit");

impl Validate for Resident {
    fn rules() -> Vec<Rule> {
        let name = Constraint::Length {
            min: None,
            max: Some(60),
        };
        vec![
            Rule::new("first_name", Constraint::NotBlank, RESIDENT_GROUPS),
            Rule::new("first_name", name.clone(), RESIDENT_GROUPS),
            Rule::new("middle_name", name.clone(), RESIDENT_GROUPS),
            Rule::new("last_name", Constraint::NotBlank, RESIDENT_GROUPS),
            Rule::new("last_name", name, RESIDENT_GROUPS),
            Rule::new("birthday", Constraint::NotNull, RESIDENT_GROUPS),
            Rule::new("gender", Constraint::Choice(Gender::CODES), RESIDENT_GROUPS),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "space_id" => FieldValue::Uuid(*self.space_id.as_uuid()),
            "salutation_id" => self.salutation_id.into(),
            "first_name" => (&self.first_name).into(),
            "middle_name" => (&self.middle_name).into(),
            "last_name" => (&self.last_name).into(),
            "birthday" => self.birthday.into(),
            "gender" => FieldValue::Integer(i64::from(self.gender.code())),
            _ => FieldValue::Unknown,
        }
    }
}

impl Gridded for Resident {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", Resident::TABLE, "r")
                .join(GridJoin::new("sal", "tbl_salutation", "r", "salutation_id"))
                .scoped("r", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("r.id"))
                .column(
                    GridColumn::new("salutation", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("sal.title"),
                )
                .column(
                    GridColumn::new("first_name", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("r.first_name"),
                )
                .column(
                    GridColumn::new("last_name", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("r.last_name"),
                )
                .column(
                    GridColumn::new("birthday", ColumnType::Date)
                        .sortable()
                        .filterable()
                        .expr("r.birthday"),
                )
                .column(
                    GridColumn::new("gender", ColumnType::Number)
                        .sortable()
                        .filterable()
                        .expr("r.gender"),
                ),
        ]
    }
}

impl Projection for Resident {
    fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
        match group {
            "list" => Some(&["id", "first_name", "last_name", "birthday", "gender"]),
            _ => None,
        }
    }

    fn virtual_fields(&self, group: &str) -> Vec<(&'static str, Value)> {
        match group {
            "list" => vec![("full_name", Value::String(self.full_name()))],
            _ => Vec::new(),
        }
    }
}

pub const RESIDENT_FACILITY_ADD: &str = "api_admin_resident_facility_option_add";
pub const RESIDENT_FACILITY_EDIT: &str = "api_admin_resident_facility_option_edit";

/// Facility a resident is admitted to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentFacilityOption {
    pub id: EntityId,
    pub resident_id: EntityId,
    pub facility_id: EntityId,
    #[serde(default)]
    pub dining_room_id: Option<EntityId>,
    #[serde(default)]
    pub care_level_id: Option<EntityId>,
    pub date_admitted: NaiveDate,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(flatten)]
    pub care: CareFlags,
    #[serde(flatten)]
    pub audit: Audit,
}

impl ResidentFacilityOption {
    pub fn new(resident_id: EntityId, facility_id: EntityId, date_admitted: NaiveDate) -> Self {
        Self {
            id: EntityId::new(),
            resident_id,
            facility_id,
            dining_room_id: None,
            care_level_id: None,
            date_admitted,
            state: LifecycleState::default(),
            care: CareFlags::default(),
            audit: Audit::default(),
        }
    }
}

impl_record!(ResidentFacilityOption, "tbl_resident_facility_option");
impl_audited!(ResidentFacilityOption);
impl_lifecycle!(ResidentFacilityOption);
impl_operations!(ResidentFacilityOption, RESIDENT_FACILITY_ADD, RESIDENT_FACILITY_EDIT);

impl Validate for ResidentFacilityOption {
    fn rules() -> Vec<Rule> {
        const ALL: &[&str] = &[RESIDENT_FACILITY_ADD, RESIDENT_FACILITY_EDIT];
        vec![
            Rule::new("facility_id", Constraint::NotNull, ALL),
            Rule::new("resident_id", Constraint::UniqueWith(&[]), &[RESIDENT_FACILITY_ADD]),
            Rule::new("date_admitted", Constraint::NotNull, ALL),
            Rule::new("care_group", CareFlags::CARE_GROUP, ALL),
            Rule::new("state", Constraint::Choice(LifecycleState::CODES), ALL),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "resident_id" => FieldValue::Uuid(*self.resident_id.as_uuid()),
            "facility_id" => FieldValue::Uuid(*self.facility_id.as_uuid()),
            "dining_room_id" => self.dining_room_id.into(),
            "care_level_id" => self.care_level_id.into(),
            "date_admitted" => self.date_admitted.into(),
            "state" => FieldValue::Integer(i64::from(self.state.code())),
            other => self.care.field(other),
        }
    }
}

impl Gridded for ResidentFacilityOption {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", ResidentFacilityOption::TABLE, "rfo")
                .join(GridJoin::new("r", Resident::TABLE, "rfo", "resident_id"))
                .join(GridJoin::new("f", "tbl_facility", "rfo", "facility_id"))
                .join(GridJoin::new("dr", "tbl_dining_room", "rfo", "dining_room_id"))
                .scoped("r", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("rfo.id"))
                .column(
                    GridColumn::new("resident", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("CONCAT(r.first_name, ' ', r.last_name)"),
                )
                .column(
                    GridColumn::new("facility", ColumnType::StringUppercase)
                        .sortable()
                        .filterable()
                        .expr("f.shorthand"),
                )
                .column(
                    GridColumn::new("dining_room", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("dr.title"),
                )
                .column(
                    GridColumn::new("date_admitted", ColumnType::Date)
                        .sortable()
                        .filterable()
                        .expr("rfo.date_admitted"),
                )
                .column(
                    GridColumn::new("state", ColumnType::Number)
                        .sortable()
                        .filterable()
                        .expr("rfo.state"),
                ),
        ]
    }
}

pub const RESIDENT_APARTMENT_ADD: &str = "api_admin_resident_apartment_option_add";
pub const RESIDENT_APARTMENT_EDIT: &str = "api_admin_resident_apartment_option_edit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentApartmentOption {
    pub id: EntityId,
    pub resident_id: EntityId,
    pub apartment_id: EntityId,
    pub date_admitted: NaiveDate,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(flatten)]
    pub audit: Audit,
}

impl ResidentApartmentOption {
    pub fn new(resident_id: EntityId, apartment_id: EntityId, date_admitted: NaiveDate) -> Self {
        Self {
            id: EntityId::new(),
            resident_id,
            apartment_id,
            date_admitted,
            state: LifecycleState::default(),
            audit: Audit::default(),
        }
    }
}

impl_record!(ResidentApartmentOption, "tbl_resident_apartment_option");
impl_audited!(ResidentApartmentOption);
impl_lifecycle!(ResidentApartmentOption);
impl_operations!(ResidentApartmentOption, RESIDENT_APARTMENT_ADD, RESIDENT_APARTMENT_EDIT);

impl Validate for ResidentApartmentOption {
    fn rules() -> Vec<Rule> {
        const ALL: &[&str] = &[RESIDENT_APARTMENT_ADD, RESIDENT_APARTMENT_EDIT];
        vec![
            Rule::new("resident_id", Constraint::UniqueWith(&[]), &[RESIDENT_APARTMENT_ADD]),
            Rule::new("date_admitted", Constraint::NotNull, ALL),
            Rule::new("state", Constraint::Choice(LifecycleState::CODES), ALL),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "resident_id" => FieldValue::Uuid(*self.resident_id.as_uuid()),
            "apartment_id" => FieldValue::Uuid(*self.apartment_id.as_uuid()),
            "date_admitted" => self.date_admitted.into(),
            "state" => FieldValue::Integer(i64::from(self.state.code())),
            _ => FieldValue::Unknown,
        }
    }
}

pub const RESIDENT_REGION_ADD: &str = "api_admin_resident_region_option_add";
pub const RESIDENT_REGION_EDIT: &str = "api_admin_resident_region_option_edit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentRegionOption {
    pub id: EntityId,
    pub resident_id: EntityId,
    pub region_id: EntityId,
    pub date_admitted: NaiveDate,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(flatten)]
    pub care: CareFlags,
    #[serde(flatten)]
    pub audit: Audit,
}

impl ResidentRegionOption {
    pub fn new(resident_id: EntityId, region_id: EntityId, date_admitted: NaiveDate) -> Self {
        Self {
            id: EntityId::new(),
            resident_id,
            region_id,
            date_admitted,
            state: LifecycleState::default(),
            care: CareFlags::default(),
            audit: Audit::default(),
        }
    }
}

impl_record!(ResidentRegionOption, "tbl_resident_region_option");
impl_audited!(ResidentRegionOption);
impl_lifecycle!(ResidentRegionOption);
impl_operations!(ResidentRegionOption, RESIDENT_REGION_ADD, RESIDENT_REGION_EDIT);

impl Validate for ResidentRegionOption {
    fn rules() -> Vec<Rule> {
        const ALL: &[&str] = &[RESIDENT_REGION_ADD, RESIDENT_REGION_EDIT];
        vec![
            Rule::new("resident_id", Constraint::UniqueWith(&[]), &[RESIDENT_REGION_ADD]),
            Rule::new("date_admitted", Constraint::NotNull, ALL),
            Rule::new("care_group", CareFlags::CARE_GROUP, ALL),
            Rule::new("state", Constraint::Choice(LifecycleState::CODES), ALL),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "resident_id" => FieldValue::Uuid(*self.resident_id.as_uuid()),
            "region_id" => FieldValue::Uuid(*self.region_id.as_uuid()),
            "date_admitted" => self.date_admitted.into(),
            "state" => FieldValue::Integer(i64::from(self.state.code())),
            other => self.care.field(other),
        }
    }
}

/// Allergy recorded for a resident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentAllergen {
    pub id: EntityId,
    pub resident_id: EntityId,
    pub allergen_id: EntityId,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl ResidentAllergen {
    pub fn new(resident_id: EntityId, allergen_id: EntityId) -> Self {
        Self {
            id: EntityId::new(),
            resident_id,
            allergen_id,
            notes: None,
            audit: Audit::default(),
        }
    }
}

impl_record!(ResidentAllergen, "tbl_resident_allergen");
impl_audited!(ResidentAllergen);
impl_operations!(
    ResidentAllergen,
    "api_admin_resident_allergen_add",
    "api_admin_resident_allergen_edit"
);

impl Validate for ResidentAllergen {
    fn rules() -> Vec<Rule> {
        const ALL: &[&str] = &[
            "api_admin_resident_allergen_add",
            "api_admin_resident_allergen_edit",
        ];
        vec![
            Rule::new("allergen_id", Constraint::UniqueWith(&["resident_id"]), ALL),
            Rule::new("notes", Constraint::Length { min: None, max: Some(512) }, ALL),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "resident_id" => FieldValue::Uuid(*self.resident_id.as_uuid()),
            "allergen_id" => FieldValue::Uuid(*self.allergen_id.as_uuid()),
            "notes" => (&self.notes).into(),
            _ => FieldValue::Unknown,
        }
    }
}

/// Medication prescribed to a resident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentMedication {
    pub id: EntityId,
    pub resident_id: EntityId,
    pub medication_id: EntityId,
    pub dosage: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl ResidentMedication {
    pub fn new(resident_id: EntityId, medication_id: EntityId, dosage: &str) -> Self {
        Self {
            id: EntityId::new(),
            resident_id,
            medication_id,
            dosage: dosage.to_string(),
            notes: None,
            audit: Audit::default(),
        }
    }
}

impl_record!(ResidentMedication, "tbl_resident_medication");
impl_audited!(ResidentMedication);
impl_operations!(
    ResidentMedication,
    "api_admin_resident_medication_add",
    "api_admin_resident_medication_edit"
);

impl Validate for ResidentMedication {
    fn rules() -> Vec<Rule> {
        const ALL: &[&str] = &[
            "api_admin_resident_medication_add",
            "api_admin_resident_medication_edit",
        ];
        vec![
            Rule::new("medication_id", Constraint::UniqueWith(&["resident_id"]), ALL),
            Rule::new("dosage", Constraint::NotBlank, ALL),
            Rule::new("dosage", Constraint::Length { min: None, max: Some(255) }, ALL),
            Rule::new("notes", Constraint::Length { min: None, max: Some(512) }, ALL),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "resident_id" => FieldValue::Uuid(*self.resident_id.as_uuid()),
            "medication_id" => FieldValue::Uuid(*self.medication_id.as_uuid()),
            "dosage" => (&self.dosage).into(),
            "notes" => (&self.notes).into(),
            _ => FieldValue::Unknown,
        }
    }
}
