//! Contracts and their per-type option records.
//!
//! A contract is signed for a facility stay, an apartment or in-region home
//! care; the matching option row carries the placement details and the
//! lifecycle state. Options die with their contract; placements they point
//! at (dining room, room, region, care level) may disappear independently,
//! leaving the option with a null reference.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use seniorcare_core::{
    Audit, ColumnType, Constraint, DomainError, DomainResult, EntityId, FieldValue, GridColumn,
    GridJoin, GridView, Gridded, LifecycleState, Projection, Record, Rule, Validate,
};

use crate::care::CareFlags;

/// Kind of service a contract covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum ContractType {
    Facility = 1,
    Apartment = 2,
    Region = 3,
}

impl_coded!(ContractType, "contract type", { Facility = 1, Apartment = 2, Region = 3 });

const CONTRACT_GROUPS: &[&str] = &["api_admin_contract_add", "api_admin_contract_edit"];

/// Service contract for a resident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: EntityId,
    pub resident_id: EntityId,
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    pub contract_type: ContractType,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Contract {
    pub fn new(resident_id: EntityId, contract_type: ContractType, start: NaiveDate) -> Self {
        Self {
            id: EntityId::new(),
            resident_id,
            start,
            end: None,
            contract_type,
            audit: Audit::default(),
        }
    }

    /// In force on `day`.
    pub fn is_open(&self, day: NaiveDate) -> bool {
        self.start <= day && self.end.map_or(true, |end| end >= day)
    }

    /// Set the end date; it may not precede the start.
    pub fn close(&mut self, end: NaiveDate) -> DomainResult<()> {
        if end < self.start {
            return Err(DomainError::validation("contract cannot end before it starts"));
        }
        self.end = Some(end);
        Ok(())
    }
}

impl_record!(Contract, "tbl_contract");
impl_audited!(Contract);
impl_operations!(Contract, "api_admin_contract_add", "api_admin_contract_edit");

impl Validate for Contract {
    fn rules() -> Vec<Rule> {
        vec![
            Rule::new("start", Constraint::NotNull, CONTRACT_GROUPS),
            Rule::new("end", Constraint::NotBefore("start"), CONTRACT_GROUPS),
            Rule::new("contract_type", Constraint::Choice(ContractType::CODES), CONTRACT_GROUPS),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "resident_id" => FieldValue::Uuid(*self.resident_id.as_uuid()),
            "start" => self.start.into(),
            "end" => self.end.map_or(FieldValue::Null, FieldValue::Date),
            "contract_type" => FieldValue::Integer(i64::from(self.contract_type.code())),
            _ => FieldValue::Unknown,
        }
    }
}

impl Projection for Contract {
    fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
        match group {
            "list" => Some(&["id", "resident_id", "start", "end", "contract_type"]),
            _ => None,
        }
    }
}

/// Group used when an option is created together with its contract.
pub const CONTRACT_FACILITY_ADD: &str = "api_admin_contract_facility_add";
pub const CONTRACT_FACILITY_EDIT: &str = "api_admin_contract_facility_edit";
/// State-only change of an existing option.
pub const CONTRACT_FACILITY_STATE: &str = "api_admin_contract_facility_state";

/// Facility placement details for a facility contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractFacilityOption {
    pub id: EntityId,
    pub contract_id: EntityId,
    #[serde(default)]
    pub dining_room_id: Option<EntityId>,
    #[serde(default)]
    pub care_level_id: Option<EntityId>,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(flatten)]
    pub care: CareFlags,
    #[serde(flatten)]
    pub audit: Audit,
}

impl ContractFacilityOption {
    pub fn new(contract_id: EntityId) -> Self {
        Self {
            id: EntityId::new(),
            contract_id,
            dining_room_id: None,
            care_level_id: None,
            state: LifecycleState::default(),
            care: CareFlags::default(),
            audit: Audit::default(),
        }
    }
}

impl_record!(ContractFacilityOption, "tbl_contract_facility_option");
impl_audited!(ContractFacilityOption);
impl_lifecycle!(ContractFacilityOption);
impl_operations!(ContractFacilityOption, CONTRACT_FACILITY_ADD, CONTRACT_FACILITY_EDIT);

impl Validate for ContractFacilityOption {
    fn rules() -> Vec<Rule> {
        const ALL: &[&str] = &[CONTRACT_FACILITY_ADD, CONTRACT_FACILITY_EDIT];
        vec![
            // The dining room is picked when the stay starts; later edits may
            // leave it empty (e.g. after the room was removed).
            Rule::new("dining_room_id", Constraint::NotNull, &[CONTRACT_FACILITY_ADD]),
            Rule::new("care_level_id", Constraint::NotNull, ALL),
            Rule::new("care_group", CareFlags::CARE_GROUP, ALL),
            Rule::new(
                "state",
                Constraint::Choice(LifecycleState::CODES),
                &[CONTRACT_FACILITY_ADD, CONTRACT_FACILITY_EDIT, CONTRACT_FACILITY_STATE],
            ),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "contract_id" => FieldValue::Uuid(*self.contract_id.as_uuid()),
            "dining_room_id" => self.dining_room_id.into(),
            "care_level_id" => self.care_level_id.into(),
            "state" => FieldValue::Integer(i64::from(self.state.code())),
            other => self.care.field(other),
        }
    }
}

impl Gridded for ContractFacilityOption {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", ContractFacilityOption::TABLE, "cfo")
                .join(GridJoin::new("c", Contract::TABLE, "cfo", "contract_id"))
                .join(GridJoin::new("r", "tbl_resident", "c", "resident_id"))
                .join(GridJoin::new("dr", "tbl_dining_room", "cfo", "dining_room_id"))
                .join(GridJoin::new("cl", "tbl_care_level", "cfo", "care_level_id"))
                .scoped("r", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("cfo.id"))
                .column(
                    GridColumn::new("resident", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("CONCAT(r.first_name, ' ', r.last_name)"),
                )
                .column(
                    GridColumn::new("start", ColumnType::Date)
                        .sortable()
                        .filterable()
                        .expr("c.start"),
                )
                .column(
                    GridColumn::new("end", ColumnType::Date)
                        .sortable()
                        .filterable()
                        .expr("c.end"),
                )
                .column(
                    GridColumn::new("dining_room", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("dr.title"),
                )
                .column(
                    GridColumn::new("care_level", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("cl.title"),
                )
                .column(
                    GridColumn::new("state", ColumnType::Number)
                        .sortable()
                        .filterable()
                        .expr("cfo.state"),
                )
                .column(GridColumn::new("dnr", ColumnType::Boolean).filterable().expr("cfo.dnr"))
                .column(GridColumn::new("polst", ColumnType::Boolean).filterable().expr("cfo.polst"))
                .column(
                    GridColumn::new("ambulatory", ColumnType::Boolean)
                        .filterable()
                        .expr("cfo.ambulatory"),
                )
                .column(
                    GridColumn::new("care_group", ColumnType::Number)
                        .sortable()
                        .filterable()
                        .expr("cfo.care_group"),
                ),
        ]
    }
}

impl Projection for ContractFacilityOption {
    fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
        match group {
            "list" => Some(&["id", "contract_id", "dining_room_id", "state"]),
            _ => None,
        }
    }
}

pub const CONTRACT_APARTMENT_ADD: &str = "api_admin_contract_apartment_add";
pub const CONTRACT_APARTMENT_EDIT: &str = "api_admin_contract_apartment_edit";

/// Apartment placement details for an apartment contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractApartmentOption {
    pub id: EntityId,
    pub contract_id: EntityId,
    #[serde(default)]
    pub apartment_room_id: Option<EntityId>,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(flatten)]
    pub audit: Audit,
}

impl ContractApartmentOption {
    pub fn new(contract_id: EntityId) -> Self {
        Self {
            id: EntityId::new(),
            contract_id,
            apartment_room_id: None,
            state: LifecycleState::default(),
            audit: Audit::default(),
        }
    }
}

impl_record!(ContractApartmentOption, "tbl_contract_apartment_option");
impl_audited!(ContractApartmentOption);
impl_lifecycle!(ContractApartmentOption);
impl_operations!(ContractApartmentOption, CONTRACT_APARTMENT_ADD, CONTRACT_APARTMENT_EDIT);

impl Validate for ContractApartmentOption {
    fn rules() -> Vec<Rule> {
        const ALL: &[&str] = &[CONTRACT_APARTMENT_ADD, CONTRACT_APARTMENT_EDIT];
        vec![
            Rule::new("apartment_room_id", Constraint::NotNull, &[CONTRACT_APARTMENT_ADD]),
            Rule::new("state", Constraint::Choice(LifecycleState::CODES), ALL),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "contract_id" => FieldValue::Uuid(*self.contract_id.as_uuid()),
            "apartment_room_id" => self.apartment_room_id.into(),
            "state" => FieldValue::Integer(i64::from(self.state.code())),
            _ => FieldValue::Unknown,
        }
    }
}

impl Gridded for ContractApartmentOption {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", ContractApartmentOption::TABLE, "cao")
                .join(GridJoin::new("c", Contract::TABLE, "cao", "contract_id"))
                .join(GridJoin::new("r", "tbl_resident", "c", "resident_id"))
                .join(GridJoin::new("ar", "tbl_apartment_room", "cao", "apartment_room_id"))
                .join(GridJoin::new("a", "tbl_apartment", "ar", "apartment_id"))
                .scoped("r", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("cao.id"))
                .column(
                    GridColumn::new("resident", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("CONCAT(r.first_name, ' ', r.last_name)"),
                )
                .column(
                    GridColumn::new("apartment", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("a.name"),
                )
                .column(
                    GridColumn::new("room", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("ar.number"),
                )
                .column(
                    GridColumn::new("state", ColumnType::Number)
                        .sortable()
                        .filterable()
                        .expr("cao.state"),
                ),
        ]
    }
}

pub const CONTRACT_REGION_ADD: &str = "api_admin_contract_region_add";
pub const CONTRACT_REGION_EDIT: &str = "api_admin_contract_region_edit";

/// In-home care details for a region contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRegionOption {
    pub id: EntityId,
    pub contract_id: EntityId,
    #[serde(default)]
    pub region_id: Option<EntityId>,
    pub street_address: String,
    pub city: String,
    pub zip: String,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(flatten)]
    pub care: CareFlags,
    #[serde(flatten)]
    pub audit: Audit,
}

impl ContractRegionOption {
    pub fn new(contract_id: EntityId) -> Self {
        Self {
            id: EntityId::new(),
            contract_id,
            region_id: None,
            street_address: String::new(),
            city: String::new(),
            zip: String::new(),
            state: LifecycleState::default(),
            care: CareFlags::default(),
            audit: Audit::default(),
        }
    }
}

impl_record!(ContractRegionOption, "tbl_contract_region_option");
impl_audited!(ContractRegionOption);
impl_lifecycle!(ContractRegionOption);
impl_operations!(ContractRegionOption, CONTRACT_REGION_ADD, CONTRACT_REGION_EDIT);

impl Validate for ContractRegionOption {
    fn rules() -> Vec<Rule> {
        const ALL: &[&str] = &[CONTRACT_REGION_ADD, CONTRACT_REGION_EDIT];
        vec![
            Rule::new("region_id", Constraint::NotNull, &[CONTRACT_REGION_ADD]),
            Rule::new("street_address", Constraint::NotBlank, ALL),
            Rule::new("street_address", Constraint::Length { min: None, max: Some(100) }, ALL),
            Rule::new("city", Constraint::NotBlank, ALL),
            Rule::new("zip", Constraint::NotBlank, ALL),
            Rule::new("zip", Constraint::Mask("99999"), ALL),
            Rule::new("care_group", CareFlags::CARE_GROUP, ALL),
            Rule::new("state", Constraint::Choice(LifecycleState::CODES), ALL),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "contract_id" => FieldValue::Uuid(*self.contract_id.as_uuid()),
            "region_id" => self.region_id.into(),
            "street_address" => (&self.street_address).into(),
            "city" => (&self.city).into(),
            "zip" => (&self.zip).into(),
            "state" => FieldValue::Integer(i64::from(self.state.code())),
            other => self.care.field(other),
        }
    }
}

impl Gridded for ContractRegionOption {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", ContractRegionOption::TABLE, "cro")
                .join(GridJoin::new("c", Contract::TABLE, "cro", "contract_id"))
                .join(GridJoin::new("r", "tbl_resident", "c", "resident_id"))
                .join(GridJoin::new("rg", "tbl_region", "cro", "region_id"))
                .scoped("r", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("cro.id"))
                .column(
                    GridColumn::new("resident", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("CONCAT(r.first_name, ' ', r.last_name)"),
                )
                .column(
                    GridColumn::new("region", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("rg.name"),
                )
                .column(
                    GridColumn::new("address", ColumnType::String)
                        .filterable()
                        .expr("CONCAT(cro.street_address, ', ', cro.city, ' ', cro.zip)"),
                )
                .column(
                    GridColumn::new("state", ColumnType::Number)
                        .sortable()
                        .filterable()
                        .expr("cro.state"),
                ),
        ]
    }
}
