//! Facilities, dining rooms, apartments and regions.

use serde::{Deserialize, Serialize};

use seniorcare_core::{
    Audit, ColumnType, Constraint, EntityId, FieldValue, GridColumn, GridJoin, GridView, Gridded,
    Projection, Record, Rule, SpaceId, Validate,
};

/// Licensed care facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: EntityId,
    pub space_id: SpaceId,
    pub name: String,
    /// Short code shown upper-cased in listings.
    pub shorthand: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub fax: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    pub beds_licensed: i64,
    pub beds_target: i64,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Facility {
    pub fn new(space_id: SpaceId, name: &str, shorthand: &str) -> Self {
        Self {
            id: EntityId::new(),
            space_id,
            name: seniorcare_core::normalize_title(name),
            shorthand: shorthand.to_string(),
            address: None,
            phone: None,
            fax: None,
            email: None,
            license: None,
            beds_licensed: 0,
            beds_target: 0,
            audit: Audit::default(),
        }
    }
}

impl_record!(Facility, "tbl_facility", space: space_id, title: name);
impl_audited!(Facility);
impl_operations!(Facility, "api_admin_facility_add", "api_admin_facility_edit");

impl Validate for Facility {
    fn rules() -> Vec<Rule> {
        const GROUPS: &[&str] = &["api_admin_facility_add", "api_admin_facility_edit"];
        vec![
            Rule::new("name", Constraint::NotBlank, GROUPS),
            Rule::new("name", Constraint::Length { min: None, max: Some(100) }, GROUPS),
            Rule::new("name", Constraint::UniqueWith(&["space_id"]), GROUPS),
            Rule::new("shorthand", Constraint::NotBlank, GROUPS),
            Rule::new("shorthand", Constraint::Length { min: None, max: Some(100) }, GROUPS),
            Rule::new("phone", Constraint::Mask("(999) 999-9999"), GROUPS),
            Rule::new("fax", Constraint::Mask("(999) 999-9999"), GROUPS),
            Rule::new("email", Constraint::Email, GROUPS),
            Rule::new("beds_licensed", Constraint::Range { min: Some(1), max: None }, GROUPS),
            Rule::new("beds_target", Constraint::Range { min: Some(1), max: None }, GROUPS),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "space_id" => FieldValue::Uuid(*self.space_id.as_uuid()),
            "name" => (&self.name).into(),
            "shorthand" => (&self.shorthand).into(),
            "address" => (&self.address).into(),
            "phone" => (&self.phone).into(),
            "fax" => (&self.fax).into(),
            "email" => (&self.email).into(),
            "license" => (&self.license).into(),
            "beds_licensed" => self.beds_licensed.into(),
            "beds_target" => self.beds_target.into(),
            _ => FieldValue::Unknown,
        }
    }
}

impl Gridded for Facility {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", Facility::TABLE, "f")
                .scoped("f", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("f.id"))
                .column(
                    GridColumn::new("name", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("f.name"),
                )
                .column(
                    GridColumn::new("shorthand", ColumnType::StringUppercase)
                        .sortable()
                        .filterable()
                        .expr("f.shorthand"),
                )
                .column(
                    GridColumn::new("phone", ColumnType::String)
                        .filterable()
                        .expr("f.phone"),
                )
                .column(
                    GridColumn::new("email", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("f.email"),
                )
                .column(
                    GridColumn::new("beds_licensed", ColumnType::Number)
                        .sortable()
                        .filterable()
                        .expr("f.beds_licensed"),
                )
                .column(
                    GridColumn::new("beds_target", ColumnType::Number)
                        .sortable()
                        .filterable()
                        .expr("f.beds_target"),
                ),
        ]
    }
}

impl Projection for Facility {
    fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
        match group {
            "list" => Some(&["id", "name", "shorthand"]),
            _ => None,
        }
    }
}

/// Dining room inside a facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningRoom {
    pub id: EntityId,
    pub facility_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl DiningRoom {
    pub fn new(facility_id: EntityId, title: &str) -> Self {
        Self {
            id: EntityId::new(),
            facility_id,
            title: seniorcare_core::normalize_title(title),
            notes: None,
            audit: Audit::default(),
        }
    }
}

impl_record!(DiningRoom, "tbl_dining_room", title: title);
impl_audited!(DiningRoom);
impl_operations!(DiningRoom, "api_admin_dining_room_add", "api_admin_dining_room_edit");

impl Validate for DiningRoom {
    fn rules() -> Vec<Rule> {
        const GROUPS: &[&str] = &["api_admin_dining_room_add", "api_admin_dining_room_edit"];
        vec![
            Rule::new("title", Constraint::NotBlank, GROUPS),
            Rule::new("title", Constraint::Length { min: None, max: Some(50) }, GROUPS),
            Rule::new("title", Constraint::UniqueWith(&["facility_id"]), GROUPS),
            Rule::new("notes", Constraint::Length { min: None, max: Some(512) }, GROUPS),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "facility_id" => FieldValue::Uuid(*self.facility_id.as_uuid()),
            "title" => (&self.title).into(),
            "notes" => (&self.notes).into(),
            _ => FieldValue::Unknown,
        }
    }
}

impl Gridded for DiningRoom {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", DiningRoom::TABLE, "dr")
                .join(GridJoin::new("f", Facility::TABLE, "dr", "facility_id"))
                .scoped("f", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("dr.id"))
                .column(
                    GridColumn::new("title", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("dr.title"),
                )
                .column(
                    GridColumn::new("facility", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("f.name"),
                )
                .column(GridColumn::new("notes", ColumnType::String).expr("dr.notes")),
        ]
    }
}

impl Projection for DiningRoom {
    fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
        match group {
            "list" => Some(&["id", "title", "facility_id"]),
            _ => None,
        }
    }
}

/// Independent-living apartment building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apartment {
    pub id: EntityId,
    pub space_id: SpaceId,
    pub name: String,
    pub shorthand: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub license_capacity: i64,
    pub capacity: i64,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Apartment {
    pub fn new(space_id: SpaceId, name: &str, shorthand: &str) -> Self {
        Self {
            id: EntityId::new(),
            space_id,
            name: seniorcare_core::normalize_title(name),
            shorthand: shorthand.to_string(),
            address: None,
            phone: None,
            license_capacity: 0,
            capacity: 0,
            audit: Audit::default(),
        }
    }
}

impl_record!(Apartment, "tbl_apartment", space: space_id, title: name);
impl_audited!(Apartment);
impl_operations!(Apartment, "api_admin_apartment_add", "api_admin_apartment_edit");

impl Validate for Apartment {
    fn rules() -> Vec<Rule> {
        const GROUPS: &[&str] = &["api_admin_apartment_add", "api_admin_apartment_edit"];
        vec![
            Rule::new("name", Constraint::NotBlank, GROUPS),
            Rule::new("name", Constraint::Length { min: None, max: Some(100) }, GROUPS),
            Rule::new("name", Constraint::UniqueWith(&["space_id"]), GROUPS),
            Rule::new("shorthand", Constraint::NotBlank, GROUPS),
            Rule::new("phone", Constraint::Mask("(999) 999-9999"), GROUPS),
            Rule::new("license_capacity", Constraint::Range { min: Some(1), max: None }, GROUPS),
            Rule::new("capacity", Constraint::Range { min: Some(1), max: None }, GROUPS),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "space_id" => FieldValue::Uuid(*self.space_id.as_uuid()),
            "name" => (&self.name).into(),
            "shorthand" => (&self.shorthand).into(),
            "address" => (&self.address).into(),
            "phone" => (&self.phone).into(),
            "license_capacity" => self.license_capacity.into(),
            "capacity" => self.capacity.into(),
            _ => FieldValue::Unknown,
        }
    }
}

impl Gridded for Apartment {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", Apartment::TABLE, "a")
                .scoped("a", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("a.id"))
                .column(
                    GridColumn::new("name", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("a.name"),
                )
                .column(
                    GridColumn::new("shorthand", ColumnType::StringUppercase)
                        .sortable()
                        .filterable()
                        .expr("a.shorthand"),
                )
                .column(
                    GridColumn::new("capacity", ColumnType::Number)
                        .sortable()
                        .filterable()
                        .expr("a.capacity"),
                ),
        ]
    }
}

/// Numbered room within an apartment building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApartmentRoom {
    pub id: EntityId,
    pub apartment_id: EntityId,
    pub number: String,
    pub floor: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ApartmentRoom {
    pub fn new(apartment_id: EntityId, number: &str, floor: i64) -> Self {
        Self {
            id: EntityId::new(),
            apartment_id,
            number: number.to_string(),
            floor,
            notes: None,
        }
    }
}

impl_record!(ApartmentRoom, "tbl_apartment_room");
impl_operations!(ApartmentRoom, "api_admin_apartment_room_add", "api_admin_apartment_room_edit");

impl Validate for ApartmentRoom {
    fn rules() -> Vec<Rule> {
        const GROUPS: &[&str] = &["api_admin_apartment_room_add", "api_admin_apartment_room_edit"];
        vec![
            Rule::new("number", Constraint::NotBlank, GROUPS),
            Rule::new("number", Constraint::Length { min: None, max: Some(10) }, GROUPS),
            Rule::new("number", Constraint::UniqueWith(&["apartment_id"]), GROUPS),
            Rule::new("floor", Constraint::Range { min: Some(1), max: Some(200) }, GROUPS),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "apartment_id" => FieldValue::Uuid(*self.apartment_id.as_uuid()),
            "number" => (&self.number).into(),
            "floor" => self.floor.into(),
            "notes" => (&self.notes).into(),
            _ => FieldValue::Unknown,
        }
    }
}

/// Service region for in-home care.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: EntityId,
    pub space_id: SpaceId,
    pub name: String,
    pub shorthand: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Region {
    pub fn new(space_id: SpaceId, name: &str, shorthand: &str) -> Self {
        Self {
            id: EntityId::new(),
            space_id,
            name: seniorcare_core::normalize_title(name),
            shorthand: shorthand.to_string(),
            description: None,
            audit: Audit::default(),
        }
    }
}

impl_record!(Region, "tbl_region", space: space_id, title: name);
impl_audited!(Region);
impl_operations!(Region, "api_admin_region_add", "api_admin_region_edit");

impl Validate for Region {
    fn rules() -> Vec<Rule> {
        const GROUPS: &[&str] = &["api_admin_region_add", "api_admin_region_edit"];
        vec![
            Rule::new("name", Constraint::NotBlank, GROUPS),
            Rule::new("name", Constraint::Length { min: None, max: Some(100) }, GROUPS),
            Rule::new("name", Constraint::UniqueWith(&["space_id"]), GROUPS),
            Rule::new("shorthand", Constraint::NotBlank, GROUPS),
            Rule::new("description", Constraint::Length { min: None, max: Some(512) }, GROUPS),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "space_id" => FieldValue::Uuid(*self.space_id.as_uuid()),
            "name" => (&self.name).into(),
            "shorthand" => (&self.shorthand).into(),
            "description" => (&self.description).into(),
            _ => FieldValue::Unknown,
        }
    }
}

impl Gridded for Region {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", Region::TABLE, "rg")
                .scoped("rg", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("rg.id"))
                .column(
                    GridColumn::new("name", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("rg.name"),
                )
                .column(
                    GridColumn::new("shorthand", ColumnType::StringUppercase)
                        .sortable()
                        .filterable()
                        .expr("rg.shorthand"),
                )
                .column(GridColumn::new("description", ColumnType::String).expr("rg.description")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seniorcare_core::Operations;
    use seniorcare_core::validation::{unique_checks, validate};

    #[test]
    fn facility_requires_us_phone_mask() {
        let mut f = Facility::new(SpaceId::new(), "Sunrise  Home", "srh");
        assert_eq!(f.name, "Sunrise Home");
        f.beds_licensed = 40;
        f.beds_target = 35;
        f.phone = Some("555-1234".into());
        let errors = validate(&f, &Facility::add_groups()).unwrap_err();
        assert!(errors.contains("phone"));
        f.phone = Some("(555) 123-4567".into());
        assert!(validate(&f, &Facility::add_groups()).is_ok());
    }

    #[test]
    fn dining_room_title_unique_per_facility() {
        let room = DiningRoom::new(EntityId::new(), "Main Hall");
        let checks = unique_checks(&room, &DiningRoom::add_groups());
        assert_eq!(checks[0].columns[1].0, "facility_id");
    }

    #[test]
    fn apartment_room_floor_range() {
        let room = ApartmentRoom::new(EntityId::new(), "12B", 0);
        let errors = validate(&room, &ApartmentRoom::add_groups()).unwrap_err();
        assert!(errors.contains("floor"));
    }

    #[test]
    fn dining_room_grid_scopes_through_facility() {
        let view = DiningRoom::grid_view("list").unwrap();
        view.validate().unwrap();
        assert_eq!(view.space_column, Some(("f", "space_id")));
        assert_eq!(
            view.find_column("facility").unwrap().column_type,
            ColumnType::String
        );
        for v in Facility::grid_views()
            .into_iter()
            .chain(Apartment::grid_views())
            .chain(Region::grid_views())
        {
            v.validate().unwrap();
        }
    }
}
