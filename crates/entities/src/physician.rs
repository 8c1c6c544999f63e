//! Physicians and their phone numbers.

use serde::{Deserialize, Serialize};

use seniorcare_core::validation::mask_violation;
use seniorcare_core::{
    Audit, ColumnType, Constraint, EntityId, FieldValue, GridColumn, GridJoin, GridView, Gridded,
    Group, Projection, Record, Rule, SpaceId, ValidationErrors, Validate, ValueObject,
};

/// Number format a phone follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum PhoneCompatibility {
    #[default]
    Us = 1,
    Armenian = 2,
}

impl_coded!(PhoneCompatibility, "phone compatibility", { Us = 1, Armenian = 2 });

impl PhoneCompatibility {
    /// Input mask numbers must follow, if any.
    pub fn mask(self) -> Option<&'static str> {
        match self {
            PhoneCompatibility::Us => Some("(999) 999-9999"),
            PhoneCompatibility::Armenian => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum PhoneKind {
    Home = 1,
    #[default]
    Mobile = 2,
    Office = 3,
    Emergency = 4,
    Fax = 5,
    Room = 6,
}

impl_coded!(PhoneKind, "phone kind", {
    Home = 1,
    Mobile = 2,
    Office = 3,
    Emergency = 4,
    Fax = 5,
    Room = 6,
});

impl PhoneKind {
    /// Whether the line can receive text messages at all.
    pub fn can_receive_sms(self) -> bool {
        matches!(self, PhoneKind::Mobile)
    }
}

/// A phone number with its format and flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    pub compatibility: PhoneCompatibility,
    #[serde(rename = "type")]
    pub kind: PhoneKind,
    pub number: String,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub sms_enabled: bool,
}

impl ValueObject for Phone {}

impl Phone {
    pub fn us(kind: PhoneKind, number: &str) -> Self {
        Self {
            compatibility: PhoneCompatibility::Us,
            kind,
            number: number.to_string(),
            ..Self::default()
        }
    }

    /// Digits only, for dialing and de-duplication.
    pub fn digits(&self) -> String {
        self.number.chars().filter(char::is_ascii_digit).collect()
    }

    fn check_into(&self, errors: &mut ValidationErrors) {
        if let Some(message) = self
            .compatibility
            .mask()
            .and_then(|mask| mask_violation(&self.number, mask))
        {
            errors.add("number", message);
        }
        if self.sms_enabled && !self.kind.can_receive_sms() {
            errors.add("sms_enabled", "Only mobile numbers can receive text messages.");
        }
    }
}

const PHYSICIAN_GROUPS: &[&str] = &["api_admin_physician_add", "api_admin_physician_edit"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physician {
    pub id: EntityId,
    pub space_id: SpaceId,
    #[serde(default)]
    pub salutation_id: Option<EntityId>,
    #[serde(default)]
    pub speciality_id: Option<EntityId>,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub address_1: Option<String>,
    #[serde(default)]
    pub address_2: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Physician {
    pub fn new(space_id: SpaceId, first_name: &str, last_name: &str) -> Self {
        Self {
            id: EntityId::new(),
            space_id,
            salutation_id: None,
            speciality_id: None,
            first_name: first_name.to_string(),
            middle_name: None,
            last_name: last_name.to_string(),
            address_1: None,
            address_2: None,
            email: None,
            website_url: None,
            audit: Audit::default(),
        }
    }
}

impl_record!(Physician, "tbl_physician", space: space_id);
impl_audited!(Physician);
impl_operations!(Physician, "api_admin_physician_add", "api_admin_physician_edit");

impl Validate for Physician {
    fn rules() -> Vec<Rule> {
        let name = Constraint::Length {
            min: None,
            max: Some(60),
        };
        let line = Constraint::Length {
            min: None,
            max: Some(100),
        };
        vec![
            Rule::new("first_name", Constraint::NotBlank, PHYSICIAN_GROUPS),
            Rule::new("first_name", name.clone(), PHYSICIAN_GROUPS),
            Rule::new("middle_name", name.clone(), PHYSICIAN_GROUPS),
            Rule::new("last_name", Constraint::NotBlank, PHYSICIAN_GROUPS),
            Rule::new("last_name", name, PHYSICIAN_GROUPS),
            Rule::new("address_1", line.clone(), PHYSICIAN_GROUPS),
            Rule::new("address_2", line, PHYSICIAN_GROUPS),
            Rule::new("email", Constraint::Email, PHYSICIAN_GROUPS),
            Rule::new("email", Constraint::UniqueWith(&["space_id"]), PHYSICIAN_GROUPS),
            Rule::new(
                "website_url",
                Constraint::Length {
                    min: None,
                    max: Some(255),
                },
                PHYSICIAN_GROUPS,
            ),
            Rule::new("website_url", Constraint::Url, PHYSICIAN_GROUPS),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "space_id" => FieldValue::Uuid(*self.space_id.as_uuid()),
            "salutation_id" => self.salutation_id.into(),
            "speciality_id" => self.speciality_id.into(),
            "first_name" => (&self.first_name).into(),
            "middle_name" => (&self.middle_name).into(),
            "last_name" => (&self.last_name).into(),
            "address_1" => (&self.address_1).into(),
            "address_2" => (&self.address_2).into(),
            "email" => (&self.email).into(),
            "website_url" => (&self.website_url).into(),
            _ => FieldValue::Unknown,
        }
    }
}

impl Gridded for Physician {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", Physician::TABLE, "p")
                .join(GridJoin::new("sal", "tbl_salutation", "p", "salutation_id"))
                .join(GridJoin::new("sp", "tbl_speciality", "p", "speciality_id"))
                .scoped("p", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("p.id"))
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
                        .expr("p.first_name"),
                )
                .column(
                    GridColumn::new("last_name", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("p.last_name"),
                )
                .column(
                    GridColumn::new("speciality", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("sp.title"),
                )
                .column(
                    GridColumn::new("email", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("p.email"),
                ),
        ]
    }
}

impl Projection for Physician {
    fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
        match group {
            "list" => Some(&["id", "first_name", "last_name", "speciality_id", "email"]),
            _ => None,
        }
    }
}

const PHONE_GROUPS: &[&str] = &["api_admin_physician_add", "api_admin_physician_edit"];

/// A phone number belonging to a physician.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicianPhone {
    pub id: EntityId,
    pub physician_id: EntityId,
    #[serde(flatten)]
    pub phone: Phone,
}

impl PhysicianPhone {
    pub fn new(physician_id: EntityId, phone: Phone) -> Self {
        Self {
            id: EntityId::new(),
            physician_id,
            phone,
        }
    }
}

impl_record!(PhysicianPhone, "tbl_physician_phone");
impl_operations!(
    PhysicianPhone,
    "api_admin_physician_add",
    "api_admin_physician_edit"
);

impl Validate for PhysicianPhone {
    fn rules() -> Vec<Rule> {
        vec![
            Rule::new("number", Constraint::NotBlank, PHONE_GROUPS),
            Rule::new(
                "extension",
                Constraint::Length {
                    min: None,
                    max: Some(10),
                },
                PHONE_GROUPS,
            ),
            Rule::new("type", Constraint::Choice(PhoneKind::CODES), PHONE_GROUPS),
            Rule::new(
                "compatibility",
                Constraint::Choice(PhoneCompatibility::CODES),
                PHONE_GROUPS,
            ),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "physician_id" => FieldValue::Uuid(*self.physician_id.as_uuid()),
            "number" => (&self.phone.number).into(),
            "extension" => (&self.phone.extension).into(),
            "type" => FieldValue::Integer(i64::from(self.phone.kind.code())),
            "compatibility" => FieldValue::Integer(i64::from(self.phone.compatibility.code())),
            "primary" => self.phone.primary.into(),
            "sms_enabled" => self.phone.sms_enabled.into(),
            _ => FieldValue::Unknown,
        }
    }

    fn check(&self, groups: &[Group], errors: &mut ValidationErrors) {
        if groups.iter().any(|g| PHONE_GROUPS.contains(&g.as_str())) {
            self.phone.check_into(errors);
        }
    }
}

/// At most one phone of a physician may be primary.
pub fn check_single_primary(phones: &[PhysicianPhone]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if phones.iter().filter(|p| p.phone.primary).count() > 1 {
        errors.add("phones", "Only one phone can be marked primary.");
    }
    errors.into_result()
}
