//! Space: the tenant boundary.

use serde::{Deserialize, Serialize};

use seniorcare_core::{
    Audit, ColumnType, Constraint, EntityId, FieldValue, GridColumn, GridView, Gridded,
    Operations, Projection, Record, Rule, SpaceId, Validate,
};

/// Organization owning facilities, residents and catalogs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Space {
    pub fn new(name: &str) -> Self {
        Self {
            id: SpaceId::new(),
            name: seniorcare_core::normalize_title(name),
            audit: Audit::default(),
        }
    }
}

impl seniorcare_core::Entity for Space {
    type Id = SpaceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Space {
    const TABLE: &'static str = "tbl_space";

    fn record_id(&self) -> EntityId {
        EntityId::from_uuid(*self.id.as_uuid())
    }

    fn normalize(&mut self) {
        self.name = seniorcare_core::normalize_title(&self.name);
    }
}

impl_audited!(Space);
impl_operations!(Space, "api_admin_space_add", "api_admin_space_edit");

impl Validate for Space {
    fn rules() -> Vec<Rule> {
        const GROUPS: &[&str] = &["api_admin_space_add", "api_admin_space_edit"];
        vec![
            Rule::new("name", Constraint::NotBlank, GROUPS),
            Rule::new("name", Constraint::Length { min: None, max: Some(50) }, GROUPS),
            Rule::new("name", Constraint::UniqueWith(&[]), GROUPS),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "name" => (&self.name).into(),
            _ => FieldValue::Unknown,
        }
    }
}

impl Gridded for Space {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", Space::TABLE, "s")
                .scoped("s", "id")
                .column(GridColumn::new("id", ColumnType::Id).expr("s.id"))
                .column(
                    GridColumn::new("name", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("s.name"),
                ),
        ]
    }
}

impl Projection for Space {
    fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
        match group {
            "list" | "detail" => Some(&["id", "name"]),
            _ => None,
        }
    }
}
