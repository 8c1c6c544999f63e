//! Tenant-scoped reference catalogs.
//!
//! Every catalog row belongs to one space, carries a normalized title that is
//! unique within that space, and is maintained through an add/edit pair of
//! validation groups.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use seniorcare_core::{
    Audit, ColumnType, Constraint, EntityId, FieldValue, GridColumn, GridView, Gridded,
    Projection, Rule, SpaceId, Validate,
};

macro_rules! catalog_entity {
    (
        $(#[$meta:meta])*
        $name:ident {
            table: $table:literal,
            alias: $alias:literal,
            add: $add:literal,
            edit: $edit:literal,
            title_max: $max:literal,
            extra: {
                $( $(#[$fmeta:meta])* $field:ident : $ty:ty => $ctype:ident [ $($constraint:expr),* ] ),* $(,)?
            } $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub id: EntityId,
            pub space_id: SpaceId,
            pub title: String,
            $( $(#[$fmeta])* pub $field: $ty, )*
            #[serde(flatten)]
            pub audit: Audit,
        }

        impl $name {
            pub fn new(space_id: SpaceId, title: &str) -> Self {
                Self {
                    id: EntityId::new(),
                    space_id,
                    title: seniorcare_core::normalize_title(title),
                    $( $field: Default::default(), )*
                    audit: Audit::default(),
                }
            }
        }

        impl_record!($name, $table, space: space_id, title: title);
        impl_audited!($name);
        impl_operations!($name, $add, $edit);

        impl Validate for $name {
            fn rules() -> Vec<Rule> {
                const GROUPS: &[&str] = &[$add, $edit];
                #[allow(unused_mut)]
                let mut rules = vec![
                    Rule::new("title", Constraint::NotBlank, GROUPS),
                    Rule::new("title", Constraint::Length { min: None, max: Some($max) }, GROUPS),
                    Rule::new("title", Constraint::UniqueWith(&["space_id"]), GROUPS),
                ];
                $( $( rules.push(Rule::new(stringify!($field), $constraint, GROUPS)); )* )*
                rules
            }

            fn field(&self, path: &str) -> FieldValue<'_> {
                match path {
                    "id" => FieldValue::Uuid(*self.id.as_uuid()),
                    "space_id" => FieldValue::Uuid(*self.space_id.as_uuid()),
                    "title" => (&self.title).into(),
                    $( stringify!($field) => (&self.$field).into(), )*
                    _ => FieldValue::Unknown,
                }
            }
        }

        impl Gridded for $name {
            fn grid_views() -> Vec<GridView> {
                vec![
                    GridView::new("list", $table, $alias)
                        .scoped($alias, "space_id")
                        .column(GridColumn::new("id", ColumnType::Id).expr(concat!($alias, ".id")))
                        .column(
                            GridColumn::new("title", ColumnType::String)
                                .sortable()
                                .filterable()
                                .expr(concat!($alias, ".title")),
                        )
                        $(
                            .column(
                                GridColumn::new(stringify!($field), ColumnType::$ctype)
                                    .sortable()
                                    .filterable()
                                    .expr(concat!($alias, ".", stringify!($field))),
                            )
                        )*
                ]
            }
        }

        impl Projection for $name {
            fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
                match group {
                    "list" => Some(&["id", "title" $(, stringify!($field))*]),
                    "detail" => Some(&[
                        "id",
                        "space_id",
                        "title"
                        $(, stringify!($field))*,
                        "created_at",
                        "updated_at",
                    ]),
                    _ => None,
                }
            }
        }
    };
}

catalog_entity! {
    /// Substance a resident may be allergic to.
    Allergen {
        table: "tbl_allergen",
        alias: "al",
        add: "api_admin_allergen_add",
        edit: "api_admin_allergen_edit",
        title_max: 200,
        extra: {
            #[serde(default)]
            description: Option<String> => String [Constraint::Length { min: None, max: Some(255) }],
        },
    }
}

catalog_entity! {
    /// Level of care offered by a facility.
    CareLevel {
        table: "tbl_care_level",
        alias: "cl",
        add: "api_admin_care_level_add",
        edit: "api_admin_care_level_edit",
        title_max: 255,
        extra: {
            #[serde(default)]
            description: Option<String> => String [Constraint::Length { min: None, max: Some(255) }],
        },
    }
}

catalog_entity! {
    /// Credit line applied to resident billing.
    Credit {
        table: "tbl_credit",
        alias: "cr",
        add: "api_admin_credit_add",
        edit: "api_admin_credit_edit",
        title_max: 255,
        extra: {
            amount: Decimal => Number [Constraint::Numeric { scale: 2 }],
        },
    }
}

catalog_entity! {
    Discount {
        table: "tbl_discount",
        alias: "d",
        add: "api_admin_discount_add",
        edit: "api_admin_discount_edit",
        title_max: 255,
        extra: {
            amount: Decimal => Number [Constraint::Numeric { scale: 2 }],
        },
    }
}

catalog_entity! {
    Expense {
        table: "tbl_expense",
        alias: "e",
        add: "api_admin_expense_add",
        edit: "api_admin_expense_edit",
        title_max: 255,
        extra: {
            amount: Decimal => Number [Constraint::Numeric { scale: 2 }],
        },
    }
}

catalog_entity! {
    InsuranceCompany {
        table: "tbl_insurance_company",
        alias: "ic",
        add: "api_admin_insurance_company_add",
        edit: "api_admin_insurance_company_edit",
        title_max: 255,
        extra: {},
    }
}

catalog_entity! {
    Medication {
        table: "tbl_medication",
        alias: "m",
        add: "api_admin_medication_add",
        edit: "api_admin_medication_edit",
        title_max: 200,
        extra: {},
    }
}

catalog_entity! {
    /// Private-pay source with its default amount.
    PaymentType {
        table: "tbl_payment_type",
        alias: "pt",
        add: "api_admin_payment_type_add",
        edit: "api_admin_payment_type_edit",
        title_max: 255,
        extra: {
            amount: Decimal => Number [Constraint::Numeric { scale: 2 }],
        },
    }
}

catalog_entity! {
    /// Relationship of a responsible person to a resident (guardian, POA, ...).
    ResponsiblePersonRole {
        table: "tbl_responsible_person_role",
        alias: "rpr",
        add: "api_admin_responsible_person_role_add",
        edit: "api_admin_responsible_person_role_edit",
        title_max: 255,
        extra: {
            #[serde(default)]
            icon: Option<String> => String [Constraint::Length { min: None, max: Some(255) }],
        },
    }
}

catalog_entity! {
    /// How a responsible person pays.
    RpPaymentType {
        table: "tbl_rp_payment_type",
        alias: "rpt",
        add: "api_admin_rp_payment_type_add",
        edit: "api_admin_rp_payment_type_edit",
        title_max: 255,
        extra: {},
    }
}

catalog_entity! {
    Salutation {
        table: "tbl_salutation",
        alias: "sal",
        add: "api_admin_salutation_add",
        edit: "api_admin_salutation_edit",
        title_max: 20,
        extra: {},
    }
}

catalog_entity! {
    /// Physician speciality.
    Speciality {
        table: "tbl_speciality",
        alias: "sp",
        add: "api_admin_speciality_add",
        edit: "api_admin_speciality_edit",
        title_max: 200,
        extra: {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seniorcare_core::validation::{unique_checks, validate};
    use seniorcare_core::{Operations, Projection, Record, Titled};

    #[test]
    fn blank_role_title_fails_on_add_only() {
        let role = ResponsiblePersonRole::new(SpaceId::new(), "   ");
        let errors = validate(&role, &ResponsiblePersonRole::add_groups()).unwrap_err();
        assert!(errors.contains("title"));
        assert!(validate(&role, &[]).is_ok());
    }

    #[test]
    fn title_is_normalized_on_write() {
        let mut med = Medication::new(SpaceId::new(), "x");
        med.title = "Vitamin  D".into();
        med.normalize();
        assert_eq!(med.title(), "Vitamin D");

        let mut s = Salutation::new(SpaceId::new(), "x");
        s.set_title("Mrs.   ");
        assert_eq!(s.title, "Mrs. ");
    }

    #[test]
    fn amount_must_have_two_decimals_at_most() {
        let mut credit = Credit::new(SpaceId::new(), "Deposit");
        credit.amount = Decimal::new(10025, 2);
        assert!(validate(&credit, &Credit::add_groups()).is_ok());
        credit.amount = Decimal::new(100250, 3);
        assert!(validate(&credit, &Credit::add_groups()).is_ok());
        credit.amount = Decimal::new(100255, 3);
        let errors = validate(&credit, &Credit::edit_groups()).unwrap_err();
        assert!(errors.contains("amount"));
        credit.amount = Decimal::new(-5, 0);
        assert!(validate(&credit, &Credit::add_groups()).is_err());
    }

    #[test]
    fn amount_survives_a_row_round_trip_exactly() {
        let mut payment = PaymentType::new(SpaceId::new(), "Private pay");
        payment.amount = Decimal::new(1999999, 2);
        let row = payment.to_row().unwrap();
        assert_eq!(row["amount"], "19999.99");
        assert_eq!(PaymentType::from_row(row).unwrap().amount, payment.amount);

        // Postgres hands numerics back as JSON numbers.
        let mut row = payment.to_row().unwrap();
        row.insert("amount".into(), serde_json::json!(19999.99));
        assert_eq!(PaymentType::from_row(row).unwrap().amount, Decimal::new(1999999, 2));
    }

    #[test]
    fn list_projection_follows_declared_order() {
        let allergen = Allergen::new(SpaceId::new(), "Peanuts");
        let projected = allergen.project("list");
        let keys: Vec<&str> = projected
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["id", "title", "description"]);
    }

    #[test]
    fn salutation_title_limit() {
        let s = Salutation::new(SpaceId::new(), "A very long salutation text");
        assert!(validate(&s, &Salutation::add_groups()).is_err());
    }

    #[test]
    fn title_uniqueness_is_per_space() {
        let space = SpaceId::new();
        let a = Allergen::new(space, "Peanuts");
        let checks = unique_checks(&a, &Allergen::add_groups());
        assert_eq!(checks.len(), 1);
        assert_eq!(
            checks[0].columns,
            vec![
                ("title", serde_json::json!("Peanuts")),
                ("space_id", serde_json::json!(space.to_string())),
            ]
        );
    }

    #[test]
    fn grid_views_are_well_formed() {
        let views = [
            Allergen::grid_views(),
            CareLevel::grid_views(),
            Credit::grid_views(),
            Discount::grid_views(),
            Expense::grid_views(),
            InsuranceCompany::grid_views(),
            Medication::grid_views(),
            PaymentType::grid_views(),
            ResponsiblePersonRole::grid_views(),
            RpPaymentType::grid_views(),
            Salutation::grid_views(),
            Speciality::grid_views(),
        ];
        for view in views.iter().flatten() {
            view.validate().unwrap();
        }
        let credit = Credit::grid_view("list").unwrap();
        let keys: Vec<_> = credit.columns.iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["id", "title", "amount"]);
        assert_eq!(credit.find_column("amount").unwrap().expression, "cr.amount");
    }

    #[test]
    fn row_mapping_flattens_audit() {
        let mut role = ResponsiblePersonRole::new(SpaceId::new(), "Guardian");
        role.icon = Some("fa-shield".into());
        let row = role.to_row().unwrap();
        assert!(row.contains_key("created_at"));
        assert!(!row.contains_key("audit"));
        assert_eq!(ResponsiblePersonRole::from_row(row).unwrap(), role);
    }

    #[test]
    fn list_projection() {
        let p = PaymentType::new(SpaceId::new(), "Medicaid");
        let json = p.project("list");
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 3);
        assert!(json.get("space_id").is_none());
    }
}
