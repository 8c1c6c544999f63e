//! Storage schema: tables, columns, foreign keys and uniqueness.
//!
//! The catalog is the single description of the relational layout. The
//! in-memory store enforces it directly; [`Catalog::ddl`] renders it for
//! Postgres so both backends share one set of delete and uniqueness rules.
//!
//! Every table has a `uuid` primary key named `id`. Audit columns are plain
//! nullable values without a foreign key, so removing a user never rewrites
//! history on other rows.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;

/// Column storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Uuid,
    Varchar(u32),
    Text,
    SmallInt,
    BigInt,
    Numeric(u8, u8),
    Boolean,
    Date,
    Timestamp,
    Json,
}

impl SqlType {
    pub fn render(self) -> String {
        match self {
            SqlType::Uuid => "UUID".into(),
            SqlType::Varchar(n) => format!("VARCHAR({n})"),
            SqlType::Text => "TEXT".into(),
            SqlType::SmallInt => "SMALLINT".into(),
            SqlType::BigInt => "BIGINT".into(),
            SqlType::Numeric(p, s) => format!("NUMERIC({p}, {s})"),
            SqlType::Boolean => "BOOLEAN".into(),
            SqlType::Date => "DATE".into(),
            SqlType::Timestamp => "TIMESTAMPTZ".into(),
            SqlType::Json => "JSONB".into(),
        }
    }

    /// Postgres cast applied to a text-bound parameter.
    pub fn cast(self) -> &'static str {
        match self {
            SqlType::Uuid => "uuid",
            SqlType::Varchar(_) | SqlType::Text => "text",
            SqlType::SmallInt => "smallint",
            SqlType::BigInt => "bigint",
            SqlType::Numeric(..) => "numeric",
            SqlType::Boolean => "boolean",
            SqlType::Date => "date",
            SqlType::Timestamp => "timestamptz",
            SqlType::Json => "jsonb",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
}

/// What happens to referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

impl OnDelete {
    fn sql(self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
            OnDelete::Restrict => "RESTRICT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: &'static str,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unique {
    pub name: String,
    pub columns: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
    pub uniques: Vec<Unique>,
    pub audited: bool,
}

impl Table {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            columns: vec![Column {
                name: "id",
                sql_type: SqlType::Uuid,
                nullable: false,
            }],
            foreign_keys: Vec::new(),
            uniques: Vec::new(),
            audited: false,
        }
    }

    pub fn col(mut self, name: &'static str, sql_type: SqlType) -> Self {
        self.columns.push(Column {
            name,
            sql_type,
            nullable: false,
        });
        self
    }

    pub fn nullable(mut self, name: &'static str, sql_type: SqlType) -> Self {
        self.columns.push(Column {
            name,
            sql_type,
            nullable: true,
        });
        self
    }

    /// Reference column; nullable exactly when the action is `SetNull`.
    pub fn references(
        mut self,
        column: &'static str,
        table: &'static str,
        on_delete: OnDelete,
    ) -> Self {
        self.columns.push(Column {
            name: column,
            sql_type: SqlType::Uuid,
            nullable: on_delete == OnDelete::SetNull,
        });
        self.foreign_keys.push(ForeignKey {
            column,
            references: table,
            on_delete,
        });
        self
    }

    /// Tenant column referencing `tbl_space`.
    pub fn space(self) -> Self {
        self.references("space_id", "tbl_space", OnDelete::Cascade)
    }

    pub fn unique(mut self, columns: &[&'static str]) -> Self {
        let name = format!("uq_{}_{}", self.name.trim_start_matches("tbl_"), columns.join("_"));
        self.uniques.push(Unique {
            name,
            columns: columns.to_vec(),
        });
        self
    }

    /// Audit pair columns.
    pub fn audited(mut self) -> Self {
        self = self
            .nullable("created_by", SqlType::Uuid)
            .nullable("updated_by", SqlType::Uuid)
            .nullable("created_at", SqlType::Timestamp)
            .nullable("updated_at", SqlType::Timestamp);
        self.audited = true;
        self
    }

    /// Care flag group shared by facility and region options.
    fn care_flags(self) -> Self {
        self.col("dnr", SqlType::Boolean)
            .col("polst", SqlType::Boolean)
            .col("ambulatory", SqlType::Boolean)
            .nullable("care_group", SqlType::BigInt)
    }

    fn lifecycle(self) -> Self {
        self.col("state", SqlType::SmallInt)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    fn ddl(&self) -> String {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut line = format!("    \"{}\" {}", c.name, c.sql_type.render());
                if !c.nullable {
                    line.push_str(" NOT NULL");
                }
                if c.name == "id" {
                    line.push_str(" PRIMARY KEY");
                }
                line
            })
            .collect();
        for fk in &self.foreign_keys {
            lines.push(format!(
                "    FOREIGN KEY (\"{}\") REFERENCES \"{}\" (\"id\") ON DELETE {}",
                fk.column,
                fk.references,
                fk.on_delete.sql()
            ));
        }
        for unique in &self.uniques {
            let cols: Vec<String> = unique.columns.iter().map(|c| format!("\"{c}\"")).collect();
            lines.push(format!(
                "    CONSTRAINT \"{}\" UNIQUE ({})",
                unique.name,
                cols.join(", ")
            ));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n{}\n);",
            self.name,
            lines.join(",\n")
        )
    }
}

/// A foreign key seen from the referenced side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingKey<'a> {
    pub table: &'a Table,
    pub key: &'a ForeignKey,
}

/// The full set of tables.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: Vec<Table>,
    index: HashMap<&'static str, usize>,
}

impl Catalog {
    pub fn new(tables: Vec<Table>) -> Self {
        let index = tables.iter().enumerate().map(|(i, t)| (t.name, i)).collect();
        Self { tables, index }
    }

    /// Every table of the application.
    pub fn standard() -> Self {
        use OnDelete::{Cascade, SetNull};
        use SqlType::*;

        let catalog_table = |name: &'static str, title_max: u32| {
            Table::new(name)
                .space()
                .col("title", Varchar(title_max))
                .audited()
                .unique(&["space_id", "title"])
        };

        let tables = vec![
            Table::new("tbl_space")
                .col("name", Varchar(50))
                .audited()
                .unique(&["name"]),
            Table::new("tbl_user")
                .space()
                .col("first_name", Varchar(60))
                .col("last_name", Varchar(60))
                .col("username", Varchar(128))
                .col("email", Varchar(255))
                .col("password", Varchar(255))
                .col("enabled", Boolean)
                .col("login_attempts", BigInt)
                .nullable("last_activity_at", Timestamp)
                .nullable("password_recovery_hash", Varchar(255))
                .nullable("activation_hash", Varchar(255))
                .col("completed", Boolean)
                .audited()
                .unique(&["username"])
                .unique(&["email"]),
            Table::new("tbl_role")
                .space()
                .col("name", Varchar(255))
                .col("is_default", Boolean)
                .nullable("grants", Json)
                .audited()
                .unique(&["space_id", "name"]),
            Table::new("tbl_user_role")
                .references("user_id", "tbl_user", Cascade)
                .references("role_id", "tbl_role", Cascade)
                .unique(&["user_id", "role_id"]),
            token_table("tbl_oauth2_access_token"),
            token_table("tbl_oauth2_refresh_token"),
            catalog_table("tbl_allergen", 200).nullable("description", Varchar(255)),
            catalog_table("tbl_care_level", 255).nullable("description", Varchar(255)),
            catalog_table("tbl_credit", 255).col("amount", Numeric(10, 2)),
            catalog_table("tbl_discount", 255).col("amount", Numeric(10, 2)),
            catalog_table("tbl_expense", 255).col("amount", Numeric(10, 2)),
            catalog_table("tbl_insurance_company", 255),
            catalog_table("tbl_medication", 200),
            catalog_table("tbl_payment_type", 255).col("amount", Numeric(10, 2)),
            catalog_table("tbl_responsible_person_role", 255).nullable("icon", Varchar(255)),
            catalog_table("tbl_rp_payment_type", 255),
            catalog_table("tbl_salutation", 20),
            catalog_table("tbl_speciality", 200),
            Table::new("tbl_facility")
                .space()
                .col("name", Varchar(100))
                .col("shorthand", Varchar(100))
                .nullable("address", Text)
                .nullable("phone", Varchar(32))
                .nullable("fax", Varchar(32))
                .nullable("email", Varchar(255))
                .nullable("license", Varchar(255))
                .col("beds_licensed", BigInt)
                .col("beds_target", BigInt)
                .audited()
                .unique(&["space_id", "name"]),
            Table::new("tbl_dining_room")
                .references("facility_id", "tbl_facility", Cascade)
                .col("title", Varchar(50))
                .nullable("notes", Varchar(512))
                .audited()
                .unique(&["facility_id", "title"]),
            Table::new("tbl_apartment")
                .space()
                .col("name", Varchar(100))
                .col("shorthand", Varchar(100))
                .nullable("address", Text)
                .nullable("phone", Varchar(32))
                .col("license_capacity", BigInt)
                .col("capacity", BigInt)
                .audited()
                .unique(&["space_id", "name"]),
            Table::new("tbl_apartment_room")
                .references("apartment_id", "tbl_apartment", Cascade)
                .col("number", Varchar(10))
                .col("floor", BigInt)
                .nullable("notes", Varchar(512))
                .unique(&["apartment_id", "number"]),
            Table::new("tbl_region")
                .space()
                .col("name", Varchar(100))
                .col("shorthand", Varchar(100))
                .nullable("description", Varchar(512))
                .audited()
                .unique(&["space_id", "name"]),
            Table::new("tbl_resident")
                .space()
                .references("salutation_id", "tbl_salutation", SetNull)
                .col("first_name", Varchar(60))
                .nullable("middle_name", Varchar(60))
                .col("last_name", Varchar(60))
                .col("birthday", Date)
                .col("gender", SmallInt)
                .audited(),
            Table::new("tbl_contract")
                .references("resident_id", "tbl_resident", Cascade)
                .col("start", Date)
                .nullable("end", Date)
                .col("contract_type", SmallInt)
                .audited(),
            Table::new("tbl_contract_facility_option")
                .references("contract_id", "tbl_contract", Cascade)
                .references("dining_room_id", "tbl_dining_room", SetNull)
                .references("care_level_id", "tbl_care_level", SetNull)
                .lifecycle()
                .care_flags()
                .audited(),
            Table::new("tbl_contract_apartment_option")
                .references("contract_id", "tbl_contract", Cascade)
                .references("apartment_room_id", "tbl_apartment_room", SetNull)
                .lifecycle()
                .audited(),
            Table::new("tbl_contract_region_option")
                .references("contract_id", "tbl_contract", Cascade)
                .references("region_id", "tbl_region", SetNull)
                .col("street_address", Varchar(100))
                .col("city", Varchar(100))
                .col("zip", Varchar(10))
                .lifecycle()
                .care_flags()
                .audited(),
            Table::new("tbl_resident_facility_option")
                .references("resident_id", "tbl_resident", Cascade)
                .references("facility_id", "tbl_facility", Cascade)
                .references("dining_room_id", "tbl_dining_room", SetNull)
                .references("care_level_id", "tbl_care_level", SetNull)
                .col("date_admitted", Date)
                .lifecycle()
                .care_flags()
                .audited()
                .unique(&["resident_id"]),
            Table::new("tbl_resident_apartment_option")
                .references("resident_id", "tbl_resident", Cascade)
                .references("apartment_id", "tbl_apartment", Cascade)
                .col("date_admitted", Date)
                .lifecycle()
                .audited()
                .unique(&["resident_id"]),
            Table::new("tbl_resident_region_option")
                .references("resident_id", "tbl_resident", Cascade)
                .references("region_id", "tbl_region", Cascade)
                .col("date_admitted", Date)
                .lifecycle()
                .care_flags()
                .audited()
                .unique(&["resident_id"]),
            Table::new("tbl_resident_allergen")
                .references("resident_id", "tbl_resident", Cascade)
                .references("allergen_id", "tbl_allergen", Cascade)
                .nullable("notes", Varchar(512))
                .audited()
                .unique(&["resident_id", "allergen_id"]),
            Table::new("tbl_resident_medication")
                .references("resident_id", "tbl_resident", Cascade)
                .references("medication_id", "tbl_medication", Cascade)
                .col("dosage", Varchar(255))
                .nullable("notes", Varchar(512))
                .audited()
                .unique(&["resident_id", "medication_id"]),
            Table::new("tbl_physician")
                .space()
                .references("salutation_id", "tbl_salutation", SetNull)
                .references("speciality_id", "tbl_speciality", SetNull)
                .col("first_name", Varchar(60))
                .nullable("middle_name", Varchar(60))
                .col("last_name", Varchar(60))
                .nullable("address_1", Varchar(100))
                .nullable("address_2", Varchar(100))
                .nullable("email", Varchar(255))
                .nullable("website_url", Varchar(255))
                .audited()
                .unique(&["space_id", "email"]),
            Table::new("tbl_physician_phone")
                .references("physician_id", "tbl_physician", Cascade)
                .col("compatibility", SmallInt)
                .col("type", SmallInt)
                .col("number", Varchar(32))
                .nullable("extension", Varchar(10))
                .col("primary", Boolean)
                .col("sms_enabled", Boolean),
        ];
        Self::new(tables)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.index.get(name).map(|i| &self.tables[*i])
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Foreign keys in other tables that point at `name`.
    pub fn referencing(&self, name: &str) -> Vec<IncomingKey<'_>> {
        self.tables
            .iter()
            .flat_map(|t| {
                t.foreign_keys
                    .iter()
                    .filter(move |fk| fk.references == name)
                    .map(move |key| IncomingKey { table: t, key })
            })
            .collect()
    }

    /// Tables ordered so every table follows the tables it references.
    ///
    /// Self-references are ignored; references to tables outside the catalog
    /// are treated as already satisfied.
    pub fn tables_in_dependency_order(&self) -> Vec<&Table> {
        let mut placed: BTreeSet<&str> = BTreeSet::new();
        let mut ordered = Vec::with_capacity(self.tables.len());
        while ordered.len() < self.tables.len() {
            let before = ordered.len();
            for table in &self.tables {
                if placed.contains(table.name) {
                    continue;
                }
                let ready = table.foreign_keys.iter().all(|fk| {
                    fk.references == table.name
                        || placed.contains(fk.references)
                        || !self.index.contains_key(fk.references)
                });
                if ready {
                    placed.insert(table.name);
                    ordered.push(table);
                }
            }
            if ordered.len() == before {
                // Reference cycle: append the rest in declaration order.
                ordered.extend(self.tables.iter().filter(|t| !placed.contains(t.name)));
                break;
            }
        }
        ordered
    }

    /// Postgres DDL for every table, in dependency order.
    pub fn ddl(&self) -> String {
        let mut out = String::new();
        for table in self.tables_in_dependency_order() {
            let _ = writeln!(out, "{}\n", table.ddl());
        }
        out
    }
}

fn token_table(name: &'static str) -> Table {
    Table::new(name)
        .col("token", SqlType::Varchar(255))
        .col("client_id", SqlType::Varchar(255))
        .references("user_id", "tbl_user", OnDelete::Cascade)
        .nullable("expires_at", SqlType::BigInt)
        .nullable("scope", SqlType::Varchar(255))
        .unique(&["token"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use seniorcare_core::Record;
    use seniorcare_entities::*;

    #[test]
    fn contract_options_cascade_from_contract() {
        let catalog = Catalog::standard();
        let incoming = catalog.referencing("tbl_contract");
        let tables: Vec<_> = incoming.iter().map(|k| k.table.name).collect();
        assert!(tables.contains(&"tbl_contract_facility_option"));
        assert!(tables.contains(&"tbl_contract_apartment_option"));
        assert!(tables.contains(&"tbl_contract_region_option"));
        assert!(incoming.iter().all(|k| k.key.on_delete == OnDelete::Cascade));
    }

    #[test]
    fn placement_references_set_null() {
        let catalog = Catalog::standard();
        let option = catalog.table("tbl_contract_facility_option").unwrap();
        assert_eq!(option.foreign_key("dining_room_id").unwrap().on_delete, OnDelete::SetNull);
        assert_eq!(option.foreign_key("care_level_id").unwrap().on_delete, OnDelete::SetNull);
        assert!(option.column("dining_room_id").unwrap().nullable);
        assert!(!option.column("contract_id").unwrap().nullable);
    }

    #[test]
    fn catalogs_are_unique_per_space_and_title() {
        let catalog = Catalog::standard();
        for name in [
            Allergen::TABLE,
            CareLevel::TABLE,
            Credit::TABLE,
            Discount::TABLE,
            Expense::TABLE,
            InsuranceCompany::TABLE,
            Medication::TABLE,
            PaymentType::TABLE,
            ResponsiblePersonRole::TABLE,
            RpPaymentType::TABLE,
            Salutation::TABLE,
            Speciality::TABLE,
        ] {
            let table = catalog.table(name).unwrap();
            assert!(
                table.uniques.iter().any(|u| u.columns == ["space_id", "title"]),
                "{name} lacks (space_id, title) uniqueness"
            );
        }
    }

    #[test]
    fn every_table_follows_its_references() {
        let catalog = Catalog::standard();
        let order: Vec<_> = catalog
            .tables_in_dependency_order()
            .iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(order.len(), catalog.tables().len());
        for table in catalog.tables() {
            let pos = order.iter().position(|n| *n == table.name).unwrap();
            for fk in &table.foreign_keys {
                let dep = order.iter().position(|n| *n == fk.references).unwrap();
                assert!(dep < pos, "{} before {}", fk.references, table.name);
            }
        }
    }

    #[test]
    fn entity_rows_fit_their_tables() {
        let catalog = Catalog::standard();
        let space = seniorcare_core::SpaceId::new();
        let rows = vec![
            (Space::TABLE, Space::new("Main").to_row().unwrap()),
            (Allergen::TABLE, Allergen::new(space, "Peanuts").to_row().unwrap()),
            (Credit::TABLE, Credit::new(space, "Deposit").to_row().unwrap()),
            (Facility::TABLE, Facility::new(space, "Sunrise", "SR").to_row().unwrap()),
            (
                ContractFacilityOption::TABLE,
                ContractFacilityOption::new(seniorcare_core::EntityId::new())
                    .to_row()
                    .unwrap(),
            ),
        ];
        for (name, row) in rows {
            let table = catalog.table(name).unwrap();
            for key in row.keys() {
                assert!(table.column(key).is_some(), "{name} has no column {key}");
            }
            for column in &table.columns {
                assert!(row.contains_key(column.name), "{name} row lacks {}", column.name);
            }
        }
    }

    #[test]
    fn ddl_renders_actions_and_constraints() {
        let ddl = Catalog::standard().ddl();
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS \"tbl_contract_facility_option\""));
        assert!(ddl.contains(
            "FOREIGN KEY (\"dining_room_id\") REFERENCES \"tbl_dining_room\" (\"id\") ON DELETE SET NULL"
        ));
        assert!(ddl.contains(
            "FOREIGN KEY (\"contract_id\") REFERENCES \"tbl_contract\" (\"id\") ON DELETE CASCADE"
        ));
        assert!(ddl.contains("CONSTRAINT \"uq_allergen_space_id_title\" UNIQUE (\"space_id\", \"title\")"));
        assert!(ddl.find("\"tbl_space\"").unwrap() < ddl.find("\"tbl_allergen\"").unwrap());
    }
}
