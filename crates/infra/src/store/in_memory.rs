//! In-memory store for tests and database-less runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use seniorcare_core::{EntityId, GridView, Row, SpaceId};

use super::{DeleteOutcome, NulledRef, RowRef, Store, StoreError, row_id};
use crate::grid::{self, GridPage, GridQuery, Tables};
use crate::schema::{Catalog, OnDelete, Table};

/// Columns that keep their first stored value.
const IMMUTABLE: [&str; 2] = ["created_at", "created_by"];

/// Catalog-enforcing store over `RwLock`ed maps.
///
/// Locks are never held across an `.await`.
#[derive(Debug)]
pub struct InMemoryStore {
    catalog: Arc<Catalog>,
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            tables: RwLock::new(Tables::new()),
        }
    }

    /// Store over [`Catalog::standard`].
    pub fn standard() -> Self {
        Self::new(Arc::new(Catalog::standard()))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Number of rows in `table`.
    pub fn count(&self, table: &str) -> Result<usize, StoreError> {
        let table = self.table(table)?;
        Ok(self.read()?.get(table.name).map_or(0, BTreeMap::len))
    }

    fn table(&self, name: &str) -> Result<&Table, StoreError> {
        self.catalog
            .table(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }
}

/// Reject unknown columns, require non-nullable ones, fill the rest with null.
fn conform(table: &Table, mut row: Row) -> Result<Row, StoreError> {
    if let Some(key) = row.keys().find(|k| table.column(k).is_none()) {
        return Err(StoreError::Mapping(format!("{} has no column '{key}'", table.name)));
    }
    for column in &table.columns {
        match row.get(column.name) {
            Some(Value::Null) | None if !column.nullable => {
                return Err(StoreError::Mapping(format!(
                    "{}.{} cannot be null",
                    table.name, column.name
                )));
            }
            None => {
                row.insert(column.name.to_string(), Value::Null);
            }
            Some(_) => {}
        }
    }
    Ok(row)
}

fn check_references(tables: &Tables, table: &Table, row: &Row) -> Result<(), StoreError> {
    for fk in &table.foreign_keys {
        let value = match row.get(fk.column) {
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };
        let target = value
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| {
                StoreError::Mapping(format!("{}.{} is not a uuid", table.name, fk.column))
            })?;
        let exists = tables
            .get(fk.references)
            .is_some_and(|rows| rows.contains_key(&target));
        if !exists {
            tracing::debug!(table = table.name, column = fk.column, %target, "dangling reference");
            return Err(StoreError::ForeignKeyViolation {
                table: table.name.to_string(),
                column: fk.column.to_string(),
                message: format!("no {} row {target}", fk.references),
            });
        }
    }
    Ok(())
}

/// Exact, case-sensitive comparison; a null in any column never collides.
fn check_uniques(tables: &Tables, table: &Table, row: &Row, id: Uuid) -> Result<(), StoreError> {
    let Some(rows) = tables.get(table.name) else {
        return Ok(());
    };
    for unique in &table.uniques {
        let values: Option<Vec<&Value>> = unique
            .columns
            .iter()
            .map(|c| row.get(*c).filter(|v| !v.is_null()))
            .collect();
        let Some(values) = values else {
            continue;
        };
        let clash = rows.iter().any(|(other_id, other)| {
            *other_id != id
                && unique
                    .columns
                    .iter()
                    .zip(&values)
                    .all(|(c, v)| other.get(*c) == Some(*v))
        });
        if clash {
            return Err(StoreError::UniqueViolation {
                table: table.name.to_string(),
                constraint: unique.name.clone(),
                columns: unique.columns.iter().map(|c| c.to_string()).collect(),
            });
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    #[instrument(skip(self, row), fields(table = %table), err)]
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let table = self.table(table)?;
        let row = conform(table, row)?;
        let id = row_id(table.name, &row)?;

        let mut tables = self.write()?;
        if tables.get(table.name).is_some_and(|rows| rows.contains_key(&id)) {
            return Err(StoreError::UniqueViolation {
                table: table.name.to_string(),
                constraint: format!("{}_pkey", table.name),
                columns: vec!["id".into()],
            });
        }
        check_references(&tables, table, &row)?;
        check_uniques(&tables, table, &row, id)?;
        tables.entry(table.name).or_default().insert(id, row.clone());
        Ok(row)
    }

    #[instrument(skip(self, row), fields(table = %table), err)]
    async fn update(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let table = self.table(table)?;
        let mut row = conform(table, row)?;
        let id = row_id(table.name, &row)?;

        let mut tables = self.write()?;
        let existing = tables
            .get(table.name)
            .and_then(|rows| rows.get(&id))
            .ok_or_else(|| StoreError::NotFound {
                table: table.name.to_string(),
                id: EntityId::from_uuid(id),
            })?;
        for column in IMMUTABLE {
            if let Some(stored) = existing.get(column) {
                row.insert(column.to_string(), stored.clone());
            }
        }
        check_references(&tables, table, &row)?;
        check_uniques(&tables, table, &row, id)?;
        tables.entry(table.name).or_default().insert(id, row.clone());
        Ok(row)
    }

    async fn get(&self, table: &str, id: EntityId) -> Result<Option<Row>, StoreError> {
        let table = self.table(table)?;
        let tables = self.read()?;
        Ok(tables
            .get(table.name)
            .and_then(|rows| rows.get(id.as_uuid()))
            .cloned())
    }

    #[instrument(skip(self), fields(table = %table, id = %id), err)]
    async fn delete(&self, table: &str, id: EntityId) -> Result<DeleteOutcome, StoreError> {
        let table = self.table(table)?;
        let root = *id.as_uuid();
        let mut tables = self.write()?;
        if !tables.get(table.name).is_some_and(|rows| rows.contains_key(&root)) {
            return Err(StoreError::NotFound {
                table: table.name.to_string(),
                id,
            });
        }

        let mut doomed: BTreeSet<(&'static str, Uuid)> = BTreeSet::from([(table.name, root)]);
        let mut queue = vec![(table.name, root)];
        let mut outcome = DeleteOutcome::default();
        while let Some((parent, parent_id)) = queue.pop() {
            let parent_text = parent_id.to_string();
            for incoming in self.catalog.referencing(parent) {
                let Some(rows) = tables.get(incoming.table.name) else {
                    continue;
                };
                let column = incoming.key.column;
                for (child_id, child) in rows {
                    if child.get(column).and_then(Value::as_str) != Some(parent_text.as_str()) {
                        continue;
                    }
                    match incoming.key.on_delete {
                        OnDelete::Cascade => {
                            if doomed.insert((incoming.table.name, *child_id)) {
                                outcome.cascaded.push(RowRef {
                                    table: incoming.table.name,
                                    id: *child_id,
                                });
                                queue.push((incoming.table.name, *child_id));
                            }
                        }
                        OnDelete::SetNull => outcome.nulled.push(NulledRef {
                            table: incoming.table.name,
                            id: *child_id,
                            column,
                        }),
                        OnDelete::Restrict => {
                            return Err(StoreError::ForeignKeyViolation {
                                table: incoming.table.name.to_string(),
                                column: column.to_string(),
                                message: format!(
                                    "row {child_id} still references {parent} {parent_id}"
                                ),
                            });
                        }
                    }
                }
            }
        }
        outcome
            .nulled
            .retain(|n| !doomed.contains(&(n.table, n.id)));

        for (name, doomed_id) in &doomed {
            if let Some(rows) = tables.get_mut(name) {
                rows.remove(doomed_id);
            }
        }
        for nulled in &outcome.nulled {
            if let Some(row) = tables.get_mut(nulled.table).and_then(|rows| rows.get_mut(&nulled.id)) {
                row.insert(nulled.column.to_string(), Value::Null);
            }
        }
        tracing::debug!(
            cascaded = outcome.cascaded.len(),
            nulled = outcome.nulled.len(),
            "delete applied"
        );
        Ok(outcome)
    }

    async fn list(&self, table: &str, space: Option<SpaceId>) -> Result<Vec<Row>, StoreError> {
        let table = self.table(table)?;
        let space = space
            .filter(|_| table.column("space_id").is_some())
            .map(|s| Value::String(s.to_string()));
        let tables = self.read()?;
        Ok(tables
            .get(table.name)
            .map(|rows| {
                rows.values()
                    .filter(|row| space.as_ref().is_none_or(|s| row.get("space_id") == Some(s)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn exists_with(
        &self,
        table: &str,
        columns: &[(&str, Value)],
        exclude: Option<EntityId>,
    ) -> Result<bool, StoreError> {
        let table = self.table(table)?;
        if columns.iter().any(|(_, v)| v.is_null()) {
            return Ok(false);
        }
        let tables = self.read()?;
        Ok(tables.get(table.name).is_some_and(|rows| {
            rows.iter().any(|(id, row)| {
                exclude.is_none_or(|ex| ex.as_uuid() != id)
                    && columns.iter().all(|(c, v)| row.get(*c) == Some(v))
            })
        }))
    }

    #[instrument(skip(self, view, query), fields(view = view.name, table = view.table), err)]
    async fn grid(
        &self,
        view: &GridView,
        query: &GridQuery,
        space: Option<SpaceId>,
    ) -> Result<GridPage, StoreError> {
        self.table(view.table)?;
        let tables = self.read()?;
        Ok(grid::evaluate(view, query, space, &tables)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use crate::grid::GridQuery;
    use seniorcare_core::{Gridded, Record, UserId};
    use seniorcare_entities::{
        Allergen, CareLevel, Contract, ContractFacilityOption, ContractType, DiningRoom, Facility,
        Gender, Physician, Resident, Space,
    };

    async fn put<R: Record>(store: &InMemoryStore, record: &R) -> Result<Row, StoreError> {
        store.insert(R::TABLE, record.to_row().unwrap()).await
    }

    struct Fixture {
        store: InMemoryStore,
        space: Space,
        contract: Contract,
        dining_room: DiningRoom,
        option: ContractFacilityOption,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::standard();
        let space = Space::new("Sunrise");
        put(&store, &space).await.unwrap();

        let facility = Facility::new(space.id, "Sunrise Manor", "SRM");
        put(&store, &facility).await.unwrap();
        let dining_room = DiningRoom::new(facility.id, "Main hall");
        put(&store, &dining_room).await.unwrap();
        let care_level = CareLevel::new(space.id, "Assisted");
        put(&store, &care_level).await.unwrap();

        let birthday = NaiveDate::from_ymd_opt(1940, 1, 1).unwrap();
        let resident = Resident::new(space.id, "Anna", "Petrosyan", birthday, Gender::Female);
        put(&store, &resident).await.unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let contract = Contract::new(resident.id, ContractType::Facility, start);
        put(&store, &contract).await.unwrap();

        let mut option = ContractFacilityOption::new(contract.id);
        option.dining_room_id = Some(dining_room.id);
        option.care_level_id = Some(care_level.id);
        put(&store, &option).await.unwrap();

        Fixture {
            store,
            space,
            contract,
            dining_room,
            option,
        }
    }

    #[tokio::test]
    async fn duplicate_title_in_space_is_rejected() {
        let store = InMemoryStore::standard();
        let space = Space::new("A");
        let other = Space::new("B");
        put(&store, &space).await.unwrap();
        put(&store, &other).await.unwrap();

        put(&store, &Allergen::new(space.id, "Peanuts")).await.unwrap();
        let err = put(&store, &Allergen::new(space.id, "Peanuts")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::UniqueViolation { ref constraint, .. } if constraint == "uq_allergen_space_id_title"
        ));

        put(&store, &Allergen::new(other.id, "Peanuts")).await.unwrap();
        put(&store, &Allergen::new(space.id, "peanuts")).await.unwrap();
        assert_eq!(store.count(Allergen::TABLE).unwrap(), 3);
    }

    #[tokio::test]
    async fn nulls_never_collide() {
        let store = InMemoryStore::standard();
        let space = Space::new("A");
        put(&store, &space).await.unwrap();
        put(&store, &Physician::new(space.id, "Aram", "Hakobyan")).await.unwrap();
        put(&store, &Physician::new(space.id, "Lilit", "Sargsyan")).await.unwrap();

        let mut with_email = Physician::new(space.id, "Karen", "Mkrtchyan");
        with_email.email = Some("dr@example.com".into());
        put(&store, &with_email).await.unwrap();
        with_email.id = seniorcare_core::EntityId::new();
        assert!(put(&store, &with_email).await.is_err());
    }

    #[tokio::test]
    async fn dangling_reference_is_rejected() {
        let store = InMemoryStore::standard();
        let option = ContractFacilityOption::new(seniorcare_core::EntityId::new());
        let err = put(&store, &option).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ForeignKeyViolation { ref column, .. } if column == "contract_id"
        ));
    }

    #[tokio::test]
    async fn deleting_contract_cascades_to_option() {
        let f = fixture().await;
        let outcome = f.store.delete(Contract::TABLE, f.contract.id).await.unwrap();
        assert_eq!(outcome.cascaded_from(ContractFacilityOption::TABLE), 1);
        assert!(
            f.store
                .get(ContractFacilityOption::TABLE, f.option.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn deleting_dining_room_nulls_option_reference() {
        let f = fixture().await;
        let outcome = f.store.delete(DiningRoom::TABLE, f.dining_room.id).await.unwrap();
        assert_eq!(outcome.nulled_in(ContractFacilityOption::TABLE), 1);
        assert!(outcome.cascaded.is_empty());

        let row = f
            .store
            .get(ContractFacilityOption::TABLE, f.option.id)
            .await
            .unwrap()
            .unwrap();
        let option = ContractFacilityOption::from_row(row).unwrap();
        assert_eq!(option.dining_room_id, None);
        assert!(option.care_level_id.is_some());
    }

    #[tokio::test]
    async fn deleting_space_cascades_recursively() {
        let f = fixture().await;
        let outcome = f.store.delete(Space::TABLE, f.space.record_id()).await.unwrap();
        for table in [
            "tbl_facility",
            "tbl_dining_room",
            "tbl_care_level",
            "tbl_resident",
            "tbl_contract",
            "tbl_contract_facility_option",
        ] {
            assert_eq!(f.store.count(table).unwrap(), 0, "{table} not emptied");
        }
        assert_eq!(outcome.cascaded.len(), 6);
        assert!(outcome.nulled.is_empty());
    }

    #[tokio::test]
    async fn update_keeps_creation_stamp() {
        let store = InMemoryStore::standard();
        let space = Space::new("A");
        put(&store, &space).await.unwrap();

        let mut allergen = Allergen::new(space.id, "Dust");
        let creator = UserId::new();
        allergen.audit.created_by = Some(creator);
        allergen.audit.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        put(&store, &allergen).await.unwrap();

        allergen.audit.created_by = None;
        allergen.audit.created_at = Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        allergen.title = "House dust".into();
        let row = store.update(Allergen::TABLE, allergen.to_row().unwrap()).await.unwrap();
        let stored = Allergen::from_row(row).unwrap();
        assert_eq!(stored.title, "House dust");
        assert_eq!(stored.audit.created_by, Some(creator));
        assert_eq!(
            stored.audit.created_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn rejects_unknown_tables_and_columns() {
        let store = InMemoryStore::standard();
        assert!(matches!(
            store.list("tbl_invoice", None).await,
            Err(StoreError::UnknownTable(_))
        ));
        let mut row = Space::new("A").to_row().unwrap();
        row.insert("colour".into(), Value::from("red"));
        assert!(matches!(
            store.insert(Space::TABLE, row).await,
            Err(StoreError::Mapping(_))
        ));
    }

    #[tokio::test]
    async fn list_and_exists_with_are_space_scoped() {
        let store = InMemoryStore::standard();
        let a = Space::new("A");
        let b = Space::new("B");
        put(&store, &a).await.unwrap();
        put(&store, &b).await.unwrap();
        let peanuts = Allergen::new(a.id, "Peanuts");
        put(&store, &peanuts).await.unwrap();
        put(&store, &Allergen::new(b.id, "Dust")).await.unwrap();

        assert_eq!(store.list(Allergen::TABLE, Some(a.id)).await.unwrap().len(), 1);
        assert_eq!(store.list(Allergen::TABLE, None).await.unwrap().len(), 2);

        let columns = [
            ("title", Value::from("Peanuts")),
            ("space_id", Value::from(a.id.to_string())),
        ];
        assert!(store.exists_with(Allergen::TABLE, &columns, None).await.unwrap());
        assert!(
            !store
                .exists_with(Allergen::TABLE, &columns, Some(peanuts.id))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn space_grid_only_shows_the_requested_space() {
        let store = InMemoryStore::standard();
        let a = Space::new("Tenant A");
        let b = Space::new("Tenant B");
        put(&store, &a).await.unwrap();
        put(&store, &b).await.unwrap();

        let view = Space::grid_view("list").unwrap();
        let page = store
            .grid(&view, &GridQuery::default(), Some(a.id))
            .await
            .unwrap();
        let names: Vec<&str> = page
            .rows
            .iter()
            .map(|row| row["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Tenant A"]);
        assert_eq!(page.total, 1);
    }
}
