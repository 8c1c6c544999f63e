//! Postgres-backed store.
//!
//! Every value is bound as text and cast to the column's type in the
//! statement, and rows come back as `row_to_json`, so the row shape is the
//! same JSON object the in-memory store holds.
//!
//! ## Error Mapping
//!
//! | SQLSTATE | StoreError |
//! |----------|------------|
//! | `23505` unique violation | `UniqueViolation` |
//! | `23503` foreign key violation | `ForeignKeyViolation` |
//! | `23502` not-null violation | `Mapping` |
//! | anything else | `Database` |

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row as _};
use tracing::instrument;
use uuid::Uuid;

use seniorcare_core::{EntityId, GridView, Row, SpaceId};

use super::{DeleteOutcome, NulledRef, RowRef, Store, StoreError, row_id};
use crate::config::DatabaseConfig;
use crate::grid::{self, GridPage, GridQuery};
use crate::schema::{Catalog, Column, OnDelete, Table};

/// Columns never rewritten by an update.
const IMMUTABLE: [&str; 3] = ["id", "created_at", "created_by"];

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
    catalog: Arc<Catalog>,
}

impl PostgresStore {
    pub fn new(pool: PgPool, catalog: Arc<Catalog>) -> Self {
        Self {
            pool: Arc::new(pool),
            catalog,
        }
    }

    /// Open a pool from configuration.
    pub async fn connect(config: &DatabaseConfig, catalog: Arc<Catalog>) -> Result<Self, StoreError> {
        let url = config
            .require_url()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool, catalog))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create every catalog table that does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(&self.catalog.ddl())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        tracing::info!(tables = self.catalog.tables().len(), "schema ensured");
        Ok(())
    }

    fn table(&self, name: &str) -> Result<&Table, StoreError> {
        self.catalog
            .table(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    async fn ids_referencing(
        &self,
        conn: &mut sqlx::PgConnection,
        table: &str,
        column: &str,
        parent: Uuid,
    ) -> Result<Vec<Uuid>, StoreError> {
        let sql = format!("SELECT \"id\" FROM \"{table}\" WHERE \"{column}\" = $1");
        let rows = sqlx::query(&sql)
            .bind(parent)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        rows.iter()
            .map(|r| r.try_get::<Uuid, _>("id"))
            .collect::<Result<_, _>>()
            .map_err(|e| StoreError::Mapping(e.to_string()))
    }
}

/// Text form of a JSON value for a `$n::cast` parameter.
fn param(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn known_columns<'t>(table: &'t Table, row: &Row) -> Result<Vec<&'t Column>, StoreError> {
    if let Some(key) = row.keys().find(|k| table.column(k).is_none()) {
        return Err(StoreError::Mapping(format!("{} has no column '{key}'", table.name)));
    }
    Ok(table.columns.iter().collect())
}

fn insert_sql(table: &Table, columns: &[&Column]) -> String {
    let names: Vec<String> = columns.iter().map(|c| format!("\"{}\"", c.name)).collect();
    let values: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("${}::{}", i + 1, c.sql_type.cast()))
        .collect();
    format!(
        "INSERT INTO \"{}\" AS t ({}) VALUES ({}) RETURNING row_to_json(t) AS row",
        table.name,
        names.join(", "),
        values.join(", ")
    )
}

/// `$1` is the id; the SET list follows in `columns` order from `$2`.
fn update_sql(table: &Table, columns: &[&Column]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("\"{}\" = ${}::{}", c.name, i + 2, c.sql_type.cast()))
        .collect();
    format!(
        "UPDATE \"{}\" AS t SET {} WHERE t.\"id\" = $1::uuid RETURNING row_to_json(t) AS row",
        table.name,
        assignments.join(", ")
    )
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: Vec<Option<String>>,
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = query.bind(value);
    }
    query
}

fn json_row(row: &sqlx::postgres::PgRow) -> Result<Row, StoreError> {
    match row.try_get::<Value, _>("row") {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Mapping(format!("expected a row object, got {other}"))),
        Err(e) => Err(StoreError::Mapping(e.to_string())),
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self, row), fields(table = %table), err)]
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let table = self.table(table)?;
        let columns = known_columns(table, &row)?;
        let sql = insert_sql(table, &columns);
        let values = columns
            .iter()
            .map(|c| row.get(c.name).and_then(param))
            .collect();
        let stored = bind_all(sqlx::query(&sql), values)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;
        json_row(&stored)
    }

    #[instrument(skip(self, row), fields(table = %table), err)]
    async fn update(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let table = self.table(table)?;
        known_columns(table, &row)?;
        let id = row_id(table.name, &row)?;
        let columns: Vec<&Column> = table
            .columns
            .iter()
            .filter(|c| !IMMUTABLE.contains(&c.name))
            .collect();
        let sql = update_sql(table, &columns);
        let mut values = vec![Some(id.to_string())];
        values.extend(columns.iter().map(|c| row.get(c.name).and_then(param)));
        let stored = bind_all(sqlx::query(&sql), values)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e))?
            .ok_or_else(|| StoreError::NotFound {
                table: table.name.to_string(),
                id: EntityId::from_uuid(id),
            })?;
        json_row(&stored)
    }

    async fn get(&self, table: &str, id: EntityId) -> Result<Option<Row>, StoreError> {
        let table = self.table(table)?;
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM \"{}\" AS t WHERE t.\"id\" = $1",
            table.name
        );
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?
            .as_ref()
            .map(json_row)
            .transpose()
    }

    /// Walks the reference graph inside the delete's transaction to report
    /// the effects; the database applies them.
    #[instrument(skip(self), fields(table = %table, id = %id), err)]
    async fn delete(&self, table: &str, id: EntityId) -> Result<DeleteOutcome, StoreError> {
        let table = self.table(table)?;
        let root = *id.as_uuid();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        let mut doomed: BTreeSet<(&'static str, Uuid)> = BTreeSet::from([(table.name, root)]);
        let mut queue = vec![(table.name, root)];
        let mut outcome = DeleteOutcome::default();
        while let Some((parent, parent_id)) = queue.pop() {
            for incoming in self.catalog.referencing(parent) {
                let child_table = incoming.table.name;
                let column = incoming.key.column;
                let children = self
                    .ids_referencing(&mut *tx, child_table, column, parent_id)
                    .await?;
                for child_id in children {
                    match incoming.key.on_delete {
                        OnDelete::Cascade => {
                            if doomed.insert((child_table, child_id)) {
                                outcome.cascaded.push(RowRef {
                                    table: child_table,
                                    id: child_id,
                                });
                                queue.push((child_table, child_id));
                            }
                        }
                        OnDelete::SetNull => outcome.nulled.push(NulledRef {
                            table: child_table,
                            id: child_id,
                            column,
                        }),
                        // the DELETE below fails with 23503
                        OnDelete::Restrict => {}
                    }
                }
            }
        }
        outcome
            .nulled
            .retain(|n| !doomed.contains(&(n.table, n.id)));

        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", table.name);
        let result = sqlx::query(&sql)
            .bind(root)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: table.name.to_string(),
                id,
            });
        }
        tx.commit().await.map_err(|e| map_sqlx_error("delete", e))?;

        tracing::debug!(
            cascaded = outcome.cascaded.len(),
            nulled = outcome.nulled.len(),
            "delete applied"
        );
        Ok(outcome)
    }

    async fn list(&self, table: &str, space: Option<SpaceId>) -> Result<Vec<Row>, StoreError> {
        let table = self.table(table)?;
        let scoped = space.filter(|_| table.column("space_id").is_some());
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM \"{}\" AS t{} ORDER BY t.\"id\"",
            table.name,
            if scoped.is_some() { " WHERE t.\"space_id\" = $1" } else { "" }
        );
        let mut query = sqlx::query(&sql);
        if let Some(space) = scoped {
            query = query.bind(*space.as_uuid());
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;
        rows.iter().map(json_row).collect()
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
        let mut conditions = Vec::with_capacity(columns.len() + 1);
        let mut values = Vec::with_capacity(columns.len() + 1);
        for (name, value) in columns {
            let column = table.column(name).ok_or_else(|| {
                StoreError::Mapping(format!("{} has no column '{name}'", table.name))
            })?;
            values.push(param(value));
            conditions.push(format!(
                "\"{name}\" = ${}::{}",
                values.len(),
                column.sql_type.cast()
            ));
        }
        if let Some(exclude) = exclude {
            values.push(Some(exclude.to_string()));
            conditions.push(format!("\"id\" <> ${}::uuid", values.len()));
        }
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM \"{}\" WHERE {}) AS found",
            table.name,
            conditions.join(" AND ")
        );
        let row = bind_all(sqlx::query(&sql), values)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists_with", e))?;
        row.try_get::<bool, _>("found")
            .map_err(|e| StoreError::Mapping(e.to_string()))
    }

    #[instrument(skip(self, view, query), fields(view = view.name, table = view.table), err)]
    async fn grid(
        &self,
        view: &GridView,
        query: &GridQuery,
        space: Option<SpaceId>,
    ) -> Result<GridPage, StoreError> {
        let built = grid::build_sql(view, query, space)?;

        let sql = format!("SELECT row_to_json(q) AS row FROM ({}) AS q", built.sql);
        let params: Vec<Option<String>> = built.params.iter().cloned().map(Some).collect();
        let rows = bind_all(sqlx::query(&sql), params.clone())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("grid", e))?
            .iter()
            .map(json_row)
            .collect::<Result<Vec<_>, _>>()?;

        let total = bind_all(sqlx::query(&built.count_sql), params)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("grid", e))?
            .try_get::<i64, _>("total")
            .map_err(|e| StoreError::Mapping(e.to_string()))?;

        Ok(GridPage::new(
            view.columns.clone(),
            rows,
            u64::try_from(total).unwrap_or(0),
            query.pagination.clamped(),
        ))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            let table = db_err.table().unwrap_or_default().to_string();
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation {
                    table,
                    columns: Vec::new(),
                    constraint,
                },
                Some("23503") => StoreError::ForeignKeyViolation {
                    table,
                    column: constraint,
                    message: msg,
                },
                Some("23502") => StoreError::Mapping(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Database(format!("{operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> Table {
        Catalog::standard().table(name).unwrap().clone()
    }

    #[test]
    fn insert_casts_every_parameter() {
        let t = table("tbl_allergen");
        let columns: Vec<&Column> = t.columns.iter().collect();
        let sql = insert_sql(&t, &columns);
        assert!(sql.starts_with("INSERT INTO \"tbl_allergen\" AS t (\"id\", \"space_id\""));
        assert!(sql.contains("$1::uuid, $2::uuid, $3::text"));
        assert!(sql.ends_with("RETURNING row_to_json(t) AS row"));
    }

    #[test]
    fn update_never_sets_creation_columns() {
        let t = table("tbl_allergen");
        let columns: Vec<&Column> = t
            .columns
            .iter()
            .filter(|c| !IMMUTABLE.contains(&c.name))
            .collect();
        let sql = update_sql(&t, &columns);
        assert!(sql.contains("SET \"space_id\" = $2::uuid"));
        assert!(sql.contains("\"updated_at\" = $"));
        assert!(!sql.contains("\"created_at\" ="));
        assert!(!sql.contains("\"created_by\" ="));
        assert!(sql.contains("WHERE t.\"id\" = $1::uuid"));
    }

    #[test]
    fn unknown_column_is_a_mapping_error() {
        let t = table("tbl_space");
        let mut row = Row::new();
        row.insert("colour".into(), Value::from("red"));
        assert!(matches!(known_columns(&t, &row), Err(StoreError::Mapping(_))));
    }

    #[test]
    fn params_are_text() {
        assert_eq!(param(&Value::Null), None);
        assert_eq!(param(&Value::from("x")).as_deref(), Some("x"));
        assert_eq!(param(&Value::from(true)).as_deref(), Some("true"));
        assert_eq!(param(&Value::from(12.5)).as_deref(), Some("12.5"));
        assert_eq!(
            param(&serde_json::json!({"a": 1})).as_deref(),
            Some("{\"a\":1}")
        );
    }
}
