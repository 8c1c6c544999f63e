//! Storage collaborator.
//!
//! Stores move [`Row`]s in and out of named tables and enforce the rules the
//! [`Catalog`](crate::schema::Catalog) declares: uniqueness, reference
//! existence and the per-reference delete action. Typed access goes through
//! [`Repository`](crate::repository::Repository).

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use seniorcare_core::{DomainError, EntityId, GridView, Row, SpaceId};

use crate::grid::{GridError, GridPage, GridQuery};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint '{constraint}' violated on {table}")]
    UniqueViolation {
        table: String,
        constraint: String,
        columns: Vec<String>,
    },

    #[error("foreign key violation on {table}.{column}: {message}")]
    ForeignKeyViolation {
        table: String,
        column: String,
        message: String,
    },

    #[error("{table} row {id} not found")]
    NotFound { table: String, id: EntityId },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("row mapping failed: {0}")]
    Mapping(String),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("database error: {0}")]
    Database(String),
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        StoreError::Mapping(err.to_string())
    }
}

/// A row touched as a side effect of a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRef {
    pub table: &'static str,
    pub id: Uuid,
}

/// A reference column nulled as a side effect of a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NulledRef {
    pub table: &'static str,
    pub id: Uuid,
    pub column: &'static str,
}

/// What a delete did besides removing the requested row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Dependents removed through `ON DELETE CASCADE`.
    pub cascaded: Vec<RowRef>,
    /// References cleared through `ON DELETE SET NULL`.
    pub nulled: Vec<NulledRef>,
}

impl DeleteOutcome {
    pub fn cascaded_from(&self, table: &str) -> usize {
        self.cascaded.iter().filter(|r| r.table == table).count()
    }

    pub fn nulled_in(&self, table: &str) -> usize {
        self.nulled.iter().filter(|r| r.table == table).count()
    }
}

/// Row-level persistence over the schema catalog.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Insert a new row; returns the stored row.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Replace an existing row. `created_at`/`created_by` keep their stored
    /// values whatever the incoming row says.
    async fn update(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    async fn get(&self, table: &str, id: EntityId) -> Result<Option<Row>, StoreError>;

    /// Delete a row and apply the declared action of every reference to it.
    async fn delete(&self, table: &str, id: EntityId) -> Result<DeleteOutcome, StoreError>;

    /// All rows of a table, restricted to `space` when the table has a
    /// `space_id` column.
    async fn list(&self, table: &str, space: Option<SpaceId>) -> Result<Vec<Row>, StoreError>;

    /// Whether a row other than `exclude` has exactly these column values.
    async fn exists_with(
        &self,
        table: &str,
        columns: &[(&str, Value)],
        exclude: Option<EntityId>,
    ) -> Result<bool, StoreError>;

    async fn grid(
        &self,
        view: &GridView,
        query: &GridQuery,
        space: Option<SpaceId>,
    ) -> Result<GridPage, StoreError>;
}

#[async_trait::async_trait]
impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        (**self).insert(table, row).await
    }

    async fn update(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        (**self).update(table, row).await
    }

    async fn get(&self, table: &str, id: EntityId) -> Result<Option<Row>, StoreError> {
        (**self).get(table, id).await
    }

    async fn delete(&self, table: &str, id: EntityId) -> Result<DeleteOutcome, StoreError> {
        (**self).delete(table, id).await
    }

    async fn list(&self, table: &str, space: Option<SpaceId>) -> Result<Vec<Row>, StoreError> {
        (**self).list(table, space).await
    }

    async fn exists_with(
        &self,
        table: &str,
        columns: &[(&str, Value)],
        exclude: Option<EntityId>,
    ) -> Result<bool, StoreError> {
        (**self).exists_with(table, columns, exclude).await
    }

    async fn grid(
        &self,
        view: &GridView,
        query: &GridQuery,
        space: Option<SpaceId>,
    ) -> Result<GridPage, StoreError> {
        (**self).grid(view, query, space).await
    }
}

/// The `id` column of a row.
pub(crate) fn row_id(table: &str, row: &Row) -> Result<Uuid, StoreError> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| StoreError::Mapping(format!("{table} row has no valid id")))
}
