//! Record mapping: entity <-> storage row.
//!
//! Rows are JSON objects keyed by column name. Entities serialize straight
//! into their column layout (embedded groups are flattened), so the mapping
//! is the serde derive and nothing else.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::DomainError;
use crate::id::{EntityId, SpaceId};

pub type Row = Map<String, Value>;

/// A persisted entity type bound to one table.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn record_id(&self) -> EntityId;

    /// Owning space, for tenant-scoped records.
    fn record_space(&self) -> Option<SpaceId> {
        None
    }

    /// Write hook run before every insert/update.
    fn normalize(&mut self) {}

    fn to_row(&self) -> Result<Row, DomainError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(DomainError::invariant(format!(
                "{} does not serialize to an object",
                Self::TABLE
            ))),
            Err(e) => Err(DomainError::invariant(format!("{}: {e}", Self::TABLE))),
        }
    }

    fn from_row(row: Row) -> Result<Self, DomainError> {
        serde_json::from_value(Value::Object(row))
            .map_err(|e| DomainError::validation(format!("{}: {e}", Self::TABLE)))
    }
}
