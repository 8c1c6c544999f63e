//! Infrastructure layer: schema catalog, stores, audit stamping, grid
//! queries and configuration.

pub mod audit;
pub mod config;
pub mod grid;
pub mod repository;
pub mod schema;
pub mod store;

pub use audit::{AuditListener, Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use grid::{BuiltQuery, GridError, GridPage, GridQuery, Pagination};
pub use repository::{Repository, RepositoryError};
pub use schema::{Catalog, OnDelete, Table};
pub use seniorcare_core::record::{Record, Row};
pub use store::{DeleteOutcome, InMemoryStore, PostgresStore, Store, StoreError};
