//! `seniorcare-core`: conventions shared by every entity.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the lifecycle state, the audit pair, title normalization,
//! validation groups, grid descriptors and serialization projections.

pub mod audit;
pub mod entity;
pub mod error;
pub mod grid;
pub mod id;
pub mod lifecycle;
pub mod projection;
pub mod record;
pub mod text;
pub mod validation;
pub mod value_object;

pub use audit::{Audit, Audited};
pub use entity::{Entity, SpaceScoped};
pub use error::{DomainError, DomainResult, ValidationErrors};
pub use grid::{ColumnType, GridColumn, GridJoin, GridView, Gridded};
pub use id::{EntityId, SpaceId, UserId};
pub use lifecycle::{HasLifecycleState, LifecycleState};
pub use projection::Projection;
pub use record::{Record, Row};
pub use text::{Titled, normalize_title};
pub use validation::{Constraint, FieldValue, Group, Operations, Rule, UniqueCheck, Validate};
pub use value_object::ValueObject;
