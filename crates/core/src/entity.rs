//! Entity trait: identity + continuity across state changes.

use crate::id::SpaceId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Entity scoped to exactly one space.
///
/// Entities reached only through a parent (options, phones, dining rooms)
/// are scoped transitively and do not implement this.
pub trait SpaceScoped {
    fn space_id(&self) -> SpaceId;
}
