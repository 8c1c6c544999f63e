//! Value object trait: equality by value, not identity.
//!
//! Field groups shared by several entities (phone numbers, care flags) are
//! composed into their owners as value objects instead of being repeated
//! column by column.

/// Marker trait for value objects.
///
/// Two value objects with the same attribute values are the same value; to
/// "modify" one, replace it wholesale.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct CareFlags {
///     dnr: bool,
///     polst: bool,
/// }
///
/// impl ValueObject for CareFlags {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
