//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two instances with the same attribute
/// values are the same value (e.g. `Money`, a depreciation method descriptor).
/// They are immutable; "modifying" one means building a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
