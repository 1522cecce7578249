//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Tools, machines and reports keep their identifier for their whole lifetime;
/// every other attribute may change (or, for append-only records, never does).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
