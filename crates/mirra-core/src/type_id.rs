//! Sequential numeric identity for registered types.
//!
//! A [`TypeId`] is an opaque 32-bit handle assigned by the registry from a
//! monotonically increasing counter. Ids are never reused within a process
//! image: once a descriptor has been registered under an id, that id refers
//! to it for the rest of the process lifetime.
//!
//! Two ids sit outside the counter range:
//!
//! - [`TypeId::INVALID`] (`0`) — the "never registered" sentinel. Resolving
//!   it always fails with `InvalidId`.
//! - [`TypeId::VOID`] — the fixed id of the built-in `void` descriptor,
//!   resolvable without touching the counter.

use std::fmt;

/// Opaque handle identifying a registered type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// The invalid/unregistered sentinel. Never resolves to a descriptor.
    pub const INVALID: TypeId = TypeId(0);

    /// Fixed id of the built-in `void` descriptor.
    pub const VOID: TypeId = TypeId(u32::MAX);

    /// First id the registry counter hands out.
    pub(crate) const FIRST: u32 = 1;

    /// Last id the counter may hand out before `MaxLimitReached`.
    pub(crate) const LAST: u32 = u32::MAX - 1;

    /// Reconstruct an id from its raw value.
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    /// The raw 32-bit value of this id.
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// Whether this id is anything other than the invalid sentinel.
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TypeId::INVALID => write!(f, "invalid"),
            TypeId::VOID => write!(f, "void"),
            TypeId(raw) => write!(f, "{raw}"),
        }
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_not_valid() {
        assert!(!TypeId::INVALID.is_valid());
        assert!(TypeId::VOID.is_valid());
        assert!(TypeId::from_raw(1).is_valid());
    }

    #[test]
    fn raw_round_trip() {
        let id = TypeId::from_raw(42);
        assert_eq!(id.to_raw(), 42);
        assert_eq!(id, TypeId::from_raw(42));
        assert_ne!(id, TypeId::from_raw(43));
    }

    #[test]
    fn display_forms() {
        assert_eq!(TypeId::INVALID.to_string(), "invalid");
        assert_eq!(TypeId::VOID.to_string(), "void");
        assert_eq!(TypeId::from_raw(7).to_string(), "7");
        assert_eq!(format!("{:?}", TypeId::from_raw(7)), "TypeId(7)");
    }

    #[test]
    fn default_is_invalid() {
        assert_eq!(TypeId::default(), TypeId::INVALID);
    }
}
