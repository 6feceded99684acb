//! Facade crate re-exporting the reflection engine.
//!
//! All functionality lives in `mirra-core`; this crate is the single
//! dependency consumers declare.

pub use mirra_core::*;

/// Commonly used items, importable in one line.
pub mod prelude {
    pub use mirra_core::{
        Describe, Ownership, ReflectError, ReflectResult, TypeBuilder, TypeFlags, TypeId,
        TypeInfo, TypeRegistry, Variant,
    };
}
