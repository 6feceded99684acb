//! Unified error types for the reflection engine.
//!
//! Every fallible operation in the engine returns a result value; nothing is
//! thrown across the dynamic boundary. Each area has its own error enum for
//! fine-grained handling, and all of them convert into [`ReflectError`] for
//! unified propagation:
//!
//! ```text
//! ReflectError (top-level wrapper, optional backtrace in debug builds)
//! ├── RegistryError - id allocation and descriptor lookup
//! ├── VariantError  - type-erased value access
//! ├── FieldError    - dynamic field get/set
//! └── MethodError   - overload selection and invocation
//! ```
//!
//! Reflection failures are programmer/configuration errors, not transient
//! faults; nothing here is retried automatically.

use std::backtrace::Backtrace;
use std::fmt;

use thiserror::Error;

use crate::type_id::TypeId;
use crate::variant::Ownership;

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors surfaced by the type registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The zero sentinel id was used where a registered id is required.
    #[error("type id 0 is the invalid sentinel and never resolves")]
    InvalidId,

    /// The id was never registered in this process image.
    #[error("no type registered under id {0}")]
    NotFound(TypeId),

    /// The 32-bit id space is exhausted.
    #[error("type id space exhausted")]
    MaxLimitReached,

    /// Storage allocation for the registry tables failed.
    #[error("registry storage allocation failed")]
    OutOfMemory,

    /// A descriptor factory reported an error during registration.
    #[error("type descriptor construction failed: {0}")]
    CreationFailed(String),
}

// ============================================================================
// Variant Errors
// ============================================================================

/// Errors surfaced by type-erased value access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    /// The requested type does not match the erased payload.
    #[error("variant holds `{actual}` but `{requested}` was requested")]
    TypeMismatch {
        /// Name of the type the caller asked for.
        requested: &'static str,
        /// Name of the type actually stored.
        actual: &'static str,
    },

    /// Mutable access was requested through a const ownership category.
    #[error("mutable access to `{requested}` through a {kind} variant")]
    ConstViolation {
        /// The const category that blocked the access.
        kind: Ownership,
        /// Name of the type the caller asked for.
        requested: &'static str,
    },

    /// Any access through an empty variant.
    #[error("access through an empty variant")]
    VoidAccess,

    /// A move was requested out of a non-owning category.
    #[error("cannot move a value out of a {kind} variant")]
    NotOwned {
        /// The borrowing category that blocked the move.
        kind: Ownership,
    },
}

// ============================================================================
// Field Errors
// ============================================================================

/// Errors surfaced by dynamic field access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Write access to a const field.
    #[error("field `{field}` is const and cannot be written")]
    ConstViolation {
        /// Field name.
        field: String,
    },

    /// The receiver's type id does not match the declaring type.
    #[error("field `{field}` is declared on type {expected}, receiver has type {got}")]
    WrongReceiverType {
        /// Field name.
        field: String,
        /// Id of the declaring type.
        expected: TypeId,
        /// Id the receiver actually carried.
        got: TypeId,
    },

    /// The value's type id does not match the field's declared type.
    #[error("field `{field}` has type {expected}, value has type {got}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Declared field type id.
        expected: TypeId,
        /// Id the value actually carried.
        got: TypeId,
    },

    /// An instance field was accessed with the void variant as receiver.
    #[error("field `{field}` requires a receiver instance")]
    MissingReceiver {
        /// Field name.
        field: String,
    },

    /// A static field backed by accessor closures has no aliasable storage.
    #[error("static field `{field}` has no addressable storage")]
    NotAddressable {
        /// Field name.
        field: String,
    },
}

// ============================================================================
// Method Errors
// ============================================================================

/// Errors surfaced by dynamic method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodError {
    /// No overload accepts the supplied number of arguments.
    #[error("method `{method}` has no overload taking {got} argument(s)")]
    ArgumentCountMismatch {
        /// Method name.
        method: String,
        /// Number of arguments supplied.
        got: usize,
    },

    /// An overload with matching arity exists, but argument types differ.
    #[error("no overload of `{method}` matches the supplied argument types")]
    NoMatchingOverload {
        /// Method name.
        method: String,
    },

    /// A non-static method was invoked with the void variant as receiver.
    #[error("method `{method}` requires a receiver instance")]
    MissingReceiver {
        /// Method name.
        method: String,
    },
}

// ============================================================================
// Top-level wrapper
// ============================================================================

/// The area an error originated from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Registry lookup or registration failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Type-erased value access failure.
    #[error(transparent)]
    Variant(#[from] VariantError),

    /// Dynamic field access failure.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Dynamic method invocation failure.
    #[error(transparent)]
    Method(#[from] MethodError),
}

/// Top-level error carrying the area-specific kind and, in debug builds, a
/// captured call stack for diagnostics.
#[derive(Debug)]
pub struct ReflectError {
    kind: ErrorKind,
    trace: Option<Box<Backtrace>>,
}

impl ReflectError {
    fn capture(kind: ErrorKind) -> Self {
        let trace = if cfg!(debug_assertions) {
            Some(Box::new(Backtrace::capture()))
        } else {
            None
        };
        Self { kind, trace }
    }

    /// The area-specific error this wraps.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The call stack captured at construction, when available.
    ///
    /// Only populated in debug builds, and only if backtrace capture is
    /// enabled for the process.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.trace.as_deref()
    }
}

impl fmt::Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for ReflectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for ReflectError {
    fn from(kind: ErrorKind) -> Self {
        ReflectError::capture(kind)
    }
}

impl From<RegistryError> for ReflectError {
    fn from(err: RegistryError) -> Self {
        ReflectError::capture(ErrorKind::Registry(err))
    }
}

impl From<VariantError> for ReflectError {
    fn from(err: VariantError) -> Self {
        ReflectError::capture(ErrorKind::Variant(err))
    }
}

impl From<FieldError> for ReflectError {
    fn from(err: FieldError) -> Self {
        ReflectError::capture(ErrorKind::Field(err))
    }
}

impl From<MethodError> for ReflectError {
    fn from(err: MethodError) -> Self {
        ReflectError::capture(ErrorKind::Method(err))
    }
}

/// Result alias used throughout the engine.
pub type ReflectResult<T> = Result<T, ReflectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_error_messages() {
        assert_eq!(
            RegistryError::NotFound(TypeId::from_raw(99)).to_string(),
            "no type registered under id 99"
        );
        assert_eq!(
            RegistryError::InvalidId.to_string(),
            "type id 0 is the invalid sentinel and never resolves"
        );
    }

    #[test]
    fn variant_error_names_both_types() {
        let err = VariantError::TypeMismatch {
            requested: "i32",
            actual: "f64",
        };
        let msg = err.to_string();
        assert!(msg.contains("i32"));
        assert!(msg.contains("f64"));
    }

    #[test]
    fn wrapper_preserves_kind() {
        let err = ReflectError::from(VariantError::VoidAccess);
        assert!(matches!(
            err.kind(),
            ErrorKind::Variant(VariantError::VoidAccess)
        ));
        assert_eq!(err.to_string(), "access through an empty variant");
    }

    #[test]
    fn wrapper_exposes_source() {
        use std::error::Error as _;
        let err = ReflectError::from(RegistryError::MaxLimitReached);
        assert!(err.source().is_some());
    }

    #[test]
    fn backtrace_captured_in_debug_builds() {
        let err = ReflectError::from(MethodError::MissingReceiver {
            method: "frob".into(),
        });
        assert_eq!(err.backtrace().is_some(), cfg!(debug_assertions));
    }
}
