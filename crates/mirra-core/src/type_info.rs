//! Immutable type descriptors and their query surface.
//!
//! A [`TypeInfo`] is the static metadata for one registered type: identity,
//! naming, structure (bases, inner types, flags) and the ordered field and
//! method descriptor lists. Descriptors are built once at first reflection
//! and never mutated afterward; the registry owns them behind `Arc` and every
//! other component refers to them by [`TypeId`].
//!
//! Typed references between descriptors (bases, inners, field types,
//! argument and return types) are ids, not embedded descriptors. They are
//! resolved lazily through the registry, which tolerates forward references
//! and breaks cycles between mutually referencing types; a dangling id
//! surfaces as `NotFound` at resolution time, not at construction time.

use std::any;
use std::fmt;

use bitflags::bitflags;

use crate::field::Field;
use crate::method::Method;
use crate::registry::TypeRegistry;
use crate::type_id::TypeId;

bitflags! {
    /// Shape flags for a type descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeFlags: u32 {
        /// The type is an array shape over its inner type.
        const ARRAY = 1;
        /// The type is a pointer shape over its inner type.
        const POINTER = 1 << 1;
        /// The type is a reference shape over its inner type.
        const REFERENCE = 1 << 2;
        /// The type is a const-qualified view of its inner type.
        const CONST = 1 << 3;
        /// The type is volatile-qualified.
        const VOLATILE = 1 << 4;
    }
}

/// Custom print function for compound shapes ("const X", "pointer to X").
///
/// Receives the registry so inner ids can be resolved to names.
pub type PrintFn = fn(&TypeInfo, &TypeRegistry, &mut fmt::Formatter<'_>) -> fmt::Result;

/// Immutable static metadata for one registered type.
pub struct TypeInfo {
    pub(crate) id: TypeId,
    pub(crate) rust: Option<any::TypeId>,
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
    pub(crate) bases: Vec<TypeId>,
    pub(crate) inners: Vec<TypeId>,
    pub(crate) flags: TypeFlags,
    pub(crate) fields: Vec<Field>,
    pub(crate) methods: Vec<Method>,
    pub(crate) printer: Option<PrintFn>,
}

impl TypeInfo {
    /// The registry id of this type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Unqualified type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace, if the type declared one.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Shape flags.
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    /// Whether this flag is set on the descriptor.
    pub fn has(&self, flags: TypeFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Identity comparison by registry id.
    pub fn is(&self, id: TypeId) -> bool {
        self.id == id
    }

    /// Whether this descriptor mirrors the concrete Rust type `T`.
    pub fn is_type<T: any::Any>(&self) -> bool {
        self.rust == Some(any::TypeId::of::<T>())
    }

    /// Ids of the declared base types, in declaration order.
    pub fn bases(&self) -> &[TypeId] {
        &self.bases
    }

    /// Id of the `i`-th base type.
    pub fn base(&self, i: usize) -> Option<TypeId> {
        self.bases.get(i).copied()
    }

    /// Ids of the declared inner types, in declaration order.
    pub fn inners(&self) -> &[TypeId] {
        &self.inners
    }

    /// Id of the `i`-th inner type.
    pub fn inner(&self, i: usize) -> Option<TypeId> {
        self.inners.get(i).copied()
    }

    /// Whether `id` appears in the inner-type list.
    pub fn has_inner(&self, id: TypeId) -> bool {
        self.inners.contains(&id)
    }

    /// The ordered field descriptor list.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// First field with the given name, in declaration order.
    ///
    /// Absence is a normal empty result, not an error.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// The ordered method descriptor list.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// First method with the given name, in declaration order.
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name() == name)
    }

    /// Canonical textual form: `[namespace::]name`.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}::{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Write the canonical textual form, using the custom printer when one
    /// was installed.
    pub fn print(&self, registry: &TypeRegistry, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.printer {
            Some(printer) => printer(self, registry, f),
            None => f.write_str(&self.qualified_name()),
        }
    }

    /// The canonical textual form as an owned string.
    pub fn dump(&self, registry: &TypeRegistry) -> String {
        self.display(registry).to_string()
    }

    /// Adapter implementing [`fmt::Display`] against the given registry.
    pub fn display<'a>(&'a self, registry: &'a TypeRegistry) -> TypeDisplay<'a> {
        TypeDisplay {
            info: self,
            registry,
        }
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("id", &self.id)
            .field("name", &self.qualified_name())
            .field("flags", &self.flags)
            .field("bases", &self.bases)
            .field("inners", &self.inners)
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Borrowed pair of descriptor and registry that knows how to print itself.
pub struct TypeDisplay<'a> {
    info: &'a TypeInfo,
    registry: &'a TypeRegistry,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.info.print(self.registry, f)
    }
}
