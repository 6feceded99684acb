//! The type registry: single source of truth mapping [`TypeId`] to
//! [`TypeInfo`].
//!
//! A [`TypeRegistry`] is an explicitly constructed object injected into
//! every reflection entry point; there is no hidden global instance. First
//! reflection of a type registers it (mutating the registry), every later
//! reflection of the same type is a pure memoized read. The table only
//! grows: descriptors live for the registry's lifetime and are never
//! deregistered.
//!
//! Registration requires `&mut TypeRegistry`, so exclusive access stands in
//! for an initialization lock. Once registered, descriptors are immutable
//! and shared behind `Arc`, making every read path (`get`, field/method
//! lookup, invocation) safe to use from multiple threads.
//!
//! Types become reflectable by implementing [`Describe`]: the producer
//! contract for the descriptor data. The engine does not care whether an
//! implementation is hand-written or generated from annotated sources.

use std::any::{self, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::error::{ReflectError, ReflectResult, RegistryError};
use crate::field::Field;
use crate::method::{Method, Overload};
use crate::type_id::TypeId;
use crate::type_info::{PrintFn, TypeFlags, TypeInfo};

/// Descriptor producer: a type describes its own reflection metadata.
///
/// `describe` is invoked at most once per registry, on first reflection of
/// the type; the result is memoized under the assigned [`TypeId`].
pub trait Describe: Any {
    /// Populate the descriptor under construction.
    fn describe(builder: &mut TypeBuilder<'_, Self>) -> ReflectResult<()>
    where
        Self: Sized;
}

lazy_static! {
    static ref VOID_TYPE: Arc<TypeInfo> = Arc::new(TypeInfo {
        id: TypeId::VOID,
        rust: Some(any::TypeId::of::<()>()),
        name: "void".to_string(),
        namespace: None,
        bases: Vec::new(),
        inners: Vec::new(),
        flags: TypeFlags::empty(),
        fields: Vec::new(),
        methods: Vec::new(),
        printer: None,
    });
}

/// Process-wide store mapping [`TypeId`] to immutable descriptors.
pub struct TypeRegistry {
    types: FxHashMap<TypeId, Arc<TypeInfo>>,
    by_rust: FxHashMap<any::TypeId, TypeId>,
    by_name: FxHashMap<String, TypeId>,
    compounds: FxHashMap<(u32, TypeId), TypeId>,
    next: u32,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        TypeRegistry {
            types: FxHashMap::default(),
            by_rust: FxHashMap::default(),
            by_name: FxHashMap::default(),
            compounds: FxHashMap::default(),
            next: TypeId::FIRST,
        }
    }

    fn allocate(&mut self) -> Result<TypeId, RegistryError> {
        if self.next > TypeId::LAST {
            return Err(RegistryError::MaxLimitReached);
        }
        let id = TypeId::from_raw(self.next);
        self.next += 1;
        Ok(id)
    }

    fn reserve_slot(&mut self) -> Result<(), RegistryError> {
        self.types
            .try_reserve(1)
            .map_err(|_| RegistryError::OutOfMemory)
    }

    /// Reflect `T`, registering it on first use, and return its id.
    ///
    /// Registration is memoized per concrete Rust type; the descriptor
    /// factory runs exactly once. `()` resolves to [`TypeId::VOID`] without
    /// consuming a counter id.
    pub fn reflect<T: Describe>(&mut self) -> ReflectResult<TypeId> {
        let rust = any::TypeId::of::<T>();
        if rust == any::TypeId::of::<()>() {
            return Ok(TypeId::VOID);
        }
        if let Some(id) = self.by_rust.get(&rust) {
            return Ok(*id);
        }
        self.reserve_slot()?;
        let id = self.allocate()?;
        // Memoize before describing so mutually referencing types terminate.
        self.by_rust.insert(rust, id);
        let mut builder = TypeBuilder {
            registry: self,
            info: TypeInfo {
                id,
                rust: Some(rust),
                name: short_type_name::<T>().to_string(),
                namespace: None,
                bases: Vec::new(),
                inners: Vec::new(),
                flags: TypeFlags::empty(),
                fields: Vec::new(),
                methods: Vec::new(),
                printer: None,
            },
            _marker: PhantomData,
        };
        match T::describe(&mut builder) {
            Ok(()) => {
                let info = builder.info;
                self.by_name.insert(info.qualified_name(), id);
                self.types.insert(id, Arc::new(info));
                Ok(id)
            }
            Err(err) => {
                self.by_rust.remove(&rust);
                Err(RegistryError::CreationFailed(err.to_string()).into())
            }
        }
    }

    /// Reflect `T` and return its descriptor.
    pub fn reflect_type<T: Describe>(&mut self) -> ReflectResult<Arc<TypeInfo>> {
        let id = self.reflect::<T>()?;
        self.get(id)
    }

    /// Resolve an id to its descriptor.
    ///
    /// `InvalidId` for the zero sentinel, `NotFound` for ids never
    /// registered in this registry.
    pub fn get(&self, id: TypeId) -> ReflectResult<Arc<TypeInfo>> {
        if id == TypeId::INVALID {
            return Err(RegistryError::InvalidId.into());
        }
        if id == TypeId::VOID {
            return Ok(Arc::clone(&VOID_TYPE));
        }
        self.types
            .get(&id)
            .cloned()
            .ok_or_else(|| ReflectError::from(RegistryError::NotFound(id)))
    }

    /// The fixed built-in `void` descriptor.
    ///
    /// Always resolvable; distinct from ordinary registration and never
    /// touches the id counter.
    pub fn void(&self) -> Arc<TypeInfo> {
        Arc::clone(&VOID_TYPE)
    }

    /// Look up an id by qualified name.
    pub fn find(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Number of registered descriptors (compounds included, `void`
    /// excluded).
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all registered descriptors in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeInfo>> {
        self.types.values()
    }

    /// Argument-to-parameter compatibility: exact id, or const-widening
    /// (`from` is a const view whose inner type is `to`).
    ///
    /// A const value may be read as its non-const shape, never the other
    /// way around.
    pub fn is_compatible(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        match self.types.get(&from) {
            Some(info) => {
                info.flags.contains(TypeFlags::CONST) && info.inners.first() == Some(&to)
            }
            None => false,
        }
    }

    /// The const-qualified view of `inner`, synthesized and memoized on
    /// first request.
    pub fn const_of(&mut self, inner: TypeId) -> ReflectResult<TypeId> {
        self.compound(TypeFlags::CONST, inner, |name| format!("const {name}"), print_const)
    }

    /// The pointer shape over `inner`.
    pub fn pointer_to(&mut self, inner: TypeId) -> ReflectResult<TypeId> {
        self.compound(TypeFlags::POINTER, inner, |name| format!("{name}*"), print_pointer)
    }

    /// The reference shape over `inner`.
    pub fn reference_to(&mut self, inner: TypeId) -> ReflectResult<TypeId> {
        self.compound(
            TypeFlags::REFERENCE,
            inner,
            |name| format!("{name}&"),
            print_reference,
        )
    }

    /// The array shape over `inner`.
    pub fn array_of(&mut self, inner: TypeId) -> ReflectResult<TypeId> {
        self.compound(TypeFlags::ARRAY, inner, |name| format!("{name}[]"), print_array)
    }

    fn compound(
        &mut self,
        flags: TypeFlags,
        inner: TypeId,
        name: impl FnOnce(&str) -> String,
        printer: PrintFn,
    ) -> ReflectResult<TypeId> {
        let key = (flags.bits(), inner);
        if let Some(id) = self.compounds.get(&key) {
            return Ok(*id);
        }
        // Resolve first: a dangling inner id fails here, not later.
        let inner_info = self.get(inner)?;
        self.reserve_slot()?;
        let id = self.allocate()?;
        let info = TypeInfo {
            id,
            rust: None,
            name: name(&inner_info.qualified_name()),
            namespace: None,
            bases: Vec::new(),
            inners: vec![inner],
            flags,
            fields: Vec::new(),
            methods: Vec::new(),
            printer: Some(printer),
        };
        self.by_name.insert(info.qualified_name(), id);
        self.compounds.insert(key, id);
        self.types.insert(id, Arc::new(info));
        Ok(id)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        TypeRegistry::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types.len())
            .field("next", &self.next)
            .finish()
    }
}

/// Strip the leading path segments from a Rust type name, leaving generic
/// arguments intact: `alloc::vec::Vec<alloc::string::String>` becomes
/// `Vec<alloc::string::String>`. Only `::` outside angle brackets separates
/// path segments.
fn short_type_name<T>() -> &'static str {
    let full = any::type_name::<T>();
    let bytes = full.as_bytes();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && i > 0 && bytes[i - 1] == b':' => start = i + 1,
            _ => {}
        }
    }
    &full[start..]
}

fn print_inner(info: &TypeInfo, registry: &TypeRegistry, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match info.inner(0).and_then(|id| registry.get(id).ok()) {
        Some(inner) => inner.print(registry, f),
        None => f.write_str("?"),
    }
}

fn print_const(info: &TypeInfo, registry: &TypeRegistry, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("const ")?;
    print_inner(info, registry, f)
}

fn print_pointer(
    info: &TypeInfo,
    registry: &TypeRegistry,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.write_str("pointer to ")?;
    print_inner(info, registry, f)
}

fn print_reference(
    info: &TypeInfo,
    registry: &TypeRegistry,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.write_str("reference to ")?;
    print_inner(info, registry, f)
}

fn print_array(info: &TypeInfo, registry: &TypeRegistry, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("array of ")?;
    print_inner(info, registry, f)
}

/// Builder handed to [`Describe::describe`] while a descriptor for `T` is
/// under construction.
///
/// Holds the registry mutably so member, base and argument types resolve
/// (and lazily register) during description.
pub struct TypeBuilder<'r, T> {
    registry: &'r mut TypeRegistry,
    info: TypeInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T: Any> TypeBuilder<'r, T> {
    /// The id assigned to the type under construction.
    pub fn id(&self) -> TypeId {
        self.info.id
    }

    /// The registry the descriptor is being built against.
    ///
    /// Exposed for resolving additional types and for building qualified
    /// [`Overload`]s by hand before attaching them with
    /// [`TypeBuilder::overload`].
    pub fn registry(&mut self) -> &mut TypeRegistry {
        self.registry
    }

    /// Set the unqualified type name (defaults to the Rust type name).
    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        self.info.name = name.into();
        self
    }

    /// Set the namespace.
    pub fn namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.info.namespace = Some(namespace.into());
        self
    }

    /// Merge shape flags into the descriptor.
    pub fn flags(&mut self, flags: TypeFlags) -> &mut Self {
        self.info.flags |= flags;
        self
    }

    /// Install a custom print function.
    pub fn printer(&mut self, printer: PrintFn) -> &mut Self {
        self.info.printer = Some(printer);
        self
    }

    /// Declare a base type.
    pub fn base<B: Describe>(&mut self) -> ReflectResult<&mut Self> {
        let id = self.registry.reflect::<B>()?;
        self.info.bases.push(id);
        Ok(self)
    }

    /// Declare a base type by id, tolerating forward references.
    ///
    /// The id is stored as-is; a dangling id surfaces as `NotFound` when it
    /// is resolved through the registry.
    pub fn base_id(&mut self, id: TypeId) -> &mut Self {
        self.info.bases.push(id);
        self
    }

    /// Declare an inner type.
    pub fn inner<I: Describe>(&mut self) -> ReflectResult<&mut Self> {
        let id = self.registry.reflect::<I>()?;
        self.info.inners.push(id);
        Ok(self)
    }

    /// Declare an inner type by id, tolerating forward references.
    pub fn inner_id(&mut self, id: TypeId) -> &mut Self {
        self.info.inners.push(id);
        self
    }

    /// Declare a mutable instance field through projection functions.
    pub fn field<U>(
        &mut self,
        name: &str,
        get: fn(&T) -> &U,
        get_mut: fn(&mut T) -> &mut U,
    ) -> ReflectResult<&mut Self>
    where
        U: Describe + Clone,
    {
        let ty = self.registry.reflect::<U>()?;
        self.info
            .fields
            .push(Field::instance(name, ty, self.info.id, get, get_mut));
        Ok(self)
    }

    /// Declare a const instance field.
    pub fn const_field<U>(&mut self, name: &str, get: fn(&T) -> &U) -> ReflectResult<&mut Self>
    where
        U: Describe + Clone,
    {
        let ty = self.registry.reflect::<U>()?;
        self.info
            .fields
            .push(Field::const_instance(name, ty, self.info.id, get));
        Ok(self)
    }

    /// Declare a writable static field through accessor closures.
    pub fn static_field<U>(
        &mut self,
        name: &str,
        read: impl Fn() -> U + Send + Sync + 'static,
        write: impl Fn(U) + Send + Sync + 'static,
    ) -> ReflectResult<&mut Self>
    where
        U: Describe + Clone,
    {
        let ty = self.registry.reflect::<U>()?;
        self.info
            .fields
            .push(Field::static_field(name, ty, read, write));
        Ok(self)
    }

    /// Declare a read-only static field.
    pub fn const_static_field<U>(
        &mut self,
        name: &str,
        read: impl Fn() -> U + Send + Sync + 'static,
    ) -> ReflectResult<&mut Self>
    where
        U: Describe + Clone,
    {
        let ty = self.registry.reflect::<U>()?;
        self.info
            .fields
            .push(Field::const_static_field(name, ty, read));
        Ok(self)
    }

    /// Attach a pre-built overload under `name`.
    ///
    /// Overloads attached under the same name accumulate on one method, in
    /// attachment order.
    pub fn overload(&mut self, name: &str, overload: Overload) -> &mut Self {
        match self.info.methods.iter().position(|m| m.name() == name) {
            Some(i) => self.info.methods[i].push_overload(overload),
            None => self
                .info
                .methods
                .push(Method::new(name, self.info.id, overload)),
        }
        self
    }

    /// Declare a nullary `&mut` receiver method.
    pub fn method0<R: Describe>(&mut self, name: &str, f: fn(&mut T) -> R) -> ReflectResult<&mut Self> {
        let overload = Overload::method0::<T, R>(self.registry, f)?;
        Ok(self.overload(name, overload))
    }

    /// Declare a nullary `&` receiver method.
    pub fn const_method0<R: Describe>(
        &mut self,
        name: &str,
        f: fn(&T) -> R,
    ) -> ReflectResult<&mut Self> {
        let overload = Overload::const_method0::<T, R>(self.registry, f)?;
        Ok(self.overload(name, overload))
    }

    /// Declare a nullary associated function.
    pub fn static_method0<R: Describe>(&mut self, name: &str, f: fn() -> R) -> ReflectResult<&mut Self> {
        let overload = Overload::static_fn0::<R>(self.registry, f)?;
        Ok(self.overload(name, overload))
    }
}

macro_rules! builder_methods {
    ($method:ident, $const_method:ident, $static_method:ident, $overload_method:ident,
     $overload_const:ident, $overload_static:ident, $n:literal, $($A:ident),+) => {
        impl<'r, T: Any> TypeBuilder<'r, T> {
            /// Declare a `&mut` receiver method with named parameters.
            pub fn $method<$($A,)+ R>(
                &mut self,
                name: &str,
                params: [&str; $n],
                f: fn(&mut T, $($A),+) -> R,
            ) -> ReflectResult<&mut Self>
            where
                $($A: Describe + Clone,)+
                R: Describe,
            {
                let overload = Overload::$overload_method::<T, $($A,)+ R>(self.registry, params, f)?;
                Ok(self.overload(name, overload))
            }

            /// Declare a `&` receiver method with named parameters.
            pub fn $const_method<$($A,)+ R>(
                &mut self,
                name: &str,
                params: [&str; $n],
                f: fn(&T, $($A),+) -> R,
            ) -> ReflectResult<&mut Self>
            where
                $($A: Describe + Clone,)+
                R: Describe,
            {
                let overload = Overload::$overload_const::<T, $($A,)+ R>(self.registry, params, f)?;
                Ok(self.overload(name, overload))
            }

            /// Declare an associated function with named parameters.
            pub fn $static_method<$($A,)+ R>(
                &mut self,
                name: &str,
                params: [&str; $n],
                f: fn($($A),+) -> R,
            ) -> ReflectResult<&mut Self>
            where
                $($A: Describe + Clone,)+
                R: Describe,
            {
                let overload = Overload::$overload_static::<$($A,)+ R>(self.registry, params, f)?;
                Ok(self.overload(name, overload))
            }
        }
    };
}

builder_methods!(method1, const_method1, static_method1, method1, const_method1, static_fn1, 1, A0);
builder_methods!(method2, const_method2, static_method2, method2, const_method2, static_fn2, 2, A0, A1);
builder_methods!(method3, const_method3, static_method3, method3, const_method3, static_fn3, 3, A0, A1, A2);
builder_methods!(method4, const_method4, static_method4, method4, const_method4, static_fn4, 4, A0, A1, A2, A3);

// ============================================================================
// Tests
// ============================================================================
