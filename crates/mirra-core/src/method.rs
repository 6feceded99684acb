//! Overload-aware method descriptors and invocation.
//!
//! A [`Method`] owns one or more [`Overload`]s sharing a name. Invocation
//! scans the overloads in declaration order and calls the first one whose
//! signature is fully compatible with the receiver and arguments. This is a
//! deliberate policy choice, not true overload resolution: there is no
//! best-match scoring, and when two overloads are both structurally
//! compatible the first declared one wins.
//!
//! Typed invokers are built at registration time, one per concrete
//! signature; the dynamic path only checks tags and forwards. A native
//! function is never called unless its overload matched completely.

use std::any::{self, Any};
use std::fmt;

use crate::error::{MethodError, ReflectError};
use crate::registry::{Describe, TypeRegistry};
use crate::type_id::TypeId;
use crate::variant::{Ownership, Variant};

/// Reference qualification of an overload's receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverQual {
    /// Accepts any receiver category.
    #[default]
    Unqualified,
    /// Requires an lvalue receiver (anything but `RValueRef`).
    LValue,
    /// Requires an `RValueRef` receiver.
    RValue,
}

/// One declared parameter: name and type id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    name: String,
    ty: TypeId,
}

impl Param {
    /// Create a parameter descriptor.
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Param {
            name: name.into(),
            ty,
        }
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type id.
    pub fn type_id(&self) -> TypeId {
        self.ty
    }
}

type InvokeFn = Box<
    dyn Fn(&mut Variant<'_>, &mut [Variant<'_>]) -> Result<Variant<'static>, ReflectError>
        + Send
        + Sync,
>;

/// One concrete callable shape among several sharing a method name.
pub struct Overload {
    is_static: bool,
    is_const: bool,
    receiver: ReceiverQual,
    ret: TypeId,
    params: Vec<Param>,
    invoke: InvokeFn,
}

impl Overload {
    /// Whether this overload ignores the receiver.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether this overload leaves the receiver unmodified.
    pub fn is_const(&self) -> bool {
        self.is_const
    }

    /// Reference qualification of the receiver.
    pub fn receiver_qual(&self) -> ReceiverQual {
        self.receiver
    }

    /// Return type id; `TypeId::VOID` for `()` returns.
    pub fn return_type(&self) -> TypeId {
        self.ret
    }

    /// Declared parameters in order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Override the receiver qualification.
    pub fn with_receiver(mut self, qual: ReceiverQual) -> Self {
        self.receiver = qual;
        self
    }

    /// Receiver category check for a non-void, non-static call.
    ///
    /// A const or by-value receiver excludes overloads that need mutation
    /// or an rvalue; an rvalue qualification requires an `RValueRef`.
    fn receiver_compatible(&self, instance: &Variant<'_>) -> bool {
        let ownership = instance.ownership();
        let qual_ok = match self.receiver {
            ReceiverQual::RValue => ownership == Ownership::RValueRef,
            ReceiverQual::LValue => ownership != Ownership::RValueRef,
            ReceiverQual::Unqualified => true,
        };
        // A by-value receiver is a copy: mutating it would be invisible to
        // the caller, so only const overloads accept it.
        let mutation_ok =
            self.is_const || !(ownership.is_const() || ownership == Ownership::Value);
        qual_ok && mutation_ok
    }

    /// Per-argument compatibility: exact id, or const-widening through the
    /// registry's inner lists.
    fn args_compatible(&self, registry: &TypeRegistry, args: &[Variant<'_>]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(p, a)| registry.is_compatible(a.type_id(), p.ty))
    }
}

impl fmt::Debug for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overload")
            .field("is_static", &self.is_static)
            .field("is_const", &self.is_const)
            .field("receiver", &self.receiver)
            .field("ret", &self.ret)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A named method: an ordered set of overloads on one declaring type.
pub struct Method {
    name: String,
    owner: TypeId,
    overloads: Vec<Overload>,
}

impl Method {
    pub(crate) fn new(name: &str, owner: TypeId, first: Overload) -> Self {
        Method {
            name: name.to_string(),
            owner,
            overloads: vec![first],
        }
    }

    pub(crate) fn push_overload(&mut self, overload: Overload) {
        self.overloads.push(overload);
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the declaring type.
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    /// All overloads in declaration order.
    pub fn overloads(&self) -> &[Overload] {
        &self.overloads
    }

    /// The `i`-th overload.
    pub fn overload(&self, i: usize) -> Option<&Overload> {
        self.overloads.get(i)
    }

    /// Whether at least one overload matches the argument count and types.
    pub fn can_invoke(&self, registry: &TypeRegistry, args: &[Variant<'_>]) -> bool {
        self.overloads
            .iter()
            .any(|o| o.args_compatible(registry, args))
    }

    /// Select and invoke the first compatible overload.
    ///
    /// Static overloads ignore `instance`; non-static overloads require a
    /// receiver of the declaring type. Void-returning calls produce
    /// [`Variant::void`].
    pub fn invoke(
        &self,
        registry: &TypeRegistry,
        instance: &mut Variant<'_>,
        args: &mut [Variant<'_>],
    ) -> Result<Variant<'static>, ReflectError> {
        let mut arity_matched = false;
        let mut receiver_missing = false;
        for overload in &self.overloads {
            if overload.params.len() != args.len() {
                continue;
            }
            arity_matched = true;
            if !overload.is_static {
                if instance.is_void() {
                    receiver_missing = true;
                    continue;
                }
                // Disambiguated: `Any::type_id` on the reference would
                // shadow the inherent accessor here.
                if Variant::type_id(instance) != self.owner {
                    continue;
                }
                if !overload.receiver_compatible(instance) {
                    continue;
                }
            }
            if !overload.args_compatible(registry, args) {
                continue;
            }
            return (overload.invoke)(instance, args);
        }
        if !arity_matched {
            return Err(MethodError::ArgumentCountMismatch {
                method: self.name.clone(),
                got: args.len(),
            }
            .into());
        }
        if receiver_missing {
            return Err(MethodError::MissingReceiver {
                method: self.name.clone(),
            }
            .into());
        }
        Err(MethodError::NoMatchingOverload {
            method: self.name.clone(),
        }
        .into())
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("overloads", &self.overloads)
            .finish()
    }
}

/// Marshal one argument: move out of owning variants, clone out of
/// borrowing ones.
fn take_arg<A: Any + Clone>(arg: &mut Variant<'_>) -> Result<A, ReflectError> {
    match arg.take::<A>() {
        Ok(value) => Ok(value),
        Err(_) => Ok(arg.value::<A>()?),
    }
}

/// Wrap a native return value; `()` becomes the void variant.
fn wrap_return<R: Any>(ret: TypeId, value: R) -> Variant<'static> {
    if any::TypeId::of::<R>() == any::TypeId::of::<()>() {
        Variant::void()
    } else {
        Variant::owned(ret, value)
    }
}

impl Overload {
    /// Build a nullary overload for a `&mut` receiver method.
    pub fn method0<T, R>(registry: &mut TypeRegistry, f: fn(&mut T) -> R) -> Result<Overload, ReflectError>
    where
        T: Any,
        R: Describe,
    {
        let ret = registry.reflect::<R>()?;
        let invoke: InvokeFn = Box::new(move |instance: &mut Variant<'_>, _args: &mut [Variant<'_>]| {
            let this = instance.get_mut::<T>()?;
            Ok(wrap_return::<R>(ret, f(this)))
        });
        Ok(Overload {
            is_static: false,
            is_const: false,
            receiver: ReceiverQual::Unqualified,
            ret,
            params: Vec::new(),
            invoke,
        })
    }

    /// Build a nullary overload for a `&` receiver method.
    pub fn const_method0<T, R>(
        registry: &mut TypeRegistry,
        f: fn(&T) -> R,
    ) -> Result<Overload, ReflectError>
    where
        T: Any,
        R: Describe,
    {
        let ret = registry.reflect::<R>()?;
        let invoke: InvokeFn = Box::new(move |instance: &mut Variant<'_>, _args: &mut [Variant<'_>]| {
            let this = instance.get_ref::<T>()?;
            Ok(wrap_return::<R>(ret, f(this)))
        });
        Ok(Overload {
            is_static: false,
            is_const: true,
            receiver: ReceiverQual::Unqualified,
            ret,
            params: Vec::new(),
            invoke,
        })
    }

    /// Build a nullary overload for an associated function.
    pub fn static_fn0<R>(registry: &mut TypeRegistry, f: fn() -> R) -> Result<Overload, ReflectError>
    where
        R: Describe,
    {
        let ret = registry.reflect::<R>()?;
        let invoke: InvokeFn = Box::new(move |_instance: &mut Variant<'_>, _args: &mut [Variant<'_>]| Ok(wrap_return::<R>(ret, f())));
        Ok(Overload {
            is_static: true,
            is_const: false,
            receiver: ReceiverQual::Unqualified,
            ret,
            params: Vec::new(),
            invoke,
        })
    }
}

macro_rules! overload_ctors {
    ($method:ident, $const_method:ident, $static_fn:ident, $n:literal, $($A:ident / $a:ident : $idx:tt),+) => {
        impl Overload {
            /// Build an overload for a `&mut` receiver method.
            pub fn $method<T, $($A,)+ R>(
                registry: &mut TypeRegistry,
                names: [&str; $n],
                f: fn(&mut T, $($A),+) -> R,
            ) -> Result<Overload, ReflectError>
            where
                T: Any,
                $($A: Describe + Clone,)+
                R: Describe,
            {
                let ret = registry.reflect::<R>()?;
                let params = vec![$(Param::new(names[$idx], registry.reflect::<$A>()?)),+];
                let invoke: InvokeFn = Box::new(move |instance: &mut Variant<'_>, args: &mut [Variant<'_>]| {
                    $(let $a = take_arg::<$A>(&mut args[$idx])?;)+
                    let this = instance.get_mut::<T>()?;
                    Ok(wrap_return::<R>(ret, f(this, $($a),+)))
                });
                Ok(Overload {
                    is_static: false,
                    is_const: false,
                    receiver: ReceiverQual::Unqualified,
                    ret,
                    params,
                    invoke,
                })
            }

            /// Build an overload for a `&` receiver method.
            pub fn $const_method<T, $($A,)+ R>(
                registry: &mut TypeRegistry,
                names: [&str; $n],
                f: fn(&T, $($A),+) -> R,
            ) -> Result<Overload, ReflectError>
            where
                T: Any,
                $($A: Describe + Clone,)+
                R: Describe,
            {
                let ret = registry.reflect::<R>()?;
                let params = vec![$(Param::new(names[$idx], registry.reflect::<$A>()?)),+];
                let invoke: InvokeFn = Box::new(move |instance: &mut Variant<'_>, args: &mut [Variant<'_>]| {
                    $(let $a = take_arg::<$A>(&mut args[$idx])?;)+
                    let this = instance.get_ref::<T>()?;
                    Ok(wrap_return::<R>(ret, f(this, $($a),+)))
                });
                Ok(Overload {
                    is_static: false,
                    is_const: true,
                    receiver: ReceiverQual::Unqualified,
                    ret,
                    params,
                    invoke,
                })
            }

            /// Build an overload for an associated function.
            pub fn $static_fn<$($A,)+ R>(
                registry: &mut TypeRegistry,
                names: [&str; $n],
                f: fn($($A),+) -> R,
            ) -> Result<Overload, ReflectError>
            where
                $($A: Describe + Clone,)+
                R: Describe,
            {
                let ret = registry.reflect::<R>()?;
                let params = vec![$(Param::new(names[$idx], registry.reflect::<$A>()?)),+];
                let invoke: InvokeFn = Box::new(move |_instance: &mut Variant<'_>, args: &mut [Variant<'_>]| {
                    $(let $a = take_arg::<$A>(&mut args[$idx])?;)+
                    Ok(wrap_return::<R>(ret, f($($a),+)))
                });
                Ok(Overload {
                    is_static: true,
                    is_const: false,
                    receiver: ReceiverQual::Unqualified,
                    ret,
                    params,
                    invoke,
                })
            }
        }
    };
}

overload_ctors!(method1, const_method1, static_fn1, 1, A0 / a0: 0);
overload_ctors!(method2, const_method2, static_fn2, 2, A0 / a0: 0, A1 / a1: 1);
overload_ctors!(method3, const_method3, static_fn3, 3, A0 / a0: 0, A1 / a1: 1, A2 / a2: 2);
overload_ctors!(
    method4,
    const_method4,
    static_fn4,
    4,
    A0 / a0: 0,
    A1 / a1: 1,
    A2 / a2: 2,
    A3 / a3: 3
);
