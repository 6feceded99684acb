//! Type-erased values with explicit ownership categories.
//!
//! A [`Variant`] is the unit passed across every dynamic boundary in the
//! engine: it pairs an erased payload with the [`TypeId`] of the value and an
//! [`Ownership`] category describing how the payload may be accessed. All
//! downcasts check the erasure tag before reinterpreting anything; a type or
//! category mismatch is a typed error, never undefined behavior, and const
//! categories never silently promote to mutable access.
//!
//! The ownership categories mirror the value/reference/pointer distinctions
//! of the reflected model. Rust spells the distinction in the constructor
//! rather than deducing it from the argument:
//!
//! | Constructor         | Category        | Mutable through it?     |
//! |---------------------|-----------------|-------------------------|
//! | [`Variant::void`]   | `Void`          | never                   |
//! | [`Variant::owned`]  | `Value`         | yes                     |
//! | [`Variant::borrowed_mut`] | `LValueRef` | yes                  |
//! | [`Variant::borrowed`] | `ConstLValueRef` | no                   |
//! | [`Variant::rvalue`] | `RValueRef`     | yes, consumed once      |
//! | [`Variant::const_rvalue`] | `ConstRValueRef` | no              |
//! | [`Variant::pointer`] | `Pointer`      | yes (pointee, `unsafe`) |
//! | [`Variant::const_pointer`] | `ConstPointer` | no               |

use std::any::{self, Any};
use std::fmt;

use crate::error::VariantError;
use crate::type_id::TypeId;

/// How a variant's payload is held, and what access it permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Carries no value.
    Void,
    /// An owned copy.
    Value,
    /// Borrows a mutable lvalue, non-owning.
    LValueRef,
    /// Borrows an immutable lvalue, non-owning.
    ConstLValueRef,
    /// A movable temporary, consumed by the first move out of it.
    RValueRef,
    /// An immutable temporary.
    ConstRValueRef,
    /// Holds a raw address, non-owning; pointee access is `unsafe`.
    Pointer,
    /// Holds a raw address to immutable data.
    ConstPointer,
}

impl Ownership {
    /// Whether this category forbids mutable access.
    pub fn is_const(self) -> bool {
        matches!(
            self,
            Ownership::ConstLValueRef | Ownership::ConstRValueRef | Ownership::ConstPointer
        )
    }

    /// Whether the payload is owned by the variant and can be moved out.
    pub fn is_owned(self) -> bool {
        matches!(self, Ownership::Value | Ownership::RValueRef)
    }

    /// Whether the payload is a raw address.
    pub fn is_pointer(self) -> bool {
        matches!(self, Ownership::Pointer | Ownership::ConstPointer)
    }

    fn label(self) -> &'static str {
        match self {
            Ownership::Void => "void",
            Ownership::Value => "value",
            Ownership::LValueRef => "lvalue-ref",
            Ownership::ConstLValueRef => "const lvalue-ref",
            Ownership::RValueRef => "rvalue-ref",
            Ownership::ConstRValueRef => "const rvalue-ref",
            Ownership::Pointer => "pointer",
            Ownership::ConstPointer => "const pointer",
        }
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

enum Payload<'a> {
    Empty,
    Owned(Box<dyn Any>),
    Ref(&'a dyn Any),
    Mut(&'a mut dyn Any),
}

/// A type-erased value carrying a [`TypeId`] and an [`Ownership`] category.
///
/// The lifetime parameter bounds the borrow for the reference categories;
/// owned and pointer categories are `'static`.
pub struct Variant<'a> {
    ty: TypeId,
    ownership: Ownership,
    payload: Payload<'a>,
    erased: any::TypeId,
    erased_name: &'static str,
}

impl Variant<'static> {
    /// The canonical empty variant, used as the "no receiver" token for
    /// static field and method access.
    pub fn void() -> Self {
        Variant {
            ty: TypeId::VOID,
            ownership: Ownership::Void,
            payload: Payload::Empty,
            erased: any::TypeId::of::<()>(),
            erased_name: "void",
        }
    }

    /// Erase an owned copy of `value` under the `Value` category.
    pub fn owned<T: Any>(ty: TypeId, value: T) -> Self {
        Variant {
            ty,
            ownership: Ownership::Value,
            payload: Payload::Owned(Box::new(value)),
            erased: any::TypeId::of::<T>(),
            erased_name: any::type_name::<T>(),
        }
    }

    /// Erase a movable temporary under the `RValueRef` category.
    ///
    /// The payload may be moved out exactly once with [`Variant::take`],
    /// after which the variant is void.
    pub fn rvalue<T: Any>(ty: TypeId, value: T) -> Self {
        Variant {
            ownership: Ownership::RValueRef,
            ..Variant::owned(ty, value)
        }
    }

    /// Erase an immutable temporary under the `ConstRValueRef` category.
    pub fn const_rvalue<T: Any>(ty: TypeId, value: T) -> Self {
        Variant {
            ownership: Ownership::ConstRValueRef,
            ..Variant::owned(ty, value)
        }
    }

    /// Hold a raw mutable address under the `Pointer` category.
    ///
    /// The variant stores the address by value; it never dereferences it on
    /// its own. Read it back with `value::<*mut T>()`, or dereference it
    /// through the `unsafe` pointee accessors.
    pub fn pointer<T: Any>(ty: TypeId, address: *mut T) -> Self {
        Variant {
            ownership: Ownership::Pointer,
            ..Variant::owned(ty, address)
        }
    }

    /// Hold a raw const address under the `ConstPointer` category.
    pub fn const_pointer<T: Any>(ty: TypeId, address: *const T) -> Self {
        Variant {
            ownership: Ownership::ConstPointer,
            ..Variant::owned(ty, address)
        }
    }
}

impl<'a> Variant<'a> {
    /// Borrow an immutable lvalue under the `ConstLValueRef` category.
    pub fn borrowed<T: Any>(ty: TypeId, value: &'a T) -> Variant<'a> {
        Variant {
            ty,
            ownership: Ownership::ConstLValueRef,
            payload: Payload::Ref(value),
            erased: any::TypeId::of::<T>(),
            erased_name: any::type_name::<T>(),
        }
    }

    /// Borrow a mutable lvalue under the `LValueRef` category.
    pub fn borrowed_mut<T: Any>(ty: TypeId, value: &'a mut T) -> Variant<'a> {
        Variant {
            ty,
            ownership: Ownership::LValueRef,
            payload: Payload::Mut(value),
            erased: any::TypeId::of::<T>(),
            erased_name: any::type_name::<T>(),
        }
    }

    /// The registry id of the stored type.
    pub fn type_id(&self) -> TypeId {
        self.ty
    }

    /// The ownership category of the payload.
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Whether this variant carries no value.
    pub fn is_void(&self) -> bool {
        self.ownership == Ownership::Void
    }

    /// Human-readable name of the erased type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.erased_name
    }

    /// The `std::any::TypeId` the payload was erased from.
    ///
    /// For the pointer categories this is the id of the pointer type
    /// itself, not the pointee.
    pub fn erased_type(&self) -> any::TypeId {
        self.erased
    }

    fn payload_ref(&self) -> Option<&dyn Any> {
        match &self.payload {
            Payload::Empty => None,
            Payload::Owned(boxed) => Some(boxed.as_ref()),
            Payload::Ref(shared) => Some(*shared),
            Payload::Mut(exclusive) => Some(&**exclusive),
        }
    }

    fn mismatch<T: Any>(&self) -> VariantError {
        VariantError::TypeMismatch {
            requested: any::type_name::<T>(),
            actual: self.erased_name,
        }
    }

    /// Read the payload out by value, cloning it.
    ///
    /// Succeeds for every non-void category whose erased type is exactly
    /// `T`; const categories permit this read because the payload is copied,
    /// never aliased.
    pub fn value<T: Any + Clone>(&self) -> Result<T, VariantError> {
        let payload = self.payload_ref().ok_or(VariantError::VoidAccess)?;
        payload
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| self.mismatch::<T>())
    }

    /// Move the payload out, leaving the variant void.
    ///
    /// Only the owning categories (`Value`, `RValueRef`) can be consumed;
    /// const categories fail with `ConstViolation` and borrowing ones with
    /// `NotOwned`.
    pub fn take<T: Any>(&mut self) -> Result<T, VariantError> {
        match self.ownership {
            Ownership::Void => return Err(VariantError::VoidAccess),
            Ownership::Value | Ownership::RValueRef => {}
            kind if kind.is_const() => {
                return Err(VariantError::ConstViolation {
                    kind,
                    requested: any::type_name::<T>(),
                });
            }
            kind => return Err(VariantError::NotOwned { kind }),
        }
        let requested = any::type_name::<T>();
        let actual = self.erased_name;
        match std::mem::replace(&mut self.payload, Payload::Empty) {
            Payload::Owned(boxed) => match boxed.downcast::<T>() {
                Ok(value) => {
                    self.ty = TypeId::VOID;
                    self.ownership = Ownership::Void;
                    self.erased = any::TypeId::of::<()>();
                    self.erased_name = "void";
                    Ok(*value)
                }
                Err(boxed) => {
                    self.payload = Payload::Owned(boxed);
                    Err(VariantError::TypeMismatch { requested, actual })
                }
            },
            other => {
                self.payload = other;
                Err(VariantError::NotOwned {
                    kind: self.ownership,
                })
            }
        }
    }

    /// Borrow the payload immutably.
    ///
    /// Allowed for every non-void category; shared access never violates
    /// constness. The returned reference aliases the live storage, so
    /// address identity is preserved for the reference categories.
    pub fn get_ref<T: Any>(&self) -> Result<&T, VariantError> {
        let payload = self.payload_ref().ok_or(VariantError::VoidAccess)?;
        payload
            .downcast_ref::<T>()
            .ok_or_else(|| self.mismatch::<T>())
    }

    /// Borrow the payload mutably.
    ///
    /// Fails with `ConstViolation` for every const category, `VoidAccess`
    /// for the empty variant, and `TypeMismatch` if the erased type is not
    /// exactly `T`.
    pub fn get_mut<T: Any>(&mut self) -> Result<&mut T, VariantError> {
        if self.ownership.is_const() {
            return Err(VariantError::ConstViolation {
                kind: self.ownership,
                requested: any::type_name::<T>(),
            });
        }
        let requested = any::type_name::<T>();
        let actual = self.erased_name;
        let slot = match &mut self.payload {
            Payload::Empty => return Err(VariantError::VoidAccess),
            Payload::Owned(boxed) => boxed.downcast_mut::<T>(),
            Payload::Mut(exclusive) => exclusive.downcast_mut::<T>(),
            Payload::Ref(_) => None,
        };
        slot.ok_or(VariantError::TypeMismatch { requested, actual })
    }

    /// Dereference a `Pointer` or `ConstPointer` payload immutably.
    ///
    /// The stored address is tag-checked against `*mut T` / `*const T`
    /// before any dereference. A null address fails with `VoidAccess`.
    ///
    /// # Safety
    ///
    /// The caller must guarantee the stored address is valid for reads of
    /// `T` for the duration of the returned borrow.
    pub unsafe fn pointee_ref<T: Any>(&self) -> Result<&T, VariantError> {
        match self.ownership {
            Ownership::Pointer => {
                let address = *self.get_ref::<*mut T>()?;
                unsafe { address.as_ref() }.ok_or(VariantError::VoidAccess)
            }
            Ownership::ConstPointer => {
                let address = *self.get_ref::<*const T>()?;
                unsafe { address.as_ref() }.ok_or(VariantError::VoidAccess)
            }
            _ => Err(self.mismatch::<*const T>()),
        }
    }

    /// Dereference a `Pointer` payload mutably.
    ///
    /// `ConstPointer` fails with `ConstViolation`.
    ///
    /// # Safety
    ///
    /// The caller must guarantee the stored address is valid for writes of
    /// `T` for the duration of the returned borrow, and that no other alias
    /// is live.
    pub unsafe fn pointee_mut<T: Any>(&mut self) -> Result<&mut T, VariantError> {
        match self.ownership {
            Ownership::Pointer => {
                let address = *self.get_ref::<*mut T>()?;
                unsafe { address.as_mut() }.ok_or(VariantError::VoidAccess)
            }
            kind if kind.is_const() => Err(VariantError::ConstViolation {
                kind,
                requested: any::type_name::<T>(),
            }),
            _ => Err(self.mismatch::<*mut T>()),
        }
    }
}

impl fmt::Debug for Variant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("ty", &self.ty)
            .field("ownership", &self.ownership)
            .field("erased", &self.erased_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> TypeId {
        TypeId::from_raw(raw)
    }

    #[test]
    fn void_carries_nothing() {
        let v = Variant::void();
        assert!(v.is_void());
        assert_eq!(v.type_id(), TypeId::VOID);
        assert_eq!(
            v.value::<i32>().unwrap_err(),
            VariantError::VoidAccess
        );
        assert_eq!(v.get_ref::<i32>().unwrap_err(), VariantError::VoidAccess);
    }

    #[test]
    fn owned_value_round_trip() {
        let v = Variant::owned(id(1), 42i32);
        assert_eq!(v.ownership(), Ownership::Value);
        assert_eq!(v.value::<i32>().unwrap(), 42);
        assert_eq!(*v.get_ref::<i32>().unwrap(), 42);
    }

    #[test]
    fn owned_value_is_mutable() {
        let mut v = Variant::owned(id(1), 42i32);
        *v.get_mut::<i32>().unwrap() += 1;
        assert_eq!(v.value::<i32>().unwrap(), 43);
    }

    #[test]
    fn type_mismatch_names_both_sides() {
        let v = Variant::owned(id(1), 42i32);
        let err = v.value::<String>().unwrap_err();
        let VariantError::TypeMismatch { requested, actual } = err else {
            panic!("expected a type mismatch, got {err:?}");
        };
        assert!(requested.contains("String"));
        assert!(actual.contains("i32"));
    }

    #[test]
    fn borrowed_preserves_address_identity() {
        let value = String::from("alias me");
        let v = Variant::borrowed(id(2), &value);
        assert_eq!(v.ownership(), Ownership::ConstLValueRef);
        assert!(std::ptr::eq(v.get_ref::<String>().unwrap(), &value));
    }

    #[test]
    fn const_borrow_refuses_mutation() {
        let value = 7i64;
        let mut v = Variant::borrowed(id(3), &value);
        let err = v.get_mut::<i64>().unwrap_err();
        assert!(matches!(
            err,
            VariantError::ConstViolation {
                kind: Ownership::ConstLValueRef,
                ..
            }
        ));
        // Shared access still works after the refused mutation.
        assert_eq!(*v.get_ref::<i64>().unwrap(), 7);
    }

    #[test]
    fn mutable_borrow_writes_through() {
        let mut value = 10i32;
        {
            let mut v = Variant::borrowed_mut(id(1), &mut value);
            *v.get_mut::<i32>().unwrap() = 20;
        }
        assert_eq!(value, 20);
    }

    #[test]
    fn take_consumes_owned_payload_once() {
        let mut v = Variant::rvalue(id(4), String::from("moved"));
        assert_eq!(v.take::<String>().unwrap(), "moved");
        assert!(v.is_void());
        assert_eq!(v.take::<String>().unwrap_err(), VariantError::VoidAccess);
    }

    #[test]
    fn take_refuses_borrows() {
        let mut value = 5u8;
        let mut v = Variant::borrowed_mut(id(1), &mut value);
        assert!(matches!(
            v.take::<u8>().unwrap_err(),
            VariantError::NotOwned {
                kind: Ownership::LValueRef
            }
        ));
    }

    #[test]
    fn take_refuses_const_categories() {
        let mut v = Variant::const_rvalue(id(1), 9i32);
        assert!(matches!(
            v.take::<i32>().unwrap_err(),
            VariantError::ConstViolation { .. }
        ));
        // The payload survives the refused move.
        assert_eq!(v.value::<i32>().unwrap(), 9);
    }

    #[test]
    fn take_mismatch_keeps_payload() {
        let mut v = Variant::owned(id(1), 31i32);
        assert!(matches!(
            v.take::<String>().unwrap_err(),
            VariantError::TypeMismatch { .. }
        ));
        assert_eq!(v.take::<i32>().unwrap(), 31);
    }

    #[test]
    fn const_rvalue_reads_but_never_writes() {
        let mut v = Variant::const_rvalue(id(1), 3.5f64);
        assert_eq!(v.value::<f64>().unwrap(), 3.5);
        assert!(matches!(
            v.get_mut::<f64>().unwrap_err(),
            VariantError::ConstViolation {
                kind: Ownership::ConstRValueRef,
                ..
            }
        ));
    }

    #[test]
    fn pointer_stores_the_address_by_value() {
        let mut target = 11i32;
        let v = Variant::pointer(id(1), &mut target as *mut i32);
        assert_eq!(v.ownership(), Ownership::Pointer);
        assert_eq!(v.value::<*mut i32>().unwrap(), &mut target as *mut i32);
    }

    #[test]
    fn pointee_access_is_tag_checked() {
        let mut target = 11i32;
        let mut v = Variant::pointer(id(1), &mut target as *mut i32);
        unsafe {
            assert_eq!(*v.pointee_ref::<i32>().unwrap(), 11);
            *v.pointee_mut::<i32>().unwrap() = 12;
            // Requesting the wrong pointee type fails before any dereference.
            assert!(matches!(
                v.pointee_ref::<f32>().unwrap_err(),
                VariantError::TypeMismatch { .. }
            ));
        }
        assert_eq!(target, 12);
    }

    #[test]
    fn const_pointer_refuses_mutable_pointee() {
        let target = 4u16;
        let mut v = Variant::const_pointer(id(1), &target as *const u16);
        unsafe {
            assert_eq!(*v.pointee_ref::<u16>().unwrap(), 4);
            assert!(matches!(
                v.pointee_mut::<u16>().unwrap_err(),
                VariantError::ConstViolation {
                    kind: Ownership::ConstPointer,
                    ..
                }
            ));
        }
    }

    #[test]
    fn null_pointer_reads_as_void_access() {
        let mut v = Variant::pointer(id(1), std::ptr::null_mut::<i32>());
        unsafe {
            assert_eq!(
                v.pointee_ref::<i32>().unwrap_err(),
                VariantError::VoidAccess
            );
            assert_eq!(
                v.pointee_mut::<i32>().unwrap_err(),
                VariantError::VoidAccess
            );
        }
    }

    #[test]
    fn ownership_predicates() {
        assert!(Ownership::ConstPointer.is_const());
        assert!(Ownership::ConstLValueRef.is_const());
        assert!(!Ownership::LValueRef.is_const());
        assert!(Ownership::Value.is_owned());
        assert!(Ownership::RValueRef.is_owned());
        assert!(!Ownership::ConstRValueRef.is_owned());
        assert!(Ownership::Pointer.is_pointer());
        assert!(!Ownership::Value.is_pointer());
    }

    #[test]
    fn debug_output_names_category_and_type() {
        let v = Variant::owned(id(9), 1u8);
        let debug = format!("{v:?}");
        assert!(debug.contains("Value"));
        assert!(debug.contains("u8"));
    }
}
