//! Type-erased field descriptors and accessors.
//!
//! A [`Field`] binds one native field to the variant-based dynamic
//! interface. The binding is a capability object chosen at registration
//! time, not at call time: instance fields use member-projection function
//! pointers (the Rust analog of member pointers), static fields use accessor
//! closures over global storage.

use std::any::Any;
use std::fmt;

use crate::error::{FieldError, ReflectError};
use crate::type_id::TypeId;
use crate::variant::Variant;

/// Capability interface bound to one native field shape.
///
/// One concrete implementation exists per shape; the receiver has already
/// been validated by [`Field`] when these run.
pub(crate) trait FieldAccess: Send + Sync {
    fn get(&self, instance: &Variant<'_>) -> Result<Variant<'static>, ReflectError>;
    fn get_ref<'v>(&self, instance: &'v Variant<'_>) -> Result<Variant<'v>, ReflectError>;
    fn get_mut<'v>(&self, instance: &'v mut Variant<'_>) -> Result<Variant<'v>, ReflectError>;
    fn set(&self, instance: &mut Variant<'_>, value: Variant<'_>) -> Result<(), ReflectError>;
}

/// Descriptor for one field: name, declared type, flags and the bound
/// native accessor.
pub struct Field {
    name: String,
    ty: TypeId,
    owner: TypeId,
    is_static: bool,
    is_const: bool,
    access: Box<dyn FieldAccess>,
}

impl Field {
    /// Bind a mutable instance field of `T` through projection functions.
    pub fn instance<T, U>(
        name: &str,
        ty: TypeId,
        owner: TypeId,
        get: fn(&T) -> &U,
        get_mut: fn(&mut T) -> &mut U,
    ) -> Self
    where
        T: Any,
        U: Any + Clone,
    {
        Field {
            name: name.to_string(),
            ty,
            owner,
            is_static: false,
            is_const: false,
            access: Box::new(InstanceField {
                name: name.to_string(),
                ty,
                get,
                get_mut: Some(get_mut),
            }),
        }
    }

    /// Bind a const instance field: readable, never writable.
    pub fn const_instance<T, U>(name: &str, ty: TypeId, owner: TypeId, get: fn(&T) -> &U) -> Self
    where
        T: Any,
        U: Any + Clone,
    {
        Field {
            name: name.to_string(),
            ty,
            owner,
            is_static: false,
            is_const: true,
            access: Box::new(InstanceField {
                name: name.to_string(),
                ty,
                get,
                get_mut: None,
            }),
        }
    }

    /// Bind a writable static field through accessor closures.
    pub fn static_field<U>(
        name: &str,
        ty: TypeId,
        read: impl Fn() -> U + Send + Sync + 'static,
        write: impl Fn(U) + Send + Sync + 'static,
    ) -> Self
    where
        U: Any + Clone,
    {
        Field {
            name: name.to_string(),
            ty,
            owner: TypeId::INVALID,
            is_static: true,
            is_const: false,
            access: Box::new(StaticField {
                name: name.to_string(),
                ty,
                read: Box::new(read),
                write: Some(Box::new(write)),
            }),
        }
    }

    /// Bind a read-only static field.
    pub fn const_static_field<U>(
        name: &str,
        ty: TypeId,
        read: impl Fn() -> U + Send + Sync + 'static,
    ) -> Self
    where
        U: Any + Clone,
    {
        Field {
            name: name.to_string(),
            ty,
            owner: TypeId::INVALID,
            is_static: true,
            is_const: true,
            access: Box::new(StaticField {
                name: name.to_string(),
                ty,
                read: Box::new(read),
                write: None,
            }),
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of the field.
    pub fn type_id(&self) -> TypeId {
        self.ty
    }

    /// Whether the field is static (receiver is ignored).
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether the field is const (writes always fail).
    pub fn is_const(&self) -> bool {
        self.is_const
    }

    fn check_receiver(&self, instance: &Variant<'_>) -> Result<(), FieldError> {
        if self.is_static {
            return Ok(());
        }
        if instance.is_void() {
            return Err(FieldError::MissingReceiver {
                field: self.name.clone(),
            });
        }
        if instance.type_id() != self.owner {
            return Err(FieldError::WrongReceiverType {
                field: self.name.clone(),
                expected: self.owner,
                got: instance.type_id(),
            });
        }
        Ok(())
    }

    /// Read the field as an owned `Value` variant.
    ///
    /// Static fields ignore `instance`; pass [`Variant::void`].
    pub fn get(&self, instance: &Variant<'_>) -> Result<Variant<'static>, ReflectError> {
        self.check_receiver(instance)?;
        self.access.get(instance)
    }

    /// Alias the live field storage as a const reference variant.
    pub fn get_ref<'v>(&self, instance: &'v Variant<'_>) -> Result<Variant<'v>, ReflectError> {
        self.check_receiver(instance)?;
        self.access.get_ref(instance)
    }

    /// Alias the live field storage as a mutable reference variant,
    /// enabling in-place mutation without a round-trip through `set`.
    pub fn get_mut<'v>(&self, instance: &'v mut Variant<'_>) -> Result<Variant<'v>, ReflectError> {
        self.check_receiver(instance)?;
        if self.is_const {
            return Err(FieldError::ConstViolation {
                field: self.name.clone(),
            }
            .into());
        }
        self.access.get_mut(instance)
    }

    /// Write the field from a variant.
    ///
    /// Const fields fail with `ConstViolation` before the value's type is
    /// even inspected; a declared-type mismatch fails with `TypeMismatch`.
    pub fn set(&self, instance: &mut Variant<'_>, value: Variant<'_>) -> Result<(), ReflectError> {
        self.check_receiver(instance)?;
        if self.is_const {
            return Err(FieldError::ConstViolation {
                field: self.name.clone(),
            }
            .into());
        }
        if value.type_id() != self.ty {
            return Err(FieldError::TypeMismatch {
                field: self.name.clone(),
                expected: self.ty,
                got: value.type_id(),
            }
            .into());
        }
        self.access.set(instance, value)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("is_static", &self.is_static)
            .field("is_const", &self.is_const)
            .finish_non_exhaustive()
    }
}

/// Instance field bound through member-projection function pointers.
struct InstanceField<T, U> {
    name: String,
    ty: TypeId,
    get: fn(&T) -> &U,
    get_mut: Option<fn(&mut T) -> &mut U>,
}

impl<T, U> InstanceField<T, U> {
    fn projection_mut(&self) -> Result<fn(&mut T) -> &mut U, FieldError> {
        self.get_mut.ok_or_else(|| FieldError::ConstViolation {
            field: self.name.clone(),
        })
    }
}

impl<T, U> FieldAccess for InstanceField<T, U>
where
    T: Any,
    U: Any + Clone,
{
    fn get(&self, instance: &Variant<'_>) -> Result<Variant<'static>, ReflectError> {
        let object = instance.get_ref::<T>()?;
        Ok(Variant::owned(self.ty, (self.get)(object).clone()))
    }

    fn get_ref<'v>(&self, instance: &'v Variant<'_>) -> Result<Variant<'v>, ReflectError> {
        let object = instance.get_ref::<T>()?;
        Ok(Variant::borrowed(self.ty, (self.get)(object)))
    }

    fn get_mut<'v>(&self, instance: &'v mut Variant<'_>) -> Result<Variant<'v>, ReflectError> {
        let project = self.projection_mut()?;
        let object = instance.get_mut::<T>()?;
        Ok(Variant::borrowed_mut(self.ty, project(object)))
    }

    fn set(&self, instance: &mut Variant<'_>, mut value: Variant<'_>) -> Result<(), ReflectError> {
        let project = self.projection_mut()?;
        // Move out of owning variants, clone out of borrowing ones.
        let new = match value.take::<U>() {
            Ok(v) => v,
            Err(_) => value.value::<U>()?,
        };
        let object = instance.get_mut::<T>()?;
        *project(object) = new;
        Ok(())
    }
}

/// Static field bound through accessor closures over global storage.
///
/// Closure-backed storage has no stable address to hand out, so the
/// aliasing accessors report `NotAddressable`.
struct StaticField<U> {
    name: String,
    ty: TypeId,
    read: Box<dyn Fn() -> U + Send + Sync>,
    write: Option<Box<dyn Fn(U) + Send + Sync>>,
}

impl<U> FieldAccess for StaticField<U>
where
    U: Any + Clone,
{
    fn get(&self, _instance: &Variant<'_>) -> Result<Variant<'static>, ReflectError> {
        Ok(Variant::owned(self.ty, (self.read)()))
    }

    fn get_ref<'v>(&self, _instance: &'v Variant<'_>) -> Result<Variant<'v>, ReflectError> {
        Err(FieldError::NotAddressable {
            field: self.name.clone(),
        }
        .into())
    }

    fn get_mut<'v>(&self, _instance: &'v mut Variant<'_>) -> Result<Variant<'v>, ReflectError> {
        Err(FieldError::NotAddressable {
            field: self.name.clone(),
        }
        .into())
    }

    fn set(&self, _instance: &mut Variant<'_>, mut value: Variant<'_>) -> Result<(), ReflectError> {
        let write = self.write.as_ref().ok_or_else(|| FieldError::ConstViolation {
            field: self.name.clone(),
        })?;
        let new = match value.take::<U>() {
            Ok(v) => v,
            Err(_) => value.value::<U>()?,
        };
        write(new);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct Probe {
        reading: f64,
        serial: u32,
    }

    fn owner() -> TypeId {
        TypeId::from_raw(10)
    }

    fn f64_ty() -> TypeId {
        TypeId::from_raw(11)
    }

    fn u32_ty() -> TypeId {
        TypeId::from_raw(12)
    }

    fn reading_field() -> Field {
        Field::instance(
            "reading",
            f64_ty(),
            owner(),
            |p: &Probe| &p.reading,
            |p: &mut Probe| &mut p.reading,
        )
    }

    fn serial_field() -> Field {
        Field::const_instance("serial", u32_ty(), owner(), |p: &Probe| &p.serial)
    }

    #[test]
    fn instance_get_copies_the_value() {
        let probe = Probe {
            reading: 1.5,
            serial: 77,
        };
        let instance = Variant::borrowed(owner(), &probe);
        let value = reading_field().get(&instance).unwrap();
        assert_eq!(value.value::<f64>().unwrap(), 1.5);
    }

    #[test]
    fn instance_set_then_get_round_trips() {
        let mut probe = Probe {
            reading: 0.0,
            serial: 77,
        };
        let field = reading_field();
        let mut instance = Variant::borrowed_mut(owner(), &mut probe);
        field
            .set(&mut instance, Variant::owned(f64_ty(), 2.25f64))
            .unwrap();
        let value = field.get(&instance).unwrap();
        assert_eq!(value.value::<f64>().unwrap(), 2.25);
        drop(instance);
        assert_eq!(probe.reading, 2.25);
    }

    #[test]
    fn const_field_set_always_const_violation() {
        let mut probe = Probe {
            reading: 0.0,
            serial: 77,
        };
        let field = serial_field();
        let mut instance = Variant::borrowed_mut(owner(), &mut probe);
        // Even a value of the wrong type reports the const violation first.
        let err = field
            .set(&mut instance, Variant::owned(f64_ty(), 1.0f64))
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Field(FieldError::ConstViolation { .. })
        ));
        let err = field
            .set(&mut instance, Variant::owned(u32_ty(), 5u32))
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Field(FieldError::ConstViolation { .. })
        ));
    }

    #[test]
    fn set_rejects_wrong_value_type() {
        let mut probe = Probe {
            reading: 0.0,
            serial: 77,
        };
        let mut instance = Variant::borrowed_mut(owner(), &mut probe);
        let err = reading_field()
            .set(&mut instance, Variant::owned(u32_ty(), 5u32))
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Field(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn wrong_receiver_type_is_reported() {
        let other = 3i32;
        let instance = Variant::borrowed(TypeId::from_raw(99), &other);
        let err = reading_field().get(&instance).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Field(FieldError::WrongReceiverType { .. })
        ));
    }

    #[test]
    fn void_receiver_is_missing() {
        let err = reading_field().get(&Variant::void()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Field(FieldError::MissingReceiver { .. })
        ));
    }

    #[test]
    fn get_ref_aliases_live_storage() {
        let probe = Probe {
            reading: 8.0,
            serial: 77,
        };
        let instance = Variant::borrowed(owner(), &probe);
        let alias = reading_field().get_ref(&instance).unwrap();
        assert!(std::ptr::eq(
            alias.get_ref::<f64>().unwrap(),
            &probe.reading
        ));
    }

    #[test]
    fn get_mut_writes_in_place() {
        let mut probe = Probe {
            reading: 1.0,
            serial: 77,
        };
        let field = reading_field();
        {
            let mut instance = Variant::borrowed_mut(owner(), &mut probe);
            let mut alias = field.get_mut(&mut instance).unwrap();
            *alias.get_mut::<f64>().unwrap() = 6.5;
        }
        assert_eq!(probe.reading, 6.5);
    }

    #[test]
    fn get_mut_through_const_instance_fails() {
        let probe = Probe {
            reading: 1.0,
            serial: 77,
        };
        let field = reading_field();
        let mut instance = Variant::borrowed(owner(), &probe);
        // Const receiver category blocks the mutable alias.
        let err = field.get_mut(&mut instance).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Variant(_)));
    }

    #[test]
    fn static_field_ignores_the_instance() {
        static COUNTER: AtomicI64 = AtomicI64::new(40);
        let field = Field::static_field(
            "counter",
            TypeId::from_raw(13),
            || COUNTER.load(Ordering::Relaxed),
            |v| COUNTER.store(v, Ordering::Relaxed),
        );
        assert!(field.is_static());
        let value = field.get(&Variant::void()).unwrap();
        assert_eq!(value.value::<i64>().unwrap(), 40);
        field
            .set(
                &mut Variant::void(),
                Variant::owned(TypeId::from_raw(13), 41i64),
            )
            .unwrap();
        assert_eq!(COUNTER.load(Ordering::Relaxed), 41);
    }

    #[test]
    fn static_field_is_not_addressable() {
        let field = Field::const_static_field("limit", TypeId::from_raw(13), || 100i64);
        let err = field.get_ref(&Variant::void()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Field(FieldError::NotAddressable { .. })
        ));
    }
}
