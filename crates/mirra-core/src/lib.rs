//! Runtime reflection engine: a type registry, type-erased values and
//! dynamic member access.
//!
//! Types opt in by implementing [`Describe`]; the first reflection through
//! a [`TypeRegistry`] assigns a dense [`TypeId`] and memoizes an immutable
//! [`TypeInfo`] descriptor. Values cross the dynamic boundary as
//! [`Variant`]s, which pair a type id with one of eight ownership
//! categories, and every fallible operation reports a structured
//! [`ReflectError`].
//!
//! ```
//! use mirra_core::{Describe, ReflectResult, TypeBuilder, TypeRegistry, Variant};
//!
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Describe for Point {
//!     fn describe(b: &mut TypeBuilder<'_, Self>) -> ReflectResult<()> {
//!         b.named("Point")
//!             .field("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x)?
//!             .field("y", |p: &Point| &p.y, |p: &mut Point| &mut p.y)?
//!             .method1("move", ["dx"], |p: &mut Point, dx: i32| p.x += dx)?;
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> ReflectResult<()> {
//! let mut registry = TypeRegistry::new();
//! let info = registry.reflect_type::<Point>()?;
//!
//! let mut point = Point { x: 3, y: 4 };
//! let mut instance = Variant::borrowed_mut(info.id(), &mut point);
//! let mut args = [Variant::owned(registry.reflect::<i32>()?, 5)];
//! let method = info.method("move").expect("declared above");
//! method.invoke(&registry, &mut instance, &mut args)?;
//! assert_eq!(point.x, 8);
//! # Ok(())
//! # }
//! ```

mod builtins;
pub mod error;
pub mod field;
pub mod method;
pub mod registry;
pub mod type_id;
pub mod type_info;
pub mod variant;

pub use error::{
    ErrorKind, FieldError, MethodError, ReflectError, ReflectResult, RegistryError, VariantError,
};
pub use field::Field;
pub use method::{Method, Overload, Param, ReceiverQual};
pub use registry::{Describe, TypeBuilder, TypeRegistry};
pub use type_id::TypeId;
pub use type_info::{TypeDisplay, TypeFlags, TypeInfo};
pub use variant::{Ownership, Variant};
