//! `Describe` implementations for the primitive built-in types.
//!
//! Primitives carry no fields or methods; describing one only pins its
//! canonical name. `()` is special-cased by the registry to the fixed
//! `void` id, so its implementation here never actually runs, but it keeps
//! `()` usable as a return type bound.

use crate::error::ReflectResult;
use crate::registry::{Describe, TypeBuilder};

macro_rules! describe_builtin {
    ($($t:ty => $name:literal),+ $(,)?) => {
        $(
            impl Describe for $t {
                fn describe(builder: &mut TypeBuilder<'_, Self>) -> ReflectResult<()> {
                    builder.named($name);
                    Ok(())
                }
            }
        )+
    };
}

describe_builtin! {
    bool => "bool",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    isize => "isize",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    char => "char",
    String => "string",
    () => "void",
}
