//! Argument marshaling - stack slots ↔ native values
//!
//! Design: A parameter's class is a constant of its type, so reading a
//! slot is one fixed branch on `TypeClass` followed by a plain cast.
//! Tuples of parameter types are the signatures; `Params` reads them out
//! of slots `1..=ARITY`, `Arguments` pushes them left to right.

use super::classify::{Classify, TypeClass};
use crate::engine::{Engine, Integer, Number, Slot};

/// One value crossing the boundary, tagged by class
///
/// `Text` borrows the engine stack and must not outlive the call frame it
/// was read from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Integer(Integer),
    Float(Number),
    Text(&'a str),
}

impl<'a> Scalar<'a> {
    #[inline]
    pub const fn class(&self) -> TypeClass {
        match self {
            Self::Integer(_) => TypeClass::Integral,
            Self::Float(_) => TypeClass::FloatingPoint,
            Self::Text(_) => TypeClass::Text,
        }
    }

    /// Read `slot` through the primitive selected by `class`
    #[inline]
    pub fn read<E: Engine>(engine: &'a E, slot: Slot, class: TypeClass) -> Self {
        match class {
            TypeClass::Integral => Self::Integer(engine.to_integer(slot)),
            TypeClass::FloatingPoint => Self::Float(engine.to_float(slot)),
            TypeClass::Text => Self::Text(engine.to_str(slot)),
        }
    }

    /// Push dispatcher: one push primitive per class
    #[inline]
    pub fn push<E: Engine>(self, engine: &mut E) {
        match self {
            Self::Integer(value) => engine.push_integer(value),
            Self::Float(value) => engine.push_float(value),
            Self::Text(value) => engine.push_string(value),
        }
    }

    #[inline]
    pub fn as_integer(self) -> Integer {
        match self {
            Self::Integer(value) => value,
            Self::Float(value) => value as Integer,
            Self::Text(value) => value.trim().parse().unwrap_or(0),
        }
    }

    #[inline]
    pub fn as_float(self) -> Number {
        match self {
            Self::Integer(value) => value as Number,
            Self::Float(value) => value,
            Self::Text(value) => value.trim().parse().unwrap_or(0.0),
        }
    }

    #[inline]
    pub fn as_text(self) -> &'a str {
        match self {
            Self::Text(value) => value,
            _ => "",
        }
    }
}

/// A native type that can be produced from a stack slot
pub trait Param: Classify {
    /// Native value for a slot read that borrows the stack for `'a`
    type Value<'a>;

    fn from_scalar(scalar: Scalar<'_>) -> Self::Value<'_>;

    #[inline]
    fn read<E: Engine>(engine: &E, slot: Slot) -> Self::Value<'_> {
        Self::from_scalar(Scalar::read(engine, slot, Self::CLASS))
    }
}

/// A native type that can be pushed onto the stack
pub trait Push: Classify {
    fn to_scalar(&self) -> Scalar<'_>;
}

macro_rules! integral {
    ($($ty:ty),+) => {
        $(
            impl Param for $ty {
                type Value<'a> = $ty;

                #[inline]
                fn from_scalar(scalar: Scalar<'_>) -> $ty {
                    scalar.as_integer() as $ty
                }
            }

            impl Push for $ty {
                #[inline]
                fn to_scalar(&self) -> Scalar<'_> {
                    Scalar::Integer(*self as Integer)
                }
            }
        )+
    };
}

macro_rules! floating {
    ($($ty:ty),+) => {
        $(
            impl Param for $ty {
                type Value<'a> = $ty;

                #[inline]
                fn from_scalar(scalar: Scalar<'_>) -> $ty {
                    scalar.as_float() as $ty
                }
            }

            impl Push for $ty {
                #[inline]
                fn to_scalar(&self) -> Scalar<'_> {
                    Scalar::Float(*self as Number)
                }
            }
        )+
    };
}

integral!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
floating!(f32, f64);

impl<'s> Param for &'s str {
    type Value<'a> = &'a str;

    #[inline]
    fn from_scalar(scalar: Scalar<'_>) -> &str {
        scalar.as_text()
    }
}

impl Param for String {
    type Value<'a> = String;

    #[inline]
    fn from_scalar(scalar: Scalar<'_>) -> String {
        scalar.as_text().to_owned()
    }
}

impl<'s> Push for &'s str {
    #[inline]
    fn to_scalar(&self) -> Scalar<'_> {
        Scalar::Text(*self)
    }
}

impl Push for String {
    #[inline]
    fn to_scalar(&self) -> Scalar<'_> {
        Scalar::Text(self.as_str())
    }
}

/// Parameter list of an exported function
pub trait Params {
    const ARITY: usize;
    const CLASSES: &'static [TypeClass];

    /// Argument tuple borrowing the stack for `'a`
    type Values<'a>;

    /// Read slot `k` into the `k`-th parameter, for `k` in `1..=ARITY`
    fn read<E: Engine>(engine: &E) -> Self::Values<'_>;
}

/// Argument list of an imported function
pub trait Arguments {
    const ARITY: usize;

    /// Push every argument, left to right
    fn push_all<E: Engine>(self, engine: &mut E);
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! tuples {
    ($($name:ident),*) => {
        impl<$($name: Param),*> Params for ($($name,)*) {
            const ARITY: usize = count!($($name)*);
            const CLASSES: &'static [TypeClass] = &[$($name::CLASS),*];

            type Values<'a> = ($($name::Value<'a>,)*);

            #[inline]
            #[allow(unused_mut, unused_variables)]
            fn read<E: Engine>(engine: &E) -> Self::Values<'_> {
                let mut slot: Slot = 0;
                ($({
                    slot += 1;
                    $name::read(engine, slot)
                },)*)
            }
        }

        impl<$($name: Push),*> Arguments for ($($name,)*) {
            const ARITY: usize = count!($($name)*);

            #[inline]
            #[allow(non_snake_case, unused_variables)]
            fn push_all<E: Engine>(self, engine: &mut E) {
                let ($($name,)*) = self;
                $($name.to_scalar().push(engine);)*
            }
        }
    };
}

tuples!();
tuples!(A);
tuples!(A, B);
tuples!(A, B, C);
tuples!(A, B, C, D);
tuples!(A, B, C, D, F);
tuples!(A, B, C, D, F, G);
tuples!(A, B, C, D, F, G, H);
tuples!(A, B, C, D, F, G, H, I);
