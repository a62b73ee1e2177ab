//! Result conversion - native return values ↔ stack results
//!
//! `()` is the void return on both paths: exported void functions push
//! nothing and report zero results; imported void functions never read
//! the result slot.

use super::classify::{Classify, TypeClass};
use super::marshal::{Param, Push, Scalar};
use crate::engine::{Engine, Slot};

/// Return type of an exported function
pub trait Returns {
    /// Values pushed per call (0 for void, otherwise 1)
    const COUNT: usize;

    /// Push the result and report how many values were pushed
    fn push_result<E: Engine>(self, engine: &mut E) -> usize;
}

impl Returns for () {
    const COUNT: usize = 0;

    #[inline]
    fn push_result<E: Engine>(self, _engine: &mut E) -> usize {
        0
    }
}

macro_rules! returns {
    ($($ty:ty),+) => {
        $(
            impl Returns for $ty {
                const COUNT: usize = 1;

                #[inline]
                fn push_result<E: Engine>(self, engine: &mut E) -> usize {
                    self.to_scalar().push(engine);
                    1
                }
            }
        )+
    };
}

// Borrowed `&str` results have no owner once the native returns; only
// owned text can be handed back to the engine.
returns!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String);

/// Return type of an imported function
pub trait Returned {
    /// Native value for a result slot that borrows the stack for `'a`
    type Output<'a>;

    const CLASS: Option<TypeClass>;

    fn read<E: Engine>(engine: &E, slot: Slot) -> Self::Output<'_>;
}

impl Returned for () {
    type Output<'a> = ();

    const CLASS: Option<TypeClass> = None;

    #[inline]
    fn read<E: Engine>(_engine: &E, _slot: Slot) {}
}

macro_rules! returned {
    ($($ty:ty),+) => {
        $(
            impl Returned for $ty {
                type Output<'a> = <$ty as Param>::Value<'a>;

                const CLASS: Option<TypeClass> = Some(<$ty as Classify>::CLASS);

                #[inline]
                fn read<E: Engine>(engine: &E, slot: Slot) -> Self::Output<'_> {
                    <$ty as Param>::from_scalar(Scalar::read(engine, slot, <$ty as Classify>::CLASS))
                }
            }
        )+
    };
}

returned!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String);

impl<'s> Returned for &'s str {
    type Output<'a> = &'a str;

    const CLASS: Option<TypeClass> = Some(TypeClass::Text);

    #[inline]
    fn read<E: Engine>(engine: &E, slot: Slot) -> &str {
        Scalar::read(engine, slot, TypeClass::Text).as_text()
    }
}
