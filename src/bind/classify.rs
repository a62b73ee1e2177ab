//! Type classification - which stack primitive a native type maps to
//!
//! Every bindable type belongs to exactly one class. Types without a
//! `Classify` impl cannot appear in a bound signature, so an unsupported
//! parameter or return type is rejected at compile time.

/// Stack conversion class of a native type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Integral,
    FloatingPoint,
    Text,
}

impl TypeClass {
    /// Class of `T`
    #[inline]
    pub const fn of<T: Classify + ?Sized>() -> Self {
        T::CLASS
    }

    #[inline]
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::Integral)
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::FloatingPoint)
    }

    #[inline]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text)
    }

    /// Runtime-side type name (for diagnostics)
    pub const fn runtime_name(self) -> &'static str {
        match self {
            Self::Integral => "integer",
            Self::FloatingPoint => "number",
            Self::Text => "string",
        }
    }
}

/// Compile-time classification of a native type
pub trait Classify {
    const CLASS: TypeClass;
}

macro_rules! classify {
    ($class:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl Classify for $ty {
                const CLASS: TypeClass = TypeClass::$class;
            }
        )+
    };
}

classify!(Integral => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
classify!(FloatingPoint => f32, f64);
classify!(Text => str, String);

impl<T: Classify + ?Sized> Classify for &T {
    const CLASS: TypeClass = T::CLASS;
}
