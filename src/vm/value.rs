//! Runtime values of the reference engine

use crate::engine::{Integer, NativeEntry, Number};
use crate::script::ast::Block;
use std::fmt;
use std::rc::Rc;

use super::Vm;

/// A function defined by script source
#[derive(Debug)]
pub struct ScriptFunction {
    pub name: String,
    pub chunk: Rc<str>,
    pub params: Vec<String>,
    pub body: Block,
}

/// Dynamically typed engine value
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(Integer),
    Float(Number),
    Str(Rc<str>),
    Native(NativeEntry<Vm>),
    Function(Rc<ScriptFunction>),
}

impl Value {
    pub fn string(text: impl Into<Rc<str>>) -> Self {
        Self::Str(text.into())
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) | Self::Float(_) => "number",
            Self::Str(_) => "string",
            Self::Native(_) | Self::Function(_) => "function",
        }
    }

    #[inline]
    pub const fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Boolean(false))
    }

    #[inline]
    pub const fn is_callable(&self) -> bool {
        matches!(self, Self::Native(_) | Self::Function(_))
    }

    /// Integer view: floats only when integral-valued, strings when numeric
    pub fn to_integer(&self) -> Option<Integer> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Float(value) => float_to_integer(*value),
            Self::Str(text) => match parse_number(text)? {
                Self::Integer(value) => Some(value),
                Self::Float(value) => float_to_integer(value),
                _ => None,
            },
            _ => None,
        }
    }

    /// Float view: integers widen, strings when numeric
    pub fn to_number(&self) -> Option<Number> {
        match self {
            Self::Integer(value) => Some(*value as Number),
            Self::Float(value) => Some(*value),
            Self::Str(text) => match parse_number(text)? {
                Self::Integer(value) => Some(value as Number),
                Self::Float(value) => Some(value),
                _ => None,
            },
            _ => None,
        }
    }

    /// Numeric view keeping the integer/float distinction
    pub fn to_numeric(&self) -> Option<Value> {
        match self {
            Self::Integer(_) | Self::Float(_) => Some(self.clone()),
            Self::Str(text) => parse_number(text),
            _ => None,
        }
    }

    /// String view of strings and numbers
    pub fn to_text(&self) -> Option<Rc<str>> {
        match self {
            Self::Str(text) => Some(Rc::clone(text)),
            Self::Integer(_) | Self::Float(_) => Some(self.to_string().into()),
            _ => None,
        }
    }

    /// Equality without coercion between strings and numbers
    pub fn raw_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                (*a as Number) == *b
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Native(a), Self::Native(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn float_to_integer(value: Number) -> Option<Integer> {
    const LIMIT: Number = 9_223_372_036_854_775_808.0; // 2^63
    if value.fract() == 0.0 && value >= -LIMIT && value < LIMIT {
        Some(value as Integer)
    } else {
        None
    }
}

/// Parse numeric text the way scripts write numbers
pub fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        let value = u64::from_str_radix(hex, 16).ok()? as Integer;
        return Some(Value::Integer(if negative { value.wrapping_neg() } else { value }));
    }

    if let Ok(value) = text.parse::<Integer>() {
        return Some(Value::Integer(value));
    }

    // Rust accepts "inf" and "nan"; scripts do not
    if digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return text.parse::<Number>().ok().map(Value::Float);
    }

    None
}

/// Format a float like C `%.14g`, keeping a fractional part on integral values
pub fn format_number(value: Number) -> String {
    if value.is_nan() {
        if value.is_sign_negative() { "-nan".to_string() } else { "nan".to_string() }
    } else if value.is_infinite() {
        if value > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        let text = format_general(value, 14);
        // integral results still read as floats
        if text.bytes().all(|b| b == b'-' || b.is_ascii_digit()) {
            text + ".0"
        } else {
            text
        }
    }
}

/// C `%.<precision>g`: fixed or exponent notation, trailing zeros dropped
fn format_general(value: Number, precision: usize) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0".to_string() } else { "0".to_string() };
    }

    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", format_number(*value)),
            Self::Str(text) => write!(f, "{}", text),
            Self::Native(entry) => write!(f, "function: native {:p}", Rc::as_ptr(entry) as *const ()),
            Self::Function(function) => write!(f, "function: {}", function.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(text) => write!(f, "{:?}", text),
            other => write!(f, "{}", other),
        }
    }
}

impl From<Integer> for Value {
    fn from(value: Integer) -> Self {
        Self::Integer(value)
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}
