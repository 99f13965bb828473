#![forbid(unsafe_code)]

//! Dynamic state values.
//!
//! [`Value`] is what a state record stores under each key. Equality is
//! *strict*: primitives compare by value, containers and host objects compare
//! by reference. Two lists with the same elements are different values unless
//! they are the same allocation.
//!
//! # Invariants
//!
//! 1. `a == b` is exactly [`Value::strict_eq`].
//! 2. `Number(NaN) != Number(NaN)`, and `Number(0.0) == Number(-0.0)`.
//! 3. A key missing from a [`StateMap`] reads as [`Value::Undefined`], which
//!    equals another `Undefined`.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::map::StateMap;

/// Shared `Undefined`, returned for absent keys and missing arguments.
pub(crate) const UNDEFINED: &Value = &Value::Undefined;

/// A value stored in a state record.
#[derive(Clone, Default)]
pub enum Value {
    /// No value. Also what an absent key reads as.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    /// Ordered list, compared by identity.
    List(Rc<[Value]>),
    /// Nested mapping, compared by identity. Never merged recursively.
    Map(Rc<StateMap>),
    /// Opaque host object (including runtime classes), compared by identity.
    Object(Rc<dyn Any>),
}

impl Value {
    /// Wrap a host object.
    #[must_use]
    pub fn object<T: Any>(object: Rc<T>) -> Self {
        Self::Object(object)
    }

    /// Strict equality: value comparison for primitives, identity for
    /// lists, maps and objects.
    #[must_use]
    pub fn strict_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Short name of the value's kind, used in error messages and logs.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "array",
            Self::Map(_) => "object",
            Self::Object(object) if crate::class::is_class(object) => "class",
            Self::Object(_) => "object",
        }
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&Rc<StateMap>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The property-key form of this value.
    ///
    /// Strings are used as-is. Integral numbers print without a fraction
    /// (`1.0` becomes `"1"`), lists join their elements with `,`, and maps or
    /// objects collapse to `"[object Object]"`.
    #[must_use]
    pub fn to_key(&self) -> Cow<'_, str> {
        match self {
            Self::String(s) => Cow::Borrowed(s),
            Self::Undefined => Cow::Borrowed("undefined"),
            Self::Null => Cow::Borrowed("null"),
            Self::Bool(true) => Cow::Borrowed("true"),
            Self::Bool(false) => Cow::Borrowed("false"),
            Self::Number(n) => Cow::Owned(number_key(*n)),
            Self::List(items) => Cow::Owned(
                items
                    .iter()
                    .map(|item| match item {
                        Self::Undefined | Self::Null => Cow::Borrowed(""),
                        other => other.to_key(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Self::Map(_) | Self::Object(_) => Cow::Borrowed("[object Object]"),
        }
    }
}

fn number_key(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let key = if n > 0.0 { "Infinity" } else { "-Infinity" };
        key.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        // -0.0 prints as "0".
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::Object(object) => write!(f, "Object({:p})", Rc::as_ptr(object).cast::<()>()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(Rc::from(value))
    }
}

impl From<Rc<str>> for Value {
    fn from(value: Rc<str>) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<StateMap> for Value {
    fn from(map: StateMap) -> Self {
        Self::Map(Rc::new(map))
    }
}

impl From<Rc<StateMap>> for Value {
    fn from(map: Rc<StateMap>) -> Self {
        Self::Map(map)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
