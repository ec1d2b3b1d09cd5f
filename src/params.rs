//! Parameter values for prepared statements.

use std::any::{self, Any};
use std::fmt;

/// A value bound to a positional `?` placeholder.
///
/// The bindable set is closed: 32-bit integers, doubles, floats (widened to
/// double at bind time), booleans and text. Values of any other type arrive
/// as [`Param::Unsupported`] when converted through [`Param::of`] or
/// [`Param::from_any`], and are handled according to the session's
/// [`BindMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// 32-bit signed integer.
    Integer(i32),
    /// Double-precision float.
    Double(f64),
    /// Single-precision float, bound as a double.
    Float(f32),
    /// Boolean.
    Boolean(bool),
    /// Text, from either a borrowed or an owned string.
    Text(String),
    /// A value of a type that cannot be bound.
    Unsupported {
        /// Name of the rejected type, for diagnostics.
        type_name: String,
    },
}

impl Param {
    /// Convert a value by its exact runtime type.
    ///
    /// Only `i32`, `f64`, `f32`, `bool`, `&'static str` and `String` map to a
    /// bindable variant. Anything else, including `i64` and `Option<_>`,
    /// becomes [`Param::Unsupported`] carrying the type's name.
    ///
    /// ```
    /// use db_session::Param;
    ///
    /// assert_eq!(Param::of(10), Param::Integer(10));
    /// assert!(Param::of(10i64).is_unsupported());
    /// ```
    pub fn of<T: Any>(value: T) -> Self {
        Self::from_any(&value).unwrap_or_else(|| Self::Unsupported {
            type_name: any::type_name::<T>().to_string(),
        })
    }

    /// Convert a dynamically typed value by exact type.
    ///
    /// Returns `None` when the value is not one of the bindable types; the
    /// concrete type name is not recoverable from a `dyn Any`.
    pub fn from_any(value: &dyn Any) -> Option<Self> {
        if let Some(v) = value.downcast_ref::<i32>() {
            Some(Self::Integer(*v))
        } else if let Some(v) = value.downcast_ref::<f64>() {
            Some(Self::Double(*v))
        } else if let Some(v) = value.downcast_ref::<f32>() {
            Some(Self::Float(*v))
        } else if let Some(v) = value.downcast_ref::<bool>() {
            Some(Self::Boolean(*v))
        } else if let Some(v) = value.downcast_ref::<&'static str>() {
            Some(Self::Text((*v).to_string()))
        } else {
            value
                .downcast_ref::<String>()
                .map(|v| Self::Text(v.clone()))
        }
    }

    /// Convert a dynamic value, keeping unknown types as `Unsupported`.
    pub fn from_dyn(value: &dyn Any) -> Self {
        Self::from_any(value).unwrap_or_else(|| Self::Unsupported {
            type_name: "<dynamic>".to_string(),
        })
    }

    /// Check if the value cannot be bound.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Param::Unsupported { .. })
    }

    /// Name of the value's type as reported in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Param::Integer(_) => "i32",
            Param::Double(_) => "f64",
            Param::Float(_) => "f32",
            Param::Boolean(_) => "bool",
            Param::Text(_) => "text",
            Param::Unsupported { type_name } => type_name,
        }
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Param::Integer(value)
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Double(value)
    }
}

impl From<f32> for Param {
    fn from(value: f32) -> Self {
        Param::Float(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Boolean(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<&String> for Param {
    fn from(value: &String) -> Self {
        Param::Text(value.clone())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Integer(v) => write!(f, "{}", v),
            Param::Double(v) => write!(f, "{}", v),
            Param::Float(v) => write!(f, "{}", v),
            Param::Boolean(v) => write!(f, "{}", v),
            Param::Text(v) => write!(f, "'{}'", v),
            Param::Unsupported { type_name } => write!(f, "<unsupported {}>", type_name),
        }
    }
}

/// Policy for parameters that cannot be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindMode {
    /// Reject the call with [`Error::UnsupportedParameter`](crate::Error::UnsupportedParameter)
    /// before anything is executed.
    Strict,
    /// Leave the placeholder unbound and keep binding the remaining values.
    /// Executing the statement then fails with
    /// [`Error::UnboundParameter`](crate::Error::UnboundParameter).
    #[default]
    Lenient,
}

/// Build a `Vec<Param>` from a list of expressions.
///
/// ```
/// use db_session::{params, Param};
///
/// let values = params![10, 2.5, "name"];
/// assert_eq!(values[0], Param::Integer(10));
/// assert_eq!(values[2], Param::Text("name".into()));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Param>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Param::from($value)),+]
    };
}
