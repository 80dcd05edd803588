//! Bound values and the string converters that produce them.
//!
//! Every raw argument token is converted by [`convert`], which picks one of a
//! small, closed set of converters from the member's [`ValueKind`]. Typed
//! access to bound values goes through [`FromValue`].

use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::schema::ValueKind;

/// A value bound to a member of an options instance.
///
/// # Examples
///
/// ```
/// use command_tree_core::Value;
///
/// let v = Value::List(vec![Value::from("a"), Value::from("b")]);
/// assert_eq!(v.as_list().map(<[Value]>::len), Some(2));
/// assert!(Value::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// No value (default of nullable members).
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Text value (also used for choices).
    String(String),
    /// Filesystem path.
    Path(PathBuf),
    /// Homogeneous list of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is a [`Value::Integer`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the number as `f64` (integers are widened).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the text of a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list items of a [`Value::List`].
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Path(_) => "path",
            Self::List(_) => "list",
        }
    }

    /// Renders a scalar value as the argument token that would produce it.
    ///
    /// Returns `None` for [`Value::Null`] and lists.
    pub fn to_token(&self) -> Option<String> {
        match self {
            Self::Null | Self::List(_) => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Path(p) => Some(p.to_string_lossy().into_owned()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// Failure to convert a raw token into a member's declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Token is not a recognised boolean literal.
    #[error("'{0}' is not a boolean (expected true/false, yes/no, on/off or 1/0)")]
    InvalidBool(String),
    /// Token is not a valid signed integer.
    #[error("'{raw}' is not a valid integer: {source}")]
    InvalidInteger {
        /// The raw token.
        raw: String,
        /// Underlying parse failure.
        #[source]
        source: ParseIntError,
    },
    /// Token is not a valid floating point number.
    #[error("'{raw}' is not a valid number: {source}")]
    InvalidFloat {
        /// The raw token.
        raw: String,
        /// Underlying parse failure.
        #[source]
        source: ParseFloatError,
    },
    /// Token is well-formed but not one of the allowed choices.
    #[error("'{raw}' is not one of: {}", .choices.join(", "))]
    InvalidChoice {
        /// The raw token.
        raw: String,
        /// Allowed choices.
        choices: Vec<String>,
    },
}

/// Parses a boolean literal (`true/false`, `yes/no`, `on/off`, `1/0`),
/// ignoring ASCII case.
///
/// # Examples
///
/// ```
/// use command_tree_core::parse_bool;
///
/// assert_eq!(parse_bool("Yes"), Some(true));
/// assert_eq!(parse_bool("0"), Some(false));
/// assert_eq!(parse_bool("maybe"), None);
/// ```
pub fn parse_bool(raw: &str) -> Option<bool> {
    const TRUE: [&str; 4] = ["true", "yes", "on", "1"];
    const FALSE: [&str; 4] = ["false", "no", "off", "0"];

    let raw = raw.trim();
    if TRUE.iter().any(|t| t.eq_ignore_ascii_case(raw)) {
        Some(true)
    } else if FALSE.iter().any(|f| f.eq_ignore_ascii_case(raw)) {
        Some(false)
    } else {
        None
    }
}

/// Converts a raw token into a [`Value`] of the given kind.
///
/// # Examples
///
/// ```
/// use command_tree_core::{convert, Value, ValueKind};
///
/// assert_eq!(convert(&ValueKind::Integer, "42"), Ok(Value::Integer(42)));
/// assert!(convert(&ValueKind::Integer, "forty-two").is_err());
///
/// let format = ValueKind::Choice(vec!["json".into(), "yaml".into()]);
/// assert_eq!(convert(&format, "JSON"), Ok(Value::String("json".into())));
/// ```
pub fn convert(kind: &ValueKind, raw: &str) -> Result<Value, ConversionError> {
    match kind {
        ValueKind::Bool => parse_bool(raw)
            .map(Value::Bool)
            .ok_or_else(|| ConversionError::InvalidBool(raw.to_string())),
        ValueKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|source| ConversionError::InvalidInteger {
                raw: raw.to_string(),
                source,
            }),
        ValueKind::Float => raw
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|source| ConversionError::InvalidFloat {
                raw: raw.to_string(),
                source,
            }),
        ValueKind::String => Ok(Value::String(raw.to_string())),
        ValueKind::Path => Ok(Value::Path(PathBuf::from(raw))),
        ValueKind::Choice(choices) => choices
            .iter()
            .find(|choice| choice.eq_ignore_ascii_case(raw))
            .map(|choice| Value::String(choice.clone()))
            .ok_or_else(|| ConversionError::InvalidChoice {
                raw: raw.to_string(),
                choices: choices.clone(),
            }),
    }
}

/// Conversion from a bound [`Value`] into a Rust type.
///
/// Implemented for the scalar types the converters produce, for `Option<T>`
/// (nullable members) and `Vec<T>` (list members).
pub trait FromValue: Sized {
    /// Returns `None` when the value has a different shape.
    fn from_value(value: &Value) -> Option<Self>;

    /// Type label used in extraction errors.
    fn expected() -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Path(p) => Some(p.to_string_lossy().into_owned()),
            _ => None,
        }
    }
}

impl FromValue for PathBuf {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Path(p) => Some(p.clone()),
            Value::String(s) => Some(PathBuf::from(s)),
            _ => None,
        }
    }
}

macro_rules! int_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    value.as_i64().and_then(|i| <$ty>::try_from(i).ok())
                }
            }
        )*
    };
}

int_from_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_list()?
            .iter()
            .map(T::from_value)
            .collect::<Option<Vec<_>>>()
    }
}
