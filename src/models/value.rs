//! Generic option values and the default coercion rules.
//!
//! Attach options arrive as loosely typed values. Extensions ask for them as
//! text, boolean, 64-bit integer or real, and the runtime converts with the
//! rules below:
//!
//! | from \ to | text | boolean | int64 | real |
//! |-----------|------|---------|-------|------|
//! | `Null` | fail | fail | fail | fail |
//! | `Boolean` | `true`/`false` | itself | 1/0 | 1.0/0.0 |
//! | `BigInt` | decimal | non-zero | itself | widened |
//! | `Double` | shortest repr | non-zero | rounded | itself |
//! | `Varchar` | itself | keyword | parsed | parsed |

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;

/// Logical type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// SQL NULL.
    Null,
    /// Boolean.
    Boolean,
    /// 64-bit signed integer.
    BigInt,
    /// 64-bit float.
    Double,
    /// UTF-8 text.
    Varchar,
}

impl LogicalType {
    /// Returns the type name as used in error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean => "BOOLEAN",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE",
            Self::Varchar => "VARCHAR",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A loosely typed option value.
///
/// Deserializes untagged from TOML, so `flag = true`, `count = 42`,
/// `ratio = 1.5` and `custom = "value"` map to the obvious variants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    BigInt(i64),
    /// Floating point value.
    Double(f64),
    /// Text value.
    Varchar(String),
    /// Absent value.
    #[serde(skip)]
    Null,
}

impl Value {
    /// Returns the logical type of this value.
    #[must_use]
    pub const fn logical_type(&self) -> LogicalType {
        match self {
            Self::Null => LogicalType::Null,
            Self::Boolean(_) => LogicalType::Boolean,
            Self::BigInt(_) => LogicalType::BigInt,
            Self::Double(_) => LogicalType::Double,
            Self::Varchar(_) => LogicalType::Varchar,
        }
    }

    /// Returns true if this is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts to text using the default coercion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] for `Null`.
    pub fn cast_as_varchar(&self) -> Result<String> {
        match self {
            Self::Null => Err(self.conversion_error(LogicalType::Varchar)),
            Self::Boolean(b) => Ok(b.to_string()),
            Self::BigInt(i) => Ok(i.to_string()),
            Self::Double(d) => Ok(d.to_string()),
            Self::Varchar(s) => Ok(s.clone()),
        }
    }

    /// Converts to a boolean using the default coercion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] for `Null`, `NaN` and unrecognized text.
    pub fn cast_as_boolean(&self) -> Result<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            Self::BigInt(i) => Ok(*i != 0),
            Self::Double(d) if !d.is_nan() => Ok(*d != 0.0),
            Self::Varchar(s) => {
                parse_boolean(s).ok_or_else(|| self.conversion_error(LogicalType::Boolean))
            },
            Self::Null | Self::Double(_) => Err(self.conversion_error(LogicalType::Boolean)),
        }
    }

    /// Converts to a 64-bit integer using the default coercion.
    ///
    /// Doubles are rounded half away from zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] for `Null`, non-finite or out of range
    /// doubles, and text that is not an integer.
    pub fn cast_as_bigint(&self) -> Result<i64> {
        match self {
            Self::Boolean(b) => Ok(i64::from(*b)),
            Self::BigInt(i) => Ok(*i),
            Self::Double(d) => {
                double_to_bigint(*d).ok_or_else(|| self.conversion_error(LogicalType::BigInt))
            },
            Self::Varchar(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.conversion_error(LogicalType::BigInt)),
            Self::Null => Err(self.conversion_error(LogicalType::BigInt)),
        }
    }

    /// Converts to a 64-bit float using the default coercion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] for `Null` and text that is not a number.
    #[allow(clippy::cast_precision_loss)]
    pub fn cast_as_double(&self) -> Result<f64> {
        match self {
            Self::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Self::BigInt(i) => Ok(*i as f64),
            Self::Double(d) => Ok(*d),
            Self::Varchar(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.conversion_error(LogicalType::Double)),
            Self::Null => Err(self.conversion_error(LogicalType::Double)),
        }
    }

    fn conversion_error(&self, target: LogicalType) -> Error {
        Error::Conversion {
            value: self.to_string(),
            target,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::BigInt(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Varchar(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::BigInt(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Varchar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Varchar(value)
    }
}

fn parse_boolean(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn double_to_bigint(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    // f64::round is half away from zero.
    let rounded = value.round();
    // i64::MAX is not representable as f64; the bound below is 2^63.
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varchar_casts() {
        assert_eq!(Value::from(true).cast_as_varchar().ok().as_deref(), Some("true"));
        assert_eq!(Value::from(42).cast_as_varchar().ok().as_deref(), Some("42"));
        assert_eq!(Value::from(1.5).cast_as_varchar().ok().as_deref(), Some("1.5"));
        assert_eq!(Value::from("x").cast_as_varchar().ok().as_deref(), Some("x"));
        assert!(Value::Null.cast_as_varchar().is_err());
    }

    #[test]
    fn test_boolean_keywords() {
        assert_eq!(Value::from(" Yes ").cast_as_boolean().ok(), Some(true));
        assert_eq!(Value::from("off").cast_as_boolean().ok(), Some(false));
        assert!(Value::from("maybe").cast_as_boolean().is_err());
        assert!(Value::Double(f64::NAN).cast_as_boolean().is_err());
    }

    #[test]
    fn test_bigint_rounding() {
        assert_eq!(Value::from(2.5).cast_as_bigint().ok(), Some(3));
        assert_eq!(Value::from(-2.5).cast_as_bigint().ok(), Some(-3));
        assert!(Value::Double(f64::INFINITY).cast_as_bigint().is_err());
        assert!(Value::Double(1e19).cast_as_bigint().is_err());
        assert!(Value::from("1.5").cast_as_bigint().is_err());
    }

    #[test]
    fn test_conversion_error_message() {
        let err = Value::from("abc").cast_as_double();
        assert!(
            matches!(err, Err(Error::Conversion { target: LogicalType::Double, .. })),
            "expected conversion error"
        );
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Options {
            custom: Value,
            flag: Value,
            count: Value,
            ratio: Value,
        }

        let options: Options =
            toml::from_str("custom = \"value\"\nflag = true\ncount = 42\nratio = 1.5\n")
                .unwrap();
        assert_eq!(options.custom, Value::from("value"));
        assert_eq!(options.flag, Value::Boolean(true));
        assert_eq!(options.count, Value::BigInt(42));
        assert_eq!(options.ratio, Value::Double(1.5));
    }
}
