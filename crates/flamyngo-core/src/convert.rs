//! Type coercion for raw search text and document leaves.
//!
//! Conversions are named in configuration (`summary`, `query` rules and
//! `unique_key_type`). Names are looked up in a fixed registry when the
//! [`ConfigStore`](crate::config::ConfigStore) is built, so an unknown name is a
//! startup failure rather than a per-request one.
//!
//! ## Security
//!
//! Converter names are never resolved to code at runtime. Settings files that
//! name a dotted `module.function` converter are rejected at load time; only
//! the names in [`Converter::ALL`] are accepted.
//!
//! Without a converter, values go through [`infer`]: integer, then float, then
//! the unchanged string.

use crate::error::{FlamyngoError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

/// A named conversion from the static registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Converter {
    /// Integer (truncates floats)
    Int,
    /// Finite floating point number
    Float,
    /// String; non-strings are rendered as compact JSON
    Str,
    /// Boolean from common textual spellings or numbers
    Bool,
    /// RFC 3339 timestamp in UTC
    DateTime,
}

impl Converter {
    /// Every registered converter
    pub const ALL: [Converter; 5] = [
        Converter::Int,
        Converter::Float,
        Converter::Str,
        Converter::Bool,
        Converter::DateTime,
    ];

    /// Registry name of this converter
    pub fn name(&self) -> &'static str {
        match self {
            Converter::Int => "int",
            Converter::Float => "float",
            Converter::Str => "str",
            Converter::Bool => "bool",
            Converter::DateTime => "datetime",
        }
    }

    /// Parse an optional type spec from configuration.
    ///
    /// A missing or blank spec means "infer".
    pub fn from_spec(spec: Option<&str>) -> Result<Option<Converter>> {
        match spec.map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name.parse().map(Some),
        }
    }

    /// Apply this converter to a document leaf or raw string value.
    pub fn apply(&self, value: &Value) -> Result<Value> {
        let converted = match self {
            Converter::Int => to_int(value),
            Converter::Float => to_float(value),
            Converter::Str => Some(to_str(value)),
            Converter::Bool => to_bool(value),
            Converter::DateTime => to_datetime(value),
        };

        converted.ok_or_else(|| FlamyngoError::ConversionFailed {
            converter: self.name().to_string(),
            value: value.to_string(),
        })
    }
}

impl fmt::Display for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Converter {
    type Err = FlamyngoError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(converter) = Converter::ALL.iter().find(|c| c.name() == s) {
            return Ok(*converter);
        }

        let known: Vec<&str> = Converter::ALL.iter().map(|c| c.name()).collect();
        let reason = if s.contains('.') {
            format!(
                "converter '{}' looks like a module path; dynamic imports are not supported, use one of: {}",
                s,
                known.join(", ")
            )
        } else {
            format!("unknown converter '{}', expected one of: {}", s, known.join(", "))
        };
        Err(FlamyngoError::config(reason))
    }
}

/// Convert raw text with an optional converter.
///
/// Without a converter this never fails; see [`infer`].
pub fn coerce(raw: &str, converter: Option<Converter>) -> Result<Value> {
    match converter {
        Some(converter) => converter.apply(&Value::String(raw.to_string())),
        None => Ok(infer(raw)),
    }
}

/// Convert a document leaf with an optional converter.
///
/// Without a converter, strings go through [`infer`] and every other value
/// is returned unchanged.
pub fn coerce_value(value: &Value, converter: Option<Converter>) -> Result<Value> {
    match (converter, value) {
        (Some(converter), _) => converter.apply(value),
        (None, Value::String(s)) => Ok(infer(s)),
        (None, other) => Ok(other.clone()),
    }
}

/// Positional numeric inference: integer, then float, then the original text.
///
/// An integer is only returned when the text also reads as a float of exactly
/// the same value; otherwise the float wins. Non-finite floats cannot be
/// represented and fall through to the string.
pub fn infer(raw: &str) -> Value {
    let trimmed = raw.trim();
    let float = trimmed.parse::<f64>().ok();

    if let Ok(int) = trimmed.parse::<i64>() {
        if float.map_or(false, |f| f as i128 == int as i128) {
            return Value::from(int);
        }
    } else if let Ok(int) = trimmed.parse::<u64>() {
        if float.map_or(false, |f| f as i128 == int as i128) {
            return Value::from(int);
        }
    }

    if let Some(number) = float.and_then(Number::from_f64) {
        return Value::Number(number);
    }

    Value::String(raw.to_string())
}

fn to_int(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<u64>().map(Value::from))
                .ok()
        }
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => {
            let f = n.as_f64()?.trunc();
            if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Some(Value::from(f as i64))
            } else {
                None
            }
        }
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<Value> {
    let f = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    Number::from_f64(f).map(Value::Number)
}

fn to_str(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

fn to_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn to_datetime(value: &Value) -> Option<Value> {
    let parsed: DateTime<Utc> = match value {
        Value::String(s) => parse_timestamp(s.trim())?,
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                DateTime::from_timestamp(secs, 0)?
            } else {
                let f = n.as_f64()?;
                let mut secs = f.floor();
                let mut nanos = ((f - secs) * 1e9).round();
                if nanos >= 1e9 {
                    secs += 1.0;
                    nanos = 0.0;
                }
                if !secs.is_finite() || secs < i64::MIN as f64 || secs >= i64::MAX as f64 {
                    return None;
                }
                DateTime::from_timestamp(secs as i64, nanos as u32)?
            }
        }
        _ => return None,
    };

    Some(Value::String(
        parsed.to_rfc3339_opts(SecondsFormat::AutoSi, true),
    ))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_positional() {
        assert_eq!(infer("3"), json!(3));
        assert_eq!(infer("3.5"), json!(3.5));
        assert_eq!(infer("abc"), json!("abc"));
        assert_eq!(infer("-12"), json!(-12));
        assert_eq!(infer(" 42 "), json!(42));
    }

    #[test]
    fn test_infer_float_forms() {
        // Not an integer literal, so it stays a float
        assert_eq!(infer("3.0"), json!(3.0));
        assert_eq!(infer("1e3"), json!(1000.0));
    }

    #[test]
    fn test_infer_never_fails() {
        assert_eq!(infer(""), json!(""));
        assert_eq!(infer("nan"), json!("nan"));
        assert_eq!(infer("inf"), json!("inf"));
        assert_eq!(infer("mp-1234"), json!("mp-1234"));
        // Keeps the original text, including surrounding whitespace
        assert_eq!(infer(" MoS2 "), json!(" MoS2 "));
    }

    #[test]
    fn test_infer_large_integer_prefers_exact_float() {
        // 2^63 - 1 is not exactly representable as a float
        assert_eq!(infer("9223372036854775807"), json!(9223372036854775807.0_f64));
        assert_eq!(infer("9007199254740992"), json!(9007199254740992_i64));
    }

    #[test]
    fn test_registry_lookup() {
        assert_eq!("int".parse::<Converter>().unwrap(), Converter::Int);
        assert_eq!("datetime".parse::<Converter>().unwrap(), Converter::DateTime);
        assert_eq!(Converter::from_spec(None).unwrap(), None);
        assert_eq!(Converter::from_spec(Some("  ")).unwrap(), None);
        assert_eq!(
            Converter::from_spec(Some(" float ")).unwrap(),
            Some(Converter::Float)
        );
    }

    #[test]
    fn test_registry_rejects_unknown() {
        let err = "decimal".parse::<Converter>().unwrap_err();
        assert!(err.is_fatal());

        let err = "os.system".parse::<Converter>().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("dynamic imports are not supported"));
    }

    #[test]
    fn test_named_int() {
        assert_eq!(coerce("42", Some(Converter::Int)).unwrap(), json!(42));
        assert_eq!(coerce_value(&json!(3.7), Some(Converter::Int)).unwrap(), json!(3));
        assert_eq!(coerce_value(&json!(true), Some(Converter::Int)).unwrap(), json!(1));

        let err = coerce("3.5", Some(Converter::Int)).unwrap_err();
        assert!(matches!(err, FlamyngoError::ConversionFailed { .. }));
        assert!(coerce_value(&json!([1]), Some(Converter::Int)).is_err());
        // 2^63 does not fit in an i64
        assert!(coerce_value(&json!(9223372036854775808.0_f64), Some(Converter::Int)).is_err());
        assert_eq!(
            coerce_value(&json!(-9223372036854775808.0_f64), Some(Converter::Int)).unwrap(),
            json!(i64::MIN)
        );
    }

    #[test]
    fn test_named_float_and_str() {
        assert_eq!(coerce("2", Some(Converter::Float)).unwrap(), json!(2.0));
        assert!(coerce("abc", Some(Converter::Float)).is_err());

        assert_eq!(coerce("007", Some(Converter::Str)).unwrap(), json!("007"));
        assert_eq!(coerce_value(&json!(1.5), Some(Converter::Str)).unwrap(), json!("1.5"));
    }

    #[test]
    fn test_named_bool() {
        assert_eq!(coerce("Yes", Some(Converter::Bool)).unwrap(), json!(true));
        assert_eq!(coerce("0", Some(Converter::Bool)).unwrap(), json!(false));
        assert_eq!(coerce_value(&json!(2), Some(Converter::Bool)).unwrap(), json!(true));
        assert!(coerce("maybe", Some(Converter::Bool)).is_err());
    }

    #[test]
    fn test_named_datetime() {
        assert_eq!(
            coerce("2021-03-04", Some(Converter::DateTime)).unwrap(),
            json!("2021-03-04T00:00:00Z")
        );
        assert_eq!(
            coerce("2021-03-04 05:06:07", Some(Converter::DateTime)).unwrap(),
            json!("2021-03-04T05:06:07Z")
        );
        assert_eq!(
            coerce("2021-03-04T05:06:07+02:00", Some(Converter::DateTime)).unwrap(),
            json!("2021-03-04T03:06:07Z")
        );
        assert_eq!(
            coerce_value(&json!(0), Some(Converter::DateTime)).unwrap(),
            json!("1970-01-01T00:00:00Z")
        );
        // Fractions before the epoch round toward the earlier second
        assert_eq!(
            coerce_value(&json!(-1.5), Some(Converter::DateTime)).unwrap(),
            json!("1969-12-31T23:59:58.500Z")
        );
        assert_eq!(
            coerce_value(&json!(1.25), Some(Converter::DateTime)).unwrap(),
            json!("1970-01-01T00:00:01.250Z")
        );
        assert!(coerce("yesterday", Some(Converter::DateTime)).is_err());
    }

    #[test]
    fn test_coerce_value_passthrough() {
        assert_eq!(coerce_value(&json!("3"), None).unwrap(), json!(3));
        assert_eq!(coerce_value(&json!(2.5), None).unwrap(), json!(2.5));
        assert_eq!(coerce_value(&json!(["x"]), None).unwrap(), json!(["x"]));
        assert_eq!(coerce_value(&json!(null), None).unwrap(), json!(null));
    }
}
