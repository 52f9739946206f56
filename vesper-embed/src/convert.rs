// vesper-embed - Type conversion traits
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Conversion between Rust and Vesper values.
//!
//! [`IntoValue`] turns Rust data into a [`Value`]; [`FromValue`] reads it
//! back out, failing with a `TypeError` when the shapes do not match.
//!
//! | Rust type | Vesper type |
//! |-----------|-------------|
//! | `()` | `nil` |
//! | `bool` | `boolean` |
//! | `i64`, `i32`, `usize` | `long` |
//! | `f64` | `double` |
//! | `Decimal` | `decimal` |
//! | `String`, `&str` | `string` |
//! | `Keyword` | `keyword` |
//! | `Vec<T>` | `vector` (reads lists too) |
//! | `HashMap<K, V>` | `map` |
//! | `Option<T>` | `T` or `nil` |
//!
//! Implement the traits for your own types to pass them across:
//!
//! ```rust
//! use vesper_embed::{Error, FromValue, IntoValue, Result, Value};
//!
//! struct Point { x: i64, y: i64 }
//!
//! impl IntoValue for Point {
//!     fn into_value(self) -> Value {
//!         Value::map(vec![
//!             (Value::keyword("x"), Value::int(self.x)),
//!             (Value::keyword("y"), Value::int(self.y)),
//!         ])
//!     }
//! }
//!
//! impl FromValue for Point {
//!     fn from_value(value: &Value) -> Result<Self> {
//!         match value {
//!             Value::Map(map, _) => {
//!                 let field = |name: &str| {
//!                     map.get(&Value::keyword(name))
//!                         .ok_or_else(|| Error::eval(format!("point is missing :{}", name)))
//!                         .and_then(i64::from_value)
//!                 };
//!                 Ok(Point { x: field("x")?, y: field("y")? })
//!             }
//!             other => Err(Error::type_error("map", other.type_name())),
//!         }
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use vesper_core::{Error, Result};
use vesper_parser::{Decimal, Keyword, Value};

/// Convert a Rust value into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Convert a [`Value`] into a Rust value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

// ============================================================================
// IntoValue
// ============================================================================

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Nil
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::int(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::int(i64::from(self))
    }
}

impl IntoValue for usize {
    /// Saturates at `i64::MAX`.
    fn into_value(self) -> Value {
        Value::int(i64::try_from(self).unwrap_or(i64::MAX))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::float(self)
    }
}

impl IntoValue for Decimal {
    fn into_value(self) -> Value {
        Value::decimal(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl IntoValue for Keyword {
    fn into_value(self) -> Value {
        Value::Keyword(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::vector(self.into_iter().map(IntoValue::into_value))
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Nil, IntoValue::into_value)
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for HashMap<K, V> {
    fn into_value(self) -> Value {
        Value::map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value())),
        )
    }
}

// ============================================================================
// FromValue
// ============================================================================

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for () {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Nil => Ok(()),
            other => Err(Error::type_error("nil", other.type_name())),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::type_error("boolean", other.type_name())),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(n) => Ok(*n),
            other => Err(Error::type_error("long", other.type_name())),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        let n = i64::from_value(value)?;
        i32::try_from(n).map_err(|_| {
            Error::eval(format!(
                "long {} out of range for i32 ({}..={})",
                n,
                i32::MIN,
                i32::MAX
            ))
        })
    }
}

impl FromValue for usize {
    fn from_value(value: &Value) -> Result<Self> {
        let n = i64::from_value(value)?;
        usize::try_from(n).map_err(|_| Error::eval(format!("long {} out of range for usize", n)))
    }
}

impl FromValue for f64 {
    /// Accepts any number.
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as f64),
            Value::Decimal(d) => Ok(d.to_f64()),
            other => Err(Error::type_error("number", other.type_name())),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Decimal(d) => Ok(d.clone()),
            Value::Int(n) => Ok(Decimal::from_i64(*n)),
            other => Err(Error::type_error("decimal", other.type_name())),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            other => Err(Error::type_error("string", other.type_name())),
        }
    }
}

impl FromValue for Keyword {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Keyword(kw) => Ok(kw.clone()),
            other => Err(Error::type_error("keyword", other.type_name())),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Vector(items, _) | Value::List(items, _) => {
                items.iter().map(T::from_value).collect()
            }
            Value::Nil => Ok(Vec::new()),
            other => Err(Error::type_error("vector or list", other.type_name())),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<K: FromValue + Eq + Hash, V: FromValue> FromValue for HashMap<K, V> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Map(map, _) => map
                .iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(Error::type_error("map", other.type_name())),
        }
    }
}

// ============================================================================
// Convenience functions
// ============================================================================

#[must_use]
pub fn to_value<T: IntoValue>(value: T) -> Value {
    value.into_value()
}

pub fn from_value<T: FromValue>(value: &Value) -> Result<T> {
    T::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_round_trip() {
        assert_eq!(i64::from_value(&42i64.into_value()).unwrap(), 42);
        assert!(bool::from_value(&true.into_value()).unwrap());
        assert_eq!(String::from_value(&"hi".into_value()).unwrap(), "hi");
        assert_eq!(f64::from_value(&Value::int(2)).unwrap(), 2.0);
    }

    #[test]
    fn test_i32_range_checked() {
        assert!(i32::from_value(&Value::int(i64::from(i32::MAX) + 1)).is_err());
        assert_eq!(i32::from_value(&Value::int(-5)).unwrap(), -5);
    }

    #[test]
    fn test_usize_rejects_negative() {
        assert!(usize::from_value(&Value::int(-1)).is_err());
    }

    #[test]
    fn test_option_and_nil() {
        assert_eq!(Option::<i64>::from_value(&Value::Nil).unwrap(), None);
        assert_eq!(None::<i64>.into_value(), Value::Nil);
    }

    #[test]
    fn test_vec_from_list_and_nil() {
        let list = Value::list(vec![Value::int(1), Value::int(2)]);
        assert_eq!(Vec::<i64>::from_value(&list).unwrap(), vec![1, 2]);
        assert!(Vec::<i64>::from_value(&Value::Nil).unwrap().is_empty());
        assert!(Vec::<i64>::from_value(&Value::vector(vec![Value::string("x")])).is_err());
    }

    #[test]
    fn test_hash_map() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1i64);
        let value = map.clone().into_value();
        assert_eq!(HashMap::<String, i64>::from_value(&value).unwrap(), map);
    }

    #[test]
    fn test_type_error_names_types() {
        let err = i64::from_value(&Value::string("x")).unwrap_err();
        assert!(err.to_string().contains("expected long, got string"));
    }
}
