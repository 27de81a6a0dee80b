// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// The DAP4 atomic base types. Enumerations are carried by their
/// underlying integer type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomicType {
    Char,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
    Url,
    Opaque,
}

impl AtomicType {
    pub fn is_integer(self) -> bool {
        use AtomicType::*;
        matches!(
            self,
            Int8 | UInt8 | Int16 | UInt16 | Int32 | UInt32 | Int64 | UInt64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, AtomicType::Float32 | AtomicType::Float64)
    }

    /// Width in bytes of one element, or None for variable-length types.
    pub fn size(self) -> Option<usize> {
        use AtomicType::*;
        match self {
            Char | Int8 | UInt8 => Some(1),
            Int16 | UInt16 => Some(2),
            Int32 | UInt32 | Float32 => Some(4),
            Int64 | UInt64 | Float64 => Some(8),
            String | Url | Opaque => None,
        }
    }
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use AtomicType::*;
        let name = match self {
            Char => "Char",
            Int8 => "Int8",
            UInt8 => "UInt8",
            Int16 => "Int16",
            UInt16 => "UInt16",
            Int32 => "Int32",
            UInt32 => "UInt32",
            Int64 => "Int64",
            UInt64 => "UInt64",
            Float32 => "Float32",
            Float64 => "Float64",
            String => "String",
            Url => "URL",
            Opaque => "Opaque",
        };
        write!(f, "{name}")
    }
}

/// One materialized atomic value. Floats are wrapped so compiled arrays
/// can be compared and hashed structurally.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Char(u8),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    String(String),
    Url(String),
    Opaque(Vec<u8>),
}

impl Value {
    pub fn atomic_type(&self) -> AtomicType {
        match self {
            Value::Char(_) => AtomicType::Char,
            Value::Int8(_) => AtomicType::Int8,
            Value::UInt8(_) => AtomicType::UInt8,
            Value::Int16(_) => AtomicType::Int16,
            Value::UInt16(_) => AtomicType::UInt16,
            Value::Int32(_) => AtomicType::Int32,
            Value::UInt32(_) => AtomicType::UInt32,
            Value::Int64(_) => AtomicType::Int64,
            Value::UInt64(_) => AtomicType::UInt64,
            Value::Float32(_) => AtomicType::Float32,
            Value::Float64(_) => AtomicType::Float64,
            Value::String(_) => AtomicType::String,
            Value::Url(_) => AtomicType::Url,
            Value::Opaque(_) => AtomicType::Opaque,
        }
    }

    /// Integer view of the value; None for floats, text and opaque data,
    /// and for a UInt64 too large for i64.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Char(v) | Value::UInt8(v) => Some(v as i64),
            Value::Int8(v) => Some(v as i64),
            Value::Int16(v) => Some(v as i64),
            Value::UInt16(v) => Some(v as i64),
            Value::Int32(v) => Some(v as i64),
            Value::UInt32(v) => Some(v as i64),
            Value::Int64(v) => Some(v),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float32(v) => Some(v.into_inner() as f64),
            Value::Float64(v) => Some(v.into_inner()),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Url(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Char(c) => write!(f, "'{}'", *c as char),
            Value::Int8(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(s) | Value::Url(s) => write!(f, "{s:?}"),
            Value::Opaque(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

macro_rules! value_from(
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v.into())
            }
        }
    }
);

value_from!(i8, Int8);
value_from!(u8, UInt8);
value_from!(i16, Int16);
value_from!(u16, UInt16);
value_from!(i32, Int32);
value_from!(u32, UInt32);
value_from!(i64, Int64);
value_from!(u64, UInt64);
value_from!(f32, Float32);
value_from!(f64, Float64);
value_from!(String, String);
value_from!(&str, String);

#[test]
fn test_value_types() {
    assert_eq!(AtomicType::Int32, Value::from(3i32).atomic_type());
    assert_eq!(AtomicType::Float64, Value::from(0.5f64).atomic_type());
    assert_eq!(AtomicType::String, Value::from("a").atomic_type());
    assert_eq!(AtomicType::UInt8, Value::from(7u8).atomic_type());
    assert_eq!(AtomicType::Char, Value::Char(b'x').atomic_type());
}

#[test]
fn test_value_conversions() {
    assert_eq!(Some(-4), Value::from(-4i16).as_i64());
    assert_eq!(None, Value::UInt64(u64::MAX).as_i64());
    assert_eq!(Some(2.5), Value::from(2.5f32).as_f64());
    assert_eq!(Some(3.0), Value::from(3u32).as_f64());
    assert_eq!(Some("http://x"), Value::Url("http://x".to_string()).as_str());
    assert_eq!(None, Value::from(1i32).as_str());
}

#[test]
fn test_value_serde() {
    let v: Value = serde_json::from_str(r#"{"int32": 12}"#).unwrap();
    assert_eq!(Value::Int32(12), v);
    let v: Value = serde_json::from_str(r#"{"float64": 1.25}"#).unwrap();
    assert_eq!(Value::from(1.25f64), v);
    let t: AtomicType = serde_json::from_str(r#""uint16""#).unwrap();
    assert_eq!(AtomicType::UInt16, t);
}
