//! String-or-number scalar decoding.
//!
//! Receivers report `alt_baro` as a number while airborne and as the literal
//! string `"ground"` on the ground. [`FlexibleScalar`] accepts either and keeps
//! a canonical string form.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Canonical string form of a JSON string, integer, float or null token.
///
/// - strings are kept verbatim
/// - integers are rendered in base 10
/// - floats are rounded to zero decimal places, ties to even (`25000.7`
///   becomes `"25001"`, `25000.5` becomes `"25000"`)
/// - `null` becomes the empty string
///
/// Objects, arrays and booleans are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FlexibleScalar(String);

impl FlexibleScalar {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for FlexibleScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlexibleScalar {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

struct FlexibleScalarVisitor;

impl<'de> Visitor<'de> for FlexibleScalarVisitor {
    type Value = FlexibleScalar;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, a number or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(FlexibleScalar(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(FlexibleScalar(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(FlexibleScalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(FlexibleScalar(v.to_string()))
    }

    // Zero decimals, ties to even: 2.5 renders as "2".
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(FlexibleScalar(format!("{:.0}", v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(FlexibleScalar::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(FlexibleScalar::default())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(FlexibleScalarVisitor)
    }
}

impl<'de> Deserialize<'de> for FlexibleScalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FlexibleScalarVisitor)
    }
}

impl Serialize for FlexibleScalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
