//! Lenient deserializers for numbers sent as strings.
//!
//! The upstream returns nearly every numeric field as a JSON string and
//! uses `""` for "no value". These helpers accept strings or JSON numbers
//! and map blank strings to zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use std::fmt;
use std::str::FromStr;

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal number or numeric string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Ok(Decimal::ZERO);
        }
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        Decimal::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Float(v), &self))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Decimal, E> {
        Ok(Decimal::ZERO)
    }
}

/// Decimal from a string or number; blank or null is zero.
pub fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    deserializer.deserialize_any(DecimalVisitor)
}

/// Signed integer from a string or number ("12", "12.000", -3).
pub fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = deserializer.deserialize_any(DecimalVisitor)?;
    value
        .trunc()
        .to_i64()
        .ok_or_else(|| de::Error::custom(format!("integer out of range: {value}")))
}

/// Unsigned integer from a string or number; negatives are rejected.
pub fn uint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = deserializer.deserialize_any(DecimalVisitor)?;
    value
        .trunc()
        .to_u64()
        .ok_or_else(|| de::Error::custom(format!("unsigned integer out of range: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "decimal")]
        price: Decimal,
        #[serde(deserialize_with = "int")]
        change: i64,
        #[serde(deserialize_with = "uint")]
        qty: u64,
    }

    #[test]
    fn test_string_numbers() {
        let row: Row =
            serde_json::from_str(r#"{"price":"187.2500","change":"-350","qty":"10"}"#).unwrap();
        assert_eq!(row.price, dec!(187.25));
        assert_eq!(row.change, -350);
        assert_eq!(row.qty, 10);
    }

    #[test]
    fn test_blank_and_native_numbers() {
        let row: Row = serde_json::from_str(r#"{"price":"","change":12,"qty":"3.000"}"#).unwrap();
        assert_eq!(row.price, Decimal::ZERO);
        assert_eq!(row.change, 12);
        assert_eq!(row.qty, 3);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(serde_json::from_str::<Row>(r#"{"price":"abc","change":"1","qty":"1"}"#).is_err());
        assert!(serde_json::from_str::<Row>(r#"{"price":"1","change":"1","qty":"-1"}"#).is_err());
    }
}
