//! Wire and native representations of a single DynamoDB attribute.
//!
//! The stream encodes every attribute as a one-key map whose key is a type
//! tag (`{"N": "123"}`). `AttributeValue` is a closed sum over the nine tags
//! the stream can emit; an unknown tag fails deserialization instead of
//! passing through. `Value` is the decoded, host-native form that ends up in
//! the event detail.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    String(String),
    /// Numbers travel as strings to keep their full precision.
    #[serde(rename = "N")]
    Number(String),
    /// Binary payloads travel base64-encoded.
    #[serde(rename = "B")]
    Binary(String),
    #[serde(rename = "BOOL")]
    Boolean(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "M")]
    Map(HashMap<String, AttributeValue>),
    #[serde(rename = "L")]
    List(Vec<AttributeValue>),
    #[serde(rename = "SS")]
    StringSet(Vec<String>),
    #[serde(rename = "NS")]
    NumberSet(Vec<String>),
    #[serde(rename = "BS")]
    BinarySet(Vec<String>),
}

#[derive(Debug, thiserror::Error)]
pub enum AttributeError {
    #[error("unparseable number \"{0}\"")]
    InvalidNumber(String),
    #[error("unparseable base64 binary: {0}")]
    InvalidBinary(#[from] base64::DecodeError),
}

impl AttributeValue {
    /// Decodes the wire encoding into a native `Value`. Total over the nine
    /// tags; only the base64 and number payloads can fail.
    pub fn into_value(self) -> Result<Value, AttributeError> {
        Ok(match self {
            AttributeValue::String(s) => Value::String(s),
            AttributeValue::Number(n) => Value::Number(parse_number(&n)?),
            AttributeValue::Binary(b) => Value::Bytes(BASE64.decode(b.as_bytes())?),
            AttributeValue::Boolean(b) => Value::Bool(b),
            AttributeValue::Null(_) => Value::Null,
            AttributeValue::Map(attrs) => Value::Map(
                attrs
                    .into_iter()
                    .map(|(name, attr)| Ok((name, attr.into_value()?)))
                    .collect::<Result<_, AttributeError>>()?,
            ),
            AttributeValue::List(items) => Value::List(
                items
                    .into_iter()
                    .map(AttributeValue::into_value)
                    .collect::<Result<_, _>>()?,
            ),
            AttributeValue::StringSet(items) => Value::StringSet(items.into_iter().collect()),
            AttributeValue::NumberSet(items) => Value::NumberSet(
                items
                    .iter()
                    .map(|n| parse_number(n))
                    .collect::<Result<_, _>>()?,
            ),
            AttributeValue::BinarySet(items) => Value::BinarySet(
                items
                    .iter()
                    .map(|b| Ok(BASE64.decode(b.as_bytes())?))
                    .collect::<Result<_, AttributeError>>()?,
            ),
        })
    }
}

fn parse_number(raw: &str) -> Result<Decimal, AttributeError> {
    raw.parse::<Decimal>()
        .map_err(|_| AttributeError::InvalidNumber(raw.to_owned()))
}

/// A decoded attribute. Sets are deduplicated; they are unordered in
/// semantics but stored sorted so serialization is deterministic.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    String(String),
    Number(Decimal),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    StringSet(BTreeSet<String>),
    NumberSet(BTreeSet<Decimal>),
    BinarySet(BTreeSet<Vec<u8>>),
}

/// Serializes with the event-detail encoding rules: bytes become base64
/// text, numbers become JSON numbers (integer form when exactly integral),
/// sets become ascending-sorted lists.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s),
            Value::Number(n) => serialize_decimal(n, serializer),
            Value::Bytes(b) => serializer.serialize_str(&BASE64.encode(b)),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(entries) => serializer.collect_map(entries),
            Value::StringSet(items) => serializer.collect_seq(items),
            Value::NumberSet(items) => serializer.collect_seq(items.iter().map(JsonDecimal)),
            Value::BinarySet(items) => {
                serializer.collect_seq(items.iter().map(|b| BASE64.encode(b)))
            }
        }
    }
}

struct JsonDecimal<'a>(&'a Decimal);

impl Serialize for JsonDecimal<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_decimal(self.0, serializer)
    }
}

fn serialize_decimal<S>(n: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if n.is_integer() {
        if let Some(i) = n.to_i64() {
            return serializer.serialize_i64(i);
        }
        if let Some(u) = n.to_u64() {
            return serializer.serialize_u64(u);
        }
    }
    match n.to_f64() {
        Some(f) => serializer.serialize_f64(f),
        None => Err(serde::ser::Error::custom(format!(
            "number {n} is not representable"
        ))),
    }
}
