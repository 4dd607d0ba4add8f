#![forbid(unsafe_code)]

//! Conversions between `serde_json` values and records.
//!
//! JSON objects become records with one own enumerable property per key, in
//! document order. Going back, only own enumerable properties are written and
//! function-valued properties are skipped.

use std::fmt;

use serde_json::{Map, Number, Value as Json};

use crate::record::{Record, RecordId};
use crate::value::Value;

/// Errors from JSON conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonError {
    /// A record was requested from a JSON value that is not an object.
    NotAnObject(&'static str),
    /// JSON arrays have no record representation.
    UnsupportedArray,
    /// NaN and infinities cannot be written as JSON numbers.
    NonFiniteFloat,
    /// A bare function value cannot be written as JSON.
    FunctionValue,
    /// A record contains itself.
    Cycle,
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject(kind) => write!(f, "expected a JSON object, found {kind}"),
            Self::UnsupportedArray => f.write_str("JSON arrays are not supported"),
            Self::NonFiniteFloat => f.write_str("non-finite float has no JSON form"),
            Self::FunctionValue => f.write_str("function value has no JSON form"),
            Self::Cycle => f.write_str("record graph contains a cycle"),
        }
    }
}

impl std::error::Error for JsonError {}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl Value {
    /// Build a value from JSON. Integers that fit `i64` become
    /// [`Value::Int`], other numbers [`Value::Float`].
    pub fn from_json(json: &Json) -> Result<Self, JsonError> {
        Ok(match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().ok_or(JsonError::NonFiniteFloat)?),
            },
            Json::String(s) => Self::Str(s.clone()),
            Json::Array(_) => return Err(JsonError::UnsupportedArray),
            Json::Object(map) => Self::Record(record_from_map(map)?),
        })
    }

    /// Write this value as JSON.
    pub fn to_json(&self) -> Result<Json, JsonError> {
        value_to_json(self, &mut Vec::new())
    }
}

impl Record {
    /// Build a record from a JSON object.
    pub fn from_json(json: &Json) -> Result<Self, JsonError> {
        match json {
            Json::Object(map) => record_from_map(map),
            other => Err(JsonError::NotAnObject(json_kind(other))),
        }
    }

    /// Write the record's own enumerable properties as a JSON object.
    pub fn to_json(&self) -> Result<Json, JsonError> {
        record_to_json(self, &mut Vec::new())
    }
}

fn record_from_map(map: &Map<String, Json>) -> Result<Record, JsonError> {
    let record = Record::new();
    for (key, json) in map {
        record.define(key, Value::from_json(json)?);
    }
    Ok(record)
}

fn value_to_json(value: &Value, path: &mut Vec<RecordId>) -> Result<Json, JsonError> {
    match value {
        Value::Null => Ok(Json::Null),
        Value::Bool(b) => Ok(Json::Bool(*b)),
        Value::Int(n) => Ok(Json::from(*n)),
        Value::Float(x) => Number::from_f64(*x)
            .map(Json::Number)
            .ok_or(JsonError::NonFiniteFloat),
        Value::Str(s) => Ok(Json::String(s.clone())),
        Value::Record(r) => record_to_json(r, path),
        Value::Function(_) => Err(JsonError::FunctionValue),
    }
}

fn record_to_json(record: &Record, path: &mut Vec<RecordId>) -> Result<Json, JsonError> {
    let id = record.id();
    if path.contains(&id) {
        return Err(JsonError::Cycle);
    }
    path.push(id);
    let mut map = Map::new();
    for (name, value) in record.entries() {
        if value.is_function() {
            continue;
        }
        map.insert(name, value_to_json(&value, path)?);
    }
    path.pop();
    Ok(Json::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_becomes_record_in_document_order() {
        let record = Record::from_json(&json!({"Id": 1, "Name": "Brad", "Age": 12})).unwrap();
        assert_eq!(record.get("Name"), Some(Value::from("Brad")));
        assert_eq!(record.get("Id"), Some(Value::Int(1)));
        assert_eq!(record.keys(), vec!["Id", "Name", "Age"]);
    }

    #[test]
    fn nested_objects_become_records() {
        let record = Record::from_json(&json!({"address": {"city": "Oslo"}, "score": 1.5})).unwrap();
        let address = record.get("address").unwrap();
        assert_eq!(
            address.as_record().and_then(|a| a.get("city")),
            Some(Value::from("Oslo"))
        );
        assert_eq!(record.get("score"), Some(Value::Float(1.5)));
    }

    #[test]
    fn non_objects_are_rejected() {
        assert_eq!(Record::from_json(&json!(3)), Err(JsonError::NotAnObject("number")));
        assert_eq!(
            Record::from_json(&json!({"tags": ["a"]})),
            Err(JsonError::UnsupportedArray)
        );
    }

    #[test]
    fn to_json_skips_functions_and_hidden() {
        let record = Record::new()
            .with("Name", "Brad")
            .with_hidden("secret", 1)
            .with_method("greet", |_| Value::Null);
        assert_eq!(record.to_json().unwrap(), json!({"Name": "Brad"}));
        assert_eq!(
            Value::Function(crate::value::Method::new(|_| Value::Null)).to_json(),
            Err(JsonError::FunctionValue)
        );
    }

    #[test]
    fn to_json_reads_intercepted_values() {
        let registry = crate::Registry::new();
        let record = Record::from_json(&json!({"n": 1})).unwrap();
        registry.make_observable(&record, &[]);
        record.set("n", 2);
        assert_eq!(record.to_json().unwrap(), json!({"n": 2}));
    }

    #[test]
    fn cycles_and_nan_are_errors() {
        let record = Record::new();
        record.define("me", record.clone());
        assert_eq!(record.to_json(), Err(JsonError::Cycle));
        // Break the cycle so the record is freed.
        record.define("me", Value::Null);

        assert_eq!(Value::Float(f64::NAN).to_json(), Err(JsonError::NonFiniteFloat));
    }

    #[test]
    fn to_json_keeps_definition_order() {
        let record = Record::new().with("Id", 1).with("Name", "Brad").with("Age", 12);
        let text = record.to_json().unwrap().to_string();
        assert_eq!(text, r#"{"Id":1,"Name":"Brad","Age":12}"#);
    }

    #[test]
    fn shared_child_is_not_a_cycle() {
        let child = Record::new().with("v", 1);
        let parent = Record::new().with("a", child.clone()).with("b", child);
        assert_eq!(
            parent.to_json().unwrap(),
            json!({"a": {"v": 1}, "b": {"v": 1}})
        );
    }

    #[test]
    fn error_display() {
        assert_eq!(
            JsonError::NotAnObject("array").to_string(),
            "expected a JSON object, found array"
        );
    }
}
