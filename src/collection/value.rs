//! Typed property values.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::collection::schema::{DataKind, Property};
use crate::error::{HalberdError, Result};

/// A property value stored on an object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Text(String),
    Int(i64),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Uuid(Uuid),
    List(Vec<PropertyValue>),
    Object(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Convert a JSON value according to a property definition.
    pub fn from_json(property: &Property, value: &Value) -> Result<Self> {
        if property.array {
            let items = value.as_array().ok_or_else(|| type_error(property, value))?;
            return items
                .iter()
                .map(|item| scalar_from_json(property, item))
                .collect::<Result<Vec<_>>>()
                .map(PropertyValue::List);
        }
        scalar_from_json(property, value)
    }

    /// Untyped conversion used for nested objects.
    pub fn from_untyped_json(value: &Value) -> Self {
        match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Int(i),
                None => PropertyValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => PropertyValue::Text(s.clone()),
            Value::Array(items) => {
                PropertyValue::List(items.iter().map(PropertyValue::from_untyped_json).collect())
            }
            Value::Object(map) => PropertyValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), PropertyValue::from_untyped_json(v)))
                    .collect(),
            ),
        }
    }

    /// Text fragments this value contributes to keyword search.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            PropertyValue::Text(s) => vec![s.as_str()],
            PropertyValue::List(items) => items.iter().flat_map(PropertyValue::texts).collect(),
            _ => Vec::new(),
        }
    }

    /// Display form of the value.
    ///
    /// Scalars render plainly; lists and nested objects render as JSON with
    /// sorted keys and two-space indentation, so the same value always yields
    /// the same text.
    pub fn canonical_text(&self) -> String {
        match self {
            PropertyValue::Null => "null".to_string(),
            PropertyValue::Text(s) => s.clone(),
            PropertyValue::Int(i) => i.to_string(),
            PropertyValue::Number(n) => n.to_string(),
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            PropertyValue::Uuid(u) => u.hyphenated().to_string(),
            PropertyValue::List(_) | PropertyValue::Object(_) => serde_json::to_string_pretty(self)
                .unwrap_or_else(|err| format!("<unrenderable: {err}>")),
        }
    }
}

fn type_error(property: &Property, value: &Value) -> HalberdError {
    HalberdError::schema(format!(
        "property '{}' expects {}, got {value}",
        property.name,
        property.type_name()
    ))
}

fn scalar_from_json(property: &Property, value: &Value) -> Result<PropertyValue> {
    let converted = match (&property.data_kind, value) {
        (_, Value::Null) => Some(PropertyValue::Null),
        (DataKind::Text, Value::String(s)) => Some(PropertyValue::Text(s.clone())),
        (DataKind::Int, Value::Number(n)) => n.as_i64().map(PropertyValue::Int),
        (DataKind::Number, Value::Number(n)) => n.as_f64().map(PropertyValue::Number),
        (DataKind::Boolean, Value::Bool(b)) => Some(PropertyValue::Boolean(*b)),
        (DataKind::Date, Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| PropertyValue::Date(d.with_timezone(&Utc))),
        (DataKind::Uuid | DataKind::Reference { .. }, Value::String(s)) => {
            Uuid::parse_str(s).ok().map(PropertyValue::Uuid)
        }
        (DataKind::Object, Value::Object(_)) => Some(PropertyValue::from_untyped_json(value)),
        _ => None,
    };
    converted.ok_or_else(|| type_error(property, value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_typed_conversion() {
        let title = Property::text("title");
        assert_eq!(
            PropertyValue::from_json(&title, &json!("Hello")).unwrap(),
            PropertyValue::Text("Hello".to_string())
        );
        assert!(PropertyValue::from_json(&title, &json!(3)).is_err());

        let views = Property::new("views", DataKind::Int);
        assert_eq!(
            PropertyValue::from_json(&views, &json!(42)).unwrap(),
            PropertyValue::Int(42)
        );
        assert!(PropertyValue::from_json(&views, &json!(4.5)).is_err());

        let date = Property::new("published", DataKind::Date);
        let value = PropertyValue::from_json(&date, &json!("2024-03-01T10:00:00Z")).unwrap();
        assert_eq!(value.canonical_text(), "2024-03-01T10:00:00Z");
        assert!(PropertyValue::from_json(&date, &json!("yesterday")).is_err());
    }

    #[test]
    fn test_array_conversion() {
        let tags = Property::text("tags").with_array(true);
        let value = PropertyValue::from_json(&tags, &json!(["a", "b"])).unwrap();
        assert_eq!(value.texts(), vec!["a", "b"]);
        assert!(PropertyValue::from_json(&tags, &json!("a")).is_err());
    }

    #[test]
    fn test_nested_rendering_is_canonical() {
        let meta = Property::new("meta", DataKind::Object);
        let a = PropertyValue::from_json(&meta, &json!({"z": 1, "a": {"y": true, "b": [1, 2]}})).unwrap();
        let b = PropertyValue::from_json(&meta, &json!({"a": {"b": [1, 2], "y": true}, "z": 1})).unwrap();

        let expected = "{\n  \"a\": {\n    \"b\": [\n      1,\n      2\n    ],\n    \"y\": true\n  },\n  \"z\": 1\n}";
        assert_eq!(a.canonical_text(), expected);
        assert_eq!(a.canonical_text(), b.canonical_text());
    }

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(PropertyValue::Number(1.5).canonical_text(), "1.5");
        assert_eq!(PropertyValue::Boolean(false).canonical_text(), "false");
        assert_eq!(PropertyValue::Null.canonical_text(), "null");
        let id = Uuid::nil();
        assert_eq!(
            PropertyValue::Uuid(id).canonical_text(),
            "00000000-0000-0000-0000-000000000000"
        );
    }
}
