//! Raw character records → [`NormalizedCharacter`].
//!
//! The mapping is total: every JSON value produces a record and nothing fails.
//! Per-field rules:
//!
//! | field      | source value                      | result                                  |
//! |------------|-----------------------------------|-----------------------------------------|
//! | `id`       | string / number / bool            | as string                               |
//! |            | anything else or absent           | `""`                                    |
//! | `name`     | same as `id`                      | same as `id`                            |
//! | `traits`   | array                             | every element as string, order kept     |
//! |            | anything else or absent           | `[]`                                    |
//! | `imageUrl` | non-empty string, non-zero number, `true` | as string, else omitted         |
//! | `faction`  | same as `imageUrl`                | same as `imageUrl`                      |
//! | `role`     | same as `imageUrl`                | same as `imageUrl`                      |
//! | `stats`    | object                            | numeric entries only, else omitted      |
//!
//! A non-object record yields the all-default shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCharacter {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub traits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<BTreeMap<String, f64>>,
}

pub fn normalize_character(raw: &Value) -> NormalizedCharacter {
    let Some(record) = raw.as_object() else {
        return NormalizedCharacter::default();
    };

    NormalizedCharacter {
        id: scalar_string(record.get("id")).unwrap_or_default(),
        name: scalar_string(record.get("name")).unwrap_or_default(),
        image_url: truthy_string(record.get("imageUrl")),
        traits: traits(record.get("traits")),
        faction: truthy_string(record.get("faction")),
        role: truthy_string(record.get("role")),
        stats: record.get("stats").and_then(Value::as_object).map(numeric_entries),
    }
}

pub fn normalize_all(raw: &[Value]) -> Vec<NormalizedCharacter> {
    raw.iter().map(normalize_character).collect()
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn truthy_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn traits(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(element_string).collect(),
        _ => Vec::new(),
    }
}

fn element_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(_) | Value::Bool(_) => value.to_string(),
        // compact JSON for nested shapes
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn numeric_entries(stats: &Map<String, Value>) -> BTreeMap<String, f64> {
    stats
        .iter()
        .filter_map(|(key, v)| v.as_f64().map(|n| (key.clone(), n)))
        .collect()
}
