use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A single scalar cell of an editable row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    /// Numeric reading of the value, using the same coercion a browser
    /// applies to form input: trimmed empty text is zero, anything that is
    /// not a plain decimal literal is not a number.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => coerce_number(s),
            FieldValue::Null => return None,
        };
        n.is_finite().then_some(n)
    }

    /// Loose equality between the original value and an edited draft.
    /// `"5"` equals `5`, `""` equals `0`, null only equals null.
    pub fn loosely_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Null, _) | (_, FieldValue::Null) => false,
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b,
            (FieldValue::Number(n), FieldValue::Text(s))
            | (FieldValue::Text(s), FieldValue::Number(n)) => coerce_number(s) == *n,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            // whole numbers go out as integers so integer columns accept them
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                Value::from(*n as i64)
            }
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Null => Value::Null,
        }
    }

    // Nested objects and arrays are not editable cells
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(FieldValue::Null),
            Value::Number(n) => n.as_f64().map(FieldValue::Number),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Null => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

fn coerce_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let literal = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !literal {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// A product or expense row as the inline-edit table sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditableRecord {
    pub id: i64,
    pub fields: BTreeMap<String, FieldValue>,
}

impl EditableRecord {
    pub fn new(id: i64) -> Self {
        Self { id, fields: BTreeMap::new() }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: &str, value: FieldValue) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn from_json(value: &Value) -> Result<Self, AppError> {
        let obj = value
            .as_object()
            .ok_or_else(|| AppError::validation("Record must be a JSON object"))?;
        let id = obj
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::validation("Record is missing an integer id"))?;

        let fields = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "id")
            .filter_map(|(k, v)| FieldValue::from_json(v).map(|fv| (k.clone(), fv)))
            .collect();

        Ok(Self { id, fields })
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("id".to_string(), Value::from(self.id));
        for (k, v) in &self.fields {
            obj.insert(k.clone(), v.to_json());
        }
        Value::Object(obj)
    }
}
