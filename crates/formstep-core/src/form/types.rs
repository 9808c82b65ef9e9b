// Field types
//
// A field type decodes values in two directions: `read` turns a value stored
// in the workflow context into the field's native value (used when
// pre-filling), `parse` turns a submitted value into the value stored on
// success.

use std::fmt;

use serde_json::{Number, Value};

/// Value domain of a form field
pub trait FieldType: Send + Sync + fmt::Debug {
    /// Type name
    fn name(&self) -> &str;

    /// Decode a raw context value into this type's native value
    fn read(&self, raw: &Value) -> Value {
        raw.clone()
    }

    /// Parse a submitted value, returning a user-facing message on failure
    fn parse(&self, submitted: &Value) -> Result<Value, String> {
        Ok(submitted.clone())
    }

    /// Value to use when nothing was submitted (e.g. an unchecked checkbox)
    fn missing(&self) -> Option<Value> {
        None
    }
}

/// Built-in scalar field types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicType {
    String,
    Integer,
    Float,
    Bool,
    Json,
}

impl FieldType for BasicType {
    fn name(&self) -> &str {
        match self {
            BasicType::String => "String",
            BasicType::Integer => "Integer",
            BasicType::Float => "Float",
            BasicType::Bool => "Bool",
            BasicType::Json => "JSON",
        }
    }

    fn read(&self, raw: &Value) -> Value {
        match (self, raw) {
            (BasicType::String, Value::Number(n)) => Value::String(n.to_string()),
            (BasicType::String, Value::Bool(b)) => Value::String(b.to_string()),
            (BasicType::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => raw.clone(),
            },
            (BasicType::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(float)
                .unwrap_or_else(|| raw.clone()),
            (BasicType::Bool, Value::String(s)) => Value::Bool(truthy(s).unwrap_or(false)),
            (BasicType::Bool, Value::Number(n)) => Value::Bool(n.as_f64() != Some(0.0)),
            (BasicType::Json, Value::String(s)) => {
                serde_json::from_str(s).unwrap_or_else(|_| raw.clone())
            }
            _ => raw.clone(),
        }
    }

    fn parse(&self, submitted: &Value) -> Result<Value, String> {
        match (self, submitted) {
            (BasicType::String, Value::String(_)) => Ok(submitted.clone()),
            (BasicType::String, Value::Number(_) | Value::Bool(_)) => Ok(self.read(submitted)),
            (BasicType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Ok(submitted.clone())
            }
            (BasicType::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| "Not an integer".to_string()),
            (BasicType::Float, Value::Number(_)) => Ok(submitted.clone()),
            (BasicType::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(float)
                .ok_or_else(|| "Not a number".to_string()),
            (BasicType::Bool, Value::Bool(_)) => Ok(submitted.clone()),
            (BasicType::Bool, Value::String(s)) => truthy(s)
                .map(Value::Bool)
                .ok_or_else(|| "Not a boolean".to_string()),
            (BasicType::Json, Value::String(s)) => {
                serde_json::from_str(s).map_err(|e| format!("Invalid JSON: {e}"))
            }
            (BasicType::Json, _) => Ok(submitted.clone()),
            _ => Err(format!("Unexpected value for {}", self.name())),
        }
    }

    fn missing(&self) -> Option<Value> {
        match self {
            BasicType::Bool => Some(Value::Bool(false)),
            _ => None,
        }
    }
}

fn float(f: f64) -> Option<Value> {
    Number::from_f64(f).map(Value::Number)
}

fn truthy(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" | "" => Some(false),
        _ => None,
    }
}
