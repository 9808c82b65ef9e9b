// In-memory form implementation
//
// SimpleForm holds declared fields and their values in memory. It is what
// examples and tests hand to workflow steps; applications with their own
// form layer implement `Form` directly.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{Field, Form, Validation};

/// In-memory form
#[derive(Debug, Clone, Default)]
pub struct SimpleForm {
    fields: Vec<Field>,
    values: Map<String, Value>,
    hidden: Vec<String>,
    errors: BTreeMap<String, String>,
    submit_label: Option<String>,
    action: Option<String>,
}

impl SimpleForm {
    /// Create a form with the given fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// Add a field
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Preset a value, keyed by value key
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Set an explicit submit label
    pub fn with_submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = Some(label.into());
        self
    }

    /// Errors from the last validation, keyed by value key
    /// Names of hidden fields
    pub fn hidden_fields(&self) -> &[String] {
        &self.hidden
    }
}

/// Empty strings count as "not submitted", like an empty text input
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

impl Form for SimpleForm {
    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    fn values_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.values
    }

    fn validate(&mut self, submitted: &Map<String, Value>) -> Validation {
        self.errors.clear();
        let mut valid = Map::new();

        for field in &self.fields {
            let key = field.value_key();
            let submitted_value = submitted.get(&key);
            if let Some(value) = submitted_value {
                self.values.insert(key.clone(), value.clone());
            }
            let raw = submitted_value.filter(|v| !is_blank(v));

            let parsed = match (raw, &field.field_type) {
                (Some(raw), Some(field_type)) => field_type.parse(raw),
                (Some(raw), None) => Ok(raw.clone()),
                (None, field_type) => {
                    match field_type.as_ref().and_then(|t| t.missing()) {
                        Some(default) => Ok(default),
                        None if field.required => {
                            Err(format!("{} is required", field.display_label()))
                        }
                        None => continue,
                    }
                }
            };

            match parsed {
                Ok(value) => match &field.parent_field {
                    Some(parent) => {
                        let group = valid
                            .entry(parent.clone())
                            .or_insert_with(|| Value::Object(Map::new()));
                        if let Value::Object(group) = group {
                            group.insert(field.name.clone(), value);
                        }
                    }
                    None => {
                        valid.insert(field.name.clone(), value);
                    }
                },
                Err(message) => {
                    self.errors.insert(key, message);
                }
            }
        }

        if self.errors.is_empty() {
            Validation::Valid(valid)
        } else {
            Validation::Invalid(self.errors.clone())
        }
    }

    fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    fn hide(&mut self, names: &[&str]) {
        for name in names {
            if !self.is_hidden(name) {
                self.hidden.push(name.to_string());
            }
        }
    }

    fn is_hidden(&self, name: &str) -> bool {
        self.hidden.iter().any(|h| h == name)
    }

    fn submit_label(&self) -> Option<&str> {
        self.submit_label.as_deref()
    }

    fn set_submit_label(&mut self, label: String) {
        self.submit_label = Some(label);
    }

    fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    fn set_action(&mut self, action: String) {
        self.action = Some(action);
    }
}
