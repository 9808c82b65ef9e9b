//! Form abstraction
//!
//! The engine talks to forms only through the [`Form`] trait:
//! - reading declared [`Field`]s to pre-fill values from the context
//! - validating a submission into values (or errors readable from the form)
//! - setting render hints (hidden fields, submit label, action)
//!
//! [`SimpleForm`] is an in-memory implementation used by examples and tests.

mod simple;
mod types;

pub use simple::SimpleForm;
pub use types::{BasicType, FieldType};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Outcome of validating a submission
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Submission is valid; values keyed by field name, grouped fields
    /// nested under their `parent_field`
    Valid(Map<String, Value>),

    /// Submission is invalid; messages keyed by form value key
    Invalid(BTreeMap<String, String>),
}

/// A form rendered by a workflow step
pub trait Form: Send + Sync + fmt::Debug {
    /// Declared fields, in display order
    fn fields(&self) -> &[Field];

    /// Current values, keyed by [`Field::value_key`] (plus hidden protocol fields)
    fn values(&self) -> &Map<String, Value>;

    /// Mutable access to current values
    fn values_mut(&mut self) -> &mut Map<String, Value>;

    /// Validate submitted fields
    ///
    /// Implementations keep the submitted values on the form so an invalid
    /// submission can be redisplayed without retyping.
    fn validate(&mut self, submitted: &Map<String, Value>) -> Validation;

    /// Messages from the last failed validation, keyed by form value key
    fn errors(&self) -> &BTreeMap<String, String>;

    /// Mark fields as hidden: round-tripped but not displayed
    fn hide(&mut self, names: &[&str]);

    /// Whether a field is hidden
    fn is_hidden(&self, name: &str) -> bool;

    /// Explicit submit label, if any
    fn submit_label(&self) -> Option<&str>;

    /// Set the submit label
    fn set_submit_label(&mut self, label: String);

    /// Form action (submission target), if any
    fn action(&self) -> Option<&str>;

    /// Set the form action
    fn set_action(&mut self, action: String);
}

/// A declared form field
#[derive(Clone)]
pub struct Field {
    /// Field name
    pub name: String,

    /// Display label
    pub label: Option<String>,

    /// Group this field belongs to, if any
    pub parent_field: Option<String>,

    /// Value type, providing the `read` decode hook
    pub field_type: Option<Arc<dyn FieldType>>,

    /// Whether a value must be submitted
    pub required: bool,
}

impl Field {
    /// Create an untyped, optional field
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            parent_field: None,
            field_type: None,
            required: false,
        }
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Put the field in a group
    pub fn in_group(mut self, parent_field: impl Into<String>) -> Self {
        self.parent_field = Some(parent_field.into());
        self
    }

    /// Set the field type
    pub fn with_type(mut self, field_type: impl FieldType + 'static) -> Self {
        self.field_type = Some(Arc::new(field_type));
        self
    }

    /// Make the field required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Key of this field in the form's values
    ///
    /// Grouped fields use `"{parent_field}_{name}"`.
    pub fn value_key(&self) -> String {
        match &self.parent_field {
            Some(parent) => format!("{}_{}", parent, self.name),
            None => self.name.clone(),
        }
    }

    /// Decode a raw context value with the field type's `read` hook
    pub fn read(&self, raw: &Value) -> Value {
        match &self.field_type {
            Some(field_type) => field_type.read(raw),
            None => raw.clone(),
        }
    }

    /// Label for messages, falling back to the name
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("parent_field", &self.parent_field)
            .field("field_type", &self.field_type.as_ref().map(|t| t.name()))
            .field("required", &self.required)
            .finish()
    }
}
