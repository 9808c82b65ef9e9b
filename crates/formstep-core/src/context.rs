// Workflow context
//
// The context is the accumulating state of one workflow run. It is never
// stored on the server: every rendered step carries it back to the client
// (see `codec`), and the next submission returns it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Accumulated workflow state, an open JSON object
///
/// Steps contribute their values either at the top level or nested under
/// their `context_field`. Within a nested step object, grouped form fields
/// are nested one level further under their `parent_field`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Borrow the underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the context, returning the underlying JSON object
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Get a top-level value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a top-level value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the context has no keys
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow top-level merge: keys in `values` overwrite existing keys
    pub fn merge(&mut self, values: Map<String, Value>) {
        self.0.extend(values);
    }

    /// Merge a completed step's contribution
    ///
    /// Without a `context_field` this is a plain [`merge`](Self::merge).
    /// With one, `values` are shallow-merged into the existing object at
    /// `context[context_field]`, keeping sibling keys already there. A
    /// missing or non-object value at that key is replaced by a new object.
    pub fn merge_step(&mut self, context_field: Option<&str>, values: Map<String, Value>) {
        match context_field {
            Some(field) => {
                let mut nested = match self.0.get(field) {
                    Some(Value::Object(existing)) => existing.clone(),
                    _ => Map::new(),
                };
                nested.extend(values);
                self.0.insert(field.to_string(), Value::Object(nested));
            }
            None => self.merge(values),
        }
    }

    /// Look up a stored value for a form field
    ///
    /// - `context_field` and `parent_field`: `context[context_field][parent_field][name]`
    /// - `context_field` only: `context[context_field][name]`
    /// - otherwise: `context[name]`
    pub fn lookup(
        &self,
        context_field: Option<&str>,
        parent_field: Option<&str>,
        name: &str,
    ) -> Option<&Value> {
        let Some(field) = context_field else {
            return self.0.get(name);
        };
        let scope = self.0.get(field)?.as_object()?;
        match parent_field {
            Some(parent) => scope.get(parent)?.as_object()?.get(name),
            None => scope.get(name),
        }
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Context> for Value {
    fn from(context: Context) -> Self {
        Value::Object(context.into_map())
    }
}
