// Translation of user-facing strings
//
// The engine translates the submit labels ("Save", "Next") and the title
// words ("step", "max"). A workflow has a default translator; callers pass
// a request-scoped one (e.g. from the user's locale) to `Workflow::run`.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::codec::DecodeError;

/// Translates a user-facing string
pub trait Translator: Send + Sync {
    /// Translate `key`, returning it unchanged when no translation exists
    fn translate(&self, key: &str) -> String;
}

impl<F> Translator for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn translate(&self, key: &str) -> String {
        self(key)
    }
}

/// Translator that returns every key unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Translator for Identity {
    fn translate(&self, key: &str) -> String {
        key.to_string()
    }
}

/// String table translator for one locale
///
/// Missing keys fall back to the key itself.
#[derive(Clone, Default)]
pub struct Catalog {
    locale: String,
    messages: HashMap<String, String>,
}

impl Catalog {
    /// Create an empty catalog for a locale
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            messages: HashMap::new(),
        }
    }

    /// Load a catalog from a flat JSON object of `"key": "translation"`
    ///
    /// Non-string values are ignored.
    pub fn from_json(locale: impl Into<String>, json: &str) -> Result<Self, DecodeError> {
        let Value::Object(entries) = serde_json::from_str::<Value>(json)? else {
            return Err(DecodeError::NotAnObject);
        };
        let messages = entries
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(text) => Some((key, text)),
                _ => None,
            })
            .collect();
        Ok(Self {
            locale: locale.into(),
            messages,
        })
    }

    /// Add a translation
    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(key.into(), text.into());
        self
    }

    /// Locale this catalog serves
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Number of translations
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str) -> String {
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("locale", &self.locale)
            .field("messages", &self.messages.len())
            .finish()
    }
}
