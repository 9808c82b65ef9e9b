// Builder step types
//
// A builder step hands off to the visual layout editor instead of a form.
// The engine only reads `mode` from the producer's options; everything
// else is passed through to the editor untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::Context;

/// Options produced by a builder step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuilderOptions {
    /// Editor mode (e.g. "show", "edit", "page")
    pub mode: String,

    /// Remaining editor options, opaque to the engine
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuilderOptions {
    /// Create options for a mode
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            extra: Map::new(),
        }
    }

    /// Add an editor option
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Render directive for a builder step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderRender {
    /// Options from the step's producer
    pub options: BuilderOptions,

    /// Context so far
    pub context: Context,

    /// Current layout, taken from the context's top-level `layout` key
    pub layout: Option<Value>,

    /// Workflow action override
    pub action: Option<String>,

    /// Name of the step being rendered
    pub step_name: String,

    /// Editor mode, copied from the options
    pub mode: String,

    /// Asset version tag from the environment
    #[serde(rename = "version_tag")]
    pub version_tag: Option<String>,
}
