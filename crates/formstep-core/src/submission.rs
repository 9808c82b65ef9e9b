// Submission parsing
//
// Turns the untyped request body into either a fresh start or a resumption
// of a named step. This is the only place protocol fields are validated.

use serde_json::{Map, Value};

use crate::codec;
use crate::context::Context;
use crate::error::{Result, WorkflowError};

/// Hidden field naming the step a form belongs to
pub const STEP_NAME_FIELD: &str = "stepName";

/// Hidden field carrying the encoded context
pub const CONTEXT_FIELD: &str = "contextEnc";

/// Builder field carrying the encoded column definitions
pub const COLUMNS_FIELD: &str = "columns";

/// Builder field carrying the encoded layout
pub const LAYOUT_FIELD: &str = "layout";

/// A parsed request body
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// No step indicator: start the workflow from the first step
    Fresh,

    /// Submission of a rendered step
    Resume {
        /// Name of the submitted step
        step_name: String,

        /// The `contextEnc` string exactly as submitted
        context_enc: String,

        /// Decoded context
        context: Context,

        /// Everything else in the body
        fields: Map<String, Value>,
    },
}

impl Submission {
    /// Parse a request body
    ///
    /// A body without `stepName` (absent, null or empty) starts fresh.
    /// Otherwise `stepName` must be a string and `contextEnc` must be a
    /// string holding a percent-encoded JSON object.
    pub fn parse(body: Option<Map<String, Value>>) -> Result<Self> {
        let Some(mut fields) = body else {
            return Ok(Submission::Fresh);
        };

        let step_name = match fields.remove(STEP_NAME_FIELD) {
            None | Some(Value::Null) => return Ok(Submission::Fresh),
            Some(Value::String(name)) if name.is_empty() => return Ok(Submission::Fresh),
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(WorkflowError::invalid_submission(format!(
                    "{STEP_NAME_FIELD} must be a string, got {other}"
                )))
            }
        };

        let context_enc = match fields.remove(CONTEXT_FIELD) {
            Some(Value::String(enc)) => enc,
            Some(_) => {
                return Err(WorkflowError::invalid_submission(format!(
                    "{CONTEXT_FIELD} must be a string"
                )))
            }
            None => {
                return Err(WorkflowError::invalid_submission(format!(
                    "{CONTEXT_FIELD} is missing"
                )))
            }
        };

        let context = codec::decode_context(&context_enc).map_err(WorkflowError::ContextDecode)?;

        Ok(Submission::Resume {
            step_name,
            context_enc,
            context,
            fields,
        })
    }
}
