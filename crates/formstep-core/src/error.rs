// Error types for the workflow engine

use thiserror::Error;

use crate::codec::DecodeError;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Message shown to users when a submission cannot be resumed
pub const INVALID_FORM_MESSAGE: &str = "Invalid or expired form";

/// Errors that can occur while running a workflow
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Submitted `stepName` does not match any declared step
    #[error("Step not found: {0}")]
    StepNotFound(String),

    /// `contextEnc` could not be decoded
    #[error("Context decode error: {0}")]
    ContextDecode(#[source] DecodeError),

    /// A builder field (`columns`, `layout`) could not be decoded
    #[error("Failed to decode field '{field}': {source}")]
    FieldDecode {
        field: String,
        #[source]
        source: DecodeError,
    },

    /// Protocol fields of the submission are malformed
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// Two steps share a name
    #[error("Duplicate step name: {0}")]
    DuplicateStep(String),

    /// A step's predicate, form or builder producer failed
    #[error("Step '{step}' failed: {source}")]
    Producer {
        step: String,
        #[source]
        source: anyhow::Error,
    },

    /// The completion callback failed
    #[error("Completion failed: {0}")]
    Completion(#[source] anyhow::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Create a step not found error
    pub fn step_not_found(name: impl Into<String>) -> Self {
        WorkflowError::StepNotFound(name.into())
    }

    /// Create an invalid submission error
    pub fn invalid_submission(msg: impl Into<String>) -> Self {
        WorkflowError::InvalidSubmission(msg.into())
    }

    /// Wrap a producer failure for the given step
    pub fn producer(step: impl Into<String>, source: anyhow::Error) -> Self {
        WorkflowError::Producer {
            step: step.into(),
            source,
        }
    }

    /// Whether the error was caused by what the client sent back
    ///
    /// These should be answered with a generic "invalid or expired form"
    /// response rather than an internal error.
    pub fn is_invalid_submission(&self) -> bool {
        matches!(
            self,
            WorkflowError::StepNotFound(_)
                | WorkflowError::ContextDecode(_)
                | WorkflowError::FieldDecode { .. }
                | WorkflowError::InvalidSubmission(_)
        )
    }

    /// Get a user-facing message for this error
    ///
    /// Internal details (producer failures, serialization) are hidden.
    pub fn user_message(&self) -> &'static str {
        if self.is_invalid_submission() {
            INVALID_FORM_MESSAGE
        } else {
            "An error occurred. Please try again."
        }
    }
}
