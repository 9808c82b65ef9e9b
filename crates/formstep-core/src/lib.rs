//! # Formstep
//!
//! A stateless engine for multi-step forms ("wizards").
//!
//! ## Features
//!
//! - **Client-carried state**: the accumulated context is embedded in every
//!   rendered step as a percent-encoded JSON string and returned with the
//!   next submission, so the server keeps no session
//! - **Conditional steps**: `only_when` predicates skip steps silently
//! - **Nested contributions**: a step can write under its own `context_field`
//!   without clobbering other steps' values
//! - **Resumable validation**: invalid submissions re-render the same step
//!   with the values the user entered
//! - **Form and builder steps**: collect values with a form, or hand off to
//!   the visual layout builder
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  body (stepName, contextEnc, fields)  ┌──────────────────┐
//! │   Browser   │ ────────────────────────────────────▶ │     Workflow     │
//! │             │ ◀──────────────────────────────────── │  run / advance   │
//! └─────────────┘  StepOutcome (form | builder | done)  └──────────────────┘
//!                                                         │ producers
//!                                                         ▼
//!                                                 Form / BuilderOptions / on_done
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use formstep_core::prelude::*;
//!
//! let workflow = Workflow::builder()
//!     .step(Step::form("Account", |_ctx| {
//!         SimpleForm::new(vec![Field::new("email").with_type(BasicType::String).required()])
//!     }))
//!     .step(
//!         Step::form("Company", |_ctx| SimpleForm::new(vec![Field::new("name")]))
//!             .only_when(|ctx| ctx.get("business").is_some())
//!             .context_field("company"),
//!     )
//!     .build()?;
//!
//! let outcome = workflow.run(None, None).await?;
//! ```

pub mod builder;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod form;
pub mod i18n;
pub mod outcome;
pub mod step;
pub mod submission;
pub mod workflow;

/// Prelude for common imports
pub mod prelude {
    pub use crate::builder::{BuilderOptions, BuilderRender};
    pub use crate::config::WorkflowConfig;
    pub use crate::context::Context;
    pub use crate::error::{Result, WorkflowError};
    pub use crate::form::{BasicType, Field, FieldType, Form, SimpleForm, Validation};
    pub use crate::i18n::{Catalog, Identity, Translator};
    pub use crate::outcome::{StepOutcome, StepProgress};
    pub use crate::step::{Step, StepKind};
    pub use crate::workflow::{Workflow, WorkflowBuilder};
}

// Re-export key types at crate root
pub use builder::{BuilderOptions, BuilderRender};
pub use codec::DecodeError;
pub use config::WorkflowConfig;
pub use context::Context;
pub use error::{Result, WorkflowError};
pub use form::{BasicType, Field, FieldType, Form, SimpleForm, Validation};
pub use i18n::{Catalog, Identity, Translator};
pub use outcome::{StepOutcome, StepProgress};
pub use step::{Step, StepKind};
pub use submission::{Submission, CONTEXT_FIELD, STEP_NAME_FIELD};
pub use workflow::{DoneHandler, Workflow, WorkflowBuilder};
