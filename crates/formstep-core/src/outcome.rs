// Results of driving a workflow
//
// Every call into the engine ends either with something to render for the
// current step or with the completion callback's result.

use serde::Serialize;

use crate::builder::BuilderRender;
use crate::context::Context;
use crate::form::Form;

/// Progress metadata attached to every render directive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepProgress {
    /// Context so far
    pub context: Context,

    /// Name of the step being rendered
    pub step_name: String,

    /// 1-based position of the step
    pub current_step: usize,

    /// Total number of declared steps
    pub max_steps: usize,

    /// Human-readable title, e.g. "Fields (step 1 / max 3)"
    pub title: String,
}

/// What the engine returns for one request
#[derive(Debug)]
pub enum StepOutcome<T> {
    /// Render a form step
    RenderForm {
        form: Box<dyn Form>,
        progress: StepProgress,
    },

    /// Render a builder step
    RenderBuilder {
        builder: BuilderRender,
        progress: StepProgress,
    },

    /// The workflow finished; the completion callback's result
    Done(T),
}

impl<T> StepOutcome<T> {
    /// Progress metadata, unless the workflow finished
    pub fn progress(&self) -> Option<&StepProgress> {
        match self {
            StepOutcome::RenderForm { progress, .. } | StepOutcome::RenderBuilder { progress, .. } => {
                Some(progress)
            }
            StepOutcome::Done(_) => None,
        }
    }

    /// The form to render, if this is a form step
    pub fn form(&self) -> Option<&dyn Form> {
        match self {
            StepOutcome::RenderForm { form, .. } => Some(&**form),
            _ => None,
        }
    }

    /// The builder directive, if this is a builder step
    pub fn builder(&self) -> Option<&BuilderRender> {
        match self {
            StepOutcome::RenderBuilder { builder, .. } => Some(builder),
            _ => None,
        }
    }

    /// Whether the workflow finished
    pub fn is_done(&self) -> bool {
        matches!(self, StepOutcome::Done(_))
    }

    /// The completion result, if the workflow finished
    pub fn into_done(self) -> Option<T> {
        match self {
            StepOutcome::Done(result) => Some(result),
            _ => None,
        }
    }
}
