//! Workflow engine
//!
//! The [`Workflow`] drives a user through its steps across stateless
//! request/response round-trips:
//! - a request without a step indicator starts at the first step
//! - a submission of step N is validated and merged into the context,
//!   then the engine advances to the next step whose `only_when` holds
//! - an invalid submission re-renders step N with the entered values
//! - advancing past the last step invokes the completion callback
//!
//! The engine keeps no state between calls. The context travels with every
//! rendered form as the hidden `contextEnc` value and comes back with the
//! next submission.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::builder::BuilderRender;
use crate::codec;
use crate::config::WorkflowConfig;
use crate::context::Context;
use crate::error::{Result, WorkflowError};
use crate::form::{Form, Validation};
use crate::i18n::{Identity, Translator};
use crate::outcome::{StepOutcome, StepProgress};
use crate::step::{BuilderProducer, FormProducer, Step, StepKind};
use crate::submission::{Submission, COLUMNS_FIELD, CONTEXT_FIELD, LAYOUT_FIELD, STEP_NAME_FIELD};

/// Completion callback, invoked with the final context
pub type DoneHandler<T> =
    Arc<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// A multi-step workflow
///
/// `T` is what the completion callback returns; by default the final
/// context itself.
///
/// # Example
///
/// ```ignore
/// let workflow = Workflow::builder()
///     .step(Step::form("Table", |_ctx| table_form()))
///     .step(Step::builder("Layout", |_ctx| BuilderOptions::new("edit")))
///     .on_done(|ctx| async move { save_view(ctx).await })
///     .build()?;
///
/// match workflow.run(body, Some(&catalog)).await? {
///     StepOutcome::RenderForm { form, progress } => render_form(form, progress),
///     StepOutcome::RenderBuilder { builder, progress } => render_builder(builder, progress),
///     StepOutcome::Done(view) => redirect_to(view),
/// }
/// ```
pub struct Workflow<T = Context> {
    steps: Vec<Step>,
    on_done: DoneHandler<T>,
    action: Option<String>,
    translator: Arc<dyn Translator>,
    config: WorkflowConfig,
}

impl Workflow<Context> {
    /// Start building a workflow
    pub fn builder() -> WorkflowBuilder<Context> {
        WorkflowBuilder::new()
    }
}

impl<T> Workflow<T> {
    /// Declared steps, in order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of declared steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the workflow has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Form action override
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Configuration
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Index of the step with the given name
    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.name == name)
    }

    /// Handle one request
    ///
    /// `body` is the submitted form body (absent for a fresh start).
    /// `translator` is the request-scoped translator; the workflow's default
    /// is used when none is given.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        body: Option<Map<String, Value>>,
        translator: Option<&dyn Translator>,
    ) -> Result<StepOutcome<T>> {
        let tr = self.resolve(translator);

        let submission = Submission::parse(body)
            .inspect_err(|e| warn!(error = %e, "rejected workflow submission"))?;

        let (step_name, context_enc, mut context, fields) = match submission {
            Submission::Fresh => {
                debug!("starting workflow");
                return self.advance_with(Context::new(), 0, tr).await;
            }
            Submission::Resume {
                step_name,
                context_enc,
                context,
                fields,
            } => (step_name, context_enc, context, fields),
        };

        let Some(index) = self.step_index(&step_name) else {
            warn!(step = %step_name, "submitted step not found");
            return Err(WorkflowError::step_not_found(step_name));
        };
        let step = &self.steps[index];
        debug!(step = %step.name, index, kind = %step.kind, "resuming workflow");

        let values = match &step.kind {
            StepKind::Form(producer) => {
                let mut form = produce_form(producer, step, &context).await?;
                match form.validate(&fields) {
                    Validation::Valid(values) => values,
                    Validation::Invalid(errors) => {
                        debug!(
                            step = %step.name,
                            errors = errors.len(),
                            "validation failed, redisplaying step"
                        );
                        self.decorate(&mut *form, step, index, context_enc, tr);
                        let progress = self.progress(context, step, index, tr);
                        return Ok(StepOutcome::RenderForm { form, progress });
                    }
                }
            }
            StepKind::Builder(_) => decode_builder_fields(&fields)?,
        };

        context.merge_step(step.context_field.as_deref(), values);
        self.advance_with(context, index + 1, tr).await
    }

    /// Start the workflow with a seeded context
    pub async fn start(
        &self,
        context: Context,
        translator: Option<&dyn Translator>,
    ) -> Result<StepOutcome<T>> {
        self.advance(context, 0, translator).await
    }

    /// Advance to the first step at or after `index` that should be shown
    ///
    /// Steps whose `only_when` evaluates to false are skipped. Past the last
    /// step the completion callback is invoked with `context`.
    pub async fn advance(
        &self,
        context: Context,
        index: usize,
        translator: Option<&dyn Translator>,
    ) -> Result<StepOutcome<T>> {
        self.advance_with(context, index, self.resolve(translator)).await
    }

    async fn advance_with(
        &self,
        context: Context,
        mut index: usize,
        tr: &dyn Translator,
    ) -> Result<StepOutcome<T>> {
        while let Some(step) = self.steps.get(index) {
            if let Some(only_when) = &step.only_when {
                let show = only_when(context.clone())
                    .await
                    .map_err(|e| WorkflowError::producer(&step.name, e))?;
                if !show {
                    debug!(step = %step.name, index, "skipping step");
                    index += 1;
                    continue;
                }
            }

            return match &step.kind {
                StepKind::Form(producer) => {
                    self.render_form(producer, step, index, context, tr).await
                }
                StepKind::Builder(producer) => {
                    self.render_builder(producer, step, index, context, tr).await
                }
            };
        }

        info!(steps = self.len(), "workflow completed");
        let result = (self.on_done)(context)
            .await
            .map_err(WorkflowError::Completion)?;
        Ok(StepOutcome::Done(result))
    }

    async fn render_form(
        &self,
        producer: &FormProducer,
        step: &Step,
        index: usize,
        context: Context,
        tr: &dyn Translator,
    ) -> Result<StepOutcome<T>> {
        let mut form = produce_form(producer, step, &context).await?;

        prefill(&mut *form, &context, step.context_field.as_deref());
        let context_enc = codec::encode_context(&context)?;
        self.decorate(&mut *form, step, index, context_enc, tr);

        debug!(step = %step.name, current_step = index + 1, "rendering form step");
        let progress = self.progress(context, step, index, tr);
        Ok(StepOutcome::RenderForm { form, progress })
    }

    async fn render_builder(
        &self,
        producer: &BuilderProducer,
        step: &Step,
        index: usize,
        context: Context,
        tr: &dyn Translator,
    ) -> Result<StepOutcome<T>> {
        let options = producer(context.clone())
            .await
            .map_err(|e| WorkflowError::producer(&step.name, e))?;

        debug!(
            step = %step.name,
            current_step = index + 1,
            mode = %options.mode,
            "rendering builder step"
        );
        let builder = BuilderRender {
            mode: options.mode.clone(),
            options,
            layout: context.get(LAYOUT_FIELD).cloned(),
            context: context.clone(),
            action: self.action().map(str::to_string),
            step_name: step.name.clone(),
            version_tag: self.config().version_tag.clone(),
        };
        let progress = self.progress(context, step, index, tr);
        Ok(StepOutcome::RenderBuilder { builder, progress })
    }

    /// Title for a step, e.g. `"Fields (step 1 / max 3)"` or `"Layout (step 3 / 3)"`
    ///
    /// "max" is only shown while there are steps after this one.
    pub fn title(&self, step: &Step, index: usize, translator: &dyn Translator) -> String {
        let total = self.len();
        let max = if total > index + 1 {
            format!("{} ", translator.translate("max"))
        } else {
            String::new()
        };
        format!(
            "{} ({} {} / {}{})",
            step.name,
            translator.translate("step"),
            index + 1,
            max,
            total
        )
    }

    /// Submit label for the step at `index`: "Save" on the last step, "Next »" otherwise
    pub fn submit_label(&self, index: usize, translator: &dyn Translator) -> String {
        if index + 1 >= self.len() {
            translator.translate("Save")
        } else {
            format!("{} »", translator.translate("Next"))
        }
    }

    fn resolve<'a>(&'a self, translator: Option<&'a dyn Translator>) -> &'a dyn Translator {
        translator.unwrap_or(self.translator.as_ref())
    }

    /// Set the hidden protocol fields and render hints on a step's form
    fn decorate(
        &self,
        form: &mut dyn Form,
        step: &Step,
        index: usize,
        context_enc: String,
        tr: &dyn Translator,
    ) {
        form.hide(&[STEP_NAME_FIELD, CONTEXT_FIELD]);
        let values = form.values_mut();
        values.insert(STEP_NAME_FIELD.to_string(), Value::String(step.name.clone()));
        values.insert(CONTEXT_FIELD.to_string(), Value::String(context_enc));

        if let Some(action) = self.action() {
            form.set_action(action.to_string());
        }
        if form.submit_label().is_none() {
            form.set_submit_label(self.submit_label(index, tr));
        }
    }

    fn progress(
        &self,
        context: Context,
        step: &Step,
        index: usize,
        tr: &dyn Translator,
    ) -> StepProgress {
        StepProgress {
            context,
            step_name: step.name.clone(),
            current_step: index + 1,
            max_steps: self.len(),
            title: self.title(step, index, tr),
        }
    }
}

impl<T> fmt::Debug for Workflow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("steps", &self.steps)
            .field("action", &self.action)
            .field("config", &self.config)
            .finish()
    }
}

async fn produce_form(
    producer: &FormProducer,
    step: &Step,
    context: &Context,
) -> Result<Box<dyn Form>> {
    producer(context.clone())
        .await
        .map_err(|e| WorkflowError::producer(&step.name, e))
}

/// Pre-fill form fields that have no explicit value from the context
fn prefill(form: &mut dyn Form, context: &Context, context_field: Option<&str>) {
    let updates: Vec<(String, Value)> = form
        .fields()
        .iter()
        .filter_map(|field| {
            let key = field.value_key();
            if form.values().contains_key(&key) {
                return None;
            }
            let raw = context.lookup(context_field, field.parent_field.as_deref(), &field.name)?;
            Some((key, field.read(raw)))
        })
        .collect();

    form.values_mut().extend(updates);
}

/// Decode the `columns` and `layout` fields submitted by the builder
fn decode_builder_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>> {
    let mut values = Map::new();
    for name in [COLUMNS_FIELD, LAYOUT_FIELD] {
        let value = codec::decode_field(fields.get(name)).map_err(|source| {
            warn!(field = name, error = %source, "invalid builder submission");
            WorkflowError::FieldDecode {
                field: name.to_string(),
                source,
            }
        })?;
        values.insert(name.to_string(), value);
    }
    Ok(values)
}

/// Builder for [`Workflow`]
pub struct WorkflowBuilder<T = Context> {
    steps: Vec<Step>,
    on_done: DoneHandler<T>,
    action: Option<String>,
    translator: Arc<dyn Translator>,
    config: WorkflowConfig,
}

impl Default for WorkflowBuilder<Context> {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowBuilder<Context> {
    /// Create a builder whose completion callback returns the final context
    pub fn new() -> Self {
        let on_done: DoneHandler<Context> =
            Arc::new(|ctx: Context| future::ready(anyhow::Ok(ctx)).boxed());
        Self {
            steps: Vec::new(),
            on_done,
            action: None,
            translator: Arc::new(Identity),
            config: WorkflowConfig::default(),
        }
    }
}

impl<T> WorkflowBuilder<T> {
    /// Append a step
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Override the action of every rendered form
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Set the default translator
    pub fn translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the completion callback
    pub fn on_done<U, F, Fut>(self, on_done: F) -> WorkflowBuilder<U>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<U>> + Send + 'static,
        U: Send + 'static,
    {
        WorkflowBuilder {
            steps: self.steps,
            on_done: Arc::new(move |ctx: Context| on_done(ctx).boxed()),
            action: self.action,
            translator: self.translator,
            config: self.config,
        }
    }

    /// Build the workflow
    ///
    /// Fails if two steps share a name, since submissions find their step by name.
    pub fn build(self) -> Result<Workflow<T>> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) {
                return Err(WorkflowError::DuplicateStep(step.name.clone()));
            }
        }

        Ok(Workflow {
            steps: self.steps,
            on_done: self.on_done,
            action: self.action,
            translator: self.translator,
            config: self.config,
        })
    }
}
