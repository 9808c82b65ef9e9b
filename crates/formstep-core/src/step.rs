// Workflow step definitions
//
// A step is either a form step or a builder step. Producers (the form or
// builder options, and the optional `only_when` predicate) are computed
// from the current context and may suspend; they are all stored as
// functions returning boxed futures so the engine treats sync and async
// producers the same way.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

use crate::builder::BuilderOptions;
use crate::context::Context;
use crate::form::Form;

/// Produces the form for a form step
pub type FormProducer =
    Arc<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<Box<dyn Form>>> + Send + Sync>;

/// Produces the options for a builder step
pub type BuilderProducer =
    Arc<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<BuilderOptions>> + Send + Sync>;

/// Decides whether a step is shown
pub type Predicate = Arc<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync>;

/// What a step renders
#[derive(Clone)]
pub enum StepKind {
    /// Collect values with a form
    Form(FormProducer),

    /// Configure a layout with the visual builder
    Builder(BuilderProducer),
}

impl StepKind {
    /// Kind name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Form(_) => "form",
            StepKind::Builder(_) => "builder",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single workflow step
#[derive(Clone)]
pub struct Step {
    pub(crate) name: String,
    pub(crate) kind: StepKind,
    pub(crate) only_when: Option<Predicate>,
    pub(crate) context_field: Option<String>,
}

impl Step {
    fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
            only_when: None,
            context_field: None,
        }
    }

    /// Create a form step from a synchronous producer
    pub fn form<F, Fm>(name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(&Context) -> Fm + Send + Sync + 'static,
        Fm: Form + 'static,
    {
        let producer: FormProducer = Arc::new(move |ctx: Context| {
            let form: Box<dyn Form> = Box::new(producer(&ctx));
            future::ready(anyhow::Ok(form)).boxed()
        });
        Self::new(name, StepKind::Form(producer))
    }

    /// Create a form step from an async, fallible producer
    pub fn form_async<F, Fut, Fm>(name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Fm>> + Send + 'static,
        Fm: Form + 'static,
    {
        let producer: FormProducer = Arc::new(move |ctx: Context| {
            producer(ctx)
                .map(|result| result.map(|form| Box::new(form) as Box<dyn Form>))
                .boxed()
        });
        Self::new(name, StepKind::Form(producer))
    }

    /// Create a builder step from a synchronous producer
    pub fn builder<F>(name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(&Context) -> BuilderOptions + Send + Sync + 'static,
    {
        let producer: BuilderProducer =
            Arc::new(move |ctx: Context| future::ready(anyhow::Ok(producer(&ctx))).boxed());
        Self::new(name, StepKind::Builder(producer))
    }

    /// Create a builder step from an async, fallible producer
    pub fn builder_async<F, Fut>(name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<BuilderOptions>> + Send + 'static,
    {
        let producer: BuilderProducer = Arc::new(move |ctx: Context| producer(ctx).boxed());
        Self::new(name, StepKind::Builder(producer))
    }

    /// Only show this step when the predicate holds for the current context
    pub fn only_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.only_when = Some(Arc::new(move |ctx: Context| {
            future::ready(anyhow::Ok(predicate(&ctx))).boxed()
        }));
        self
    }

    /// Only show this step when the async predicate resolves to true
    pub fn only_when_async<F, Fut>(mut self, predicate: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.only_when = Some(Arc::new(move |ctx: Context| predicate(ctx).boxed()));
        self
    }

    /// Nest this step's values under `context[field]`
    pub fn context_field(mut self, field: impl Into<String>) -> Self {
        self.context_field = Some(field.into());
        self
    }

    /// Step name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Step kind
    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// Key this step's values are nested under, if any
    pub fn nested_under(&self) -> Option<&str> {
        self.context_field.as_deref()
    }

    /// Whether the step has an `only_when` predicate
    pub fn is_conditional(&self) -> bool {
        self.only_when.is_some()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("kind", &self.kind.as_str())
            .field("conditional", &self.is_conditional())
            .field("context_field", &self.context_field)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Field, SimpleForm};

    #[tokio::test]
    async fn test_sync_form_producer() {
        let step = Step::form("basic", |_ctx| SimpleForm::new(vec![Field::new("name")]));

        let StepKind::Form(producer) = step.kind() else {
            panic!("Expected form step");
        };
        let form = producer(Context::new()).await.unwrap();
        assert_eq!(form.fields().len(), 1);
    }

    #[tokio::test]
    async fn test_async_builder_producer_error() {
        let step = Step::builder_async("layout", |_ctx| async {
            Err(anyhow::anyhow!("no table"))
        });

        let StepKind::Builder(producer) = step.kind() else {
            panic!("Expected builder step");
        };
        assert!(producer(Context::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_only_when_reads_context() {
        let step = Step::form("extra", |_ctx| SimpleForm::default())
            .only_when(|ctx| ctx.get("advanced").is_some());

        let predicate = step.only_when.clone().unwrap();
        assert!(!predicate(Context::new()).await.unwrap());

        let mut ctx = Context::new();
        ctx.insert("advanced", serde_json::json!(true));
        assert!(predicate(ctx).await.unwrap());
    }

    #[test]
    fn test_debug_and_accessors() {
        let step = Step::builder("layout", |_ctx| BuilderOptions::new("show"))
            .context_field("configuration");

        assert_eq!(step.name(), "layout");
        assert_eq!(step.kind().to_string(), "builder");
        assert_eq!(step.nested_under(), Some("configuration"));
        assert!(!step.is_conditional());
        assert!(format!("{:?}", step).contains("layout"));
    }
}
