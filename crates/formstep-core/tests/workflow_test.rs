// Integration tests for the workflow engine
//
// These tests drive workflows through `run` the way an HTTP handler would:
// a fresh request, then submissions carrying the hidden `stepName` and
// `contextEnc` values from the previously rendered form.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use formstep_core::codec;
use formstep_core::prelude::*;
use formstep_core::{CONTEXT_FIELD, STEP_NAME_FIELD};
use serde_json::{json, Map, Value};

// =============================================================================
// Helpers
// =============================================================================

fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn context(value: Value) -> Context {
    Context::from(obj(value))
}

fn encoded(value: Value) -> String {
    codec::encode_value(&value).unwrap()
}

/// Build a submission body for a step
fn submission(step: &str, context_enc: &str, fields: Value) -> Option<Map<String, Value>> {
    let mut body = obj(fields);
    body.insert(STEP_NAME_FIELD.to_string(), json!(step));
    body.insert(CONTEXT_FIELD.to_string(), json!(context_enc));
    Some(body)
}

/// The `contextEnc` value a rendered form would post back
fn context_enc_of<T>(outcome: &StepOutcome<T>) -> String {
    outcome
        .form()
        .and_then(|form| form.values().get(CONTEXT_FIELD))
        .and_then(Value::as_str)
        .expect("rendered form carries contextEnc")
        .to_string()
}

fn form_a() -> SimpleForm {
    SimpleForm::new(vec![Field::new("a").with_type(BasicType::Integer).required()])
}

fn form_b() -> SimpleForm {
    SimpleForm::new(vec![Field::new("b").with_type(BasicType::String).required()])
}

fn two_step_workflow() -> Workflow {
    Workflow::builder()
        .step(Step::form("one", |_ctx| form_a()))
        .step(Step::form("two", |_ctx| form_b()))
        .build()
        .unwrap()
}

// =============================================================================
// End-to-end
// =============================================================================

#[test_log::test(tokio::test)]
async fn test_two_step_workflow_end_to_end() {
    let workflow = two_step_workflow();

    // Fresh start renders step one
    let outcome = workflow.run(None, None).await.unwrap();
    let progress = outcome.progress().unwrap();
    assert_eq!(progress.step_name, "one");
    assert_eq!(progress.current_step, 1);
    assert_eq!(progress.max_steps, 2);
    assert_eq!(progress.title, "one (step 1 / max 2)");

    let form = outcome.form().unwrap();
    assert_eq!(form.values().get(STEP_NAME_FIELD), Some(&json!("one")));
    assert!(form.is_hidden(STEP_NAME_FIELD));
    assert!(form.is_hidden(CONTEXT_FIELD));
    assert_eq!(form.submit_label(), Some("Next »"));

    let enc = context_enc_of(&outcome);
    assert_eq!(enc, encoded(json!({})));

    // Valid values for step one advance to step two
    let outcome = workflow
        .run(submission("one", &enc, json!({"a": "5"})), None)
        .await
        .unwrap();
    let progress = outcome.progress().unwrap();
    assert_eq!(progress.step_name, "two");
    assert_eq!(progress.current_step, 2);
    assert_eq!(progress.max_steps, 2);
    assert_eq!(progress.title, "two (step 2 / 2)");
    assert_eq!(Value::from(progress.context.clone()), json!({"a": 5}));
    assert_eq!(outcome.form().unwrap().submit_label(), Some("Save"));

    // Valid values for step two complete the workflow
    let enc = context_enc_of(&outcome);
    let outcome = workflow
        .run(submission("two", &enc, json!({"b": "hello"})), None)
        .await
        .unwrap();

    assert!(outcome.is_done());
    let result = outcome.into_done().unwrap();
    assert_eq!(Value::from(result), json!({"a": 5, "b": "hello"}));
}

#[tokio::test]
async fn test_on_done_result_is_returned() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let workflow = Workflow::builder()
        .step(Step::form("one", |_ctx| form_a()))
        .on_done(move |ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(format!("saved {} keys", ctx.len()))
            }
        })
        .build()
        .unwrap();

    let outcome = workflow
        .run(submission("one", &encoded(json!({"x": 1})), json!({"a": 2})), None)
        .await
        .unwrap();

    assert_eq!(outcome.into_done(), Some("saved 2 keys".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Navigation
// =============================================================================

#[tokio::test]
async fn test_skip_chaining_renders_third_step() {
    let workflow = Workflow::builder()
        .step(Step::form("S1", |_ctx| form_a()).only_when(|_ctx| false))
        .step(Step::form("S2", |_ctx| form_a()).only_when(|_ctx| false))
        .step(Step::form("S3", |_ctx| form_b()))
        .build()
        .unwrap();

    let outcome = workflow.advance(Context::new(), 0, None).await.unwrap();
    let progress = outcome.progress().unwrap();

    assert_eq!(progress.step_name, "S3");
    assert_eq!(progress.current_step, 3);
    assert_eq!(progress.title, "S3 (step 3 / 3)");
}

#[tokio::test]
async fn test_every_predicate_combination_terminates() {
    const N: usize = 4;

    for mask in 0u32..(1 << N) {
        let done = Arc::new(AtomicUsize::new(0));
        let counter = done.clone();
        let steps = (0..N).map(|i| {
            let shown = mask & (1u32 << i) != 0;
            Step::form(format!("s{i}"), |_ctx| SimpleForm::default()).only_when(move |_ctx| shown)
        });
        let workflow = Workflow::builder()
            .steps(steps)
            .on_done(move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { anyhow::Ok(ctx) }
            })
            .build()
            .unwrap();

        let outcome = workflow.advance(Context::new(), 0, None).await.unwrap();

        match (0..N).find(|&i| mask & (1u32 << i) != 0) {
            Some(first) => {
                assert_eq!(outcome.progress().unwrap().current_step, first + 1);
                assert_eq!(done.load(Ordering::SeqCst), 0);
            }
            None => {
                assert!(outcome.is_done());
                assert_eq!(done.load(Ordering::SeqCst), 1);
            }
        }
    }
}

#[tokio::test]
async fn test_only_when_sees_merged_context() {
    let workflow = Workflow::builder()
        .step(Step::form("kind", |_ctx| {
            SimpleForm::new(vec![Field::new("business").with_type(BasicType::Bool)])
        }))
        .step(
            Step::form("company", |_ctx| form_b())
                .only_when(|ctx| ctx.get("business") == Some(&json!(true))),
        )
        .step(Step::form("done", |_ctx| SimpleForm::default()))
        .build()
        .unwrap();

    let personal = workflow
        .run(submission("kind", &encoded(json!({})), json!({})), None)
        .await
        .unwrap();
    assert_eq!(personal.progress().unwrap().step_name, "done");

    let business = workflow
        .run(submission("kind", &encoded(json!({})), json!({"business": "on"})), None)
        .await
        .unwrap();
    assert_eq!(business.progress().unwrap().step_name, "company");
}

#[tokio::test]
async fn test_async_producers_and_predicates() {
    let workflow = Workflow::builder()
        .step(
            Step::form_async("lookup", |ctx: Context| async move {
                let label = ctx
                    .get("table")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                anyhow::Ok(SimpleForm::new(vec![Field::new("col").with_label(label)]))
            })
            .only_when_async(|ctx: Context| async move { anyhow::Ok(ctx.get("table").is_some()) }),
        )
        .build()
        .unwrap();

    let outcome = workflow
        .start(context(json!({"table": "orders"})), None)
        .await
        .unwrap();
    let form = outcome.form().unwrap();
    assert_eq!(form.fields()[0].label.as_deref(), Some("orders"));

    let outcome = workflow.start(Context::new(), None).await.unwrap();
    assert!(outcome.is_done());
}

// =============================================================================
// Context merging and pre-fill
// =============================================================================

#[tokio::test]
async fn test_context_field_merge_preserves_siblings() {
    let workflow = Workflow::builder()
        .step(
            Step::form("settings", |_ctx| {
                SimpleForm::new(vec![Field::new("b").with_type(BasicType::Integer)])
            })
            .context_field("settings"),
        )
        .build()
        .unwrap();

    let enc = encoded(json!({"settings": {"a": 1}, "other": "kept"}));
    let outcome = workflow
        .run(submission("settings", &enc, json!({"b": "2"})), None)
        .await
        .unwrap();

    assert_eq!(
        Value::from(outcome.into_done().unwrap()),
        json!({"settings": {"a": 1, "b": 2}, "other": "kept"})
    );
}

#[tokio::test]
async fn test_grouped_fields_merge_under_parent() {
    let workflow = Workflow::builder()
        .step(
            Step::form("style", |_ctx| {
                SimpleForm::new(vec![Field::new("x").in_group("grp").with_type(BasicType::Integer)])
            })
            .context_field("settings"),
        )
        .build()
        .unwrap();

    let outcome = workflow
        .run(submission("style", &encoded(json!({})), json!({"grp_x": "5"})), None)
        .await
        .unwrap();

    assert_eq!(
        Value::from(outcome.into_done().unwrap()),
        json!({"settings": {"grp": {"x": 5}}})
    );
}

#[derive(Debug)]
struct Doubled;

impl FieldType for Doubled {
    fn name(&self) -> &str {
        "Doubled"
    }

    fn read(&self, raw: &Value) -> Value {
        raw.as_i64().map(|n| json!(n * 2)).unwrap_or_else(|| raw.clone())
    }
}

#[tokio::test]
async fn test_prefill_from_nested_context() {
    let workflow = Workflow::builder()
        .step(
            Step::form("style", |_ctx| {
                SimpleForm::new(vec![
                    Field::new("x").in_group("grp"),
                    Field::new("y").in_group("grp").with_type(Doubled),
                    Field::new("z").in_group("grp"),
                    Field::new("title"),
                ])
                .with_value("grp_z", json!("explicit"))
            })
            .context_field("settings"),
        )
        .build()
        .unwrap();

    let ctx = context(json!({
        "title": "top-level is not consulted",
        "settings": {"title": "Orders", "grp": {"x": 5, "y": 5, "z": 9}}
    }));
    let outcome = workflow.start(ctx, None).await.unwrap();
    let values = outcome.form().unwrap().values();

    assert_eq!(values.get("grp_x"), Some(&json!(5)));
    assert_eq!(values.get("grp_y"), Some(&json!(10)));
    assert_eq!(values.get("grp_z"), Some(&json!("explicit")));
    assert_eq!(values.get("title"), Some(&json!("Orders")));
}

#[tokio::test]
async fn test_prefill_from_top_level_context() {
    let workflow = Workflow::builder()
        .step(Step::form("one", |_ctx| form_a()))
        .step(Step::form("two", |_ctx| form_a()))
        .build()
        .unwrap();

    // Going back over a step with a value already in the context pre-fills it
    let outcome = workflow
        .advance(context(json!({"a": "7"})), 1, None)
        .await
        .unwrap();

    assert_eq!(outcome.form().unwrap().values().get("a"), Some(&json!(7)));
    assert_eq!(context_enc_of(&outcome), encoded(json!({"a": "7"})));
}

// =============================================================================
// Validation and rendering
// =============================================================================

#[test_log::test(tokio::test)]
async fn test_invalid_submission_redisplays_step() {
    let workflow = Workflow::builder()
        .step(Step::form("one", |_ctx| {
            SimpleForm::new(vec![
                Field::new("a").with_type(BasicType::Integer).required(),
                Field::new("note"),
            ])
        }))
        .step(Step::form("two", |_ctx| form_b()))
        .action("/wizard/submit")
        .build()
        .unwrap();

    let enc = encoded(json!({"earlier": true}));
    let outcome = workflow
        .run(
            submission("one", &enc, json!({"a": "not a number", "note": "keep me"})),
            None,
        )
        .await
        .unwrap();

    let progress = outcome.progress().unwrap();
    assert_eq!(progress.step_name, "one");
    assert_eq!(progress.current_step, 1);
    assert_eq!(Value::from(progress.context.clone()), json!({"earlier": true}));

    let form = outcome.form().unwrap();
    assert_eq!(form.values().get("note"), Some(&json!("keep me")));
    assert_eq!(form.values().get("a"), Some(&json!("not a number")));
    assert_eq!(form.values().get(CONTEXT_FIELD), Some(&json!(enc)));
    assert_eq!(form.action(), Some("/wizard/submit"));
    assert_eq!(form.submit_label(), Some("Next »"));
}

#[tokio::test]
async fn test_invalid_submission_exposes_messages() {
    let workflow = Workflow::builder()
        .step(Step::form("one", |_ctx| {
            SimpleForm::new(vec![
                Field::new("a").with_type(BasicType::Integer).required(),
                Field::new("email").with_label("Email").required(),
            ])
        }))
        .build()
        .unwrap();

    let outcome = workflow
        .run(submission("one", "%7B%7D", json!({"a": "x"})), None)
        .await
        .unwrap();

    let errors = outcome.form().unwrap().errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors.get("a").map(String::as_str), Some("Not an integer"));
    assert_eq!(errors.get("email").map(String::as_str), Some("Email is required"));
}

#[tokio::test]
async fn test_cleared_field_is_redisplayed_blank() {
    let workflow = Workflow::builder()
        .step(Step::form("one", |_ctx| {
            SimpleForm::new(vec![
                Field::new("title").required(),
                Field::new("a").with_type(BasicType::Integer),
            ])
            .with_value("title", json!("Untitled"))
        }))
        .build()
        .unwrap();

    let outcome = workflow
        .run(submission("one", "%7B%7D", json!({"title": "", "a": "3"})), None)
        .await
        .unwrap();

    let form = outcome.form().unwrap();
    assert_eq!(form.values().get("title"), Some(&json!("")));
    assert_eq!(form.values().get("a"), Some(&json!("3")));
    assert!(form.errors().contains_key("title"));
}

#[tokio::test]
async fn test_submit_label_follows_last_step_rule() {
    let workflow = Workflow::builder()
        .step(Step::form("one", |_ctx| SimpleForm::default()))
        .step(Step::form("two", |_ctx| SimpleForm::default()))
        .step(Step::form("three", |_ctx| SimpleForm::default()))
        .build()
        .unwrap();

    for (index, expected) in [(0, "Next »"), (1, "Next »"), (2, "Save")] {
        let outcome = workflow.advance(Context::new(), index, None).await.unwrap();
        assert_eq!(outcome.form().unwrap().submit_label(), Some(expected));
    }
}

#[tokio::test]
async fn test_explicit_submit_label_is_kept() {
    let workflow = Workflow::builder()
        .step(Step::form("one", |_ctx| SimpleForm::default().with_submit_label("Create")))
        .build()
        .unwrap();

    let outcome = workflow.run(None, None).await.unwrap();
    assert_eq!(outcome.form().unwrap().submit_label(), Some("Create"));
}

#[tokio::test]
async fn test_request_translator_overrides_default() {
    let workflow = Workflow::builder()
        .step(Step::form("Champs", |_ctx| SimpleForm::default()))
        .step(Step::form("Fin", |_ctx| SimpleForm::default()))
        .translator(|s: &str| format!("[{s}]"))
        .build()
        .unwrap();

    let default = workflow.run(None, None).await.unwrap();
    assert_eq!(default.progress().unwrap().title, "Champs ([step] 1 / [max] 2)");

    let fr = Catalog::from_json("fr", r#"{"step": "étape", "Next": "Suivant"}"#).unwrap();
    let outcome = workflow.run(None, Some(&fr)).await.unwrap();

    assert_eq!(outcome.progress().unwrap().title, "Champs (étape 1 / max 2)");
    assert_eq!(outcome.form().unwrap().submit_label(), Some("Suivant »"));
}

// =============================================================================
// Builder steps
// =============================================================================

#[tokio::test]
async fn test_builder_step_render_and_submit() {
    let workflow = Workflow::builder()
        .step(Step::form("name", |_ctx| form_b()))
        .step(
            Step::builder("layout", |_ctx| {
                BuilderOptions::new("edit").with_option("fields", json!(["id", "name"]))
            })
            .context_field("configuration"),
        )
        .action("/viewedit/config")
        .config(WorkflowConfig::default().with_version_tag("abc123"))
        .build()
        .unwrap();

    let enc = encoded(json!({}));
    let outcome = workflow
        .run(submission("name", &enc, json!({"b": "x"})), None)
        .await
        .unwrap();

    let builder = outcome.builder().expect("builder step rendered");
    assert_eq!(builder.mode, "edit");
    assert_eq!(builder.step_name, "layout");
    assert_eq!(builder.action.as_deref(), Some("/viewedit/config"));
    assert_eq!(builder.version_tag.as_deref(), Some("abc123"));
    assert_eq!(builder.layout, None);
    assert_eq!(builder.options.extra.get("fields"), Some(&json!(["id", "name"])));

    let progress = outcome.progress().unwrap();
    assert_eq!(progress.current_step, 2);
    assert_eq!(progress.title, "layout (step 2 / 2)");

    // The builder posts back columns and layout as encoded JSON
    let enc = codec::encode_context(&progress.context).unwrap();
    let outcome = workflow
        .run(
            submission(
                "layout",
                &enc,
                json!({
                    "columns": encoded(json!([{"field": "id"}])),
                    "layout": encoded(json!({"above": []}))
                }),
            ),
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        Value::from(outcome.into_done().unwrap()),
        json!({
            "b": "x",
            "configuration": {"columns": [{"field": "id"}], "layout": {"above": []}}
        })
    );
}

#[tokio::test]
async fn test_builder_layout_comes_from_context() {
    let workflow = Workflow::builder()
        .step(Step::builder("layout", |_ctx| BuilderOptions::new("show")))
        .build()
        .unwrap();

    let outcome = workflow
        .start(context(json!({"layout": {"type": "blank"}})), None)
        .await
        .unwrap();

    assert_eq!(outcome.builder().unwrap().layout, Some(json!({"type": "blank"})));
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_unknown_step_is_an_error() {
    let workflow = two_step_workflow();

    let err = workflow
        .run(submission("three", &encoded(json!({})), json!({})), None)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::StepNotFound(ref name) if name == "three"));
    assert!(err.is_invalid_submission());
}

#[tokio::test]
async fn test_corrupt_context_is_an_error() {
    let workflow = two_step_workflow();

    let err = workflow
        .run(submission("one", "%7B%22a%22", json!({"a": "1"})), None)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::ContextDecode(_)));
    assert_eq!(err.user_message(), "Invalid or expired form");
}

#[tokio::test]
async fn test_malformed_escape_in_context_is_an_error() {
    let workflow = two_step_workflow();

    let err = workflow
        .run(
            submission("one", "%7B%22a%22%3A%22%ZZ%22%7D", json!({"a": "1"})),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::ContextDecode(codec::DecodeError::MalformedEscape(16))
    ));
    assert!(err.is_invalid_submission());
}

#[tokio::test]
async fn test_malformed_builder_submission_is_an_error() {
    let workflow = Workflow::builder()
        .step(Step::builder("layout", |_ctx| BuilderOptions::new("edit")))
        .build()
        .unwrap();

    let err = workflow
        .run(
            submission(
                "layout",
                &encoded(json!({})),
                json!({"columns": "%5B", "layout": "%7B%7D"}),
            ),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::FieldDecode { ref field, .. } if field == "columns"));
}

#[tokio::test]
async fn test_producer_failure_propagates() {
    let workflow = Workflow::builder()
        .step(Step::form_async("broken", |_ctx| async {
            Err::<SimpleForm, _>(anyhow::anyhow!("table missing"))
        }))
        .build()
        .unwrap();

    let err = workflow.run(None, None).await.unwrap_err();

    match err {
        WorkflowError::Producer { step, source } => {
            assert_eq!(step, "broken");
            assert_eq!(source.to_string(), "table missing");
        }
        other => panic!("Expected Producer error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_completion_failure_propagates() {
    let workflow = Workflow::builder()
        .on_done(|_ctx| async { Err::<(), _>(anyhow::anyhow!("save failed")) })
        .build()
        .unwrap();

    let err = workflow.run(None, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Completion(_)));
}

#[tokio::test]
async fn test_workflow_accessors() {
    let workflow = Workflow::builder()
        .step(Step::form("one", |_ctx| form_a()))
        .step(Step::builder("two", |_ctx| BuilderOptions::new("edit")).only_when(|_ctx| true))
        .action("/wizard")
        .config(WorkflowConfig::default().with_version_tag("v1"))
        .build()
        .unwrap();

    assert_eq!(workflow.len(), 2);
    assert!(!workflow.is_empty());
    assert_eq!(workflow.action(), Some("/wizard"));
    assert_eq!(workflow.config().version_tag.as_deref(), Some("v1"));
    assert_eq!(workflow.step_index("two"), Some(1));
    assert!(!workflow.steps()[0].is_conditional());
    assert!(workflow.steps()[1].is_conditional());

    let empty = Workflow::builder().build().unwrap();
    assert!(empty.is_empty());
    let done = empty.run(None, None).await.unwrap();
    assert_eq!(done.into_done().map(Context::into_map), Some(Map::new()));
}

#[tokio::test]
async fn test_shared_workflow_handles_concurrent_requests() {
    let workflow = Arc::new(two_step_workflow());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let workflow = workflow.clone();
            tokio::spawn(async move {
                let body = submission("one", &encoded(json!({"tab": i})), json!({"a": i}));
                let outcome = workflow.run(body, None).await.unwrap();
                outcome.progress().unwrap().context.clone()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let ctx = handle.await.unwrap();
        assert_eq!(Value::from(ctx), json!({"tab": i, "a": i}));
    }
}
