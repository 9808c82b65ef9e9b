//! Signup Wizard Example
//!
//! Drives a three-step workflow through simulated browser round-trips:
//! an account form, a company form shown only for business accounts, and a
//! builder step for the profile page layout.
//!
//! Run with: cargo run --example signup_wizard -p formstep-core
//!
//! Set FORMSTEP_VERSION_TAG to see it passed through to the builder step.

use formstep_core::codec;
use formstep_core::prelude::*;
use formstep_core::{CONTEXT_FIELD, STEP_NAME_FIELD};
use serde_json::{json, Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formstep_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Signup Wizard Example ===\n");

    let workflow = signup_workflow()?;

    // Fresh request: no stepName, so the wizard starts at the first step
    let outcome = workflow.run(None, None).await?;
    let enc = show(&outcome)?;

    // The user forgets their email
    println!("--- Submitting account without email ---\n");
    let outcome = workflow
        .run(body("Account", &enc, json!({"business": "on"})), None)
        .await?;
    let enc = show(&outcome)?;

    println!("--- Submitting account ---\n");
    let outcome = workflow
        .run(
            body("Account", &enc, json!({"email": "ada@example.com", "business": "on"})),
            None,
        )
        .await?;
    let enc = show(&outcome)?;

    println!("--- Submitting company ---\n");
    let outcome = workflow
        .run(
            body("Company", &enc, json!({"name": "Analytical Engines", "seats": "12"})),
            None,
        )
        .await?;
    let enc = show(&outcome)?;

    // The builder posts its columns and layout back as encoded JSON
    println!("--- Submitting profile layout ---\n");
    let columns = codec::encode_value(&json!([{"field": "email"}]))?;
    let layout = codec::encode_value(&json!({"above": [{"type": "field", "field": "email"}]}))?;
    let outcome = workflow
        .run(
            body("Profile", &enc, json!({"columns": columns, "layout": layout})),
            None,
        )
        .await?;

    match outcome {
        StepOutcome::Done(summary) => println!("Done: {summary}"),
        _ => println!("Workflow did not complete"),
    }

    println!("\n=== Example completed! ===");
    Ok(())
}

fn signup_workflow() -> Result<Workflow<String>> {
    Workflow::builder()
        .step(Step::form("Account", |_ctx| {
            SimpleForm::new(vec![
                Field::new("email")
                    .with_label("Email")
                    .with_type(BasicType::String)
                    .required(),
                Field::new("business")
                    .with_label("Business account")
                    .with_type(BasicType::Bool),
            ])
        }))
        .step(
            Step::form("Company", |_ctx| {
                SimpleForm::new(vec![
                    Field::new("name").with_label("Company name").required(),
                    Field::new("seats").with_type(BasicType::Integer),
                ])
            })
            .only_when(|ctx| ctx.get("business") == Some(&json!(true)))
            .context_field("company"),
        )
        .step(
            Step::builder("Profile", |ctx| {
                let fields: Vec<&str> = ctx.as_map().keys().map(String::as_str).collect();
                BuilderOptions::new("show").with_option("fields", json!(fields))
            })
            .context_field("profile"),
        )
        .action("/signup")
        .config(WorkflowConfig::from_env())
        .on_done(|ctx| async move {
            let context = serde_json::to_string_pretty(&ctx)?;
            anyhow::Ok(format!("account created with context {context}"))
        })
        .build()
}

/// Build a submission body the way the rendered form would post it
fn body(step: &str, context_enc: &str, fields: Value) -> Option<Map<String, Value>> {
    let Value::Object(mut body) = fields else {
        return None;
    };
    body.insert(STEP_NAME_FIELD.to_string(), json!(step));
    body.insert(CONTEXT_FIELD.to_string(), json!(context_enc));
    Some(body)
}

/// Print a render directive and return the context to post back
fn show(outcome: &StepOutcome<String>) -> anyhow::Result<String> {
    if let Some(progress) = outcome.progress() {
        println!("Title: {}", progress.title);
        println!("Progress: {}", serde_json::to_string(progress)?);
    }

    match outcome {
        StepOutcome::RenderForm { form, .. } => {
            let visible: Vec<&str> = form
                .fields()
                .iter()
                .filter(|field| !form.is_hidden(&field.name))
                .map(|field| field.display_label())
                .collect();
            println!("Form fields: {visible:?}");
            println!("Submit label: {}", form.submit_label().unwrap_or_default());
            println!("Values: {}\n", serde_json::to_string(form.values())?);
            let enc = form
                .values()
                .get(CONTEXT_FIELD)
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(enc.to_string())
        }
        StepOutcome::RenderBuilder { builder, progress } => {
            println!("Builder: {}\n", serde_json::to_string_pretty(builder)?);
            Ok(codec::encode_context(&progress.context)?)
        }
        StepOutcome::Done(_) => Ok(String::new()),
    }
}
