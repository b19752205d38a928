mod executor;
mod push_handler;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use executor::DemoExecutor;
use push_handler::ApplyToStore;
use serde_json::json;
use std::sync::Arc;
use taskcore_events::InterruptController;
use taskcore_isa::InstructionSet;
use taskcore_pipeline::{Pipeline, PipelineConfig};
use taskcore_store::EntityStore;
use taskcore_types::{EntityId, PushEvent, Record, Task, TransactionEnvelope};
use taskcore_views::{ViewKey, ViewLayer};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskcore-demo")]
#[command(about = "Runs a scripted instruction sequence and push events through the pipeline over in-process mock adapters")]
struct Args {
    #[arg(long, default_value_t = String::from("Write the quarterly report"))]
    title: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let store = Arc::new(EntityStore::new());
    let instructions = Arc::new(InstructionSet::with_builtins());
    let executor = Arc::new(DemoExecutor::new(store.clone()));
    let config = PipelineConfig::default();

    let pipeline = Pipeline::spawn_with(instructions, executor, config, store.clone());

    let task_id = EntityId::new();
    tracing::info!(%task_id, "submitting task.create");
    let created = pipeline
        .submit("task.create", json!({ "id": task_id.to_string(), "title": args.title }))
        .await?;

    let today = Utc::now().date_naive();
    tracing::info!(%task_id, %today, "submitting schedule.create");
    pipeline
        .submit("schedule.create", json!({ "task_id": task_id.to_string(), "date": today.to_string() }))
        .await?;

    let block_id = EntityId::new();
    tracing::info!(%block_id, "submitting time_block.create_from_task");
    pipeline
        .submit(
            "time_block.create_from_task",
            json!({
                "id": block_id.to_string(),
                "task_id": task_id.to_string(),
                "date": today.to_string(),
                "start_minute": 9 * 60,
                "duration_minutes": 45,
            }),
        )
        .await?;

    let planned = ViewKey::Planned;
    tracing::info!(view_key = %planned, "submitting view_preference.apply_sorting");
    pipeline
        .submit(
            "view_preference.apply_sorting",
            json!({ "view_key": planned.canonical_name(), "ordered_ids": [task_id.to_string()] }),
        )
        .await?;

    // Demonstrate the Interrupt Controller: an echo of the task.create
    // above is dropped (the correlation registry still holds its id),
    // while a genuine remote-originated event applies normally.
    let controller = InterruptController::new(pipeline.correlations().clone());
    controller.register("task.updated", Arc::new(ApplyToStore::new(store.clone(), pipeline.txn().clone())));

    tracing::info!("dispatching a push event that echoes the local task.create");
    controller
        .dispatch(PushEvent {
            event_id: Some("echo-of-create".to_string()),
            event_type: "task.updated".to_string(),
            correlation_id: created.correlation_id.clone(),
            payload: created.clone(),
        })
        .await;

    let remote_id = EntityId::new();
    tracing::info!(%remote_id, "dispatching a genuine remote push event");
    controller
        .dispatch(PushEvent {
            event_id: Some("remote-1".to_string()),
            event_type: "task.updated".to_string(),
            correlation_id: None,
            payload: TransactionEnvelope::new(Record::Task(Task {
                id: remote_id,
                title: "Filed by a teammate".to_string(),
                is_completed: false,
                archived: false,
                deleted: false,
                due_date: None,
                scheduled_date: Some(today),
                area_id: None,
                project_id: None,
                section_id: None,
                recurrence_id: None,
                recurrence_original_date: None,
            })),
        })
        .await;

    let layer = ViewLayer::new(&store);
    for view in [ViewKey::Staging, ViewKey::Planned, ViewKey::Deadline] {
        let tasks = layer.get_view_as_of(&view, today);
        println!("{view}: {} task(s)", tasks.len());
        for task in &tasks {
            println!("  - {} ({})", task.title, task.id);
        }
    }

    pipeline.shutdown().await;
    Ok(())
}
