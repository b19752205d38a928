//! End-to-end scenarios for the pipeline driver, exercising IF through WB
//! against an in-memory executor rather than a real transport.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskcore_isa::InstructionSet;
use taskcore_pipeline::{Pipeline, PipelineConfig, PipelineError};
use taskcore_types::{
    EntityId, EntityKind, HttpMethod, OutboundRequest, Record, RequestExecutor, Task, TransactionEnvelope,
    TransportError,
};

/// Echoes back a successful `TransactionEnvelope` by constructing a `Task`
/// record from the request body, or fails every Nth call when configured
/// to, simulating a flaky collaborator.
struct MockExecutor {
    fail_every: Option<usize>,
    calls: AtomicUsize,
}

impl MockExecutor {
    fn new() -> Self {
        Self { fail_every: None, calls: AtomicUsize::new(0) }
    }

    fn always_fails() -> Self {
        Self { fail_every: Some(1), calls: AtomicUsize::new(0) }
    }

    fn slow() -> Self {
        Self { fail_every: None, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl RequestExecutor for MockExecutor {
    async fn execute(&self, request: OutboundRequest) -> Result<TransactionEnvelope, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(n) = self.fail_every {
            if call % n == 0 {
                return Err(TransportError::Http { status: 500, message: "simulated failure".to_string() });
            }
        }

        let body = request.body.unwrap_or_else(|| json!({}));
        let id: EntityId = body.get("id").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or_else(EntityId::new);
        let title = body.get("title").and_then(|v| v.as_str()).unwrap_or("untitled").to_string();

        let task = Task {
            id,
            title,
            is_completed: false,
            archived: false,
            deleted: false,
            due_date: None,
            scheduled_date: None,
            area_id: None,
            project_id: None,
            section_id: None,
            recurrence_id: None,
            recurrence_original_date: None,
        };

        let mut envelope = TransactionEnvelope::new(Record::Task(task));
        if let Some(correlation_id) = request.correlation_id {
            envelope = envelope.with_correlation_id(correlation_id);
        }
        Ok(envelope)
    }
}

/// An executor whose `execute` never returns, used to exercise
/// per-instruction timeouts.
struct HangingExecutor;

#[async_trait]
impl RequestExecutor for HangingExecutor {
    async fn execute(&self, _request: OutboundRequest) -> Result<TransactionEnvelope, TransportError> {
        std::future::pending().await
    }
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        tick_interval_ms: 5,
        max_concurrency: 10,
        pending_queue_capacity: 8,
        correlation_ttl_secs: 30,
        dedup_capacity: 512,
    }
}

/// S1: a successful instruction resolves and its primary entity lands in
/// the store.
#[tokio::test(flavor = "multi_thread")]
async fn successful_instruction_resolves_and_applies_to_the_store() {
    let pipeline = Pipeline::spawn(Arc::new(InstructionSet::with_builtins()), Arc::new(MockExecutor::new()), test_config());

    let id = EntityId::new();
    let envelope = pipeline
        .submit("task.create", json!({ "id": id, "title": "Write the quarterly report" }))
        .await
        .expect("instruction should succeed");

    assert_eq!(envelope.entity.id(), id);
    assert_eq!(pipeline.store().get(EntityKind::Task, id).unwrap().as_task().unwrap().title, "Write the quarterly report");

    pipeline.shutdown().await;
}

/// S2: a validation failure never reaches the executor and never applies
/// optimistic state.
#[tokio::test(flavor = "multi_thread")]
async fn validation_failure_short_circuits_before_any_optimistic_apply() {
    let pipeline = Pipeline::spawn(Arc::new(InstructionSet::with_builtins()), Arc::new(MockExecutor::new()), test_config());

    let id = EntityId::new();
    let err = pipeline.submit("task.create", json!({ "id": id, "title": "" })).await.unwrap_err();

    assert!(matches!(err, PipelineError::Instruction(taskcore_types::InstructionError::Validation(_))));
    assert!(pipeline.store().get(EntityKind::Task, id).is_none());

    pipeline.shutdown().await;
}

/// S3: a transport failure reverts the optimistic write, leaving the
/// store as it was before submission.
#[tokio::test(flavor = "multi_thread")]
async fn transport_failure_rolls_back_the_optimistic_write() {
    let pipeline = Pipeline::spawn(Arc::new(InstructionSet::with_builtins()), Arc::new(MockExecutor::always_fails()), test_config());

    let id = EntityId::new();
    let err = pipeline.submit("task.create", json!({ "id": id, "title": "Ghost task" })).await.unwrap_err();

    assert!(matches!(err, PipelineError::Instruction(taskcore_types::InstructionError::Server { .. })));
    assert!(pipeline.store().get(EntityKind::Task, id).is_none(), "optimistic create must be reverted on failure");

    pipeline.shutdown().await;
}

/// S4: two instructions touching the same task serialize rather than
/// racing each other's optimistic state.
#[tokio::test(flavor = "multi_thread")]
async fn conflicting_instructions_on_the_same_task_serialize() {
    let pipeline = Pipeline::spawn(Arc::new(InstructionSet::with_builtins()), Arc::new(MockExecutor::new()), test_config());

    let id = EntityId::new();
    pipeline.submit("task.create", json!({ "id": id, "title": "Original" })).await.unwrap();

    let a = pipeline.submit("task.update", json!({ "id": id, "title": "First update" }));
    let b = pipeline.submit("task.update", json!({ "id": id, "title": "Second update" }));
    let (a, b) = tokio::join!(a, b);
    a.unwrap();
    b.unwrap();

    let stored = pipeline.store().get(EntityKind::Task, id).unwrap().as_task().unwrap().title;
    assert!(stored == "First update" || stored == "Second update");

    pipeline.shutdown().await;
}

/// S5: an unknown instruction type is rejected by IF without ever
/// touching the scheduler.
#[tokio::test(flavor = "multi_thread")]
async fn unknown_instruction_type_is_rejected_immediately() {
    let pipeline = Pipeline::spawn(Arc::new(InstructionSet::with_builtins()), Arc::new(MockExecutor::new()), test_config());

    let err = pipeline.submit("task.teleport", json!({})).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnknownInstructionType(t) if t == "task.teleport"));

    pipeline.shutdown().await;
}

/// S6: a per-instruction timeout surfaces as `InstructionError::Timeout`
/// and still releases the held resource key.
#[tokio::test(flavor = "multi_thread")]
async fn instruction_exceeding_its_timeout_is_reported_and_rolled_back() {
    struct TimingOutCreate;

    #[async_trait::async_trait]
    impl taskcore_isa::Instruction for TimingOutCreate {
        fn resource_keys(&self, payload: &serde_json::Value) -> Vec<taskcore_types::ResourceKey> {
            let id = payload.get("id").and_then(|v| v.as_str()).unwrap_or("unknown");
            vec![taskcore_types::ResourceKey::new(format!("task:{id}"))]
        }

        fn timeout_ms(&self) -> Option<u64> {
            Some(20)
        }

        fn request(&self, _payload: &serde_json::Value, _ctx: &taskcore_isa::InstructionContext) -> Option<OutboundRequest> {
            Some(OutboundRequest::new(HttpMethod::Post, "/tasks"))
        }
    }

    let mut instructions = InstructionSet::new();
    instructions.register("task.timeout_probe", Arc::new(TimingOutCreate));

    let pipeline = Pipeline::spawn(Arc::new(instructions), Arc::new(HangingExecutor), test_config());

    let err = pipeline.submit("task.timeout_probe", json!({ "id": "probe-1" })).await.unwrap_err();
    assert!(matches!(err, PipelineError::Instruction(taskcore_types::InstructionError::Timeout(20))));

    pipeline.shutdown().await;
}

/// The pending queue's capacity is enforced: once full, IF rejects new
/// submissions with `RateLimited` rather than growing unboundedly.
#[tokio::test(flavor = "multi_thread")]
async fn pending_queue_capacity_is_enforced() {
    let mut config = test_config();
    config.pending_queue_capacity = 1;
    config.max_concurrency = 1;

    let pipeline = Arc::new(Pipeline::spawn(Arc::new(InstructionSet::with_builtins()), Arc::new(HangingExecutor), config));

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.submit("task.create", json!({ "id": EntityId::new(), "title": "Holds the only slot" })).await })
    };
    // Give the driver a tick to move the first submission out of IF and
    // into active before we fill the queue again.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let second = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.submit("task.create", json!({ "id": EntityId::new(), "title": "Fills the queue" })).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let third = pipeline.submit("task.create", json!({ "id": EntityId::new(), "title": "Should be rejected" })).await;

    assert!(matches!(third, Err(PipelineError::Instruction(taskcore_types::InstructionError::RateLimited(1)))));

    drop(first);
    drop(second);
}
