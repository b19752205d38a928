use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;
use crate::queued::{CallerResponder, InstructionId, InstructionStatus, QueuedInstruction};
use crate::scheduler::Scheduler;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use taskcore_correlation::CorrelationRegistry;
use taskcore_isa::{InstructionContext, InstructionSet};
use taskcore_store::EntityStore;
use taskcore_txn::TransactionProcessor;
use taskcore_types::{
    ApplyMeta, ApplySource, InstructionError, RequestExecutor, TransactionEnvelope, TransportError,
};
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, error, info, trace, warn};

struct Submission {
    instruction_type: String,
    payload: Value,
    respond_to: CallerResponder,
}

enum Outcome {
    Success(TransactionEnvelope),
    Failure(InstructionError),
}

struct Completion {
    id: InstructionId,
    outcome: Outcome,
}

/// A running pipeline: the caller-facing handle around the background
/// driver task (§4.F, §5 "single logical task").
pub struct Pipeline {
    submit_tx: mpsc::UnboundedSender<Submission>,
    notify: Arc<Notify>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<tokio::task::JoinHandle<()>>,
    store: Arc<EntityStore>,
    correlations: Arc<CorrelationRegistry>,
    txn: Arc<TransactionProcessor>,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    pub fn spawn(instructions: Arc<InstructionSet>, executor: Arc<dyn RequestExecutor>, config: PipelineConfig) -> Self {
        Self::spawn_with(instructions, executor, config, Arc::new(EntityStore::new()))
    }

    pub fn spawn_with(instructions: Arc<InstructionSet>, executor: Arc<dyn RequestExecutor>, config: PipelineConfig, store: Arc<EntityStore>) -> Self {
        let correlations = Arc::new(CorrelationRegistry::with_ttl(config.correlation_ttl()));
        let txn = Arc::new(TransactionProcessor::with_capacity(config.dedup_capacity));
        let metrics = Arc::new(PipelineMetrics::new());
        let notify = Arc::new(Notify::new());

        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let driver = PipelineDriver {
            pending: VecDeque::new(),
            active: HashMap::new(),
            scheduler: Scheduler::new(config.max_concurrency),
            next_id: 0,
            instructions,
            store: store.clone(),
            correlations: correlations.clone(),
            txn: txn.clone(),
            executor,
            config,
            metrics: metrics.clone(),
            submit_rx,
            completion_tx,
            completion_rx,
            notify: notify.clone(),
        };

        let join_handle = tokio::spawn(driver.run(shutdown_rx));

        Self {
            submit_tx,
            notify,
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
            store,
            correlations,
            txn,
            metrics,
        }
    }

    /// Submit `(instruction_type, payload)` and await the instruction's
    /// terminal outcome (§4.F IF: `dispatch(type, payload) ->
    /// Promise<result>`).
    pub async fn submit(&self, instruction_type: impl Into<String>, payload: Value) -> Result<TransactionEnvelope, PipelineError> {
        let (respond_to, receiver) = oneshot::channel();
        let submission = Submission {
            instruction_type: instruction_type.into(),
            payload,
            respond_to,
        };

        self.submit_tx.send(submission).map_err(|_| PipelineError::DriverStopped)?;
        self.notify.notify_one();

        receiver.await.map_err(|_| PipelineError::DriverStopped)?
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn correlations(&self) -> &Arc<CorrelationRegistry> {
        &self.correlations
    }

    /// The same [`TransactionProcessor`] instance RES/WB apply HTTP
    /// responses through, so an embedder's Interrupt Controller can share
    /// its dedup LRU rather than double-applying envelopes that arrive by
    /// both paths.
    pub fn txn(&self) -> &Arc<TransactionProcessor> {
        &self.txn
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Ask the driver task to stop after its current tick and wait for it.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.await;
        }
    }
}

struct PipelineDriver {
    pending: VecDeque<QueuedInstruction>,
    active: HashMap<InstructionId, QueuedInstruction>,
    scheduler: Scheduler,
    next_id: InstructionId,
    instructions: Arc<InstructionSet>,
    store: Arc<EntityStore>,
    correlations: Arc<CorrelationRegistry>,
    txn: Arc<TransactionProcessor>,
    executor: Arc<dyn RequestExecutor>,
    config: PipelineConfig,
    metrics: Arc<PipelineMetrics>,
    submit_rx: mpsc::UnboundedReceiver<Submission>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    notify: Arc<Notify>,
}

impl PipelineDriver {
    async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        info!(tick_interval_ms = self.config.tick_interval_ms, "pipeline driver starting");
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut correlation_sweep = tokio::time::interval(self.config.correlation_sweep_interval());
        correlation_sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = correlation_sweep.tick() => {
                    self.correlations.expire();
                }
                _ = self.notify.notified() => {}
                _ = &mut shutdown_rx => {
                    info!("pipeline driver received shutdown signal");
                    break;
                }
            }

            self.stage_if();
            self.stage_sch();
            let synchronous_failures = self.stage_ex();
            for completion in synchronous_failures {
                self.resolve(completion);
            }
            self.stage_res_wb();
            self.update_gauges();
        }

        info!("pipeline driver stopped");
    }

    /// IF: drain submitted instructions into `pending`, applying the
    /// queue cap (§4.F, §9).
    fn stage_if(&mut self) {
        while let Ok(submission) = self.submit_rx.try_recv() {
            let Some(instruction) = self.instructions.get(&submission.instruction_type) else {
                let _ = submission.respond_to.send(Err(PipelineError::UnknownInstructionType(submission.instruction_type)));
                continue;
            };

            if self.pending.len() + self.active.len() >= self.config.pending_queue_capacity {
                let _ = submission
                    .respond_to
                    .send(Err(PipelineError::Instruction(InstructionError::RateLimited(self.config.pending_queue_capacity))));
                continue;
            }

            let id = self.next_id;
            self.next_id += 1;
            let correlation_id = self.correlations.allocate();

            let mut queued = QueuedInstruction::new(id, submission.instruction_type, submission.payload.clone(), correlation_id, submission.respond_to);
            queued.resource_keys = instruction.resource_keys(&submission.payload);
            queued.timeout_ms = instruction.timeout_ms();
            trace!(id, instruction_type = %queued.instruction_type, "instruction fetched");
            self.pending.push_back(queued);
        }
    }

    /// SCH: admit as many pending instructions as hazards and
    /// `max_concurrency` allow (§4.F).
    fn stage_sch(&mut self) {
        let instructions = self.instructions.clone();
        let issued = self.scheduler.admit(&mut self.pending, &mut self.active, |instruction_type| {
            instructions.get(instruction_type).map(|i| i.priority()).unwrap_or(0)
        });
        if !issued.is_empty() {
            trace!(count = issued.len(), "instructions issued by scheduler");
        }
    }

    /// EX: validate, optimistically apply, and launch the request/execute
    /// call for every instruction the scheduler just issued (§4.F).
    ///
    /// Validation failures are resolved immediately (no optimistic apply
    /// ever ran) and returned here rather than routed through the
    /// completion channel, since nothing asynchronous happened.
    fn stage_ex(&mut self) -> Vec<Completion> {
        let issued_ids: Vec<InstructionId> = self
            .active
            .iter()
            .filter(|(_, q)| q.status == InstructionStatus::Issued)
            .map(|(id, _)| *id)
            .collect();

        let mut synchronous_failures = Vec::new();

        for id in issued_ids {
            let queued = self.active.get(&id).expect("id came from active");
            let Some(instruction) = self.instructions.get(&queued.instruction_type) else {
                synchronous_failures.push(Completion {
                    id,
                    outcome: Outcome::Failure(InstructionError::ApplyFailure(format!("instruction type '{}' vanished from the registry", queued.instruction_type))),
                });
                continue;
            };

            if let Err(e) = instruction.validate(&queued.payload) {
                synchronous_failures.push(Completion { id, outcome: Outcome::Failure(e) });
                continue;
            }

            let ctx = InstructionContext {
                store: self.store.as_ref(),
                correlation_id: queued.correlation_id.clone(),
            };
            let snapshot = instruction.optimistic_apply(&queued.payload, &ctx);
            self.correlations.register(queued.correlation_id.clone(), queued.instruction_type.clone());

            let queued = self.active.get_mut(&id).expect("id came from active");
            queued.optimistic_snapshot = Some(snapshot);
            queued.status = InstructionStatus::Executing;
            queued.timestamps.ex_at = Some(std::time::Instant::now());

            self.launch(id, instruction);
        }

        synchronous_failures
    }

    /// Spawn the instruction's request (or imperative `execute`), racing
    /// it against `timeout_ms` if set, and route the outcome back through
    /// `completion_tx` (§4.F EX: "does not block the tick loop").
    fn launch(&self, id: InstructionId, instruction: Arc<dyn taskcore_isa::Instruction>) {
        let queued = self.active.get(&id).expect("id came from active");
        let payload = queued.payload.clone();
        let correlation_id = queued.correlation_id.clone();
        let timeout_ms = queued.timeout_ms;
        let store = self.store.clone();
        let executor = self.executor.clone();
        let completion_tx = self.completion_tx.clone();

        tokio::spawn(async move {
            let ctx = InstructionContext {
                store: store.as_ref(),
                correlation_id: correlation_id.clone(),
            };

            let call = async {
                if let Some(request) = instruction.request(&payload, &ctx) {
                    executor.execute(request).await
                } else if let Some(result) = instruction.execute(&payload, &ctx, executor.as_ref()).await {
                    result
                } else {
                    Err(TransportError::Decode("instruction defines neither request() nor execute()".to_string()))
                }
            };

            let outcome = match timeout_ms {
                Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), call).await {
                    Ok(Ok(envelope)) => Outcome::Success(envelope),
                    Ok(Err(e)) => Outcome::Failure(e.into()),
                    Err(_) => Outcome::Failure(InstructionError::Timeout(ms)),
                },
                None => match call.await {
                    Ok(envelope) => Outcome::Success(envelope),
                    Err(e) => Outcome::Failure(e.into()),
                },
            };

            if completion_tx.send(Completion { id, outcome }).is_err() {
                warn!(id, "pipeline driver dropped before instruction completion could be delivered");
            }
        });
    }

    /// RES+WB: process every completion that has arrived so far.
    fn stage_res_wb(&mut self) {
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.resolve(completion);
        }
    }

    fn resolve(&mut self, completion: Completion) {
        let Some(mut instruction) = self.active.remove(&completion.id) else {
            warn!(id = completion.id, "resolved a completion for an instruction no longer active");
            return;
        };

        let ctx = InstructionContext {
            store: self.store.as_ref(),
            correlation_id: instruction.correlation_id.clone(),
        };
        let isa = self.instructions.get(&instruction.instruction_type);

        match completion.outcome {
            Outcome::Success(envelope) => {
                instruction.status = InstructionStatus::Resolved;
                let meta = ApplyMeta {
                    correlation_id: Some(instruction.correlation_id.clone()),
                    event_id: envelope.event_id.clone(),
                    source: Some(ApplySource::Http),
                };
                if let Err(e) = self.txn.apply(&self.store, &envelope, &meta) {
                    error!(id = instruction.id, error = %e, "failed to apply resolved transaction");
                }
                if let Some(isa) = &isa {
                    isa.on_success(&envelope, &ctx);
                }

                self.scheduler.release(&instruction.resource_keys);
                instruction.status = InstructionStatus::Completed;
                instruction.timestamps.wb_at = Some(std::time::Instant::now());
                self.metrics.instructions_completed.inc();
                debug!(id = instruction.id, instruction_type = %instruction.instruction_type, "instruction completed");

                if let Some(responder) = instruction.responder.take() {
                    let _ = responder.send(Ok(envelope));
                }
            }
            Outcome::Failure(err) => {
                instruction.status = InstructionStatus::Failed;

                if err.requires_rollback() {
                    if let (Some(snapshot), Some(isa)) = (&instruction.optimistic_snapshot, &isa) {
                        isa.optimistic_revert(snapshot, &ctx);
                    }
                }
                if let Some(isa) = &isa {
                    isa.on_failure(&err, &ctx);
                }

                self.scheduler.release(&instruction.resource_keys);
                instruction.status = InstructionStatus::RolledBack;
                instruction.timestamps.wb_at = Some(std::time::Instant::now());
                self.metrics.instructions_failed.inc();
                self.metrics.instructions_rolled_back.inc();
                warn!(id = instruction.id, instruction_type = %instruction.instruction_type, error = %err, "instruction rolled back");

                if let Some(responder) = instruction.responder.take() {
                    let _ = responder.send(Err(PipelineError::Instruction(err)));
                }
            }
        }
    }

    fn update_gauges(&self) {
        self.metrics.pending_queue_depth.set(self.pending.len() as f64);
        self.metrics.active_instructions.set(self.active.len() as f64);
        self.metrics.correlation_registry_size.set(self.correlations.len() as f64);
    }
}
