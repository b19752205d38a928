//! Prometheus metrics for the pipeline driver (§10), matching the shape
//! of `riptide-workers::metrics`: a small set of gauges and counters
//! registered into a dedicated registry rather than the process default,
//! so embedders choose whether/where to expose them.

use prometheus::{Gauge, IntCounter, Registry};

pub struct PipelineMetrics {
    pub registry: Registry,
    pub active_instructions: Gauge,
    pub pending_queue_depth: Gauge,
    pub correlation_registry_size: Gauge,
    pub instructions_completed: IntCounter,
    pub instructions_failed: IntCounter,
    pub instructions_rolled_back: IntCounter,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let active_instructions = Gauge::new("taskcore_pipeline_active_instructions", "Instructions currently in SCH/EX/RES").unwrap();
        let pending_queue_depth = Gauge::new("taskcore_pipeline_pending_queue_depth", "Instructions waiting in IF's pending queue").unwrap();
        let correlation_registry_size = Gauge::new("taskcore_pipeline_correlation_registry_size", "Entries currently tracked by the Correlation Registry").unwrap();
        let instructions_completed = IntCounter::new("taskcore_pipeline_instructions_completed_total", "Instructions that reached COMPLETED").unwrap();
        let instructions_failed = IntCounter::new("taskcore_pipeline_instructions_failed_total", "Instructions that reached FAILED").unwrap();
        let instructions_rolled_back = IntCounter::new("taskcore_pipeline_instructions_rolled_back_total", "Instructions that reached ROLLED_BACK").unwrap();

        for metric in [&active_instructions, &pending_queue_depth, &correlation_registry_size] {
            registry.register(Box::new(metric.clone())).expect("metric names are unique and only registered once");
        }
        for counter in [&instructions_completed, &instructions_failed, &instructions_rolled_back] {
            registry.register(Box::new(counter.clone())).expect("metric names are unique and only registered once");
        }

        Self {
            registry,
            active_instructions,
            pending_queue_depth,
            correlation_registry_size,
            instructions_completed,
            instructions_failed,
            instructions_rolled_back,
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
