//! Pipeline configuration, loadable from defaults, a YAML file, and
//! environment overrides (§10), the way `riptide-streaming::config`
//! layers `config::Config` sources.

use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for the pipeline driver (§4.F, §5, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Tick cadence of the background driver (§9, default 16ms).
    pub tick_interval_ms: u64,
    /// SCH's `max_concurrency` (§4.F, default 10).
    pub max_concurrency: usize,
    /// IF's pending-queue cap before `RateLimited` (§9, default 1024).
    pub pending_queue_capacity: usize,
    /// Correlation Registry TTL in seconds (§3, default 30).
    pub correlation_ttl_secs: u64,
    /// Transaction Processor dedup LRU capacity (§4.C, default 512).
    pub dedup_capacity: usize,
    /// Cadence of the driver's explicit Correlation Registry sweep, on top
    /// of the registry's own amortized per-call sweep (§4.B, default 5s).
    pub correlation_sweep_interval_ms: u64,
}

impl PipelineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn correlation_ttl(&self) -> Duration {
        Duration::from_secs(self.correlation_ttl_secs)
    }

    pub fn correlation_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.correlation_sweep_interval_ms)
    }

    /// Load from compiled-in defaults, then an optional YAML file at
    /// `path` if present, then `TASKCORE_`-prefixed environment
    /// variables, in that priority order.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("tick_interval_ms", 16)?
            .set_default("max_concurrency", 10)?
            .set_default("pending_queue_capacity", 1024)?
            .set_default("correlation_ttl_secs", 30)?
            .set_default("dedup_capacity", 512)?
            .set_default("correlation_sweep_interval_ms", 5_000)?;

        let path = path.as_ref();
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(Environment::with_prefix("TASKCORE").separator("_"))
            .build()?
            .try_deserialize()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            max_concurrency: 10,
            pending_queue_capacity: 1024,
            correlation_ttl_secs: 30,
            dedup_capacity: 512,
            correlation_sweep_interval_ms: 5_000,
        }
    }
}
