use std::{fs::File, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tuning knobs for the search loop. Defaults match the original
/// deployment; tests shrink them.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WorkerConfig {
    /// Hashes ground per poll cycle before re-reading the problem
    /// descriptor and checkpointing.
    pub batch_iterations: u64,
    /// Sleep between descriptor polls once a solution is held.
    pub idle_interval_ms: u64,
    /// Store session timeout.
    pub session_timeout_ms: u64,
    /// Consecutive failed polls/checkpoints tolerated before giving up.
    pub max_consecutive_failures: u32,
    /// Base delay for exponential backoff between retries.
    pub backoff_base_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_iterations: 5_000_000,
            idle_interval_ms: 1_000,
            session_timeout_ms: 5_000,
            max_consecutive_failures: 5,
            backoff_base_ms: 200,
        }
    }
}

impl WorkerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(file)?;
        Ok(config)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// Exponential backoff for the given consecutive-failure count, with
    /// jitter so stalled workers do not stampede the store in lockstep.
    pub fn backoff(&self, failures: u32) -> Duration {
        let base = self.backoff_base_ms.saturating_mul(1u64 << failures.min(6));
        let jitter = rand::thread_rng().gen_range(0..=self.backoff_base_ms);
        Duration::from_millis(base.saturating_add(jitter))
    }
}
