//! Configuration types for parallel RStream execution

use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};

/// Partitioning strategy used when a parallel terminal operation dispatches
/// work to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Splitor {
    /// Divide a materialized buffer into near-equal contiguous index ranges,
    /// one per worker. Sources without a known length fall back to
    /// [`Splitor::SharedCursor`].
    #[default]
    Contiguous,
    /// Workers share one upstream cursor behind a lock, pulling one element
    /// at a time.
    SharedCursor,
}

/// Settings for parallel execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Upper bound on the number of worker tasks one operation may use
    pub max_threads: usize,
    pub splitor: Splitor,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_threads: num_cpus::get(),
            splitor: Splitor::default(),
        }
    }
}

impl ExecutionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of workers
    pub fn max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the partitioning strategy
    pub fn splitor(mut self, splitor: Splitor) -> Self {
        self.splitor = splitor;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> StreamResult<()> {
        if self.max_threads == 0 {
            return Err(StreamError::invalid_argument(
                "max_threads must be at least 1",
            ));
        }
        Ok(())
    }
}
