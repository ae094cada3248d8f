//! Configuration for the contact directory pipeline
//!
//! All tunables that the pipeline would otherwise hard-code live here and
//! are passed to [`ContactDirectory::new`](crate::ContactDirectory::new).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on the number of notifier workers
    ///
    /// The effective count is the smaller of this value and the available
    /// parallelism of the host (2 when it cannot be determined).
    #[serde(default = "default_max_notifiers")]
    pub max_notifiers: usize,

    /// Capacity of the event queue
    ///
    /// When full, new change events are dropped (with a warning log).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Interval between periodic mutations (in milliseconds)
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Start the periodic mutator as soon as the directory is created
    #[serde(default)]
    pub server_update: bool,

    /// How many times shutdown checks for an empty queue before stopping it
    #[serde(default = "default_drain_retries")]
    pub drain_retries: usize,

    /// Sleep between drain checks (in milliseconds)
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,

    /// Marker appended to the first name by the periodic mutator
    #[serde(default = "default_update_suffix")]
    pub update_suffix: String,

    /// Phone number written by the periodic mutator
    #[serde(default = "default_update_phone")]
    pub update_phone: String,
}

impl PipelineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            max_notifiers: default_max_notifiers(),
            queue_capacity: default_queue_capacity(),
            update_interval_ms: default_update_interval_ms(),
            server_update: false,
            drain_retries: default_drain_retries(),
            drain_interval_ms: default_drain_interval_ms(),
            update_suffix: default_update_suffix(),
            update_phone: default_update_phone(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_notifiers == 0 {
            return Err(crate::Error::config("max_notifiers must be > 0"));
        }
        if self.queue_capacity == 0 {
            return Err(crate::Error::config("queue_capacity must be > 0"));
        }
        if self.update_interval_ms == 0 {
            return Err(crate::Error::config("update_interval_ms must be > 0"));
        }
        if self.update_suffix.is_empty() {
            return Err(crate::Error::config("update_suffix cannot be empty"));
        }
        if self.update_phone.is_empty() {
            return Err(crate::Error::config("update_phone cannot be empty"));
        }
        Ok(())
    }

    /// Number of notifier workers to spawn
    pub fn notifier_count(&self) -> usize {
        let hardware = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        hardware.min(self.max_notifiers).max(1)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn with_max_notifiers(mut self, max_notifiers: usize) -> Self {
        self.max_notifiers = max_notifiers;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval_ms = duration_millis(interval);
        self
    }

    /// Enable or disable the periodic mutator at startup
    pub fn with_server_update(mut self, enabled: bool) -> Self {
        self.server_update = enabled;
        self
    }

    /// Set the best-effort drain bound used by shutdown
    pub fn with_drain(mut self, retries: usize, interval: Duration) -> Self {
        self.drain_retries = retries;
        self.drain_interval_ms = duration_millis(interval);
        self
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_max_notifiers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_update_interval_ms() -> u64 {
    1000
}

fn default_drain_retries() -> usize {
    10
}

fn default_drain_interval_ms() -> u64 {
    100
}

fn default_update_suffix() -> String {
    "XXX".to_string()
}

fn default_update_phone() -> String {
    "+7323009261".to_string()
}
