use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Configuration parameters for the derived-value (rule) scheduler
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Evaluation cycle period in milliseconds
    /// Bounds the staleness of every rule value
    /// Default value is set via default_cycle_ms() function
    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,

    /// Maximum number of expressions evaluated concurrently per cycle
    /// Default value is set via default_pool_size() function
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Grace period in milliseconds granted to an in-flight cycle on stop()
    /// before it is abandoned
    /// Default value is set via default_shutdown_grace_ms() function
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_ms: default_cycle_ms(),
            pool_size: default_pool_size(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cycle_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "cycle_ms must be greater than 0".into(),
            )));
        }
        if self.pool_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "pool_size must be greater than 0".into(),
            )));
        }
        Ok(())
    }

    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn default_cycle_ms() -> u64 {
    1000
}
fn default_pool_size() -> usize {
    16
}
fn default_shutdown_grace_ms() -> u64 {
    5000
}
