//! Configuration management module for the monitoring data plane.
//!
//! Provides hierarchical configuration loading with priority:
//! 1. Default values (hardcoded)
//! 2. Optional config file
//! 3. Environment variables (highest priority)

mod cache;
mod oscillation;
mod scheduler;
pub use cache::*;
pub use oscillation::*;
pub use scheduler::*;

//---
use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Entity cache sharding parameters
    #[serde(default)]
    pub cache: CacheConfig,
    /// Alarm oscillation damping parameters
    #[serde(default)]
    pub oscillation: OscillationConfig,
    /// Rule recomputation scheduler parameters
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Settings {
    /// Load configuration from multiple sources with priority:
    /// 1. Hardcoded defaults
    /// 2. Optional config file
    /// 3. Environment variables (`MONITOR__` prefix, `__` separator)
    ///
    /// # Arguments
    /// * `config_path` - Optional path to a TOML configuration file
    ///
    /// # Returns
    /// Merged and validated configuration
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        if let Some(path) = config_path {
            config = config.add_source(File::with_name(path).required(true));
        }

        config = config.add_source(
            Environment::with_prefix("MONITOR")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = config.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates all subsystem configurations
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.oscillation.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }
}
