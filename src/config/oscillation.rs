use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Configuration parameters for the alarm oscillation damping
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OscillationConfig {
    /// Sliding window (in seconds) over which state flips are counted
    /// Default value is set via default_time_range_secs() function
    #[serde(default = "default_time_range_secs")]
    pub time_range_secs: u64,

    /// Maximum number of state flips tolerated inside the window before the
    /// alarm is flagged as oscillating
    /// Default value is set via default_max_oscillations() function
    #[serde(default = "default_max_oscillations")]
    pub max_oscillations: u32,

    /// Cooldown (in seconds) without any flip after which the oscillating
    /// flag is cleared and the flip history discarded
    /// Default value is set via default_cooldown_secs() function
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for OscillationConfig {
    fn default() -> Self {
        Self {
            time_range_secs: default_time_range_secs(),
            max_oscillations: default_max_oscillations(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl OscillationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.time_range_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "time_range_secs must be greater than 0".into(),
            )));
        }
        if self.max_oscillations == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_oscillations must be greater than 0".into(),
            )));
        }
        if self.cooldown_secs < self.time_range_secs {
            return Err(Error::Config(ConfigError::Message(
                "cooldown_secs must not be shorter than time_range_secs".into(),
            )));
        }
        Ok(())
    }

    pub fn window_millis(&self) -> i64 {
        self.time_range_secs as i64 * 1000
    }

    pub fn cooldown_millis(&self) -> i64 {
        self.cooldown_secs as i64 * 1000
    }
}

fn default_time_range_secs() -> u64 {
    60
}
fn default_max_oscillations() -> u32 {
    6
}
// Once oscillating, an alarm stays damped until this long without a flip
fn default_cooldown_secs() -> u64 {
    180
}
