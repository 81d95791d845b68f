use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Configuration parameters for the entity caches
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Number of lock shards per cache
    /// Each key maps to a shard by `id % shard_count`; a larger value raises
    /// cross-key parallelism at the cost of memory
    /// Default value is set via default_shard_count() function
    #[serde(default = "default_shard_count")]
    pub shard_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shard_count: default_shard_count(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(Error::Config(ConfigError::Message(
                "shard_count must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_shard_count() -> usize {
    64
}
