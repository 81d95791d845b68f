//! Alarm model and evaluation: a boolean-condition watcher bound to exactly
//! one tag, with oscillation damping against alarm floods.

mod condition;
mod evaluator;
mod oscillation;

pub use condition::*;
pub use evaluator::*;
pub use oscillation::*;

use std::fmt::Debug;
use std::sync::Arc;

use crate::cache::Cacheable;
use crate::constants::NEVER_TRIGGERED;
use crate::ConfigurationError;
use crate::Result;

/// A boolean-condition watcher bound to exactly one tag.
///
/// `internal_active` always reflects the live condition evaluation;
/// `active` is the externally visible state, pinned `true` while the alarm
/// is oscillating. `trigger_timestamp` stays at the epoch-zero sentinel
/// until the first real trigger and thereafter changes only on an
/// `internal_active` false-to-true transition.
#[derive(Clone)]
pub struct Alarm {
    pub id: u64,
    /// The single owning tag
    pub tag_id: u64,
    pub condition: Arc<dyn AlarmCondition>,
    pub active: bool,
    pub internal_active: bool,
    pub oscillating: bool,
    pub trigger_timestamp: i64,
    pub source_timestamp: i64,
    pub cache_timestamp: i64,
    /// Derived flag string (mode/validity, oscillation, simulation markers)
    pub info: String,
}

impl Alarm {
    /// Validated construction; a failed construction never reaches a cache.
    pub fn new(
        id: u64,
        tag_id: u64,
        condition: Arc<dyn AlarmCondition>,
    ) -> Result<Self> {
        if id == 0 {
            return Err(ConfigurationError::InvalidParameter {
                parameter: "id",
                reason: "must be greater than 0".into(),
            }
            .into());
        }
        if tag_id == 0 {
            return Err(ConfigurationError::InvalidParameter {
                parameter: "tag_id",
                reason: "must be greater than 0".into(),
            }
            .into());
        }
        Ok(Self {
            id,
            tag_id,
            condition,
            active: false,
            internal_active: false,
            oscillating: false,
            trigger_timestamp: NEVER_TRIGGERED,
            source_timestamp: 0,
            cache_timestamp: crate::now_millis(),
            info: String::new(),
        })
    }

    /// Whether the alarm has ever gone active.
    pub fn never_triggered(&self) -> bool {
        self.trigger_timestamp == NEVER_TRIGGERED
    }

    /// Whether the alarm has ever been evaluated against a real tag value.
    ///
    /// The source timestamp is stamped on every stored evaluation, so the
    /// epoch-zero sentinel survives only until the first one. The trigger
    /// timestamp cannot serve here: it moves only on activation, and an
    /// alarm may be evaluated many times without ever going active.
    pub fn never_evaluated(&self) -> bool {
        self.source_timestamp == NEVER_TRIGGERED
    }
}

impl Cacheable for Alarm {
    fn id(&self) -> u64 {
        self.id
    }

    fn cache_timestamp(&self) -> i64 {
        self.cache_timestamp
    }
}

impl Debug for Alarm {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Alarm")
            .field("id", &self.id)
            .field("tag_id", &self.tag_id)
            .field("active", &self.active)
            .field("internal_active", &self.internal_active)
            .field("oscillating", &self.oscillating)
            .field("trigger_timestamp", &self.trigger_timestamp)
            .field("info", &self.info)
            .finish()
    }
}

#[cfg(test)]
mod evaluator_test;
#[cfg(test)]
mod oscillation_test;
