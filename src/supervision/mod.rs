//! Supervision model: up/down lifecycle status of processes and equipment.
//!
//! Supervision feeds alarms indirectly through tag quality; here it is only
//! a cacheable entity whose accepted updates announce `SupervisionChange`.

use serde::Deserialize;
use serde::Serialize;

use crate::cache::Cacheable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupervisionStatus {
    Up,
    Down,
    Uncertain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupervisionScope {
    Process,
    Equipment,
    SubEquipment,
}

/// Lifecycle status of one supervised entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisionState {
    pub entity_id: u64,
    pub scope: SupervisionScope,
    pub status: SupervisionStatus,
    /// Time at which the status was established (epoch millis)
    pub status_time: i64,
    pub message: String,
}

impl SupervisionState {
    pub fn is_up(&self) -> bool {
        self.status == SupervisionStatus::Up
    }
}

impl Cacheable for SupervisionState {
    fn id(&self) -> u64 {
        self.entity_id
    }

    fn cache_timestamp(&self) -> i64 {
        self.status_time
    }
}
