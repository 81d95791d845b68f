//! Bidirectional dependency mapping from tags to the alarms and rules that
//! depend on them.
//!
//! Built at configuration time and updated incrementally on live
//! reconfiguration. Consulted only by the push path; the poll path
//! (rule scheduler) ignores it by design.

use std::collections::HashSet;

use dashmap::DashMap;

/// `tag -> {alarms}` and `tag -> {rules}` fan-out index, O(1) amortized.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    tag_to_alarms: DashMap<u64, HashSet<u64>>,
    tag_to_rules: DashMap<u64, HashSet<u64>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_alarm(
        &self,
        tag_id: u64,
        alarm_id: u64,
    ) {
        self.tag_to_alarms.entry(tag_id).or_default().insert(alarm_id);
    }

    pub fn unregister_alarm(
        &self,
        tag_id: u64,
        alarm_id: u64,
    ) {
        if let Some(mut alarms) = self.tag_to_alarms.get_mut(&tag_id) {
            alarms.remove(&alarm_id);
        }
    }

    pub fn register_rule(
        &self,
        tag_id: u64,
        rule_id: u64,
    ) {
        self.tag_to_rules.entry(tag_id).or_default().insert(rule_id);
    }

    pub fn unregister_rule(
        &self,
        tag_id: u64,
        rule_id: u64,
    ) {
        if let Some(mut rules) = self.tag_to_rules.get_mut(&tag_id) {
            rules.remove(&rule_id);
        }
    }

    /// Alarms that must be re-evaluated when `tag_id` changes.
    pub fn alarms_for_tag(
        &self,
        tag_id: u64,
    ) -> Vec<u64> {
        self.tag_to_alarms
            .get(&tag_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Rules declaring `tag_id` as a dependency (informational only).
    pub fn rules_for_tag(
        &self,
        tag_id: u64,
    ) -> Vec<u64> {
        self.tag_to_rules
            .get(&tag_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}
