//! Tag model: a monitored measurement point with value, quality and
//! timestamps, plus the tag-specific update-acceptance policy.

mod quality;
pub use quality::*;

use serde::Deserialize;
use serde::Serialize;

use crate::cache::CacheFlow;
use crate::cache::Cacheable;

/// Dynamically-typed tag value, tagged by the declared data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl TagValue {
    /// Numeric view for threshold conditions; `None` for non-numeric types.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Int(v) => Some(*v as f64),
            TagValue::Float(v) => Some(*v),
            TagValue::Bool(_) | TagValue::Text(_) => None,
        }
    }
}

/// Operational mode of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TagMode {
    #[default]
    Operational,
    Test,
    Maintenance,
}

/// A monitored measurement point.
///
/// Mutated only via the tag cache's put path; created at configuration time
/// or first load, removed on unconfiguration.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: u64,
    pub value: Option<TagValue>,
    pub value_description: String,
    pub quality: Quality,
    pub mode: TagMode,
    pub source_timestamp: Option<i64>,
    pub daq_timestamp: Option<i64>,
    pub cache_timestamp: i64,
    /// Alarms bound to this tag
    pub alarm_ids: Vec<u64>,
    /// Rules declaring this tag as a dependency (informational only)
    pub rule_ids: Vec<u64>,
    pub simulated: bool,
}

impl Tag {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            value: None,
            value_description: String::new(),
            quality: Quality::invalid(InvalidReason::Unknown),
            mode: TagMode::Operational,
            source_timestamp: None,
            daq_timestamp: None,
            cache_timestamp: crate::now_millis(),
            alarm_ids: Vec::new(),
            rule_ids: Vec::new(),
            simulated: false,
        }
    }

    /// Effective timestamp: the lowest non-null level wins (source before
    /// daq before cache). Never null: `cache_timestamp` is always set.
    pub fn timestamp(&self) -> i64 {
        self.source_timestamp
            .or(self.daq_timestamp)
            .unwrap_or(self.cache_timestamp)
    }

    /// A tag is initialised once it carries a value.
    pub fn is_initialised(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.quality.is_valid()
    }
}

impl Cacheable for Tag {
    fn id(&self) -> u64 {
        self.id
    }

    fn cache_timestamp(&self) -> i64 {
        self.cache_timestamp
    }
}

/// Tag-specific acceptance policy.
///
/// On top of the timestamp check, an update identical to the stored entity
/// in value, value description and quality is filtered out, so repeating
/// the same measurement produces exactly one accepted update.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagUpdateFlow;

impl CacheFlow<Tag> for TagUpdateFlow {
    fn accept(
        &self,
        stored: &Tag,
        incoming: &Tag,
    ) -> bool {
        if incoming.cache_timestamp < stored.cache_timestamp {
            return false;
        }
        let unchanged = incoming.value == stored.value
            && incoming.value_description == stored.value_description
            && incoming.quality == stored.quality;
        !unchanged
    }
}
