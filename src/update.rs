//! Ingress routing for heterogeneous source updates.
//!
//! Acquisition delivers either tag-value updates or supervision events; the
//! variants are an explicit tagged union dispatched by exhaustive match, and
//! each carries only its relevant fields.

use std::sync::Arc;

use tracing::debug;

use crate::cache::EntityCache;
use crate::now_millis;
use crate::Quality;
use crate::Result;
use crate::SupervisionScope;
use crate::SupervisionState;
use crate::SupervisionStatus;
use crate::Tag;
use crate::TagValue;

/// One update delivered by the acquisition boundary.
#[derive(Debug, Clone)]
pub enum SourceUpdate {
    TagValue {
        id: u64,
        value: TagValue,
        value_description: String,
        quality: Quality,
        source_timestamp: Option<i64>,
        daq_timestamp: Option<i64>,
        simulated: bool,
    },
    Supervision {
        entity_id: u64,
        scope: SupervisionScope,
        status: SupervisionStatus,
        status_time: i64,
        message: String,
    },
}

/// Applies source updates to the owning cache.
///
/// Stamps `cache_timestamp` on ingress; the cache's `CacheFlow` policy then
/// decides acceptance as for any other put.
pub struct UpdateRouter {
    tags: Arc<EntityCache<Tag>>,
    supervision: Arc<EntityCache<SupervisionState>>,
}

impl UpdateRouter {
    pub fn new(
        tags: Arc<EntityCache<Tag>>,
        supervision: Arc<EntityCache<SupervisionState>>,
    ) -> Self {
        Self { tags, supervision }
    }

    /// Routes one update; returns whether the target cache accepted it.
    ///
    /// A tag-value update for an unconfigured tag is an error: tags are
    /// created at configuration time, never implicitly by acquisition.
    pub fn apply(
        &self,
        update: SourceUpdate,
    ) -> Result<bool> {
        match update {
            SourceUpdate::TagValue {
                id,
                value,
                value_description,
                quality,
                source_timestamp,
                daq_timestamp,
                simulated,
            } => {
                let mut tag = self.tags.get(id)?;
                tag.value = Some(value);
                tag.value_description = value_description;
                tag.quality = quality;
                tag.source_timestamp = source_timestamp;
                tag.daq_timestamp = daq_timestamp;
                tag.simulated = simulated;
                tag.cache_timestamp = now_millis();
                let accepted = self.tags.put(tag);
                debug!("tag {} value update accepted={}", id, accepted);
                Ok(accepted)
            }
            SourceUpdate::Supervision {
                entity_id,
                scope,
                status,
                status_time,
                message,
            } => {
                let state = SupervisionState {
                    entity_id,
                    scope,
                    status,
                    status_time,
                    message,
                };
                let accepted = self.supervision.put(state);
                debug!(
                    "supervision {:?} {} -> {:?} accepted={}",
                    scope, entity_id, status, accepted
                );
                Ok(accepted)
            }
        }
    }
}
