use std::sync::Arc;

use autometrics::autometrics;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::Alarm;
use super::OscillationTracker;
use crate::cache::CacheEventKind;
use crate::cache::CacheListener;
use crate::cache::CacheTransaction;
use crate::cache::EntityCache;
use crate::constants::INFO_INVALID;
use crate::constants::INFO_MAINTENANCE;
use crate::constants::INFO_OSCILLATING;
use crate::constants::INFO_SIMULATED;
use crate::constants::INFO_TEST;
use crate::now_millis;
use crate::DependencyIndex;
use crate::EvaluationError;
use crate::Result;
use crate::Tag;
use crate::TagMode;
use crate::API_SLO;

/// Recomputes alarm state from tag updates and applies accepted changes to
/// the alarm cache.
///
/// All evaluation runs inside the alarm cache's `execute_transaction`; tags
/// cross the boundary as copies. While an alarm is oscillating its state
/// changes are stored via `put_quiet`, so downstream listeners are spared
/// the flood.
pub struct AlarmEvaluationEngine {
    alarms: Arc<EntityCache<Alarm>>,
    tags: Arc<EntityCache<Tag>>,
    index: Arc<DependencyIndex>,
    tracker: Arc<OscillationTracker>,
}

impl AlarmEvaluationEngine {
    pub fn new(
        alarms: Arc<EntityCache<Alarm>>,
        tags: Arc<EntityCache<Tag>>,
        index: Arc<DependencyIndex>,
        tracker: Arc<OscillationTracker>,
    ) -> Self {
        Self {
            alarms,
            tags,
            index,
            tracker,
        }
    }

    /// Re-evaluates a single alarm against its owning tag's current value.
    ///
    /// Returns the (possibly unchanged) alarm copy.
    #[autometrics(objective = API_SLO)]
    pub fn evaluate_alarm(
        &self,
        alarm_id: u64,
    ) -> Result<Alarm> {
        // Lock order: alarm shard write locks first, then the tag read.
        self.alarms.execute_transaction(&[alarm_id], |tx| {
            let alarm = tx.get(alarm_id)?;
            let tag = self.tags.get(alarm.tag_id)?;
            match self.evaluate_one(tx, &alarm, &tag)? {
                Some(updated) => Ok(updated),
                None => Ok(alarm),
            }
        })
    }

    /// Re-evaluates every alarm connected to `tag` in one transaction.
    ///
    /// One alarm's failure never aborts the batch: it is logged, announced
    /// as `UpdateFailed`, and the remaining alarms are still evaluated.
    /// Returns the successfully evaluated alarms.
    #[autometrics(objective = API_SLO)]
    pub fn evaluate_alarms(
        &self,
        tag: &Tag,
    ) -> Vec<Alarm> {
        let alarm_ids = self.index.alarms_for_tag(tag.id);
        if alarm_ids.is_empty() {
            return Vec::new();
        }

        let mut evaluated = Vec::with_capacity(alarm_ids.len());
        let mut failed: Vec<Alarm> = Vec::new();

        self.alarms.execute_transaction(&alarm_ids, |tx| {
            for &alarm_id in &alarm_ids {
                let alarm = match tx.get(alarm_id) {
                    Ok(alarm) => alarm,
                    Err(e) => {
                        warn!("alarm {} missing during batch evaluation: {:?}", alarm_id, e);
                        continue;
                    }
                };
                match self.evaluate_one(tx, &alarm, tag) {
                    Ok(Some(updated)) => evaluated.push(updated),
                    Ok(None) => evaluated.push(alarm),
                    Err(e) => {
                        warn!("evaluation of alarm {} failed: {:?}", alarm_id, e);
                        failed.push(alarm);
                    }
                }
            }
        });

        // UpdateFailed announcements go out after the locks are released.
        for alarm in &failed {
            self.alarms.notify_listeners(CacheEventKind::UpdateFailed, alarm);
        }
        evaluated
    }

    /// Ends an alarm's oscillation damping: clears the flip history, drops
    /// the oscillating flag and re-derives `active` from `internal_active`,
    /// announced via a normal `put`.
    pub fn reset_oscillation(
        &self,
        alarm_id: u64,
    ) -> Result<Alarm> {
        self.tracker.clear(alarm_id);
        self.alarms.execute_transaction(&[alarm_id], |tx| {
            let mut alarm = tx.get(alarm_id)?;
            if !alarm.oscillating {
                return Ok(alarm);
            }
            let tag = self.tags.get(alarm.tag_id)?;
            alarm.oscillating = false;
            alarm.active = alarm.internal_active;
            alarm.info = alarm_info(&tag, false);
            alarm.cache_timestamp = now_millis();
            tx.put(alarm.clone())?;
            debug!("alarm {} oscillation reset, active={}", alarm_id, alarm.active);
            Ok(alarm)
        })
    }

    /// Evaluates one alarm inside an open transaction.
    ///
    /// `Ok(None)` means the alarm required no update; `Ok(Some)` carries the
    /// stored new version.
    fn evaluate_one(
        &self,
        tx: &mut CacheTransaction<'_, Alarm>,
        alarm: &Alarm,
        tag: &Tag,
    ) -> Result<Option<Alarm>> {
        if !alarm_should_be_evaluated(alarm, tag) {
            return Ok(None);
        }
        // Checked non-null by alarm_should_be_evaluated
        let value = match tag.value.as_ref() {
            Some(value) => value,
            None => return Ok(None),
        };

        let new_state =
            alarm
                .condition
                .evaluate_state(value)
                .map_err(|e| EvaluationError::Condition {
                    alarm_id: alarm.id,
                    reason: e.to_string(),
                })?;

        // The oscillation status must be refreshed before the new state is
        // applied so the notify-vs-suppress decision sees the current flag.
        let event_time = tag.timestamp();
        let oscillating = self.tracker.update_status(alarm, new_state, event_time);
        let info = alarm_info(tag, oscillating);

        let first_evaluation = alarm.never_evaluated();
        if !first_evaluation && new_state == alarm.internal_active && info == alarm.info {
            trace!("alarm {} unchanged, no update", alarm.id);
            return Ok(None);
        }

        let mut updated = alarm.clone();
        if new_state && !alarm.internal_active {
            updated.trigger_timestamp = now_millis();
        }
        updated.source_timestamp = event_time;
        updated.internal_active = new_state;
        updated.oscillating = oscillating;
        updated.active = if oscillating { true } else { new_state };
        updated.info = info;
        updated.cache_timestamp = now_millis();

        debug!(
            "alarm {} evaluated: active={} internal_active={} oscillating={} info={:?}",
            updated.id, updated.active, updated.internal_active, updated.oscillating, updated.info
        );

        if oscillating {
            tx.put_quiet(updated.clone())?;
        } else {
            tx.put(updated.clone())?;
        }
        Ok(Some(updated))
    }
}

/// Pure update-necessity predicate.
///
/// An alarm is only evaluated against its own tag, and only once the tag
/// carries an initialised, valid value.
pub fn alarm_should_be_evaluated(
    alarm: &Alarm,
    tag: &Tag,
) -> bool {
    if alarm.tag_id != tag.id {
        warn!(
            "alarm {} bound to tag {} evaluated against tag {}, skipping",
            alarm.id, alarm.tag_id, tag.id
        );
        return false;
    }
    if !tag.is_initialised() || !tag.is_valid() {
        trace!("tag {} not initialised or invalid, alarm {} untouched", tag.id, alarm.id);
        return false;
    }
    true
}

/// Derives the alarm info string in fixed marker order:
/// mode/validity, then oscillation, then simulation.
pub fn alarm_info(
    tag: &Tag,
    oscillating: bool,
) -> String {
    let mut info = String::new();
    match tag.mode {
        TagMode::Maintenance => {
            info.push_str(INFO_MAINTENANCE);
            if !tag.is_valid() {
                info.push_str(INFO_INVALID);
            }
        }
        TagMode::Test => {
            info.push_str(INFO_TEST);
            if !tag.is_valid() {
                info.push_str(INFO_INVALID);
            }
        }
        TagMode::Operational => {
            if !tag.is_valid() {
                info.push_str(INFO_INVALID);
            }
        }
    }
    if oscillating {
        info.push_str(INFO_OSCILLATING);
    }
    if tag.simulated {
        info.push_str(INFO_SIMULATED);
    }
    info
}

/// Push-path glue: fans an accepted tag update out to the connected alarms.
///
/// Registered on the tag cache for `UpdateAccepted`; runs synchronously on
/// the thread that delivered the tag update.
pub struct TagUpdateListener {
    engine: Arc<AlarmEvaluationEngine>,
}

impl TagUpdateListener {
    pub fn new(engine: Arc<AlarmEvaluationEngine>) -> Self {
        Self { engine }
    }
}

impl CacheListener<Tag> for TagUpdateListener {
    fn notify(
        &self,
        kind: CacheEventKind,
        tag: &Tag,
    ) -> Result<()> {
        if kind == CacheEventKind::UpdateAccepted {
            self.engine.evaluate_alarms(tag);
        }
        Ok(())
    }
}
