use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::*;
use crate::cache::CacheEventKind;
use crate::cache::CacheListener;
use crate::cache::EntityCache;
use crate::DependencyIndex;
use crate::Error;
use crate::InvalidReason;
use crate::OscillationConfig;
use crate::Quality;
use crate::Result;
use crate::Tag;
use crate::TagMode;
use crate::TagUpdateFlow;
use crate::TagValue;

struct RecordingAlarmListener {
    events: Mutex<Vec<(CacheEventKind, u64, bool)>>,
}

impl RecordingAlarmListener {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn events(&self) -> Vec<(CacheEventKind, u64, bool)> {
        self.events.lock().clone()
    }
}

impl CacheListener<Alarm> for RecordingAlarmListener {
    fn notify(
        &self,
        kind: CacheEventKind,
        alarm: &Alarm,
    ) -> Result<()> {
        self.events.lock().push((kind, alarm.id, alarm.active));
        Ok(())
    }
}

struct FailingCondition;

impl AlarmCondition for FailingCondition {
    fn evaluate_state(
        &self,
        _value: &TagValue,
    ) -> Result<bool> {
        Err(Error::Fatal("condition definition corrupt".to_string()))
    }
}

struct Harness {
    alarms: Arc<EntityCache<Alarm>>,
    tags: Arc<EntityCache<Tag>>,
    index: Arc<DependencyIndex>,
    engine: Arc<AlarmEvaluationEngine>,
    listener: Arc<RecordingAlarmListener>,
}

fn harness(max_oscillations: u32) -> Harness {
    let alarms = Arc::new(EntityCache::new("alarm", 16));
    let tags = Arc::new(EntityCache::new("tag", 16).with_flow(TagUpdateFlow));
    let index = Arc::new(DependencyIndex::new());
    let tracker = Arc::new(OscillationTracker::new(OscillationConfig {
        time_range_secs: 60,
        max_oscillations,
        cooldown_secs: 180,
    }));
    let engine = Arc::new(AlarmEvaluationEngine::new(
        alarms.clone(),
        tags.clone(),
        index.clone(),
        tracker,
    ));
    let listener = RecordingAlarmListener::new();
    alarms.register_listener(
        listener.clone(),
        &[CacheEventKind::UpdateAccepted, CacheEventKind::UpdateFailed],
    );
    Harness {
        alarms,
        tags,
        index,
        engine,
        listener,
    }
}

impl Harness {
    fn seed_alarm(
        &self,
        alarm: Alarm,
    ) {
        self.index.register_alarm(alarm.tag_id, alarm.id);
        self.alarms.put_quiet(alarm);
    }
}

fn valid_tag(
    id: u64,
    value: TagValue,
    source_timestamp: i64,
) -> Tag {
    let mut tag = Tag::new(id);
    tag.value = Some(value);
    tag.quality = Quality::valid();
    tag.source_timestamp = Some(source_timestamp);
    tag
}

fn above_three_alarm(
    id: u64,
    tag_id: u64,
) -> Alarm {
    Alarm::new(
        id,
        tag_id,
        Arc::new(RangeCondition {
            min: None,
            max: Some(3.0),
            out_of_range_trigger: true,
        }),
    )
    .unwrap()
}

#[test]
fn invalid_tag_should_leave_alarm_untouched() {
    let h = harness(6);
    h.seed_alarm(above_three_alarm(1, 10));
    let mut tag = valid_tag(10, TagValue::Int(5), 1_000);
    tag.quality.invalidate(InvalidReason::Inaccessible);

    h.engine.evaluate_alarms(&tag);

    let alarm = h.alarms.get(1).unwrap();
    assert!(!alarm.active);
    assert!(alarm.never_triggered());
    assert!(h.listener.events().is_empty());
}

#[test]
fn uninitialised_tag_should_leave_alarm_untouched() {
    let h = harness(6);
    h.seed_alarm(above_three_alarm(1, 10));
    let mut tag = Tag::new(10);
    tag.quality = Quality::valid();

    h.engine.evaluate_alarms(&tag);

    assert!(h.alarms.get(1).unwrap().never_triggered());
    assert!(h.listener.events().is_empty());
}

#[test]
fn first_trigger_should_activate_and_stamp_the_alarm() {
    let h = harness(6);
    h.seed_alarm(above_three_alarm(1, 10));
    let before = crate::now_millis();
    let tag = valid_tag(10, TagValue::Int(5), 1_000);

    let evaluated = h.engine.evaluate_alarms(&tag);

    assert_eq!(evaluated.len(), 1);
    let alarm = h.alarms.get(1).unwrap();
    assert!(alarm.active);
    assert!(alarm.internal_active);
    assert!(!alarm.oscillating);
    assert!(alarm.trigger_timestamp >= before);
    assert_eq!(alarm.source_timestamp, 1_000);
    assert_eq!(
        h.listener.events(),
        vec![(CacheEventKind::UpdateAccepted, 1, true)]
    );
}

#[test]
fn value_below_threshold_should_not_activate() {
    let h = harness(6);
    h.seed_alarm(above_three_alarm(1, 10));
    let tag = valid_tag(10, TagValue::Int(2), 1_000);

    h.engine.evaluate_alarms(&tag);

    let alarm = h.alarms.get(1).unwrap();
    assert!(!alarm.active);
    assert!(!alarm.internal_active);
    // First evaluation is recorded even without a trigger.
    assert_eq!(
        h.listener.events(),
        vec![(CacheEventKind::UpdateAccepted, 1, false)]
    );
}

#[test]
fn repeated_inactive_evaluations_should_notify_once() {
    let h = harness(6);
    h.seed_alarm(above_three_alarm(1, 10));

    // The alarm never goes active, so the trigger timestamp never moves;
    // the first-evaluation bookkeeping must still settle after one store.
    h.engine.evaluate_alarms(&valid_tag(10, TagValue::Int(2), 1_000));
    let first = h.alarms.get(1).unwrap();
    h.engine.evaluate_alarms(&valid_tag(10, TagValue::Int(1), 2_000));
    h.engine.evaluate_alarms(&valid_tag(10, TagValue::Int(3), 3_000));

    let stored = h.alarms.get(1).unwrap();
    assert!(!stored.active);
    assert!(stored.never_triggered());
    assert_eq!(stored.cache_timestamp, first.cache_timestamp);
    assert_eq!(
        h.listener.events(),
        vec![(CacheEventKind::UpdateAccepted, 1, false)]
    );
}

#[test]
fn unchanged_state_should_not_produce_an_update() {
    let h = harness(6);
    h.seed_alarm(above_three_alarm(1, 10));

    h.engine.evaluate_alarms(&valid_tag(10, TagValue::Int(5), 1_000));
    let first = h.alarms.get(1).unwrap();

    h.engine.evaluate_alarms(&valid_tag(10, TagValue::Int(7), 2_000));
    let second = h.alarms.get(1).unwrap();

    assert_eq!(second.trigger_timestamp, first.trigger_timestamp);
    assert_eq!(second.cache_timestamp, first.cache_timestamp);
    assert_eq!(h.listener.events().len(), 1);
}

#[test]
fn trigger_timestamp_should_move_only_on_rising_edges() {
    let h = harness(6);
    h.seed_alarm(above_three_alarm(1, 10));

    h.engine.evaluate_alarms(&valid_tag(10, TagValue::Int(5), 1_000));
    let first_trigger = h.alarms.get(1).unwrap().trigger_timestamp;

    std::thread::sleep(Duration::from_millis(5));
    h.engine.evaluate_alarms(&valid_tag(10, TagValue::Int(2), 2_000));
    assert_eq!(h.alarms.get(1).unwrap().trigger_timestamp, first_trigger);

    std::thread::sleep(Duration::from_millis(5));
    h.engine.evaluate_alarms(&valid_tag(10, TagValue::Int(9), 3_000));
    assert!(h.alarms.get(1).unwrap().trigger_timestamp > first_trigger);
}

#[test]
fn oscillating_alarm_should_be_pinned_active_and_silenced() {
    let h = harness(3);
    h.seed_alarm(above_three_alarm(1, 10));
    let base = 1_000_000;

    // Alternate across the threshold once a second. The fourth flip inside
    // the window exceeds the limit of 3.
    for i in 0..7i64 {
        let value = if i % 2 == 0 { 5 } else { 2 };
        h.engine
            .evaluate_alarms(&valid_tag(10, TagValue::Int(value), base + i * 1_000));
    }

    let alarm = h.alarms.get(1).unwrap();
    assert!(alarm.oscillating);
    assert!(alarm.active);
    assert!(alarm.internal_active);
    assert!(alarm.info.contains("[OSC]"));

    // Four visible updates before damping kicked in, silence afterwards.
    let events = h.listener.events();
    assert_eq!(events.len(), 4);
    assert!(events
        .iter()
        .all(|(kind, _, _)| *kind == CacheEventKind::UpdateAccepted));
}

#[test]
fn reset_oscillation_should_unpin_and_announce() {
    let h = harness(3);
    h.seed_alarm(above_three_alarm(1, 10));
    let base = 1_000_000;
    for i in 0..8i64 {
        let value = if i % 2 == 0 { 5 } else { 2 };
        h.engine
            .evaluate_alarms(&valid_tag(10, TagValue::Int(value), base + i * 1_000));
    }
    // Last value was 2: internally inactive but still pinned active.
    assert!(h.alarms.get(1).unwrap().active);
    h.tags.put_quiet(valid_tag(10, TagValue::Int(2), base + 8_000));
    let events_before = h.listener.events().len();

    let alarm = h.engine.reset_oscillation(1).unwrap();

    assert!(!alarm.oscillating);
    assert!(!alarm.active);
    assert!(!alarm.info.contains("[OSC]"));
    let events = h.listener.events();
    assert_eq!(events.len(), events_before + 1);
    assert_eq!(events.last(), Some(&(CacheEventKind::UpdateAccepted, 1, false)));
}

#[test]
fn failing_condition_should_not_block_sibling_alarms() {
    let h = harness(6);
    h.seed_alarm(above_three_alarm(1, 10));
    h.seed_alarm(Alarm::new(2, 10, Arc::new(FailingCondition)).unwrap());
    let tag = valid_tag(10, TagValue::Int(5), 1_000);

    let evaluated = h.engine.evaluate_alarms(&tag);

    assert_eq!(evaluated.len(), 1);
    assert_eq!(evaluated[0].id, 1);
    assert!(h.alarms.get(1).unwrap().active);
    // The failing alarm keeps its previous state and is announced as failed.
    assert!(h.alarms.get(2).unwrap().never_triggered());
    let events = h.listener.events();
    assert!(events.contains(&(CacheEventKind::UpdateAccepted, 1, true)));
    assert!(events.contains(&(CacheEventKind::UpdateFailed, 2, false)));
}

#[test]
fn evaluate_alarm_should_read_the_owning_tag_from_the_cache() {
    let h = harness(6);
    h.seed_alarm(above_three_alarm(1, 10));
    h.tags.put_quiet(valid_tag(10, TagValue::Int(5), 1_000));

    let alarm = h.engine.evaluate_alarm(1).unwrap();

    assert!(alarm.active);
    assert_eq!(h.alarms.get(1).unwrap().source_timestamp, 1_000);
}

#[test]
fn evaluate_alarm_should_fail_for_unknown_ids() {
    let h = harness(6);

    assert!(h.engine.evaluate_alarm(99).is_err());
}

#[test]
fn alarm_bound_to_another_tag_should_be_skipped() {
    let alarm = above_three_alarm(1, 10);
    let other_tag = valid_tag(11, TagValue::Int(5), 1_000);

    assert!(!alarm_should_be_evaluated(&alarm, &other_tag));
}

#[test]
fn info_markers_should_follow_fixed_order() {
    let mut tag = valid_tag(10, TagValue::Int(5), 1_000);
    assert_eq!(alarm_info(&tag, false), "");

    tag.mode = TagMode::Maintenance;
    tag.simulated = true;
    assert_eq!(alarm_info(&tag, true), "[M][OSC][SIM]");

    tag.mode = TagMode::Test;
    tag.quality.invalidate(InvalidReason::UnknownReason);
    assert_eq!(alarm_info(&tag, false), "[T][?][SIM]");

    tag.mode = TagMode::Operational;
    tag.simulated = false;
    assert_eq!(alarm_info(&tag, false), "[?]");
}

#[test]
fn tag_update_listener_should_drive_the_push_path() {
    let h = harness(6);
    h.seed_alarm(above_three_alarm(1, 10));
    h.tags.put_quiet(Tag::new(10));
    h.tags.register_listener(
        Arc::new(TagUpdateListener::new(h.engine.clone())),
        &[CacheEventKind::UpdateAccepted],
    );

    h.tags.put(valid_tag(10, TagValue::Int(5), 1_000));

    assert!(h.alarms.get(1).unwrap().active);
}
