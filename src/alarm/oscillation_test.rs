use std::sync::Arc;

use super::*;
use crate::OscillationConfig;
use crate::TagValue;

fn test_config() -> OscillationConfig {
    OscillationConfig {
        time_range_secs: 60,
        max_oscillations: 3,
        cooldown_secs: 180,
    }
}

fn test_alarm(id: u64) -> Alarm {
    Alarm::new(
        id,
        100,
        Arc::new(ValueCondition {
            trigger: TagValue::Bool(true),
        }),
    )
    .unwrap()
}

/// Feeds a state transition and folds the result back into the alarm the
/// way the evaluation engine does.
fn step(
    tracker: &OscillationTracker,
    alarm: &mut Alarm,
    state: bool,
    at_ms: i64,
) -> bool {
    let oscillating = tracker.update_status(alarm, state, at_ms);
    alarm.oscillating = oscillating;
    alarm.internal_active = state;
    oscillating
}

#[test]
fn rapid_toggles_should_flag_oscillation() {
    let tracker = OscillationTracker::new(test_config());
    let mut alarm = test_alarm(1);

    // First call establishes the baseline, no flip yet.
    assert!(!step(&tracker, &mut alarm, true, 0));
    assert!(!step(&tracker, &mut alarm, false, 1_000));
    assert!(!step(&tracker, &mut alarm, true, 2_000));
    assert!(!step(&tracker, &mut alarm, false, 3_000));

    // Fourth flip inside the window exceeds max_oscillations = 3.
    assert!(step(&tracker, &mut alarm, true, 4_000));
}

#[test]
fn slow_toggles_should_stay_calm() {
    let tracker = OscillationTracker::new(test_config());
    let mut alarm = test_alarm(1);

    let mut state = true;
    for i in 0..20i64 {
        // 120s between flips: at most one flip ever falls in the 60s window.
        assert!(!step(&tracker, &mut alarm, state, i * 120_000));
        state = !state;
    }
}

#[test]
fn constant_state_should_record_no_flips() {
    let tracker = OscillationTracker::new(test_config());
    let mut alarm = test_alarm(1);

    for i in 0..10i64 {
        assert!(!step(&tracker, &mut alarm, true, i * 1_000));
    }
}

#[test]
fn flag_should_stick_after_the_window_passes() {
    let tracker = OscillationTracker::new(test_config());
    let mut alarm = test_alarm(1);

    for (i, state) in [true, false, true, false, true].iter().enumerate() {
        step(&tracker, &mut alarm, *state, i as i64 * 1_000);
    }
    assert!(alarm.oscillating);

    // 70s later the window holds no flips, but the cooldown has not elapsed.
    assert!(step(&tracker, &mut alarm, true, 70_000));
}

#[test]
fn cooldown_should_clear_the_flag_and_history() {
    let tracker = OscillationTracker::new(test_config());
    let mut alarm = test_alarm(1);

    for (i, state) in [true, false, true, false, true].iter().enumerate() {
        step(&tracker, &mut alarm, *state, i as i64 * 1_000);
    }
    assert!(alarm.oscillating);

    // Last flip was at 4s; 180s of quiet later the damping ends.
    assert!(!step(&tracker, &mut alarm, true, 4_000 + 180_000));
}

#[test]
fn flip_right_after_cooldown_should_not_resurrect_the_flag() {
    let tracker = OscillationTracker::new(test_config());
    let mut alarm = test_alarm(1);

    for (i, state) in [true, false, true, false, true].iter().enumerate() {
        step(&tracker, &mut alarm, *state, i as i64 * 1_000);
    }
    assert!(alarm.oscillating);

    // The cooldown expires and the very same event flips the state again:
    // the old history is gone, one fresh flip is not an oscillation.
    assert!(!step(&tracker, &mut alarm, false, 4_000 + 180_000));
}

#[test]
fn clear_should_drop_the_history() {
    let tracker = OscillationTracker::new(test_config());
    let mut alarm = test_alarm(1);

    step(&tracker, &mut alarm, true, 0);
    assert_eq!(tracker.tracked_alarms(), 1);

    tracker.clear(1);
    assert_eq!(tracker.tracked_alarms(), 0);

    // History starts from scratch: the next flips count from zero.
    assert!(!step(&tracker, &mut alarm, false, 1_000));
    assert!(!step(&tracker, &mut alarm, true, 2_000));
}

#[test]
fn histories_should_be_tracked_per_alarm() {
    let tracker = OscillationTracker::new(test_config());
    let mut flapping = test_alarm(1);
    let mut steady = test_alarm(2);

    for (i, state) in [true, false, true, false, true].iter().enumerate() {
        step(&tracker, &mut flapping, *state, i as i64 * 1_000);
        step(&tracker, &mut steady, true, i as i64 * 1_000);
    }

    assert!(flapping.oscillating);
    assert!(!steady.oscillating);
    assert_eq!(tracker.tracked_alarms(), 2);
}
