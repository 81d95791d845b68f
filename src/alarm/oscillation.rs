use std::collections::VecDeque;

use dashmap::DashMap;
use tracing::debug;

use super::Alarm;
use crate::OscillationConfig;

#[derive(Debug, Default)]
struct FlipHistory {
    /// Times (epoch millis) at which `internal_active` flipped
    flips: VecDeque<i64>,
    last_internal_active: Option<bool>,
}

/// Rolling-window flap counter per alarm.
///
/// An alarm whose condition flips more than the configured threshold inside
/// the sliding window is flagged as oscillating; the flag is sticky and only
/// clears after a cooldown period without any flip. The engine consults the
/// tracker *before* applying an alarm's new state so the notify-vs-suppress
/// decision uses the up-to-date flag.
pub struct OscillationTracker {
    config: OscillationConfig,
    histories: DashMap<u64, FlipHistory>,
}

impl OscillationTracker {
    pub fn new(config: OscillationConfig) -> Self {
        Self {
            config,
            histories: DashMap::new(),
        }
    }

    /// Records an imminent `internal_active` transition and returns the
    /// alarm's new oscillating status.
    ///
    /// `event_time_ms` is the effective timestamp of the triggering tag
    /// update, not the wall clock, so replayed histories damp identically.
    pub fn update_status(
        &self,
        alarm: &Alarm,
        new_internal_active: bool,
        event_time_ms: i64,
    ) -> bool {
        let mut history = self.histories.entry(alarm.id).or_default();

        // Cooldown: a quiet period ends the oscillation and forgets the past.
        let mut cooled_down = false;
        if let Some(&last_flip) = history.flips.back() {
            if event_time_ms.saturating_sub(last_flip) >= self.config.cooldown_millis() {
                debug!("alarm {} oscillation cooldown expired", alarm.id);
                history.flips.clear();
                cooled_down = true;
            }
        }

        let flipped = history
            .last_internal_active
            .map(|prev| prev != new_internal_active)
            .unwrap_or(false);
        if flipped {
            history.flips.push_back(event_time_ms);
        }
        history.last_internal_active = Some(new_internal_active);

        // Bound the history to the cooldown horizon.
        let horizon = event_time_ms - self.config.cooldown_millis();
        while matches!(history.flips.front(), Some(&t) if t < horizon) {
            history.flips.pop_front();
        }

        let window_start = event_time_ms - self.config.window_millis();
        let flips_in_window = history.flips.iter().filter(|&&t| t >= window_start).count();

        if flips_in_window > self.config.max_oscillations as usize {
            if !alarm.oscillating {
                debug!(
                    "alarm {} entered oscillation ({} flips in window)",
                    alarm.id, flips_in_window
                );
            }
            true
        } else if cooled_down || history.flips.is_empty() {
            false
        } else {
            // Sticky until the cooldown clears the history.
            alarm.oscillating
        }
    }

    /// Drops an alarm's flip history (oscillation reset or unconfiguration).
    pub fn clear(
        &self,
        alarm_id: u64,
    ) {
        self.histories.remove(&alarm_id);
    }

    pub fn tracked_alarms(&self) -> usize {
        self.histories.len()
    }
}
