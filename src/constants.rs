//! Shared constants for the cache and evaluation engines.

/// Info marker for a tag in maintenance mode.
pub const INFO_MAINTENANCE: &str = "[M]";

/// Info marker for a tag in test mode.
pub const INFO_TEST: &str = "[T]";

/// Info marker for an invalid tag value.
pub const INFO_INVALID: &str = "[?]";

/// Info marker appended while an alarm is oscillating.
pub const INFO_OSCILLATING: &str = "[OSC]";

/// Info marker appended while the source tag value is simulated.
pub const INFO_SIMULATED: &str = "[SIM]";

/// Sentinel trigger timestamp of an alarm that has never fired.
pub const NEVER_TRIGGERED: i64 = 0;
