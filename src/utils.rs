use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as i64
}
