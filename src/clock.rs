//! Wall-clock helpers

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
