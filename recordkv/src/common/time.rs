use chrono::Utc;

/// Milliseconds since the Unix epoch, the unit of `createdAt` / `updatedAt`.
#[inline]
pub fn current_time_millis() -> i64 {
    Utc::now().timestamp_millis()
}
