use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current server time in epoch milliseconds
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
