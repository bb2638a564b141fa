use std::time::Duration;

pub const DEFAULT_MINUTES_PER_CUSTOMER: i32 = 15;
pub const DEFAULT_ENTRY_TIMEOUT_POLL: Duration = Duration::from_secs(10);

/// Tunables for wait-time estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    pub minutes_per_customer: i32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            minutes_per_customer: DEFAULT_MINUTES_PER_CUSTOMER,
        }
    }
}

impl QueueSettings {
    /// Minutes until a customer at `position` is expected to be served
    pub fn estimated_time(&self, position: i32) -> i32 {
        position.saturating_mul(self.minutes_per_customer)
    }

    pub fn estimated_wait(&self, waiting: i64) -> i64 {
        waiting.saturating_mul(i64::from(self.minutes_per_customer))
    }
}
