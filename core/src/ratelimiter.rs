//! Request pacing shared by every fetch task of a scan.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Spaces out request starts to at most `per_sec` per second. Clones share
/// the same schedule.
#[derive(Clone)]
pub struct RateLimiter {
    ticker: Arc<Mutex<Interval>>,
}

impl RateLimiter {
    /// Must be called from within a tokio runtime.
    pub fn new(per_sec: u32) -> Self {
        // Rates above 1M/s would round the period down to zero.
        let period = Duration::from_micros((1_000_000 / u64::from(per_sec.max(1))).max(1));
        let mut t = interval(period);
        // Idle time is not banked as a burst.
        t.set_missed_tick_behavior(MissedTickBehavior::Delay);
        RateLimiter { ticker: Arc::new(Mutex::new(t)) }
    }

    pub async fn acquire(&self) {
        self.ticker.lock().await.tick().await;
    }
}
