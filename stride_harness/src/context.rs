//! Virtual clock for driving experiments without real waits.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use stride_env::HarnessClock;

/// Clock whose `sleep` advances virtual time instead of waiting.
///
/// Clones share the same virtual time.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Current virtual time (nanoseconds since clock creation)
    virtual_time_ns: Arc<Mutex<u64>>,

    /// Wall-clock time at virtual time 0
    epoch: SystemTime,
}

impl SimClock {
    /// Creates a clock at virtual time 0.
    pub fn new() -> Self {
        Self {
            virtual_time_ns: Arc::new(Mutex::new(0)),
            epoch: UNIX_EPOCH + Duration::from_secs(1704067200), // 2024-01-01 00:00:00 UTC
        }
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.virtual_time_ns.lock().unwrap_or_else(|e| e.into_inner());
        *time += duration.as_nanos() as u64;
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HarnessClock for SimClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(*self.virtual_time_ns.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn system_time(&self) -> SystemTime {
        self.epoch + self.now()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_time(duration);
    }
}
