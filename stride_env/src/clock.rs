//! Time source used by the experiment driver.

use async_trait::async_trait;
use std::time::{Duration, SystemTime};

/// Clock abstraction for settle delays and transmission durations.
///
/// # Implementations
///
/// - **Production**: `TokioClock` - wraps `Instant` and `tokio::time::sleep`
/// - **Tests**: a virtual clock whose `sleep` advances time without waiting
#[async_trait]
pub trait HarnessClock: Send + Sync {
    /// Monotonic time since the clock was created.
    fn now(&self) -> Duration;

    /// Wall-clock time, used for the experiment start timestamp.
    fn system_time(&self) -> SystemTime;

    /// Suspends the driver for the given duration.
    async fn sleep(&self, duration: Duration);
}
