use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::BaseType;

/// Where the controller pays for simulated media throughput.
pub trait Clock {
    fn delay(&self, duration: Duration);
}

/// Blocks the calling thread for the full simulated latency.
#[derive(Clone, Copy, Debug, Default)]
pub struct SleepClock;

impl Clock for SleepClock {
    fn delay(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Accumulates simulated time instead of sleeping.
#[derive(Debug, Default)]
pub struct VirtualClock {
    elapsed_nanos: AtomicU64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::Relaxed))
    }
}

impl Clock for VirtualClock {
    fn delay(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        // saturate rather than wrap on absurdly slow media
        let _ = self
            .elapsed_nanos
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |t| {
                Some(t.saturating_add(nanos))
            });
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn delay(&self, duration: Duration) {
        (**self).delay(duration)
    }
}

/// Time to move `cells` cells at `speed` cells per second, capped at
/// `Duration::MAX` when the quotient does not fit.
pub fn transfer_time(cells: BaseType, speed: f64) -> Duration {
    Duration::try_from_secs_f64(cells as f64 / speed).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transfer_time_is_proportional() {
        assert_eq!(transfer_time(16, 500.), Duration::from_millis(32));
        assert_eq!(transfer_time(28, 200.), Duration::from_millis(140));
        assert_eq!(transfer_time(0, 200.), Duration::ZERO);
    }

    #[test]
    fn transfer_time_saturates_on_tiny_speed() {
        assert_eq!(transfer_time(16, 1e-300), Duration::MAX);
        assert_eq!(transfer_time(28, f64::MIN_POSITIVE), Duration::MAX);
    }

    #[test]
    fn virtual_clock_saturates() {
        let clock = VirtualClock::new();
        clock.delay(Duration::MAX);
        clock.delay(Duration::from_secs(1));
        assert_eq!(clock.elapsed(), Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn virtual_clock_accumulates() {
        let clock = VirtualClock::new();
        clock.delay(Duration::from_millis(140));
        (&clock).delay(Duration::from_millis(32));
        assert_eq!(clock.elapsed(), Duration::from_millis(172));
    }
}
