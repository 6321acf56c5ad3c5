use std::time::{Duration, Instant};

/// Tick timing snapshot, in milliseconds since the clock was created.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tick {
    /// Milliseconds since the clock baseline.
    pub now_ms: f64,

    /// Milliseconds since the previous tick, clamped.
    pub elapsed_ms: f64,

    /// Monotonic tick counter.
    pub index: u64,
}

/// Scheduler clock producing `Tick` snapshots.
///
/// Elapsed time is clamped so an engine resumed after a stall (debugger,
/// suspended process) does not jump every running animation to its end.
/// `now_ms` advances by the clamped amount, which keeps `Timer` intervals and
/// animation progress consistent with each other.
#[derive(Debug, Clone)]
pub struct TickClock {
    last: Instant,
    now_ms: f64,
    index: u64,
    elapsed_min: Duration,
    elapsed_max: Duration,
}

impl TickClock {
    /// Creates a new clock with default clamps (0 .. 250ms).
    pub fn new() -> Self {
        Self::with_clamps(Duration::ZERO, Duration::from_millis(250))
    }

    /// Creates a clock with custom elapsed-time clamps.
    pub fn with_clamps(elapsed_min: Duration, elapsed_max: Duration) -> Self {
        debug_assert!(elapsed_min <= elapsed_max);
        Self {
            last: Instant::now(),
            now_ms: 0.0,
            index: 0,
            elapsed_min,
            elapsed_max,
        }
    }

    /// Resets the baseline without rewinding `now_ms`.
    ///
    /// Useful when the host was paused on purpose.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns a new `Tick`.
    pub fn tick(&mut self) -> Tick {
        let now = Instant::now();
        let elapsed = now
            .saturating_duration_since(self.last)
            .clamp(self.elapsed_min, self.elapsed_max);
        self.last = now;

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        self.now_ms += elapsed_ms;

        let tick = Tick { now_ms: self.now_ms, elapsed_ms, index: self.index };
        self.index = self.index.wrapping_add(1);
        tick
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_clamped() {
        let mut clock = TickClock::with_clamps(Duration::from_millis(5), Duration::from_millis(10));
        let first = clock.tick();
        assert!(first.elapsed_ms >= 5.0 && first.elapsed_ms <= 10.0);
        std::thread::sleep(Duration::from_millis(20));
        let second = clock.tick();
        assert_eq!(second.elapsed_ms, 10.0);
        assert_eq!(second.index, 1);
    }

    #[test]
    fn now_is_the_sum_of_elapsed() {
        let mut clock = TickClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!((b.now_ms - (a.elapsed_ms + b.elapsed_ms)).abs() < 1e-9);
    }
}
