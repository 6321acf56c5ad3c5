use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Scheduler frequency. The tick interval is `floor(1000 / fps)` ms,
    /// at least 1.
    pub fps: u32,
    /// Upper bound on the elapsed time a single `tick_clock()` reports.
    pub tick_clamp: Duration,
}

impl EngineConfig {
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    pub fn with_tick_clamp(mut self, clamp: Duration) -> Self {
        self.tick_clamp = clamp;
        self
    }

    /// Milliseconds between two scheduler ticks, never less than one.
    pub fn tick_interval_ms(&self) -> u64 {
        (1000 / u64::from(self.fps.max(1))).max(1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            tick_clamp: Duration::from_millis(250),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_interval_follows_fps() {
        assert_eq!(EngineConfig::default().tick_interval_ms(), 16);
        assert_eq!(EngineConfig::default().with_fps(0).tick_interval_ms(), 1000);
    }

    #[test]
    fn tick_interval_never_reaches_zero() {
        assert_eq!(EngineConfig::default().with_fps(1000).tick_interval_ms(), 1);
        assert_eq!(EngineConfig::default().with_fps(2000).tick_interval_ms(), 1);
        assert_eq!(EngineConfig::default().with_fps(u32::MAX).tick_interval_ms(), 1);
    }
}
