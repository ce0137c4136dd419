//! Download throttle
//!
//! Downloaded bytes are counted in chunks of `chunk_length`. Once more than
//! `chunks_per_period` chunks were fetched in the current window, the next
//! download waits for the window to end.

use std::time::Duration;

use tokio::time::Instant;

use crate::constants::limits;

/// Throttle limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Length of a throttle window
    pub period: Duration,
    /// Chunks allowed per window; 0 disables throttling
    pub chunks_per_period: u64,
    /// Bytes per counted chunk
    pub chunk_length: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            period: limits::DEFAULT_PERIOD_DURATION,
            chunks_per_period: limits::DEFAULT_CHUNKS_PER_PERIOD,
            chunk_length: limits::DEFAULT_CHUNK_LENGTH,
        }
    }
}

impl ThrottleConfig {
    pub fn is_disabled(&self) -> bool {
        self.chunks_per_period == 0 || self.period.is_zero()
    }
}

/// Chunk counter over a fixed time window
#[derive(Debug)]
pub struct Throttle {
    config: ThrottleConfig,
    chunks_in_period: u64,
    period_start: Instant,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            chunks_in_period: 0,
            period_start: Instant::now(),
        }
    }

    /// Counts `bytes` against the current window
    pub fn record_bytes(&mut self, bytes: u64) {
        let chunk_length = self.config.chunk_length.max(1) as u64;
        self.chunks_in_period += (bytes + chunk_length - 1) / chunk_length;
    }

    /// How long to pause at `now`, resetting the window if it has ended
    fn pause_at(&mut self, now: Instant) -> Option<Duration> {
        if self.config.is_disabled() {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.period_start);
        if elapsed >= self.config.period {
            self.reset(now);
            return None;
        }
        if self.chunks_in_period > self.config.chunks_per_period {
            return Some(self.config.period - elapsed);
        }
        None
    }

    fn reset(&mut self, now: Instant) {
        tracing::debug!("Resetting download throttle window");
        self.chunks_in_period = 0;
        self.period_start = now;
    }

    /// Sleeps for the rest of the window if its limit was exceeded
    pub async fn wait(&mut self) {
        if let Some(pause) = self.pause_at(Instant::now()) {
            tracing::info!(
                "Throttle limit reached ({} chunks), pausing for {}s",
                self.chunks_in_period,
                pause.as_secs()
            );
            tokio::time::sleep(pause).await;
            self.reset(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(period: Duration, chunks_per_period: u64) -> ThrottleConfig {
        ThrottleConfig {
            period,
            chunks_per_period,
            chunk_length: 1024,
        }
    }

    #[test]
    fn test_defaults() {
        let config = ThrottleConfig::default();
        assert_eq!(config.period, Duration::from_secs(600));
        assert_eq!(config.chunks_per_period, 1000);
        assert_eq!(config.chunk_length, 1024);
        assert!(!config.is_disabled());
    }

    #[test]
    fn test_bytes_counted_in_whole_chunks() {
        let mut throttle = Throttle::new(config(Duration::from_secs(60), 10));
        throttle.record_bytes(1);
        throttle.record_bytes(1024);
        throttle.record_bytes(1025);
        throttle.record_bytes(0);
        assert_eq!(throttle.chunks_in_period, 4);
    }

    #[test]
    fn test_pause_when_over_limit() {
        let mut throttle = Throttle::new(config(Duration::from_secs(60), 2));
        let start = throttle.period_start;

        throttle.record_bytes(2 * 1024);
        assert_eq!(throttle.pause_at(start + Duration::from_secs(10)), None);

        throttle.record_bytes(1);
        assert_eq!(
            throttle.pause_at(start + Duration::from_secs(10)),
            Some(Duration::from_secs(50))
        );
    }

    #[test]
    fn test_window_resets_after_period() {
        let mut throttle = Throttle::new(config(Duration::from_secs(60), 2));
        let start = throttle.period_start;
        throttle.record_bytes(10 * 1024);

        assert_eq!(throttle.pause_at(start + Duration::from_secs(61)), None);
        assert_eq!(throttle.chunks_in_period, 0);
    }

    #[test]
    fn test_zero_limit_disables() {
        let mut throttle = Throttle::new(config(Duration::from_secs(60), 0));
        throttle.record_bytes(1_000_000);
        assert_eq!(throttle.pause_at(Instant::now()), None);
    }

    #[tokio::test]
    async fn test_wait_sleeps_out_short_window() {
        let period = Duration::from_millis(50);
        let mut throttle = Throttle::new(config(period, 1));
        throttle.record_bytes(4096);

        let before = Instant::now();
        throttle.wait().await;
        assert!(before.elapsed() >= Duration::from_millis(20));
        assert_eq!(throttle.chunks_in_period, 0);
    }
}
