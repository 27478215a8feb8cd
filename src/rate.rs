//! # Loop rate monitor

use std::time::{Duration, Instant};

/// Loop iteration rate monitor
///
/// The monitor counts ticks and, once `interval` has elapsed since the last report, returns the
/// number of ticks per second over that window and starts a new one.
#[derive(Debug, Clone)]
pub struct RateMonitor {
    interval: Duration,
    start: Instant,
    counter: usize,
    rate: f64,
}
impl Default for RateMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
impl RateMonitor {
    /// Creates a rate monitor reporting every `interval`
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }
    /// Creates a rate monitor which first window opens at `start`
    pub fn starting_at(start: Instant, interval: Duration) -> Self {
        Self {
            interval,
            start,
            counter: 0,
            rate: 0f64,
        }
    }
    /// Last reported rate [Hz]
    pub fn rate(&self) -> f64 {
        self.rate
    }
    /// Records one tick at `now`
    ///
    /// Returns the rate in Hz when the report is due.
    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.counter += 1;
        let elapsed = now.saturating_duration_since(self.start);
        if elapsed >= self.interval && !elapsed.is_zero() {
            self.rate = self.counter as f64 / elapsed.as_secs_f64();
            self.counter = 0;
            self.start = now;
            Some(self.rate)
        } else {
            None
        }
    }
    /// Records one tick now
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_interval() {
        let t0 = Instant::now();
        let mut monitor = RateMonitor::starting_at(t0, Duration::from_secs(1));
        let reports: Vec<_> = (1..=25)
            .filter_map(|i| monitor.tick_at(t0 + Duration::from_millis(100 * i)))
            .collect();
        assert_eq!(reports.len(), 2);
        assert!((reports[0] - 10.).abs() < 1e-9);
        assert!((reports[1] - 10.).abs() < 1e-9);
        assert!((monitor.rate() - 10.).abs() < 1e-9);
    }

    #[test]
    fn window_resets_after_report() {
        let t0 = Instant::now();
        let mut monitor = RateMonitor::starting_at(t0, Duration::from_millis(500));
        assert_eq!(monitor.tick_at(t0 + Duration::from_millis(100)), None);
        let rate = monitor.tick_at(t0 + Duration::from_millis(500)).unwrap();
        assert!((rate - 4.).abs() < 1e-9);
        assert_eq!(monitor.tick_at(t0 + Duration::from_millis(600)), None);
        let rate = monitor.tick_at(t0 + Duration::from_millis(1500)).unwrap();
        assert!((rate - 2.).abs() < 1e-9);
    }
}
