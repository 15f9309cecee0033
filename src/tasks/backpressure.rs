use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::ScanConfig;

#[derive(Debug)]
struct RateState {
    first_error_at: Option<Instant>,
    errors_in_window: u32,
    total_errors: u64,
    delay: Duration,
    batch_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateStats {
    pub delay_ms: u64,
    pub batch_size: usize,
    pub errors_in_window: u32,
    pub total_errors: u64,
}

/// Slows the scan loop down when remote calls keep failing.
///
/// Errors are counted in a sliding window; once the count passes the
/// threshold every further error widens the inter-batch delay (up to the
/// ceiling) and shrinks the batch (never below one).
#[derive(Debug)]
pub struct RateController {
    threshold: u32,
    window: Duration,
    factor: f64,
    max_delay: Duration,
    state: Mutex<RateState>,
}

impl RateController {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            threshold: config.error_threshold,
            window: config.error_window,
            factor: config.backoff_factor.max(1.0),
            max_delay: config.max_delay,
            state: Mutex::new(RateState {
                first_error_at: None,
                errors_in_window: 0,
                total_errors: 0,
                delay: config.processing_delay.min(config.max_delay),
                batch_size: config.batch_size.max(1),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.state.lock().delay
    }

    pub fn batch_size(&self) -> usize {
        self.state.lock().batch_size
    }

    pub fn record_error(&self) -> bool {
        self.record_error_at(Instant::now())
    }

    /// Returns true when this error degraded the rate.
    pub fn record_error_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        if state
            .first_error_at
            .map(|ts| now.saturating_duration_since(ts) > self.window)
            .unwrap_or(true)
        {
            state.first_error_at = Some(now);
            state.errors_in_window = 0;
        }
        state.errors_in_window = state.errors_in_window.saturating_add(1);
        state.total_errors += 1;

        if state.errors_in_window <= self.threshold {
            return false;
        }

        state.delay = state.delay.mul_f64(self.factor).min(self.max_delay);
        state.batch_size = ((state.batch_size as f64 / self.factor).floor() as usize).max(1);
        tracing::warn!(
            target: "scan",
            delay_ms = state.delay.as_millis() as u64,
            batch = state.batch_size,
            errors = state.errors_in_window,
            "adjusting scan rate after repeated errors"
        );
        true
    }

    pub fn stats(&self) -> RateStats {
        let state = self.state.lock();
        RateStats {
            delay_ms: state.delay.as_millis() as u64,
            batch_size: state.batch_size,
            errors_in_window: state.errors_in_window,
            total_errors: state.total_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> RateController {
        RateController::new(&ScanConfig::default())
    }

    #[test]
    fn errors_below_threshold_leave_rate_alone() {
        let rate = controller();
        let start = Instant::now();
        for _ in 0..5 {
            assert!(!rate.record_error_at(start));
        }
        assert_eq!(rate.delay(), Duration::from_millis(100));
        assert_eq!(rate.batch_size(), 20);
    }

    #[test]
    fn sixth_error_in_window_backs_off_multiplicatively() {
        let rate = controller();
        let start = Instant::now();
        for _ in 0..5 {
            rate.record_error_at(start);
        }
        assert!(rate.record_error_at(start + Duration::from_secs(1)));
        assert_eq!(rate.delay(), Duration::from_millis(150));
        // floor(20 / 1.5) = 13
        assert_eq!(rate.batch_size(), 13);
    }

    #[test]
    fn delay_and_batch_stay_within_bounds() {
        let rate = controller();
        let start = Instant::now();
        for _ in 0..200 {
            rate.record_error_at(start);
        }
        assert_eq!(rate.delay(), Duration::from_millis(5000));
        assert_eq!(rate.batch_size(), 1);
        assert_eq!(rate.stats().total_errors, 200);
    }

    #[test]
    fn window_expiry_restarts_the_count() {
        let rate = controller();
        let start = Instant::now();
        for _ in 0..5 {
            rate.record_error_at(start);
        }
        assert!(!rate.record_error_at(start + Duration::from_secs(61)));
        assert_eq!(rate.stats().errors_in_window, 1);
        assert_eq!(rate.batch_size(), 20);
    }
}
