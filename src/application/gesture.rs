use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiTapConfig {
    pub taps_required: usize,
    pub time_window_ms: u64,
}

impl Default for MultiTapConfig {
    fn default() -> Self {
        Self {
            taps_required: 5,
            time_window_ms: 2000,
        }
    }
}

/// Sliding-window rapid-tap detector gating the dev-menu entry point.
///
/// Every tap re-evaluates the full window: the new tap is appended, stale
/// timestamps are dropped, and the detector fires exactly once when the
/// retained count reaches the threshold, clearing its state for the next
/// run. A disabled detector ignores taps entirely, so re-enabling always
/// starts from an empty window.
#[derive(Debug)]
pub struct MultiTapDetector {
    config: MultiTapConfig,
    enabled: bool,
    tap_times: Vec<DateTime<Utc>>,
}

impl MultiTapDetector {
    pub fn new(config: MultiTapConfig) -> Self {
        Self {
            config: MultiTapConfig {
                taps_required: config.taps_required.max(1),
                time_window_ms: config.time_window_ms.max(1),
            },
            enabled: true,
            tap_times: Vec::new(),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.set_enabled(enabled);
        self
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.tap_times.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Registers a tap at `now`. Returns true when the required tap count
    /// landed inside the time window, firing at most once per run.
    pub fn record_tap(&mut self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }

        let window = Duration::milliseconds(self.config.time_window_ms as i64);
        self.tap_times.push(now);
        self.tap_times.retain(|&tap| now - tap < window);

        if self.tap_times.len() >= self.config.taps_required {
            self.tap_times.clear();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn detector() -> MultiTapDetector {
        MultiTapDetector::new(MultiTapConfig {
            taps_required: 5,
            time_window_ms: 2000,
        })
    }

    #[test]
    fn five_taps_within_window_fire_once_and_reset() {
        let mut detector = detector();
        let base = fixed_time("2026-02-16T09:00:00Z");

        for tap in 0..4 {
            assert!(!detector.record_tap(base + Duration::milliseconds(tap * 300)));
        }
        assert!(detector.record_tap(base + Duration::milliseconds(1200)));

        // The run was consumed: the next tap starts a fresh window.
        assert!(!detector.record_tap(base + Duration::milliseconds(1300)));
    }

    #[test]
    fn slow_taps_never_accumulate() {
        let mut detector = detector();
        let base = fixed_time("2026-02-16T09:00:00Z");

        for tap in 0..20 {
            assert!(!detector.record_tap(base + Duration::milliseconds(tap * 2500)));
        }
    }

    #[test]
    fn stale_taps_are_dropped_from_the_window() {
        let mut detector = detector();
        let base = fixed_time("2026-02-16T09:00:00Z");

        // Three quick taps, a long pause, then a fresh burst.
        for tap in 0..3 {
            detector.record_tap(base + Duration::milliseconds(tap * 100));
        }
        let resumed = base + Duration::seconds(10);
        for tap in 0..4 {
            assert!(!detector.record_tap(resumed + Duration::milliseconds(tap * 100)));
        }
        assert!(detector.record_tap(resumed + Duration::milliseconds(400)));
    }

    #[test]
    fn disabled_detector_ignores_taps() {
        let mut detector = detector().with_enabled(false);
        let base = fixed_time("2026-02-16T09:00:00Z");

        assert!(!detector.is_enabled());
        for tap in 0..10 {
            assert!(!detector.record_tap(base + Duration::milliseconds(tap * 100)));
        }

        // Re-enabling starts from an empty window.
        detector.set_enabled(true);
        assert!(detector.is_enabled());
        for tap in 0..4 {
            assert!(!detector.record_tap(base + Duration::milliseconds(tap * 100)));
        }
    }

    #[test]
    fn single_tap_threshold_fires_immediately() {
        let mut detector = MultiTapDetector::new(MultiTapConfig {
            taps_required: 1,
            time_window_ms: 2000,
        });
        assert!(detector.record_tap(fixed_time("2026-02-16T09:00:00Z")));
    }

    // Feature: streakcore, Property 6: a burst inside the window fires on
    // exactly the required tap, never before.
    proptest! {
        #[test]
        fn property6_burst_fires_on_required_tap(
            taps_required in 2usize..10usize,
            gap_ms in 1i64..50i64
        ) {
            let mut detector = MultiTapDetector::new(MultiTapConfig {
                taps_required,
                time_window_ms: 2000,
            });
            let base = fixed_time("2026-02-16T09:00:00Z");

            for tap in 0..taps_required - 1 {
                prop_assert!(!detector.record_tap(base + Duration::milliseconds(tap as i64 * gap_ms)));
            }
            prop_assert!(detector.record_tap(
                base + Duration::milliseconds((taps_required as i64 - 1) * gap_ms)
            ));
        }
    }
}
