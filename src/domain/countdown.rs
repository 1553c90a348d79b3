use crate::domain::models::CountdownValue;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
pub const NINETY_DAYS_IN_SECONDS: i64 = 90 * SECONDS_PER_DAY;

/// Days marked on the progress bar between start and the 90-day goal.
pub const MILESTONE_DAYS: [u32; 5] = [7, 14, 30, 60, 90];

/// Computes the countdown snapshot for a streak that began at `start_date`.
///
/// An absent start or a start in the future yields the zero value; elapsed
/// time is wall-clock seconds only, decomposed without calendar awareness.
pub fn calculate_countdown(start_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> CountdownValue {
    let Some(start_date) = start_date else {
        return CountdownValue::zero();
    };

    let total_seconds = (now - start_date).num_seconds();
    if total_seconds < 0 {
        return CountdownValue::zero();
    }

    let days = total_seconds / SECONDS_PER_DAY;
    let hours = (total_seconds % SECONDS_PER_DAY) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let progress =
        ((total_seconds as f64 / NINETY_DAYS_IN_SECONDS as f64) * 100.0).min(100.0);
    let has_reached_90_days = total_seconds >= NINETY_DAYS_IN_SECONDS;

    CountdownValue {
        days,
        hours,
        minutes,
        seconds,
        total_seconds,
        progress,
        has_reached_90_days,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneMarker {
    pub days: u32,
    pub position_percent: f64,
    pub achieved: bool,
}

/// Markers for the progress display, positioned as a percentage of the
/// 90-day span.
pub fn milestone_markers(elapsed_days: i64) -> Vec<MilestoneMarker> {
    MILESTONE_DAYS
        .iter()
        .map(|&days| MilestoneMarker {
            days,
            position_percent: (days as f64 / 90.0) * 100.0,
            achieved: elapsed_days >= days as i64,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DevPreset {
    pub label: &'static str,
    pub days: u32,
    pub is_milestone: bool,
}

/// Quick-test presets offered by the developer menu.
pub const DEV_PRESETS: [DevPreset; 9] = [
    DevPreset { label: "1 Day", days: 1, is_milestone: false },
    DevPreset { label: "7 Days", days: 7, is_milestone: true },
    DevPreset { label: "14 Days", days: 14, is_milestone: true },
    DevPreset { label: "21 Days", days: 21, is_milestone: false },
    DevPreset { label: "30 Days", days: 30, is_milestone: true },
    DevPreset { label: "60 Days", days: 60, is_milestone: true },
    DevPreset { label: "89 Days", days: 89, is_milestone: false },
    DevPreset { label: "90 Days", days: 90, is_milestone: true },
    DevPreset { label: "91 Days", days: 91, is_milestone: false },
];

/// Start instant that would show exactly `days` elapsed days as of `now`.
pub fn start_date_for_elapsed_days(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now - Duration::days(days as i64)
}
