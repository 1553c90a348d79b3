use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_TRIGGER_CHARS: usize = 50;

/// The persisted start of the current streak. Exactly one copy exists in
/// storage; only the streak service writes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub start_date: DateTime<Utc>,
}

/// One streak termination. Immutable once created, kept newest-first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResetEntry {
    pub id: String,
    pub reset_date: DateTime<Utc>,
    pub trigger: String,
    pub streak_days: u32,
}

impl ResetEntry {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "reset_entry.id")?;
        if self.trigger.chars().count() > MAX_TRIGGER_CHARS {
            return Err(format!(
                "reset_entry.trigger must be at most {MAX_TRIGGER_CHARS} characters"
            ));
        }
        Ok(())
    }
}

/// Developer-mode override. Shadows the real timer state for display without
/// modifying it; cleared entirely on exit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DevModeState {
    pub is_active: bool,
    pub dev_start_date: DateTime<Utc>,
    pub activated_at: DateTime<Utc>,
}

/// Derived countdown snapshot. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountdownValue {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub total_seconds: i64,
    pub progress: f64,
    pub has_reached_90_days: bool,
}

impl CountdownValue {
    pub fn zero() -> Self {
        Self {
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
            total_seconds: 0,
            progress: 0.0,
            has_reached_90_days: false,
        }
    }
}

/// Normalizes a user-supplied trigger note: trimmed, capped at
/// [`MAX_TRIGGER_CHARS`], empty when absent.
pub fn normalize_trigger(trigger: Option<&str>) -> String {
    trigger
        .map(str::trim)
        .unwrap_or_default()
        .chars()
        .take(MAX_TRIGGER_CHARS)
        .collect()
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
