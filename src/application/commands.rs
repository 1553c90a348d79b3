use crate::application::bootstrap::bootstrap_workspace;
use crate::application::gesture::{MultiTapConfig, MultiTapDetector};
use crate::application::streak::StreakService;
use crate::domain::countdown::{DEV_PRESETS, MilestoneMarker, milestone_markers};
use crate::domain::models::{CountdownValue, ResetEntry};
use crate::infrastructure::config::{read_dev_menu_settings, read_max_history_entries};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::key_value_store::SqliteKeyValueStore;
use crate::infrastructure::streak_repository::StreakRepository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const TRIGGER_SUGGESTIONS: [&str; 4] = ["Stress", "Boredom", "Loneliness", "Late night"];

pub struct AppState {
    streak: Arc<StreakService<SqliteKeyValueStore>>,
    gesture: Mutex<MultiTapDetector>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config_dir = workspace_root.join("config");
        let max_history_entries = read_max_history_entries(&config_dir)?;
        let dev_menu = read_dev_menu_settings(&config_dir)?;

        let store = Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path));
        let repository =
            Arc::new(StreakRepository::new(store).with_max_history_entries(max_history_entries));
        let streak = Arc::new(StreakService::new(repository));

        // The dev-menu gesture only unlocks anything in debug builds.
        let gesture = MultiTapDetector::new(MultiTapConfig {
            taps_required: dev_menu.taps_required,
            time_window_ms: dev_menu.tap_window_ms,
        })
        .with_enabled(cfg!(debug_assertions));

        Ok(Self {
            streak,
            gesture: Mutex::new(gesture),
        })
    }

    pub fn streak(&self) -> &Arc<StreakService<SqliteKeyValueStore>> {
        &self.streak
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        tracing::error!(command, %error, "command failed");
        error.to_string()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StreakStatusResponse {
    pub start_date: Option<String>,
    pub effective_start_date: Option<String>,
    pub celebration_shown: bool,
    pub is_dev_mode: bool,
    pub dev_start_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DevPresetResponse {
    pub label: String,
    pub days: u32,
    pub is_milestone: bool,
    pub start_date: String,
}

pub async fn get_countdown_impl(state: &AppState) -> Result<CountdownValue, InfraError> {
    state.streak.initialize().await?;
    state.streak.countdown()
}

pub async fn get_streak_status_impl(state: &AppState) -> Result<StreakStatusResponse, InfraError> {
    state.streak.initialize().await?;
    let status = state.streak.status()?;
    Ok(StreakStatusResponse {
        start_date: status.start_date.map(|value| value.to_rfc3339()),
        effective_start_date: status.effective_start_date.map(|value| value.to_rfc3339()),
        celebration_shown: status.celebration_shown,
        is_dev_mode: status.is_dev_mode,
        dev_start_date: status.dev_start_date.map(|value| value.to_rfc3339()),
    })
}

pub async fn get_history_impl(state: &AppState) -> Result<Vec<ResetEntry>, InfraError> {
    state.streak.initialize().await?;
    state.streak.history()
}

pub async fn reset_streak_impl(state: &AppState, trigger: Option<String>) -> Result<(), InfraError> {
    state.streak.initialize().await?;
    state.streak.reset(trigger).await
}

pub async fn mark_celebration_shown_impl(state: &AppState) -> Result<(), InfraError> {
    state.streak.initialize().await?;
    state.streak.mark_celebration_shown().await
}

pub async fn enter_dev_mode_impl(
    state: &AppState,
    date: Option<String>,
    days: Option<u32>,
) -> Result<StreakStatusResponse, InfraError> {
    state.streak.initialize().await?;
    let dev_start_date = resolve_dev_start(state, date, days)?;
    state.streak.enter_dev_mode(dev_start_date).await?;
    get_streak_status_impl(state).await
}

pub async fn update_dev_start_date_impl(
    state: &AppState,
    date: Option<String>,
    days: Option<u32>,
) -> Result<StreakStatusResponse, InfraError> {
    state.streak.initialize().await?;
    let dev_start_date = resolve_dev_start(state, date, days)?;
    state.streak.update_dev_start_date(dev_start_date).await?;
    get_streak_status_impl(state).await
}

pub async fn exit_dev_mode_impl(state: &AppState) -> Result<StreakStatusResponse, InfraError> {
    state.streak.initialize().await?;
    state.streak.exit_dev_mode().await?;
    get_streak_status_impl(state).await
}

/// Feeds the dev-menu unlock gesture. Returns true when the tap burst
/// completed and the dev menu should open.
pub fn record_dev_tap_impl(state: &AppState) -> Result<bool, InfraError> {
    let mut gesture = state
        .gesture
        .lock()
        .map_err(|error| InfraError::Storage(format!("gesture lock poisoned: {error}")))?;
    Ok(gesture.record_tap(Utc::now()))
}

pub fn list_dev_presets_impl(state: &AppState) -> Vec<DevPresetResponse> {
    DEV_PRESETS
        .iter()
        .map(|preset| DevPresetResponse {
            label: preset.label.to_string(),
            days: preset.days,
            is_milestone: preset.is_milestone,
            start_date: state.streak.start_date_for_days(preset.days).to_rfc3339(),
        })
        .collect()
}

pub fn list_trigger_suggestions_impl() -> Vec<String> {
    TRIGGER_SUGGESTIONS
        .iter()
        .map(|suggestion| suggestion.to_string())
        .collect()
}

pub async fn list_milestones_impl(state: &AppState) -> Result<Vec<MilestoneMarker>, InfraError> {
    state.streak.initialize().await?;
    let countdown = state.streak.countdown()?;
    Ok(milestone_markers(countdown.days))
}

pub async fn clear_all_data_impl(state: &AppState) -> Result<(), InfraError> {
    state.streak.clear_all_data().await
}

fn resolve_dev_start(
    state: &AppState,
    date: Option<String>,
    days: Option<u32>,
) -> Result<DateTime<Utc>, InfraError> {
    if let Some(raw) = date {
        return parse_datetime_input(&raw, "date");
    }
    if let Some(days) = days {
        return Ok(state.streak.start_date_for_days(days));
    }
    Err(InfraError::InvalidConfig(
        "either date or days is required".to_string(),
    ))
}

fn parse_datetime_input(raw: &str, field_name: &str) -> Result<DateTime<Utc>, InfraError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| {
            InfraError::InvalidConfig(format!("{field_name} must be RFC 3339: {error}"))
        })
}
