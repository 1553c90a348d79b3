mod application;
mod domain;
mod infrastructure;

#[cfg(feature = "gui")]
pub use gui::run;

#[cfg(feature = "gui")]
mod gui {
use crate::application::bootstrap::bootstrap_workspace;
use crate::application::commands::{
    AppState, DevPresetResponse, StreakStatusResponse, clear_all_data_impl, enter_dev_mode_impl,
    exit_dev_mode_impl, get_countdown_impl, get_history_impl, get_streak_status_impl,
    list_dev_presets_impl, list_milestones_impl, list_trigger_suggestions_impl,
    mark_celebration_shown_impl, record_dev_tap_impl, reset_streak_impl,
    update_dev_start_date_impl,
};
use crate::application::ticker::{CountdownTicker, TICK_INTERVAL};
use crate::domain::countdown::MilestoneMarker;
use crate::domain::models::{CountdownValue, ResetEntry};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::{Emitter, Manager};

#[derive(Debug, Serialize)]
struct BootstrapResponse {
    workspace_root: String,
    database_path: String,
}

#[tauri::command]
fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = match root {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };

    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        database_path: result.database_path.display().to_string(),
    })
}

#[tauri::command]
fn ping() -> &'static str {
    "pong"
}

#[tauri::command]
async fn get_countdown(state: tauri::State<'_, AppState>) -> Result<CountdownValue, String> {
    get_countdown_impl(state.inner())
        .await
        .map_err(|error| state.command_error("get_countdown", &error))
}

#[tauri::command]
async fn get_streak_status(
    state: tauri::State<'_, AppState>,
) -> Result<StreakStatusResponse, String> {
    get_streak_status_impl(state.inner())
        .await
        .map_err(|error| state.command_error("get_streak_status", &error))
}

#[tauri::command]
async fn get_history(state: tauri::State<'_, AppState>) -> Result<Vec<ResetEntry>, String> {
    get_history_impl(state.inner())
        .await
        .map_err(|error| state.command_error("get_history", &error))
}

#[tauri::command]
async fn reset_streak(
    state: tauri::State<'_, AppState>,
    trigger: Option<String>,
) -> Result<(), String> {
    reset_streak_impl(state.inner(), trigger)
        .await
        .map_err(|error| state.command_error("reset_streak", &error))
}

#[tauri::command]
async fn mark_celebration_shown(state: tauri::State<'_, AppState>) -> Result<(), String> {
    mark_celebration_shown_impl(state.inner())
        .await
        .map_err(|error| state.command_error("mark_celebration_shown", &error))
}

#[tauri::command]
async fn enter_dev_mode(
    state: tauri::State<'_, AppState>,
    date: Option<String>,
    days: Option<u32>,
) -> Result<StreakStatusResponse, String> {
    enter_dev_mode_impl(state.inner(), date, days)
        .await
        .map_err(|error| state.command_error("enter_dev_mode", &error))
}

#[tauri::command]
async fn update_dev_start_date(
    state: tauri::State<'_, AppState>,
    date: Option<String>,
    days: Option<u32>,
) -> Result<StreakStatusResponse, String> {
    update_dev_start_date_impl(state.inner(), date, days)
        .await
        .map_err(|error| state.command_error("update_dev_start_date", &error))
}

#[tauri::command]
async fn exit_dev_mode(state: tauri::State<'_, AppState>) -> Result<StreakStatusResponse, String> {
    exit_dev_mode_impl(state.inner())
        .await
        .map_err(|error| state.command_error("exit_dev_mode", &error))
}

#[tauri::command]
fn record_dev_tap(state: tauri::State<'_, AppState>) -> Result<bool, String> {
    record_dev_tap_impl(state.inner())
        .map_err(|error| state.command_error("record_dev_tap", &error))
}

#[tauri::command]
fn list_dev_presets(state: tauri::State<'_, AppState>) -> Vec<DevPresetResponse> {
    list_dev_presets_impl(state.inner())
}

#[tauri::command]
fn list_trigger_suggestions() -> Vec<String> {
    list_trigger_suggestions_impl()
}

#[tauri::command]
async fn list_milestones(
    state: tauri::State<'_, AppState>,
) -> Result<Vec<MilestoneMarker>, String> {
    list_milestones_impl(state.inner())
        .await
        .map_err(|error| state.command_error("list_milestones", &error))
}

#[tauri::command]
async fn clear_all_data(state: tauri::State<'_, AppState>) -> Result<(), String> {
    clear_all_data_impl(state.inner())
        .await
        .map_err(|error| state.command_error("clear_all_data", &error))
}

pub fn run() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let workspace_root = std::env::current_dir().expect("failed to resolve current directory");
    let app_state = AppState::new(workspace_root).expect("failed to initialize app state");

    tauri::Builder::default()
        .manage(app_state)
        .setup(|app| {
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                let streak = Arc::clone(handle.state::<AppState>().streak());
                if let Err(error) = streak.initialize().await {
                    tracing::error!(%error, "streak initialization failed");
                }

                let ticker = CountdownTicker::spawn(streak, TICK_INTERVAL);
                let mut updates = ticker.subscribe();
                while updates.changed().await.is_ok() {
                    let countdown = updates.borrow().clone();
                    if handle.emit("countdown://tick", &countdown).is_err() {
                        break;
                    }
                }
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            ping,
            bootstrap,
            get_countdown,
            get_streak_status,
            get_history,
            reset_streak,
            mark_celebration_shown,
            enter_dev_mode,
            update_dev_start_date,
            exit_dev_mode,
            record_dev_tap,
            list_dev_presets,
            list_trigger_suggestions,
            list_milestones,
            clear_all_data
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}
}
