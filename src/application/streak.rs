use crate::domain::countdown::{calculate_countdown, start_date_for_elapsed_days};
use crate::domain::models::{
    CountdownValue, DevModeState, ResetEntry, TimerState, normalize_trigger,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::key_value_store::KeyValueStore;
use crate::infrastructure::streak_repository::StreakRepository;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct StreakRuntime {
    start_date: Option<DateTime<Utc>>,
    history: Vec<ResetEntry>,
    celebration_shown: bool,
    is_dev_mode: bool,
    dev_start_date: Option<DateTime<Utc>>,
    // Real start captured when dev mode was entered, for exact restoration.
    real_start_date: Option<DateTime<Utc>>,
    initialized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreakStatus {
    pub start_date: Option<DateTime<Utc>>,
    pub effective_start_date: Option<DateTime<Utc>>,
    pub celebration_shown: bool,
    pub is_dev_mode: bool,
    pub dev_start_date: Option<DateTime<Utc>>,
    pub initialized: bool,
}

/// The streak state machine. Owns the authoritative start instant (real or
/// dev-mode override), mediates resets and celebration acknowledgment, and
/// is the sole writer of persisted timer records.
///
/// Persistence failures are non-fatal: the in-memory state always applies,
/// the failed write is logged, and the last successfully persisted record
/// wins after a restart.
pub struct StreakService<K: KeyValueStore> {
    repository: Arc<StreakRepository<K>>,
    runtime: Mutex<StreakRuntime>,
    init_guard: tokio::sync::Mutex<()>,
    now_provider: NowProvider,
}

impl<K: KeyValueStore> StreakService<K> {
    pub fn new(repository: Arc<StreakRepository<K>>) -> Self {
        Self {
            repository,
            runtime: Mutex::new(StreakRuntime::default()),
            init_guard: tokio::sync::Mutex::new(()),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Loads persisted state, creating and persisting a fresh start instant
    /// on first launch. Safe against concurrent double-initialization: the
    /// second caller waits on the guard and finds the work already done.
    pub async fn initialize(&self) -> Result<(), InfraError> {
        let _guard = self.init_guard.lock().await;
        if self.lock_runtime()?.initialized {
            return Ok(());
        }

        let loaded_start = self.repository.load_timer_state().await.map(|state| state.start_date);
        let history = self.repository.load_history().await;
        let dev_mode = self.repository.load_dev_mode().await;

        let (start_date, celebration_shown) = match loaded_start {
            Some(start) => (start, self.repository.celebration_shown(start).await),
            None => {
                let now = self.now();
                if let Err(error) = self
                    .repository
                    .save_timer_state(&TimerState { start_date: now })
                    .await
                {
                    warn!(%error, "failed persisting initial timer state");
                }
                (now, false)
            }
        };

        let mut runtime = self.lock_runtime()?;
        runtime.start_date = Some(start_date);
        runtime.history = history;
        runtime.celebration_shown = celebration_shown;
        if let Some(dev) = dev_mode.filter(|state| state.is_active) {
            runtime.is_dev_mode = true;
            runtime.dev_start_date = Some(dev.dev_start_date);
            runtime.real_start_date = loaded_start;
        }
        runtime.initialized = true;
        info!(start_date = %start_date.to_rfc3339(), "streak state initialized");
        Ok(())
    }

    /// Ends the current streak: records a history entry with the streak
    /// length and optional trigger note, then restarts the streak from now.
    /// Silently ignored when no streak exists.
    pub async fn reset(&self, trigger: Option<String>) -> Result<(), InfraError> {
        let now = self.now();
        let entry = {
            let runtime = self.lock_runtime()?;
            let Some(start_date) = runtime.start_date else {
                return Ok(());
            };
            let streak_days = (now - start_date).num_days().max(0) as u32;
            ResetEntry {
                id: Uuid::new_v4().to_string(),
                reset_date: now,
                trigger: normalize_trigger(trigger.as_deref()),
                streak_days,
            }
        };

        if let Err(error) = self.repository.append_history_entry(&entry).await {
            warn!(%error, "failed persisting reset history entry");
        }
        if let Err(error) = self
            .repository
            .save_timer_state(&TimerState { start_date: now })
            .await
        {
            warn!(%error, "failed persisting timer state after reset");
        }

        let mut runtime = self.lock_runtime()?;
        runtime.history.insert(0, entry);
        runtime.history.truncate(self.repository.max_history_entries());
        runtime.start_date = Some(now);
        runtime.celebration_shown = false;
        info!(streak_days = runtime.history[0].streak_days, "streak reset");
        Ok(())
    }

    /// Records that the 90-day celebration was presented for the current
    /// streak. Idempotent; silently ignored when no streak exists.
    pub async fn mark_celebration_shown(&self) -> Result<(), InfraError> {
        let start_date = {
            let runtime = self.lock_runtime()?;
            let Some(start_date) = runtime.start_date else {
                return Ok(());
            };
            start_date
        };

        if let Err(error) = self.repository.mark_celebration_shown(start_date).await {
            warn!(%error, "failed persisting celebration acknowledgment");
        }
        self.lock_runtime()?.celebration_shown = true;
        Ok(())
    }

    /// Activates dev mode with a synthetic start instant. The real start
    /// instant is saved aside untouched and restored on exit.
    pub async fn enter_dev_mode(&self, dev_start_date: DateTime<Utc>) -> Result<(), InfraError> {
        let now = self.now();
        {
            let mut runtime = self.lock_runtime()?;
            runtime.real_start_date = runtime.start_date;
            runtime.dev_start_date = Some(dev_start_date);
            runtime.is_dev_mode = true;
        }

        let record = DevModeState {
            is_active: true,
            dev_start_date,
            activated_at: now,
        };
        if let Err(error) = self.repository.save_dev_mode(&record).await {
            warn!(%error, "failed persisting dev mode state");
        }
        info!(dev_start_date = %dev_start_date.to_rfc3339(), "entered dev mode");
        Ok(())
    }

    /// Replaces the dev-mode start instant. Silently ignored outside dev
    /// mode.
    pub async fn update_dev_start_date(&self, dev_start_date: DateTime<Utc>) -> Result<(), InfraError> {
        let now = self.now();
        {
            let mut runtime = self.lock_runtime()?;
            if !runtime.is_dev_mode {
                return Ok(());
            }
            runtime.dev_start_date = Some(dev_start_date);
        }

        let record = DevModeState {
            is_active: true,
            dev_start_date,
            activated_at: now,
        };
        if let Err(error) = self.repository.save_dev_mode(&record).await {
            warn!(%error, "failed persisting dev mode state");
        }
        Ok(())
    }

    /// Deactivates dev mode and restores the saved real start instant. If
    /// none was captured the effective start becomes absent, which the UI
    /// surfaces as an uninitialized timer rather than an error.
    pub async fn exit_dev_mode(&self) -> Result<(), InfraError> {
        {
            let mut runtime = self.lock_runtime()?;
            runtime.start_date = runtime.real_start_date;
            runtime.is_dev_mode = false;
            runtime.dev_start_date = None;
            runtime.real_start_date = None;
        }

        if let Err(error) = self.repository.clear_dev_mode().await {
            warn!(%error, "failed clearing dev mode state");
        }
        info!("exited dev mode");
        Ok(())
    }

    /// Removes every persisted record and re-runs first-launch
    /// initialization.
    pub async fn clear_all_data(&self) -> Result<(), InfraError> {
        self.repository.clear_all().await?;
        {
            let mut runtime = self.lock_runtime()?;
            *runtime = StreakRuntime::default();
        }
        self.initialize().await
    }

    /// The instant the countdown displays from: the dev-mode override when
    /// active, the real start otherwise.
    pub fn effective_start_date(&self) -> Result<Option<DateTime<Utc>>, InfraError> {
        let runtime = self.lock_runtime()?;
        Ok(if runtime.is_dev_mode {
            runtime.dev_start_date
        } else {
            runtime.start_date
        })
    }

    pub fn countdown(&self) -> Result<CountdownValue, InfraError> {
        Ok(calculate_countdown(self.effective_start_date()?, self.now()))
    }

    pub fn history(&self) -> Result<Vec<ResetEntry>, InfraError> {
        Ok(self.lock_runtime()?.history.clone())
    }

    pub fn status(&self) -> Result<StreakStatus, InfraError> {
        let runtime = self.lock_runtime()?;
        let effective_start_date = if runtime.is_dev_mode {
            runtime.dev_start_date
        } else {
            runtime.start_date
        };
        Ok(StreakStatus {
            start_date: runtime.start_date,
            effective_start_date,
            celebration_shown: runtime.celebration_shown,
            is_dev_mode: runtime.is_dev_mode,
            dev_start_date: runtime.dev_start_date,
            initialized: runtime.initialized,
        })
    }

    /// Start instant that would show `days` elapsed days right now; used by
    /// the dev menu presets.
    pub fn start_date_for_days(&self, days: u32) -> DateTime<Utc> {
        start_date_for_elapsed_days(self.now(), days)
    }

    fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    fn lock_runtime(&self) -> Result<MutexGuard<'_, StreakRuntime>, InfraError> {
        self.runtime
            .lock()
            .map_err(|error| InfraError::Storage(format!("streak runtime lock poisoned: {error}")))
    }
}
