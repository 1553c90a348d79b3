use crate::domain::models::{DevModeState, ResetEntry, TimerState};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::key_value_store::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

const TIMER_STATE_KEY: &str = "timer_state";
const RESET_HISTORY_KEY: &str = "reset_history";
const CELEBRATION_SHOWN_KEY: &str = "celebration_shown";
const DEV_MODE_KEY: &str = "dev_mode_state";

pub const DEFAULT_MAX_HISTORY_ENTRIES: usize = 100;

/// Typed accessors over the key-value store for the four persisted record
/// kinds. Reads fail soft: a storage error or malformed payload is logged
/// and reported as the record being absent, so display code degrades
/// instead of crashing. History mutations are serialized through an
/// exclusive lock held from read to durable write.
pub struct StreakRepository<K: KeyValueStore> {
    store: Arc<K>,
    max_history_entries: usize,
    history_lock: Mutex<()>,
}

impl<K: KeyValueStore> StreakRepository<K> {
    pub fn new(store: Arc<K>) -> Self {
        Self {
            store,
            max_history_entries: DEFAULT_MAX_HISTORY_ENTRIES,
            history_lock: Mutex::new(()),
        }
    }

    pub fn with_max_history_entries(mut self, max_history_entries: usize) -> Self {
        self.max_history_entries = max_history_entries.max(1);
        self
    }

    pub fn max_history_entries(&self) -> usize {
        self.max_history_entries
    }

    pub async fn load_timer_state(&self) -> Option<TimerState> {
        self.read_record(TIMER_STATE_KEY).await
    }

    pub async fn save_timer_state(&self, state: &TimerState) -> Result<(), InfraError> {
        self.write_record(TIMER_STATE_KEY, state).await
    }

    pub async fn load_history(&self) -> Vec<ResetEntry> {
        self.read_record(RESET_HISTORY_KEY).await.unwrap_or_default()
    }

    /// Prepends `entry` to the persisted history (newest first), evicting
    /// the oldest entries beyond the retention cap. The whole
    /// read-modify-write cycle runs under the history lock so concurrent
    /// appends queue up instead of overwriting each other.
    pub async fn append_history_entry(&self, entry: &ResetEntry) -> Result<(), InfraError> {
        entry.validate().map_err(InfraError::InvalidConfig)?;
        let _guard = self.history_lock.lock().await;
        let mut history: Vec<ResetEntry> =
            self.read_record(RESET_HISTORY_KEY).await.unwrap_or_default();
        history.insert(0, entry.clone());
        history.truncate(self.max_history_entries);
        self.write_record(RESET_HISTORY_KEY, &history).await
    }

    pub async fn celebration_shown(&self, streak_start: DateTime<Utc>) -> bool {
        let shown: Vec<String> = self.read_record(CELEBRATION_SHOWN_KEY).await.unwrap_or_default();
        shown.contains(&streak_start.to_rfc3339())
    }

    /// Records that the celebration was presented for the streak starting
    /// at `streak_start`. Idempotent: re-marking a known streak is a no-op.
    pub async fn mark_celebration_shown(&self, streak_start: DateTime<Utc>) -> Result<(), InfraError> {
        let mut shown: Vec<String> =
            self.read_record(CELEBRATION_SHOWN_KEY).await.unwrap_or_default();
        let key = streak_start.to_rfc3339();
        if shown.contains(&key) {
            return Ok(());
        }
        shown.push(key);
        self.write_record(CELEBRATION_SHOWN_KEY, &shown).await
    }

    pub async fn load_dev_mode(&self) -> Option<DevModeState> {
        self.read_record(DEV_MODE_KEY).await
    }

    pub async fn save_dev_mode(&self, state: &DevModeState) -> Result<(), InfraError> {
        self.write_record(DEV_MODE_KEY, state).await
    }

    pub async fn clear_dev_mode(&self) -> Result<(), InfraError> {
        self.store.remove(DEV_MODE_KEY).await
    }

    pub async fn clear_all(&self) -> Result<(), InfraError> {
        let _guard = self.history_lock.lock().await;
        self.store.remove(TIMER_STATE_KEY).await?;
        self.store.remove(RESET_HISTORY_KEY).await?;
        self.store.remove(CELEBRATION_SHOWN_KEY).await?;
        self.store.remove(DEV_MODE_KEY).await?;
        Ok(())
    }

    async fn read_record<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(value) => value?,
            Err(error) => {
                warn!(key, %error, "storage read failed; treating record as absent");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, %error, "malformed record; treating as absent");
                None
            }
        }
    }

    async fn write_record<T: Serialize>(&self, key: &str, value: &T) -> Result<(), InfraError> {
        let payload = serde_json::to_string(value)?;
        self.store.set(key, &payload).await
    }
}
