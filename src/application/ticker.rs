use crate::application::streak::StreakService;
use crate::domain::models::CountdownValue;
use crate::infrastructure::key_value_store::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic countdown recomputation. Publishes a fresh snapshot once
/// immediately and then on every tick, stopping deterministically when all
/// subscribers are gone or the effective start instant becomes absent.
pub struct CountdownTicker {
    receiver: watch::Receiver<CountdownValue>,
    handle: JoinHandle<()>,
}

impl CountdownTicker {
    pub fn spawn<K: KeyValueStore + 'static>(
        service: Arc<StreakService<K>>,
        tick: Duration,
    ) -> Self {
        let initial = service.countdown().unwrap_or_else(|_| CountdownValue::zero());
        let (sender, receiver) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.tick().await;
            loop {
                interval.tick().await;
                if sender.is_closed() {
                    break;
                }
                let start_present = service
                    .effective_start_date()
                    .ok()
                    .flatten()
                    .is_some();
                let countdown = match service.countdown() {
                    Ok(value) => value,
                    Err(_) => break,
                };
                if sender.send(countdown).is_err() {
                    break;
                }
                if !start_present {
                    break;
                }
            }
        });

        Self { receiver, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<CountdownValue> {
        self.receiver.clone()
    }

    pub fn latest(&self) -> CountdownValue {
        self.receiver.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::streak::NowProvider;
    use crate::infrastructure::key_value_store::InMemoryKeyValueStore;
    use crate::infrastructure::streak_repository::StreakRepository;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use tokio::time::timeout;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn clock(start: DateTime<Utc>) -> (Arc<Mutex<DateTime<Utc>>>, NowProvider) {
        let now = Arc::new(Mutex::new(start));
        let shared = Arc::clone(&now);
        let provider: NowProvider = Arc::new(move || *shared.lock().expect("clock lock"));
        (now, provider)
    }

    async fn initialized_service(
        start: DateTime<Utc>,
    ) -> (Arc<Mutex<DateTime<Utc>>>, Arc<StreakService<InMemoryKeyValueStore>>) {
        let (now, provider) = clock(start);
        let store = Arc::new(InMemoryKeyValueStore::default());
        let service = Arc::new(
            StreakService::new(Arc::new(StreakRepository::new(store))).with_now_provider(provider),
        );
        service.initialize().await.expect("initialize");
        (now, service)
    }

    #[tokio::test]
    async fn publishes_an_immediate_snapshot() {
        let (_, service) = initialized_service(fixed_time("2026-02-16T09:00:00Z")).await;
        let ticker = CountdownTicker::spawn(service, Duration::from_millis(10));

        assert_eq!(ticker.latest().total_seconds, 0);
        ticker.stop();
    }

    #[tokio::test]
    async fn publishes_recomputed_values_on_ticks() {
        let (now, service) = initialized_service(fixed_time("2026-02-16T09:00:00Z")).await;
        let ticker = CountdownTicker::spawn(service, Duration::from_millis(10));
        let mut updates = ticker.subscribe();

        {
            let mut current = now.lock().expect("clock lock");
            *current = *current + chrono::Duration::seconds(42);
        }

        timeout(Duration::from_secs(2), async {
            loop {
                updates.changed().await.expect("sender alive");
                if updates.borrow().total_seconds == 42 {
                    break;
                }
            }
        })
        .await
        .expect("recomputed value before timeout");
        ticker.stop();
    }

    #[tokio::test]
    async fn exits_when_start_instant_is_absent() {
        let (_, provider) = clock(fixed_time("2026-02-16T09:00:00Z"));
        let store = Arc::new(InMemoryKeyValueStore::default());
        // Never initialized: no start instant exists.
        let service = Arc::new(
            StreakService::new(Arc::new(StreakRepository::new(store))).with_now_provider(provider),
        );

        let ticker = CountdownTicker::spawn(service, Duration::from_millis(10));
        let mut updates = ticker.subscribe();
        let _ = timeout(Duration::from_secs(2), updates.changed()).await;

        timeout(Duration::from_secs(2), async {
            while ticker.is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("ticker stopped after publishing the zero value");
    }

    #[tokio::test]
    async fn stop_aborts_the_loop() {
        let (_, service) = initialized_service(fixed_time("2026-02-16T09:00:00Z")).await;
        let ticker = CountdownTicker::spawn(service, Duration::from_millis(10));

        ticker.stop();
        timeout(Duration::from_secs(2), async {
            while ticker.is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("ticker stopped after abort");
    }
}
