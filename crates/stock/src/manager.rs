//! Poll loop: fetch → dedup → normalize → evaluate → publish.
//!
//! One task owns the manager and runs polls strictly one after another,
//! so the restock tracker needs no lock. Readers go through a
//! `StockHandle`, which only ever sees whole snapshots.

use std::sync::Arc;
use std::time::Duration;

use common::config::{TimerlessPolicy, WatchConfig};
use common::{ShopContainer, WantedItem};
use gag_client::StockFetcher;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::{Cache, UpdateCallback};
use crate::normalize::normalize;
use crate::restock::{RestockState, RestockTracker};

/// What readers and subscribers receive after each accepted poll.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StockUpdate {
    pub container: Arc<ShopContainer>,
    /// Watched items that became eligible on this poll.
    pub restocked: Arc<Vec<WantedItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The fetch failed; nothing changed.
    Failed,
    /// Upstream had not refreshed since the last accepted poll.
    Unchanged,
    /// A new snapshot was published.
    Applied { restocked: Vec<WantedItem> },
}

#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub interval: Duration,
    pub watch_list: Vec<String>,
    pub force: bool,
    pub timerless_policy: TimerlessPolicy,
}

impl ManagerSettings {
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.polling.interval_secs),
            watch_list: config.watch_list.clone(),
            force: config.polling.force_notify,
            timerless_policy: config.polling.timerless_policy,
        }
    }
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

/// Cheap, cloneable read access to the latest snapshot.
#[derive(Clone)]
pub struct StockHandle {
    cache: Arc<Cache<StockUpdate>>,
}

impl StockHandle {
    pub async fn current(&self) -> StockUpdate {
        self.cache.get().await
    }

    pub async fn container(&self) -> Arc<ShopContainer> {
        self.cache.get().await.container
    }
}

pub struct StockManager<F> {
    fetcher: F,
    cache: Arc<Cache<StockUpdate>>,
    tracker: RestockTracker,
    settings: ManagerSettings,
    last_fetch_id: Option<i64>,
}

impl<F: StockFetcher> StockManager<F> {
    /// Build an idle manager holding an empty snapshot.
    pub fn new(
        fetcher: F,
        settings: ManagerSettings,
        on_update: Option<UpdateCallback<StockUpdate>>,
    ) -> Self {
        let cache = match on_update {
            Some(cb) => Cache::with_callback(StockUpdate::default(), cb),
            None => Cache::new(StockUpdate::default()),
        };

        Self {
            fetcher,
            cache: Arc::new(cache),
            tracker: RestockTracker::new(settings.timerless_policy),
            settings,
            last_fetch_id: None,
        }
    }

    /// Build a manager and run the first poll before returning, so readers
    /// start from real data whenever upstream is reachable.
    pub async fn start(
        fetcher: F,
        settings: ManagerSettings,
        on_update: Option<UpdateCallback<StockUpdate>>,
    ) -> Self {
        let mut manager = Self::new(fetcher, settings, on_update);
        if manager.poll_once().await == PollOutcome::Failed {
            warn!("Initial stock poll failed; serving an empty snapshot until the next tick");
        }
        manager
    }

    pub fn handle(&self) -> StockHandle {
        StockHandle {
            cache: self.cache.clone(),
        }
    }

    pub fn restock_state(&self) -> &RestockState {
        self.tracker.state()
    }

    pub fn last_fetch_id(&self) -> Option<i64> {
        self.last_fetch_id
    }

    /// Run one poll to completion.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let raw = match self.fetcher.fetch().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to refresh stock: {}", e);
                return PollOutcome::Failed;
            }
        };

        if self.last_fetch_id == Some(raw.fetch_id) {
            debug!("Stock unchanged (fetch id {})", raw.fetch_id);
            return PollOutcome::Unchanged;
        }

        let container = normalize(&raw);
        let restocked = self
            .tracker
            .evaluate(&self.settings.watch_list, &container, self.settings.force);
        self.last_fetch_id = Some(raw.fetch_id);

        info!(
            "Applied stock fetch {}: {} shops, {} watched items restocked",
            raw.fetch_id,
            container.shops().count(),
            restocked.len()
        );

        self.cache
            .set(StockUpdate {
                container: Arc::new(container),
                restocked: Arc::new(restocked.clone()),
            })
            .await;

        PollOutcome::Applied { restocked }
    }

    /// Poll on every tick until `shutdown` flips to true or its sender drops.
    ///
    /// The first tick fires one interval from now; `start` covers time zero.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.settings.interval;
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Stock manager polling every {:?}", period);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tick.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Stock manager stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()>
    where
        F: 'static,
    {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Category, CategoryRefresh, Error, RawStockSnapshot, StockItem};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed sequence of fetch results, then fails.
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<RawStockSnapshot, Error>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<RawStockSnapshot, Error>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl StockFetcher for ScriptedFetcher {
        async fn fetch(&self) -> Result<RawStockSnapshot, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Other("script exhausted".into())))
        }
    }

    fn snapshot(fetch_id: i64, seeds: &[(&str, i64)], seeds_refresh: i64) -> RawStockSnapshot {
        let mut raw = RawStockSnapshot {
            fetch_id,
            timer_calculated_at: seeds_refresh,
            ..Default::default()
        };
        raw.categories.insert(
            Category::Seeds,
            seeds
                .iter()
                .map(|(name, value)| StockItem {
                    name: name.to_string(),
                    value: *value,
                })
                .collect(),
        );
        raw.categories.insert(Category::Easter, Vec::new());
        raw.category_refresh.insert(
            Category::Seeds,
            CategoryRefresh {
                last_refresh_epoch: seeds_refresh,
                expecting_update: false,
            },
        );
        raw.restock_interval_ms.insert(Category::Seeds, 300_000);
        raw
    }

    fn settings(watch: &[&str]) -> ManagerSettings {
        ManagerSettings {
            interval: Duration::from_secs(60),
            watch_list: watch.iter().map(|s| s.to_string()).collect(),
            force: false,
            timerless_policy: TimerlessPolicy::Always,
        }
    }

    fn restocked_names(outcome: &PollOutcome) -> Vec<String> {
        match outcome {
            PollOutcome::Applied { restocked } => {
                restocked.iter().map(|i| i.name.clone()).collect()
            }
            other => panic!("expected Applied, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_populates_cache() {
        let fetcher = ScriptedFetcher::new(vec![Ok(snapshot(1, &[("Mushroom", 3)], 1000))]);
        let manager = StockManager::start(fetcher, settings(&["Mushroom"]), None).await;

        let current = manager.handle().current().await;
        assert_eq!(current.container.shop(Category::Seeds).unwrap().quantity_of("Mushroom"), 3);
        assert_eq!(current.restocked.len(), 1);
        assert_eq!(manager.last_fetch_id(), Some(1));
    }

    #[tokio::test]
    async fn test_failed_start_serves_empty_snapshot() {
        let fetcher = ScriptedFetcher::new(vec![Err(Error::Http("connection refused".into()))]);
        let manager = StockManager::start(fetcher, settings(&["Mushroom"]), None).await;

        let current = manager.handle().current().await;
        assert!(current.container.is_empty());
        assert!(current.restocked.is_empty());
        assert!(!manager.restock_state().first_run_completed());
    }

    #[tokio::test]
    async fn test_repeated_fetch_id_is_ignored() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(snapshot(1, &[("Mushroom", 3)], 1000)),
            // Same fetch id, different payload: must be discarded wholesale.
            Ok(snapshot(1, &[("Mushroom", 9)], 5000)),
        ]);
        let mut manager = StockManager::new(fetcher, settings(&["Mushroom"]), None);

        manager.poll_once().await;
        let before = manager.handle().current().await;
        let state_before = manager.restock_state().clone();

        assert_eq!(manager.poll_once().await, PollOutcome::Unchanged);

        let after = manager.handle().current().await;
        assert!(Arc::ptr_eq(&before.container, &after.container));
        assert_eq!(manager.restock_state(), &state_before);
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_previous_state() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(snapshot(1, &[("Mushroom", 3)], 1000)),
            Err(Error::UpstreamStatus {
                status: 502,
                body: "bad gateway".into(),
            }),
        ]);
        let mut manager = StockManager::new(fetcher, settings(&["Mushroom"]), None);

        manager.poll_once().await;
        let before = manager.handle().current().await;
        let state_before = manager.restock_state().clone();

        assert_eq!(manager.poll_once().await, PollOutcome::Failed);

        let after = manager.handle().current().await;
        assert!(Arc::ptr_eq(&before.container, &after.container));
        assert_eq!(manager.restock_state(), &state_before);
        assert_eq!(manager.last_fetch_id(), Some(1));
    }

    #[tokio::test]
    async fn test_restock_cycle_through_callback() {
        let announced = Arc::new(Mutex::new(Vec::new()));
        let sink = announced.clone();
        let on_update: UpdateCallback<StockUpdate> = Box::new(move |update: &StockUpdate| {
            sink.lock().unwrap().push(update.restocked.len());
        });

        let fetcher = ScriptedFetcher::new(vec![
            Ok(snapshot(1, &[("Mushroom", 3)], 1000)),
            Ok(snapshot(2, &[("Mushroom", 3)], 1000)),
            Ok(snapshot(3, &[("Mushroom", 5)], 2000)),
        ]);
        let mut manager = StockManager::new(fetcher, settings(&["Mushroom"]), Some(on_update));

        assert_eq!(restocked_names(&manager.poll_once().await), vec!["Mushroom"]);
        assert!(restocked_names(&manager.poll_once().await).is_empty());

        match manager.poll_once().await {
            PollOutcome::Applied { restocked } => {
                assert_eq!(restocked.len(), 1);
                assert_eq!(restocked[0].quantity, 5);
            }
            other => panic!("expected Applied, got {:?}", other),
        }

        assert_eq!(*announced.lock().unwrap(), vec![1, 0, 1]);
        assert_eq!(manager.restock_state().recorded_epoch(Category::Seeds), Some(2000));
    }

    #[tokio::test]
    async fn test_force_announces_every_poll() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(snapshot(1, &[("Mushroom", 3)], 1000)),
            Ok(snapshot(2, &[("Mushroom", 3)], 1000)),
        ]);
        let mut cfg = settings(&["Mushroom"]);
        cfg.force = true;
        let mut manager = StockManager::new(fetcher, cfg, None);

        assert_eq!(restocked_names(&manager.poll_once().await).len(), 1);
        assert_eq!(restocked_names(&manager.poll_once().await).len(), 1);
    }

    #[tokio::test]
    async fn test_extreme_timer_values_still_apply() {
        let mut raw = snapshot(1, &[("Mushroom", 3)], 1000);
        raw.timer_calculated_at = i64::MAX - 10;
        let fetcher = ScriptedFetcher::new(vec![Ok(raw)]);
        let mut manager = StockManager::new(fetcher, settings(&["Mushroom"]), None);

        assert_eq!(restocked_names(&manager.poll_once().await), vec!["Mushroom"]);
        let container = manager.handle().container().await;
        let seeds = container.shop(Category::Seeds).unwrap();
        assert_eq!(seeds.predicted_restock_epoch, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_on_each_tick_until_shutdown() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(snapshot(1, &[("Mushroom", 3)], 1000)),
            Ok(snapshot(2, &[("Mushroom", 3)], 2000)),
        ]);
        let calls = fetcher.calls.clone();
        let manager = StockManager::start(fetcher, settings(&["Mushroom"]), None).await;
        let handle = manager.handle();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = manager.spawn(shutdown_rx);

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(handle.container().await.fetch_epoch(), 2);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
