//! Liveness sweeper
//!
//! Every `interval` the sweeper looks for participants whose last heartbeat is
//! older than the staleness window, posts a departure notice for each of them
//! and removes them from the directory. It runs on its own task, independent of
//! request traffic, and talks to the same storage handles as the handlers.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::models::{clock_time, now_millis, Message};
use crate::store::{MessageLog, ParticipantDirectory, StoreError};

/// Timing of the liveness sweep
#[derive(Debug, Clone, Copy)]
pub struct SweeperConfig {
    /// Time between two ticks
    pub interval: Duration,
    /// Participants silent for longer than this are pruned
    pub staleness_window: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            staleness_window: Duration::from_secs(10),
        }
    }
}

impl From<&Config> for SweeperConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.sweep_interval(),
            staleness_window: config.staleness_window(),
        }
    }
}

/// Outcome of a single tick
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Participants found expired (and sent a departure notice attempt)
    pub expired: Vec<String>,
    /// Departure notices that could not be appended
    pub failed_notices: usize,
    /// Rows actually removed from the directory
    pub removed: u64,
}

#[derive(Clone)]
pub struct LivenessSweeper {
    directory: Arc<dyn ParticipantDirectory>,
    log: Arc<dyn MessageLog>,
    config: SweeperConfig,
}

impl LivenessSweeper {
    pub fn new(
        directory: Arc<dyn ParticipantDirectory>,
        log: Arc<dyn MessageLog>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            directory,
            log,
            config,
        }
    }

    /// Cut-off below which a `lastStatus` counts as expired at `now_ms`
    pub fn threshold(&self, now_ms: i64) -> i64 {
        let window = i64::try_from(self.config.staleness_window.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(window)
    }

    /// Run one tick as if the clock read `now_ms`.
    ///
    /// A failing departure notice is logged and skipped. A failing directory
    /// read or delete abandons the tick; the next one starts from scratch.
    pub async fn sweep_once(&self, now_ms: i64) -> Result<SweepReport, StoreError> {
        let threshold = self.threshold(now_ms);
        let expired = self.directory.find_expired(threshold).await?;

        let mut report = SweepReport::default();
        let time = clock_time();

        for participant in expired {
            let notice = Message::departure(participant.name.as_str(), time.as_str());
            if let Err(e) = self.log.append(&notice).await {
                warn!(
                    "Failed to post departure notice for {}: {}",
                    participant.name, e
                );
                report.failed_notices += 1;
            }
            report.expired.push(participant.name);
        }

        report.removed = self.directory.delete_expired(threshold).await?;

        metrics::counter!("chatroom_participants_evicted_total", report.removed);
        if report.removed > 0 {
            info!(
                "Pruned {} inactive participant(s): {:?}",
                report.removed, report.expired
            );
        } else {
            debug!("Liveness sweep found nobody to prune");
        }

        Ok(report)
    }

    /// Start ticking on a background task.
    ///
    /// The first tick fires one full interval after the call.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        // A zero period would make the interval panic
        let period = self.config.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);

        info!(
            "Liveness sweeper started (interval={:?}, staleness window={:?})",
            period, self.config.staleness_window
        );

        loop {
            ticker.tick().await;

            if let Err(e) = self.sweep_once(now_millis()).await {
                metrics::increment_counter!("chatroom_sweep_failures_total");
                error!("Liveness sweep abandoned: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageKind, Participant, BROADCAST_TARGET, DEPARTURE_TEXT};
    use crate::store::{MemoryStore, MockMessageLog, MockParticipantDirectory};

    const WINDOW_MS: i64 = 10_000;

    fn sweeper_over(store: &Arc<MemoryStore>) -> LivenessSweeper {
        LivenessSweeper::new(store.clone(), store.clone(), SweeperConfig::default())
    }

    #[test]
    fn test_threshold() {
        let store = Arc::new(MemoryStore::new());
        let sweeper = sweeper_over(&store);

        assert_eq!(sweeper.threshold(50_000), 50_000 - WINDOW_MS);
        assert_eq!(sweeper.threshold(i64::MIN), i64::MIN);
    }

    #[tokio::test]
    async fn test_tick_prunes_expired_and_posts_one_notice_each() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_if_absent("alice", 1_000).await.unwrap();
        store.upsert_if_absent("bob", 2_000).await.unwrap();
        store.upsert_if_absent("carol", 20_000).await.unwrap();

        let sweeper = sweeper_over(&store);
        let report = sweeper.sweep_once(20_000).await.unwrap();

        assert_eq!(report.removed, 2);
        assert_eq!(report.failed_notices, 0);

        let remaining = store.list_all().await.unwrap();
        assert_eq!(remaining, vec![Participant::new("carol", 20_000)]);

        let notices: Vec<Message> = store
            .query("carol")
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.kind == MessageKind::Status)
            .collect();
        assert_eq!(notices.len(), 2);

        let mut leavers: Vec<&str> = notices.iter().map(|m| m.from.as_str()).collect();
        leavers.sort();
        assert_eq!(leavers, ["alice", "bob"]);
        assert!(notices
            .iter()
            .all(|m| m.to == BROADCAST_TARGET && m.text == DEPARTURE_TEXT));

        // A second tick at the same instant has nothing left to do
        let report = sweeper.sweep_once(20_000).await.unwrap();
        assert_eq!(report, SweepReport::default());
        assert_eq!(store.query("carol").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_participant_at_threshold_survives() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_if_absent("alice", 10_000).await.unwrap();

        let report = sweeper_over(&store).sweep_once(10_000 + WINDOW_MS).await.unwrap();

        assert_eq!(report.removed, 0);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_heartbeat_keeps_participant_alive() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_if_absent("alice", 1_000).await.unwrap();
        store.heartbeat("alice", 25_000).await.unwrap();

        let report = sweeper_over(&store).sweep_once(30_000).await.unwrap();

        assert!(report.expired.is_empty());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_notice_does_not_stop_the_others() {
        let mut directory = MockParticipantDirectory::new();
        directory.expect_find_expired().times(1).returning(|_| {
            Ok(vec![
                Participant::new("alice", 1),
                Participant::new("bob", 2),
                Participant::new("carol", 3),
            ])
        });
        directory
            .expect_delete_expired()
            .times(1)
            .returning(|_| Ok(3));

        let mut log = MockMessageLog::new();
        log.expect_append()
            .times(3)
            .returning(|message| {
                if message.from == "bob" {
                    Err(StoreError::Internal("connection reset".to_string()))
                } else {
                    Ok(())
                }
            });

        let sweeper = LivenessSweeper::new(
            Arc::new(directory),
            Arc::new(log),
            SweeperConfig::default(),
        );
        let report = sweeper.sweep_once(100_000).await.unwrap();

        assert_eq!(report.expired, ["alice", "bob", "carol"]);
        assert_eq!(report.failed_notices, 1);
        assert_eq!(report.removed, 3);
    }

    #[tokio::test]
    async fn test_failed_read_abandons_tick() {
        let mut directory = MockParticipantDirectory::new();
        directory
            .expect_find_expired()
            .times(1)
            .returning(|_| Err(StoreError::Internal("unreachable".to_string())));
        directory.expect_delete_expired().times(0);

        let mut log = MockMessageLog::new();
        log.expect_append().times(0);

        let sweeper = LivenessSweeper::new(
            Arc::new(directory),
            Arc::new(log),
            SweeperConfig::default(),
        );

        assert!(sweeper.sweep_once(100_000).await.is_err());
    }

    #[tokio::test]
    async fn test_threshold_is_passed_to_directory() {
        let mut directory = MockParticipantDirectory::new();
        directory
            .expect_find_expired()
            .withf(|threshold| *threshold == 90_000)
            .times(1)
            .returning(|_| Ok(Vec::new()));
        directory
            .expect_delete_expired()
            .withf(|threshold| *threshold == 90_000)
            .times(1)
            .returning(|_| Ok(0));

        let sweeper = LivenessSweeper::new(
            Arc::new(directory),
            Arc::new(MockMessageLog::new()),
            SweeperConfig::default(),
        );

        sweeper.sweep_once(100_000).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sweeper_ticks_on_interval() {
        let store = Arc::new(MemoryStore::new());
        // Joined long ago as far as the wall clock is concerned
        store.upsert_if_absent("alice", 0).await.unwrap();

        let handle = sweeper_over(&store).spawn();

        tokio::time::sleep(Duration::from_secs(14)).await;
        assert_eq!(store.list_all().await.unwrap().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.list_all().await.unwrap().is_empty());

        handle.abort();
    }
}
