//! High-level service facade.
//!
//! The service owns the reward worker, wires the cache, lock, store, and
//! mail seams together, and exposes a builder-based API for embedding the
//! subsystem into a server binary.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::cache::CacheLayer;
use crate::config::ServiceConfig;
use crate::error::{ArchiveError, Result};
use crate::kv::{KvStore, MemoryKv};
use crate::leaderboard::LeaderboardQueryEngine;
use crate::lock::LockManager;
use crate::mail::{LogMailSender, MailSender};
use crate::repository::ArchiveRepository;
use crate::scheduler::{Command, RewardWorker, RunReport};
use crate::store::ArchiveStore;

const COMMAND_BUFFER: usize = 8;

/// The assembled subsystem: repository, query engine, and reward worker.
///
/// [`ArchiveRepository`] and [`LeaderboardQueryEngine`] are cheap clones
/// over shared state; take owned copies and use them from any task.
pub struct Service {
    repository: ArchiveRepository,
    leaderboard: LeaderboardQueryEngine,
    command_tx: mpsc::Sender<Command>,
    worker_handle: JoinHandle<()>,
}

impl Service {
    /// Create a new service builder.
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    /// Save/load/delete API for player archives.
    pub fn repository(&self) -> ArchiveRepository {
        self.repository.clone()
    }

    /// Top-N and player-rank queries.
    pub fn leaderboard(&self) -> LeaderboardQueryEngine {
        self.leaderboard.clone()
    }

    /// Run a reward pass immediately instead of waiting for midnight.
    ///
    /// `day` defaults to yesterday in the configured timezone. Shards whose
    /// idempotency lock is already consumed are skipped, so triggering after
    /// a partial outage only fills in what the scheduled pass missed.
    pub async fn trigger_reward_run(&self, day: Option<NaiveDate>) -> Result<RunReport> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::RunNow {
                day,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ArchiveError::SchedulerChannelClosed)?;
        reply_rx.await.map_err(ArchiveError::SchedulerReplyClosed)?
    }

    /// Stop the reward worker and wait for it to finish.
    ///
    /// An in-flight reward pass completes before the worker exits.
    pub async fn shutdown(self) -> Result<()> {
        // The worker also stops when the channel closes; an explicit
        // command just makes the intent visible in the logs.
        let _ = self.command_tx.send(Command::Shutdown).await;
        drop(self.command_tx);

        self.worker_handle
            .await
            .map_err(ArchiveError::WorkerJoin)?;
        Ok(())
    }
}

/// Builder for [`Service`] with swappable backends.
pub struct ServiceBuilder {
    config: ServiceConfig,
    kv: Option<Arc<dyn KvStore>>,
    store: Option<Arc<dyn ArchiveStore>>,
    mail: Option<Arc<dyn MailSender>>,
}

impl ServiceBuilder {
    fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
            kv: None,
            store: None,
            mail: None,
        }
    }

    /// Override service configuration.
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the shared key-value backend (default: in-process [`MemoryKv`]).
    ///
    /// Cross-process cache coherence and lock exclusion only hold when all
    /// instances share this backend.
    pub fn kv(mut self, kv: Arc<dyn KvStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    /// Set the required durable archive store.
    pub fn store(mut self, store: Arc<dyn ArchiveStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the mail collaborator (default: [`LogMailSender`]).
    pub fn mail(mut self, mail: Arc<dyn MailSender>) -> Self {
        self.mail = Some(mail);
        self
    }

    /// Build the service and spawn the reward worker.
    pub async fn build(self) -> Result<Service> {
        let store = self.store.ok_or(ArchiveError::MissingStore)?;
        let kv = self.kv.unwrap_or_else(|| Arc::new(MemoryKv::new()));
        let mail = self.mail.unwrap_or_else(|| Arc::new(LogMailSender));

        let cache = CacheLayer::new(kv.clone());
        let locks = LockManager::new(kv.clone());
        let repository =
            ArchiveRepository::new(store.clone(), cache.clone(), locks, &self.config);
        let leaderboard = LeaderboardQueryEngine::new(store.clone(), cache, &self.config);

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let worker = RewardWorker::new(
            leaderboard.clone(),
            store,
            kv,
            mail,
            command_rx,
            &self.config,
        );
        let worker_handle = tokio::spawn(async move {
            worker.run().await;
        });

        Ok(Service {
            repository,
            leaderboard,
            command_tx,
            worker_handle,
        })
    }
}
