//! Persistence, ranking, and daily-reward services for player progress.
//!
//! This crate wires the key-value seam, cache layer, distributed lock,
//! durable archive store, leaderboard query engine, and reward scheduler
//! into a cohesive service API. Consumers embed [`Service`] to save and load
//! player archives, query leaderboards, and let the background scheduler
//! grant daily rewards.
//!
//! Modules are organized by responsibility:
//! - [`service`] hosts the facade and builder
//! - [`repository`] implements versioned save/load over store, cache, and lock
//! - [`leaderboard`] computes ranked views over archive documents
//! - the private `scheduler` module hosts the daily reward worker
//! - [`kv`], [`store`], and [`mail`] provide the injectable backend seams
pub mod cache;
pub mod config;
pub mod day;
pub mod error;
pub mod kv;
pub mod leaderboard;
pub mod lock;
pub mod mail;
pub mod repository;
pub mod service;
pub mod store;

mod scheduler;

pub use cache::CacheLayer;
pub use config::ServiceConfig;
pub use error::{ArchiveError, Result};
pub use kv::{KvError, KvStore, MemoryKv};
pub use leaderboard::LeaderboardQueryEngine;
pub use lock::{LockGuard, LockManager};
pub use mail::{LogMailSender, MailError, MailSender, RecordingMailSender};
pub use repository::ArchiveRepository;
pub use scheduler::RunReport;
pub use service::{Service, ServiceBuilder};
pub use store::{ArchiveStore, FileArchiveStore, MemoryArchiveStore, StoreError};
