//! Vetagenda — appointment scheduling and lifecycle engine for veterinary
//! clinics.
//!
//! The core pieces:
//! - [`availability`]: pure slot computation from recurring work windows
//! - [`lifecycle`]: pure appointment state machine
//! - [`coordinator`]: booking orchestration with atomic slot reservation
//! - [`ledger`]: retry-bounded tracking of outbound communications
//!
//! Record lookups, transport sending, and the clock are injected behind
//! traits ([`directory`], [`ledger::NotificationSender`], [`clock`]);
//! persistence goes through the store traits in [`stores`], with in-memory
//! and SQLite implementations provided.

pub mod audit;
pub mod availability;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod directory;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod models;
pub mod pricing;
pub mod stores;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries embedding the engine. Library callers
/// with their own subscriber should skip this.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
