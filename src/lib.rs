//! Tender/bid procurement core
//!
//! Organizations publish tenders, suppliers submit bids, and responsible
//! users close tenders through a quorum of approvals. This crate is the
//! workflow core behind that: versioned entity storage, rollback, and the
//! decision ledger with its quorum engine. Transport and authentication live
//! elsewhere and consume the typed results exposed here.
//!
//! ## Architecture
//!
//! - **Versioned entity store** (`db`): tender and bid rows plus append-only
//!   per-version snapshots of their business fields. Every edit snapshots the
//!   pre-edit state and bumps the version by one, in a single transaction.
//! - **Rollback engine** (`services::versioning`): restores a historical
//!   snapshot as a *new* edit. History is never rewritten.
//! - **Decision ledger + quorum engine** (`services::approval`): one
//!   Approve/Reject vote per (bid, user); the third approval finalizes the
//!   bid and closes the owning tender atomically, a single rejection is
//!   terminal on its own.
//! - **Collaborators** (`authz`): existence and authorization checks the
//!   engines consult before mutating anything.

pub mod authz;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

// Re-exports
pub use config::Config;
pub use db::Db;
pub use error::CoreError;
pub use services::{
    spawn_logging_listener, ApprovalService, DomainEvent, EventBus, EventListener,
    LoggingEventListener, Services, VersioningService, QUORUM,
};
