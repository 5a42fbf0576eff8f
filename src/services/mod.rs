//! Service layer for tender-core
//!
//! Services encapsulate the workflow logic between transport handlers and the
//! repository layer. Each service wraps database operations with:
//! - Authorization pre-checks
//! - Transaction boundaries
//! - Event emission for audit/notifications
//!
//! ## Architecture
//!
//! ```text
//! Transport Handlers (thin, out of scope here)
//!     ↓
//! Service Layer (versioning + approval engines)
//!     ↓
//! Repository Layer (db/tenders.rs, db/bids.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod approval;
pub mod events;
pub mod versioning;

// Re-exports
pub use approval::{ApprovalService, QUORUM};
pub use events::{
    spawn_logging_listener, DomainEvent, EventBus, EventListener, LoggingEventListener,
};
pub use versioning::VersioningService;

use std::sync::Arc;

use crate::authz::{AccessPolicy, DbAccessPolicy};
use crate::db::Db;

/// Service container for dependency injection
///
/// Holds both engines with a shared database handle, policy and event bus.
/// The store handle is threaded in explicitly; there is no process-wide
/// connection state.
pub struct Services {
    pub versioning: Arc<VersioningService>,
    pub approval: Arc<ApprovalService>,
    pub events: Arc<EventBus>,
}

impl Services {
    /// Create all services with the default database-backed access policy
    pub fn new(db: Arc<Db>) -> Self {
        Self::with_policy(db, Arc::new(DbAccessPolicy))
    }

    /// Create all services with a custom access policy
    pub fn with_policy(db: Arc<Db>, policy: Arc<dyn AccessPolicy>) -> Self {
        let events = Arc::new(EventBus::new());

        Self {
            versioning: Arc::new(VersioningService::new(
                db.clone(),
                policy.clone(),
                events.clone(),
            )),
            approval: Arc::new(ApprovalService::new(db, policy, events.clone())),
            events,
        }
    }
}
