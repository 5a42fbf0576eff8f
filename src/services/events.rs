//! Event system for procurement operations
//!
//! Provides an event bus for notifying listeners about workflow outcomes.
//! Useful for:
//! - Audit logging
//! - Notifications to suppliers/approvers
//! - Cache invalidation in read layers

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Events emitted by the workflow services
#[derive(Debug, Clone)]
pub enum DomainEvent {
    // Tender events
    TenderCreated {
        id: String,
        organization_id: String,
    },
    TenderEdited {
        id: String,
        version: i32,
    },
    TenderRolledBack {
        id: String,
        restored_version: i32,
        new_version: i32,
    },
    TenderStatusChanged {
        id: String,
        status: String,
    },

    // Bid events
    BidCreated {
        id: String,
        tender_id: String,
    },
    BidEdited {
        id: String,
        version: i32,
    },
    BidRolledBack {
        id: String,
        restored_version: i32,
        new_version: i32,
    },
    BidStatusChanged {
        id: String,
        status: String,
    },

    // Approval events
    DecisionRecorded {
        bid_id: String,
        username: String,
        decision: String,
    },
    BidFinalized {
        bid_id: String,
        decision: String,
    },
    /// Quorum cascade: the approval that finalized the bid also closed the tender
    TenderClosed {
        id: String,
        bid_id: String,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    /// Handle an event
    fn on_event(&self, event: &DomainEvent);
}

/// Event bus for broadcasting workflow events
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new event bus with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: DomainEvent) {
        trace!(event = ?event, "Emitting domain event");
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener that logs workflow events at debug level
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &DomainEvent) {
        match event {
            DomainEvent::TenderCreated { id, organization_id } => {
                debug!(id = %id, organization_id = %organization_id, "Tender created");
            }
            DomainEvent::TenderRolledBack {
                id,
                restored_version,
                new_version,
            } => {
                debug!(
                    id = %id,
                    restored_version,
                    new_version,
                    "Tender rolled back"
                );
            }
            DomainEvent::DecisionRecorded {
                bid_id,
                username,
                decision,
            } => {
                debug!(bid_id = %bid_id, username = %username, decision = %decision, "Decision recorded");
            }
            DomainEvent::BidFinalized { bid_id, decision } => {
                debug!(bid_id = %bid_id, decision = %decision, "Bid finalized");
            }
            DomainEvent::TenderClosed { id, bid_id } => {
                debug!(id = %id, bid_id = %bid_id, "Tender closed by quorum");
            }
            _ => {
                trace!(event = ?event, "Workflow event");
            }
        }
    }
}

/// Spawn a background task that logs all events from the bus.
///
/// The task runs until the bus is dropped.
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}
