//! Versioned edit and rollback engines for tenders and bids
//!
//! Every accepted edit moves the entity from version N to N + 1 and leaves a
//! snapshot of the version-N business fields behind. Rollback is not a
//! destructive operation: restoring version V re-applies V's snapshot as a
//! fresh edit, so the entity ends up at N + 1 with V's content and the full
//! history stays queryable.

use std::sync::Arc;

use tracing::info;

use super::events::{DomainEvent, EventBus};
use crate::authz::{AccessPolicy, CheckExists, OrganizationKind};
use crate::db::bids::{self, CreateBidInput};
use crate::db::models::{Bid, BidParams, BidStatus, ServiceType, Tender, TenderParams, TenderStatus};
use crate::db::tenders::{self, CreateTenderInput};
use crate::db::Db;
use crate::error::CoreError;

/// Engine for versioned edits, rollbacks and status changes
pub struct VersioningService {
    db: Arc<Db>,
    policy: Arc<dyn AccessPolicy>,
    events: Arc<EventBus>,
}

impl VersioningService {
    pub fn new(db: Arc<Db>, policy: Arc<dyn AccessPolicy>, events: Arc<EventBus>) -> Self {
        Self { db, policy, events }
    }

    // =========================================================================
    // Tender Operations
    // =========================================================================

    /// Get a tender by ID
    pub fn get_tender(&self, id: &str) -> Result<Tender, CoreError> {
        self.db.with_conn(|conn| tenders::get_tender(conn, id))
    }

    /// Create a tender owned by `input.organization_id`
    pub fn create_tender(
        &self,
        input: &CreateTenderInput,
        actor: &str,
    ) -> Result<Tender, CoreError> {
        let tender = self.db.with_conn(|conn| {
            if !OrganizationKind::exists(conn, &input.organization_id)? {
                return Err(CoreError::InvalidInput(format!(
                    "organization {} does not exist",
                    input.organization_id
                )));
            }
            if !self
                .policy
                .user_can_manage(conn, actor, &input.organization_id)?
            {
                return Err(CoreError::Forbidden(format!(
                    "user {} is not responsible for organization {}",
                    actor, input.organization_id
                )));
            }
            tenders::create_tender(conn, input)
        })?;

        info!(tender_id = %tender.id, actor, "Tender created");
        self.events.emit(DomainEvent::TenderCreated {
            id: tender.id.clone(),
            organization_id: tender.organization_id.clone(),
        });
        Ok(tender)
    }

    /// Apply `tender`'s business fields as a new version
    pub fn edit_tender(&self, tender: &Tender, actor: &str) -> Result<Tender, CoreError> {
        ServiceType::parse(&tender.service_type)?;

        let updated = self.db.with_conn(|conn| {
            let stored = tenders::get_tender(conn, &tender.id)?;
            if !self
                .policy
                .user_can_manage(conn, actor, &stored.organization_id)?
            {
                return Err(CoreError::Forbidden(format!(
                    "user {} is not responsible for organization {}",
                    actor, stored.organization_id
                )));
            }
            tenders::edit_tender(conn, tender)
        })?;

        info!(tender_id = %updated.id, version = updated.version, actor, "Tender edited");
        self.events.emit(DomainEvent::TenderEdited {
            id: updated.id.clone(),
            version: updated.version,
        });
        Ok(updated)
    }

    /// Restore the snapshot at `target_version` as a new edit
    pub fn rollback_tender(
        &self,
        id: &str,
        target_version: i32,
        actor: &str,
    ) -> Result<Tender, CoreError> {
        let updated = self.db.with_conn(|conn| {
            let mut current = tenders::get_tender(conn, id)?;

            // Only strictly earlier versions can be restored; version starts
            // at 1, so zero and negative targets fall out here as well once
            // the snapshot lookup below rejects them.
            if target_version >= current.version {
                return Err(CoreError::InvalidVersion {
                    requested: target_version,
                    current: current.version,
                });
            }

            if !self
                .policy
                .user_can_manage(conn, actor, &current.organization_id)?
            {
                return Err(CoreError::Forbidden(format!(
                    "user {} is not responsible for organization {}",
                    actor, current.organization_id
                )));
            }

            let raw = tenders::get_tender_snapshot(conn, id, target_version)?;
            let params: TenderParams = serde_json::from_str(&raw)
                .map_err(|e| CoreError::Internal(format!("Snapshot decode failed: {}", e)))?;
            params.apply(&mut current);

            tenders::edit_tender(conn, &current)
        })?;

        info!(
            tender_id = %updated.id,
            restored_version = target_version,
            new_version = updated.version,
            actor,
            "Tender rolled back"
        );
        self.events.emit(DomainEvent::TenderRolledBack {
            id: updated.id.clone(),
            restored_version: target_version,
            new_version: updated.version,
        });
        Ok(updated)
    }

    /// Change tender status. Any value in the allowed set may be written by
    /// an authorized actor; no version bump.
    pub fn change_tender_status(
        &self,
        id: &str,
        status: &str,
        actor: &str,
    ) -> Result<Tender, CoreError> {
        let status = TenderStatus::parse(status)?;

        let updated = self.db.with_conn(|conn| {
            let stored = tenders::get_tender(conn, id)?;
            if !self
                .policy
                .user_can_manage(conn, actor, &stored.organization_id)?
            {
                return Err(CoreError::Forbidden(format!(
                    "user {} is not responsible for organization {}",
                    actor, stored.organization_id
                )));
            }
            tenders::change_tender_status(conn, id, status)
        })?;

        info!(tender_id = %updated.id, status = %updated.status, actor, "Tender status changed");
        self.events.emit(DomainEvent::TenderStatusChanged {
            id: updated.id.clone(),
            status: updated.status.clone(),
        });
        Ok(updated)
    }

    // =========================================================================
    // Bid Operations
    // =========================================================================

    /// Get a bid by ID
    pub fn get_bid(&self, id: &str) -> Result<Bid, CoreError> {
        self.db.with_conn(|conn| bids::get_bid(conn, id))
    }

    /// Create a bid on an existing tender
    pub fn create_bid(&self, input: &CreateBidInput, actor: &str) -> Result<Bid, CoreError> {
        let bid = self.db.with_conn(|conn| {
            if !tenders::tender_exists(conn, &input.tender_id)? {
                return Err(CoreError::NotFound(format!("tender {}", input.tender_id)));
            }
            if !self.policy.user_can_manage_bid(
                conn,
                actor,
                &input.author_type,
                &input.author_id,
            )? {
                return Err(CoreError::Forbidden(format!(
                    "user {} may not act for author {} {}",
                    actor, input.author_type, input.author_id
                )));
            }
            bids::create_bid(conn, input)
        })?;

        info!(bid_id = %bid.id, tender_id = %bid.tender_id, actor, "Bid created");
        self.events.emit(DomainEvent::BidCreated {
            id: bid.id.clone(),
            tender_id: bid.tender_id.clone(),
        });
        Ok(bid)
    }

    /// Apply `bid`'s business fields as a new version
    pub fn edit_bid(&self, bid: &Bid, actor: &str) -> Result<Bid, CoreError> {
        let updated = self.db.with_conn(|conn| {
            let stored = bids::get_bid(conn, &bid.id)?;
            if !self.policy.user_can_manage_bid(
                conn,
                actor,
                &stored.author_type,
                &stored.author_id,
            )? {
                return Err(CoreError::Forbidden(format!(
                    "user {} may not manage bid {}",
                    actor, stored.id
                )));
            }
            bids::edit_bid(conn, bid)
        })?;

        info!(bid_id = %updated.id, version = updated.version, actor, "Bid edited");
        self.events.emit(DomainEvent::BidEdited {
            id: updated.id.clone(),
            version: updated.version,
        });
        Ok(updated)
    }

    /// Restore the snapshot at `target_version` as a new edit
    pub fn rollback_bid(
        &self,
        id: &str,
        target_version: i32,
        actor: &str,
    ) -> Result<Bid, CoreError> {
        let updated = self.db.with_conn(|conn| {
            let mut current = bids::get_bid(conn, id)?;

            if target_version >= current.version {
                return Err(CoreError::InvalidVersion {
                    requested: target_version,
                    current: current.version,
                });
            }

            if !self.policy.user_can_manage_bid(
                conn,
                actor,
                &current.author_type,
                &current.author_id,
            )? {
                return Err(CoreError::Forbidden(format!(
                    "user {} may not manage bid {}",
                    actor, current.id
                )));
            }

            let raw = bids::get_bid_snapshot(conn, id, target_version)?;
            let params: BidParams = serde_json::from_str(&raw)
                .map_err(|e| CoreError::Internal(format!("Snapshot decode failed: {}", e)))?;
            params.apply(&mut current);

            bids::edit_bid(conn, &current)
        })?;

        info!(
            bid_id = %updated.id,
            restored_version = target_version,
            new_version = updated.version,
            actor,
            "Bid rolled back"
        );
        self.events.emit(DomainEvent::BidRolledBack {
            id: updated.id.clone(),
            restored_version: target_version,
            new_version: updated.version,
        });
        Ok(updated)
    }

    /// Change bid status. No version bump.
    pub fn change_bid_status(&self, id: &str, status: &str, actor: &str) -> Result<Bid, CoreError> {
        let status = BidStatus::parse(status)?;

        let updated = self.db.with_conn(|conn| {
            let stored = bids::get_bid(conn, id)?;
            if !self.policy.user_can_manage_bid(
                conn,
                actor,
                &stored.author_type,
                &stored.author_id,
            )? {
                return Err(CoreError::Forbidden(format!(
                    "user {} may not manage bid {}",
                    actor, stored.id
                )));
            }
            bids::change_bid_status(conn, id, status)
        })?;

        info!(bid_id = %updated.id, status = %updated.status, actor, "Bid status changed");
        self.events.emit(DomainEvent::BidStatusChanged {
            id: updated.id.clone(),
            status: updated.status.clone(),
        });
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{add_organization, add_responsible, add_user, DbAccessPolicy};

    fn setup() -> VersioningService {
        let db = Arc::new(Db::open_in_memory().unwrap());
        db.with_conn(|conn| {
            add_user(conn, "alice")?;
            add_user(conn, "mallory")?;
            add_organization(conn, "org-1", "Acme")?;
            add_responsible(conn, "org-1", "alice")
        })
        .unwrap();

        VersioningService::new(db, Arc::new(DbAccessPolicy), Arc::new(EventBus::new()))
    }

    fn tender_input() -> CreateTenderInput {
        CreateTenderInput {
            name: "Warehouse build".into(),
            description: "New warehouse".into(),
            service_type: "Construction".into(),
            organization_id: "org-1".into(),
        }
    }

    #[test]
    fn rollback_restores_content_under_a_new_version() {
        let service = setup();
        let created = service.create_tender(&tender_input(), "alice").unwrap();

        let mut draft = created.clone();
        draft.name = "Warehouse build v2".into();
        let edited = service.edit_tender(&draft, "alice").unwrap();
        assert_eq!(edited.version, 2);

        let rolled = service.rollback_tender(&created.id, 1, "alice").unwrap();
        assert_eq!(rolled.version, 3);
        assert_eq!(rolled.name, "Warehouse build");

        // The superseded v2 content is still in the history
        let fetched = service.get_tender(&created.id).unwrap();
        assert_eq!(fetched.name, "Warehouse build");
        assert_eq!(fetched.version, 3);
    }

    #[test]
    fn rollback_rejects_current_and_future_versions() {
        let service = setup();
        let created = service.create_tender(&tender_input(), "alice").unwrap();

        let mut draft = created.clone();
        draft.name = "v2".into();
        let edited = service.edit_tender(&draft, "alice").unwrap();

        for target in [edited.version, edited.version + 1] {
            let err = service
                .rollback_tender(&created.id, target, "alice")
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidVersion { .. }));
        }

        // Zero was never a version; there is no snapshot for it
        let err = service.rollback_tender(&created.id, 0, "alice").unwrap_err();
        assert!(matches!(err, CoreError::VersionNotFound { version: 0, .. }));
    }

    #[test]
    fn unauthorized_actor_cannot_edit_or_roll_back() {
        let service = setup();
        let created = service.create_tender(&tender_input(), "alice").unwrap();

        let mut draft = created.clone();
        draft.name = "hijacked".into();
        assert!(matches!(
            service.edit_tender(&draft, "mallory"),
            Err(CoreError::Forbidden(_))
        ));

        let edited = service.edit_tender(&draft, "alice").unwrap();
        assert!(matches!(
            service.rollback_tender(&edited.id, 1, "mallory"),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[test]
    fn create_tender_requires_known_organization() {
        let service = setup();
        let mut input = tender_input();
        input.organization_id = "org-ghost".into();
        assert!(matches!(
            service.create_tender(&input, "alice"),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn bid_rollback_keeps_status_and_decision_out_of_the_payload() {
        let service = setup();
        let tender = service.create_tender(&tender_input(), "alice").unwrap();

        let bid = service
            .create_bid(
                &CreateBidInput {
                    name: "Bid".into(),
                    description: "Our offer".into(),
                    tender_id: tender.id.clone(),
                    author_type: "User".into(),
                    author_id: "mallory".into(),
                },
                "mallory",
            )
            .unwrap();

        let mut draft = bid.clone();
        draft.name = "Bid v2".into();
        service.edit_bid(&draft, "mallory").unwrap();

        // Status changes after the snapshot was taken
        service
            .change_bid_status(&bid.id, "Published", "mallory")
            .unwrap();

        let rolled = service.rollback_bid(&bid.id, 1, "mallory").unwrap();
        assert_eq!(rolled.name, "Bid");
        assert_eq!(rolled.version, 3);
        // Rollback restored business fields only
        assert_eq!(rolled.status, "Published");
        assert_eq!(rolled.decision, None);
    }

    #[test]
    fn create_bid_requires_existing_tender() {
        let service = setup();
        let err = service
            .create_bid(
                &CreateBidInput {
                    name: "Bid".into(),
                    description: "Offer".into(),
                    tender_id: "ghost".into(),
                    author_type: "User".into(),
                    author_id: "mallory".into(),
                },
                "mallory",
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
