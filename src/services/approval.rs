//! Quorum approval engine for bid decisions
//!
//! A bid's decision field is write-once: `Pending (null)` moves to `Approved`
//! or `Rejected` and never back. One rejection is terminal on its own; an
//! approval only finalizes once `QUORUM` distinct approvals are on the
//! ledger, and the approval that reaches quorum also closes the owning
//! tender in the same commit.

use std::sync::Arc;

use tracing::info;

use super::events::{DomainEvent, EventBus};
use crate::authz::AccessPolicy;
use crate::db::bids;
use crate::db::models::{Decision, TenderStatus};
use crate::db::tenders;
use crate::db::Db;
use crate::error::CoreError;

/// Distinct approvals required to finalize a bid and close its tender
pub const QUORUM: i64 = 3;

/// What a submitted decision did to the bid
enum Outcome {
    /// Vote recorded; bid still pending
    Recorded,
    /// Bid rejected by this vote
    Rejected,
    /// This approval reached quorum: bid approved, tender closed
    QuorumReached,
}

/// Engine for collecting votes and finalizing bids
pub struct ApprovalService {
    db: Arc<Db>,
    policy: Arc<dyn AccessPolicy>,
    events: Arc<EventBus>,
}

impl ApprovalService {
    pub fn new(db: Arc<Db>, policy: Arc<dyn AccessPolicy>, events: Arc<EventBus>) -> Self {
        Self { db, policy, events }
    }

    /// Submit one user's Approve/Reject vote on a bid.
    ///
    /// The whole operation runs inside one immediate transaction. Taking the
    /// write lock at BEGIN means the pending/already-voted checks, the vote
    /// insert and the quorum recount all observe one consistent ledger:
    /// concurrent votes by the same user serialize instead of both passing
    /// the duplicate check, and concurrent approvals cannot both observe
    /// quorum - 1.
    pub fn submit_decision(
        &self,
        bid_id: &str,
        tender_id: &str,
        username: &str,
        decision: Decision,
    ) -> Result<(), CoreError> {
        let outcome = self.db.with_conn(|conn| {
            conn.immediate_transaction(|conn| {
                let bid = bids::get_bid(conn, bid_id)?;
                // The cascade closes the bid's owning tender; a mismatched id
                // must not authorize or close an unrelated one
                if bid.tender_id != tender_id {
                    return Err(CoreError::InvalidInput(format!(
                        "bid {} does not belong to tender {}",
                        bid_id, tender_id
                    )));
                }
                if bid.decision.is_some() {
                    return Err(CoreError::AlreadyDecided(bid_id.to_string()));
                }
                if bids::count_decisions_by_user(conn, bid_id, username)? > 0 {
                    return Err(CoreError::UserAlreadyVoted {
                        bid_id: bid_id.to_string(),
                        username: username.to_string(),
                    });
                }
                if !self.policy.user_can_approve(conn, username, tender_id)? {
                    return Err(CoreError::Forbidden(format!(
                        "user {} may not approve bids on tender {}",
                        username, tender_id
                    )));
                }

                bids::insert_decision(conn, bid_id, username, decision)?;

                match decision {
                    Decision::Rejected => {
                        // A single rejection is terminal; no counting needed
                        bids::set_bid_decision(conn, bid_id, Decision::Rejected)?;
                        Ok(Outcome::Rejected)
                    }
                    Decision::Approved => {
                        let approved = bids::count_approved(conn, bid_id)?;
                        if approved >= QUORUM {
                            bids::set_bid_decision(conn, bid_id, Decision::Approved)?;
                            tenders::change_tender_status(conn, tender_id, TenderStatus::Closed)?;
                            Ok(Outcome::QuorumReached)
                        } else {
                            Ok(Outcome::Recorded)
                        }
                    }
                }
            })
        })?;

        self.events.emit(DomainEvent::DecisionRecorded {
            bid_id: bid_id.to_string(),
            username: username.to_string(),
            decision: decision.as_str().to_string(),
        });

        match outcome {
            Outcome::Recorded => {
                info!(bid_id, username, decision = decision.as_str(), "Vote recorded");
            }
            Outcome::Rejected => {
                info!(bid_id, username, "Bid rejected");
                self.events.emit(DomainEvent::BidFinalized {
                    bid_id: bid_id.to_string(),
                    decision: Decision::Rejected.as_str().to_string(),
                });
            }
            Outcome::QuorumReached => {
                info!(bid_id, tender_id, username, "Quorum reached, tender closed");
                self.events.emit(DomainEvent::BidFinalized {
                    bid_id: bid_id.to_string(),
                    decision: Decision::Approved.as_str().to_string(),
                });
                self.events.emit(DomainEvent::TenderClosed {
                    id: tender_id.to_string(),
                    bid_id: bid_id.to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{add_organization, add_responsible, add_user, DbAccessPolicy};
    use crate::db::bids::CreateBidInput;
    use crate::db::models::{Bid, Tender};
    use crate::db::tenders::CreateTenderInput;

    struct Fixture {
        db: Arc<Db>,
        approval: ApprovalService,
        tender: Tender,
        bid: Bid,
    }

    fn setup() -> Fixture {
        let db = Arc::new(Db::open_in_memory().unwrap());
        let (tender, bid) = db
            .with_conn(|conn| {
                for user in ["u1", "u2", "u3", "u4", "outsider"] {
                    add_user(conn, user)?;
                }
                add_organization(conn, "org-1", "Acme")?;
                for user in ["u1", "u2", "u3", "u4"] {
                    add_responsible(conn, "org-1", user)?;
                }

                let tender = crate::db::tenders::create_tender(
                    conn,
                    &CreateTenderInput {
                        name: "Tender".into(),
                        description: "Desc".into(),
                        service_type: "Delivery".into(),
                        organization_id: "org-1".into(),
                    },
                )?;
                let bid = crate::db::bids::create_bid(
                    conn,
                    &CreateBidInput {
                        name: "Bid".into(),
                        description: "Offer".into(),
                        tender_id: tender.id.clone(),
                        author_type: "User".into(),
                        author_id: "supplier".into(),
                    },
                )?;
                Ok((tender, bid))
            })
            .unwrap();

        let approval = ApprovalService::new(
            db.clone(),
            Arc::new(DbAccessPolicy),
            Arc::new(EventBus::new()),
        );

        Fixture {
            db,
            approval,
            tender,
            bid,
        }
    }

    impl Fixture {
        fn bid_state(&self) -> Bid {
            self.db
                .with_conn(|conn| crate::db::bids::get_bid(conn, &self.bid.id))
                .unwrap()
        }

        fn tender_state(&self) -> Tender {
            self.db
                .with_conn(|conn| crate::db::tenders::get_tender(conn, &self.tender.id))
                .unwrap()
        }
    }

    #[test]
    fn quorum_cascade_is_exact() {
        let f = setup();

        for user in ["u1", "u2"] {
            f.approval
                .submit_decision(&f.bid.id, &f.tender.id, user, Decision::Approved)
                .unwrap();
            // Below quorum: recorded but still pending, tender untouched
            assert_eq!(f.bid_state().decision, None);
            assert_eq!(f.tender_state().status, "Created");
        }

        f.approval
            .submit_decision(&f.bid.id, &f.tender.id, "u3", Decision::Approved)
            .unwrap();

        assert_eq!(f.bid_state().decision.as_deref(), Some("Approved"));
        assert_eq!(f.tender_state().status, "Closed");
    }

    #[test]
    fn one_vote_per_user() {
        let f = setup();
        f.approval
            .submit_decision(&f.bid.id, &f.tender.id, "u1", Decision::Approved)
            .unwrap();

        // Same user again, regardless of decision value
        for decision in [Decision::Approved, Decision::Rejected] {
            let err = f
                .approval
                .submit_decision(&f.bid.id, &f.tender.id, "u1", decision)
                .unwrap_err();
            assert!(matches!(err, CoreError::UserAlreadyVoted { .. }));
        }
    }

    #[test]
    fn single_rejection_is_terminal() {
        let f = setup();
        f.approval
            .submit_decision(&f.bid.id, &f.tender.id, "u1", Decision::Rejected)
            .unwrap();

        assert_eq!(f.bid_state().decision.as_deref(), Some("Rejected"));
        // Tender is not closed by a rejection
        assert_eq!(f.tender_state().status, "Created");

        // All further votes bounce off the terminal decision
        let err = f
            .approval
            .submit_decision(&f.bid.id, &f.tender.id, "u2", Decision::Approved)
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyDecided(_)));
    }

    #[test]
    fn votes_after_quorum_are_rejected_as_already_decided() {
        let f = setup();
        for user in ["u1", "u2", "u3"] {
            f.approval
                .submit_decision(&f.bid.id, &f.tender.id, user, Decision::Approved)
                .unwrap();
        }

        let err = f
            .approval
            .submit_decision(&f.bid.id, &f.tender.id, "u4", Decision::Approved)
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyDecided(_)));
    }

    #[test]
    fn non_responsible_user_cannot_vote() {
        let f = setup();
        let err = f
            .approval
            .submit_decision(&f.bid.id, &f.tender.id, "outsider", Decision::Approved)
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        // The forbidden attempt left no ledger row behind
        let count = f
            .db
            .with_conn(|conn| crate::db::bids::count_approved(conn, &f.bid.id))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn cascade_rejects_mismatched_tender() {
        let f = setup();
        let other = f
            .db
            .with_conn(|conn| {
                crate::db::tenders::create_tender(
                    conn,
                    &CreateTenderInput {
                        name: "Other".into(),
                        description: "Unrelated".into(),
                        service_type: "Construction".into(),
                        organization_id: "org-1".into(),
                    },
                )
            })
            .unwrap();

        // Approvals naming the wrong tender must not count, let alone close it
        for user in ["u1", "u2", "u3"] {
            let err = f
                .approval
                .submit_decision(&f.bid.id, &other.id, user, Decision::Approved)
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidInput(_)));
        }

        assert_eq!(f.bid_state().decision, None);
        assert_eq!(f.tender_state().status, "Created");
        let other_status = f
            .db
            .with_conn(|conn| crate::db::tenders::get_tender(conn, &other.id))
            .unwrap()
            .status;
        assert_eq!(other_status, "Created");

        // The rejected attempts left no ledger rows behind
        let count = f
            .db
            .with_conn(|conn| crate::db::bids::count_approved(conn, &f.bid.id))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn vote_on_missing_bid_is_not_found() {
        let f = setup();
        let err = f
            .approval
            .submit_decision("ghost", &f.tender.id, "u1", Decision::Approved)
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
