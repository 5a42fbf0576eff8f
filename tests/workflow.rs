//! End-to-end procurement workflow: versioned edits, rollback, and the
//! quorum approval cascade, exercised through the public service API.

use std::sync::Arc;

use tender_core::authz::{add_organization, add_responsible, add_user};
use tender_core::db::bids::CreateBidInput;
use tender_core::db::models::Decision;
use tender_core::db::tenders::CreateTenderInput;
use tender_core::{CoreError, Db, DomainEvent, Services};

fn setup() -> (Arc<Db>, Services) {
    let db = Arc::new(Db::open_in_memory().unwrap());
    db.with_conn(|conn| {
        add_organization(conn, "org-1", "Acme Construction")?;
        for user in ["owner", "u1", "u2", "u3"] {
            add_user(conn, user)?;
            add_responsible(conn, "org-1", user)?;
        }
        add_user(conn, "supplier")
    })
    .unwrap();

    let services = Services::new(db.clone());
    (db, services)
}

#[test]
fn full_tender_lifecycle() {
    let (_db, services) = setup();
    let mut events = services.events.subscribe();

    // Tender T1 owned by org O1
    let tender = services
        .versioning
        .create_tender(
            &CreateTenderInput {
                name: "Build a warehouse".into(),
                description: "20k square meters".into(),
                service_type: "Construction".into(),
                organization_id: "org-1".into(),
            },
            "owner",
        )
        .unwrap();
    assert_eq!(tender.version, 1);

    services
        .versioning
        .change_tender_status(&tender.id, "Published", "owner")
        .unwrap();

    // Bid B1 at version 1, decision pending
    let bid = services
        .versioning
        .create_bid(
            &CreateBidInput {
                name: "Our offer".into(),
                description: "Six months, fixed price".into(),
                tender_id: tender.id.clone(),
                author_type: "User".into(),
                author_id: "supplier".into(),
            },
            "supplier",
        )
        .unwrap();
    assert_eq!(bid.version, 1);
    assert_eq!(bid.decision, None);

    // Edit: version 2, snapshot of v1 behind it
    let mut draft = bid.clone();
    draft.name = "Our offer v2".into();
    let edited = services.versioning.edit_bid(&draft, "supplier").unwrap();
    assert_eq!(edited.version, 2);
    assert_eq!(edited.name, "Our offer v2");

    // Rollback to v1: version 3 with the original content
    let rolled = services.versioning.rollback_bid(&bid.id, 1, "supplier").unwrap();
    assert_eq!(rolled.version, 3);
    assert_eq!(rolled.name, "Our offer");

    // Three distinct approvals; the third closes the tender
    for user in ["u1", "u2"] {
        services
            .approval
            .submit_decision(&bid.id, &tender.id, user, Decision::Approved)
            .unwrap();
        let pending = services.versioning.get_bid(&bid.id).unwrap();
        assert_eq!(pending.decision, None);
        assert_eq!(
            services.versioning.get_tender(&tender.id).unwrap().status,
            "Published"
        );
    }

    services
        .approval
        .submit_decision(&bid.id, &tender.id, "u3", Decision::Approved)
        .unwrap();

    let finalized = services.versioning.get_bid(&bid.id).unwrap();
    assert_eq!(finalized.decision.as_deref(), Some("Approved"));
    let closed = services.versioning.get_tender(&tender.id).unwrap();
    assert_eq!(closed.status, "Closed");

    // The cascade is visible on the event bus
    let mut saw_finalized = false;
    let mut saw_closed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            DomainEvent::BidFinalized { decision, .. } => {
                assert_eq!(decision, "Approved");
                saw_finalized = true;
            }
            DomainEvent::TenderClosed { id, bid_id } => {
                assert_eq!(id, tender.id);
                assert_eq!(bid_id, bid.id);
                saw_closed = true;
            }
            _ => {}
        }
    }
    assert!(saw_finalized && saw_closed);
}

#[test]
fn history_survives_rollbacks_and_further_edits() {
    let (db, services) = setup();

    let tender = services
        .versioning
        .create_tender(
            &CreateTenderInput {
                name: "Original".into(),
                description: "d".into(),
                service_type: "Delivery".into(),
                organization_id: "org-1".into(),
            },
            "owner",
        )
        .unwrap();

    let mut draft = tender.clone();
    draft.name = "Second".into();
    services.versioning.edit_tender(&draft, "owner").unwrap();

    // Roll back to v1, then edit again: versions 3 and 4
    services.versioning.rollback_tender(&tender.id, 1, "owner").unwrap();
    draft.name = "Fourth".into();
    let latest = services.versioning.edit_tender(&draft, "owner").unwrap();
    assert_eq!(latest.version, 4);

    // Every superseded version left a snapshot, including the rolled-back-from one
    db.with_conn(|conn| {
        for (version, expected) in [(1, "Original"), (2, "Second"), (3, "Original")] {
            let raw = tender_core::db::tenders::get_tender_snapshot(conn, &tender.id, version)?;
            let params: tender_core::db::models::TenderParams =
                serde_json::from_str(&raw).unwrap();
            assert_eq!(params.name.as_deref(), Some(expected));
        }
        Ok(())
    })
    .unwrap();
}

#[test]
fn rejection_blocks_the_whole_ladder() {
    let (_db, services) = setup();

    let tender = services
        .versioning
        .create_tender(
            &CreateTenderInput {
                name: "T".into(),
                description: "d".into(),
                service_type: "Manufacture".into(),
                organization_id: "org-1".into(),
            },
            "owner",
        )
        .unwrap();
    let bid = services
        .versioning
        .create_bid(
            &CreateBidInput {
                name: "B".into(),
                description: "d".into(),
                tender_id: tender.id.clone(),
                author_type: "User".into(),
                author_id: "supplier".into(),
            },
            "supplier",
        )
        .unwrap();

    services
        .approval
        .submit_decision(&bid.id, &tender.id, "u1", Decision::Rejected)
        .unwrap();

    let rejected = services.versioning.get_bid(&bid.id).unwrap();
    assert_eq!(rejected.decision.as_deref(), Some("Rejected"));

    let err = services
        .approval
        .submit_decision(&bid.id, &tender.id, "u2", Decision::Approved)
        .unwrap_err();
    assert!(matches!(err, CoreError::AlreadyDecided(_)));
}
