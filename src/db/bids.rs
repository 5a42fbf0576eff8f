//! Bid persistence: current state, version history, and the decision ledger
//!
//! The ledger functions are deliberately thin: `insert_decision` does not
//! dedup, and `count_approved` counts distinct approving users. The quorum
//! engine composes them inside one transaction so the count always reflects
//! the just-inserted vote.

use diesel::prelude::*;
use serde::Deserialize;
use tracing::debug;

use super::models::{
    current_timestamp, AuthorType, Bid, BidParams, BidStatus, Decision, NewBid, NewBidDecision,
    NewBidVersion,
};
use super::schema::{bid_decisions, bid_versions, bids};
use crate::error::CoreError;

/// Input for creating a bid
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBidInput {
    pub name: String,
    pub description: String,
    pub tender_id: String,
    pub author_type: String,
    pub author_id: String,
}

// ============================================================================
// Read Operations
// ============================================================================

/// Get a bid by ID
pub fn get_bid(conn: &mut SqliteConnection, bid_id: &str) -> Result<Bid, CoreError> {
    bids::table
        .filter(bids::id.eq(bid_id))
        .first(conn)
        .optional()
        .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?
        .ok_or_else(|| CoreError::NotFound(format!("bid {}", bid_id)))
}

/// Check whether a bid row exists
pub fn bid_exists(conn: &mut SqliteConnection, bid_id: &str) -> Result<bool, CoreError> {
    let count: i64 = bids::table
        .filter(bids::id.eq(bid_id))
        .count()
        .get_result(conn)
        .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?;
    Ok(count > 0)
}

/// Get just the status column
pub fn get_bid_status(conn: &mut SqliteConnection, bid_id: &str) -> Result<String, CoreError> {
    bids::table
        .filter(bids::id.eq(bid_id))
        .select(bids::status)
        .first(conn)
        .optional()
        .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?
        .ok_or_else(|| CoreError::NotFound(format!("bid {}", bid_id)))
}

/// Fetch the params snapshot stored for an exact historical version
pub fn get_bid_snapshot(
    conn: &mut SqliteConnection,
    bid_id: &str,
    version: i32,
) -> Result<String, CoreError> {
    bid_versions::table
        .filter(bid_versions::bid_id.eq(bid_id))
        .filter(bid_versions::version.eq(version))
        .select(bid_versions::params)
        .first(conn)
        .optional()
        .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?
        .ok_or_else(|| CoreError::VersionNotFound {
            id: bid_id.to_string(),
            version,
        })
}

// ============================================================================
// Write Operations
// ============================================================================

/// Create a bid at version 1 with status Created and no decision
pub fn create_bid(conn: &mut SqliteConnection, input: &CreateBidInput) -> Result<Bid, CoreError> {
    AuthorType::parse(&input.author_type)?;

    let id = uuid::Uuid::new_v4().to_string();
    let created_at = current_timestamp();
    let row = NewBid {
        id: &id,
        name: &input.name,
        description: &input.description,
        status: BidStatus::Created.as_str(),
        tender_id: &input.tender_id,
        author_type: &input.author_type,
        author_id: &input.author_id,
        version: 1,
        created_at: &created_at,
    };

    diesel::insert_into(bids::table)
        .values(&row)
        .execute(conn)
        .map_err(|e| CoreError::Internal(format!("Insert failed: {}", e)))?;

    get_bid(conn, &id)
}

/// Apply `bid`'s business fields as a new version.
///
/// Same shape as `tenders::edit_tender`: snapshot the stored pre-edit fields
/// at the stored version and write the new fields with version + 1, all under
/// the write lock taken at BEGIN.
pub fn edit_bid(conn: &mut SqliteConnection, bid: &Bid) -> Result<Bid, CoreError> {
    conn.immediate_transaction(|conn| {
        let stored: Bid = bids::table
            .filter(bids::id.eq(&bid.id))
            .first(conn)
            .optional()
            .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?
            .ok_or_else(|| CoreError::NotFound(format!("bid {}", bid.id)))?;

        let params = serde_json::to_string(&BidParams::capture(&stored))
            .map_err(|e| CoreError::Internal(format!("Snapshot encode failed: {}", e)))?;

        diesel::insert_into(bid_versions::table)
            .values(&NewBidVersion {
                bid_id: &stored.id,
                version: stored.version,
                params: &params,
            })
            .execute(conn)
            .map_err(|e| CoreError::Internal(format!("Snapshot insert failed: {}", e)))?;

        diesel::update(bids::table.filter(bids::id.eq(&stored.id)))
            .set((
                bids::name.eq(&bid.name),
                bids::description.eq(&bid.description),
                bids::version.eq(stored.version + 1),
            ))
            .execute(conn)
            .map_err(|e| CoreError::Internal(format!("Update failed: {}", e)))?;

        debug!(bid_id = %stored.id, from_version = stored.version, "Bid edit committed");

        bids::table
            .filter(bids::id.eq(&stored.id))
            .first(conn)
            .map_err(|e| CoreError::Internal(format!("Fetch failed: {}", e)))
    })
}

/// Write a new status. No snapshot, no version bump.
pub fn change_bid_status(
    conn: &mut SqliteConnection,
    bid_id: &str,
    status: BidStatus,
) -> Result<Bid, CoreError> {
    let updated = diesel::update(bids::table.filter(bids::id.eq(bid_id)))
        .set(bids::status.eq(status.as_str()))
        .execute(conn)
        .map_err(|e| CoreError::Internal(format!("Update failed: {}", e)))?;

    if updated == 0 {
        return Err(CoreError::NotFound(format!("bid {}", bid_id)));
    }

    get_bid(conn, bid_id)
}

/// Set the terminal decision on the bid row. The caller (the quorum engine)
/// owns the write-once invariant.
pub fn set_bid_decision(
    conn: &mut SqliteConnection,
    bid_id: &str,
    decision: Decision,
) -> Result<(), CoreError> {
    let updated = diesel::update(bids::table.filter(bids::id.eq(bid_id)))
        .set(bids::decision.eq(decision.as_str()))
        .execute(conn)
        .map_err(|e| CoreError::Internal(format!("Update failed: {}", e)))?;

    if updated == 0 {
        return Err(CoreError::NotFound(format!("bid {}", bid_id)));
    }

    Ok(())
}

// ============================================================================
// Decision Ledger
// ============================================================================

/// Append one vote to the ledger. No dedup at this layer.
pub fn insert_decision(
    conn: &mut SqliteConnection,
    bid_id: &str,
    username: &str,
    decision: Decision,
) -> Result<(), CoreError> {
    let id = uuid::Uuid::new_v4().to_string();
    diesel::insert_into(bid_decisions::table)
        .values(&NewBidDecision {
            id: &id,
            bid_id,
            username,
            decision: decision.as_str(),
        })
        .execute(conn)
        .map_err(|e| CoreError::Internal(format!("Decision insert failed: {}", e)))?;
    Ok(())
}

/// How many votes `username` has recorded for this bid
pub fn count_decisions_by_user(
    conn: &mut SqliteConnection,
    bid_id: &str,
    username: &str,
) -> Result<i64, CoreError> {
    bid_decisions::table
        .filter(bid_decisions::bid_id.eq(bid_id))
        .filter(bid_decisions::username.eq(username))
        .count()
        .get_result(conn)
        .map_err(|e| CoreError::Internal(format!("Count query failed: {}", e)))
}

/// How many distinct users have approved this bid. Counting usernames rather
/// than rows keeps quorum honest even if duplicate rows ever reach the ledger.
pub fn count_approved(conn: &mut SqliteConnection, bid_id: &str) -> Result<i64, CoreError> {
    bid_decisions::table
        .filter(bid_decisions::bid_id.eq(bid_id))
        .filter(bid_decisions::decision.eq(Decision::Approved.as_str()))
        .select(diesel::dsl::count_distinct(bid_decisions::username))
        .get_result(conn)
        .map_err(|e| CoreError::Internal(format!("Count query failed: {}", e)))
}
