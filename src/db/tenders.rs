//! Tender persistence: current state, append-only version history, status
//!
//! `edit_tender` is the versioned-store write path: the pre-edit field values
//! are snapshotted at the stored version and the row is rewritten with
//! version + 1, inseparably in one transaction.

use diesel::prelude::*;
use serde::Deserialize;
use tracing::debug;

use super::models::{
    current_timestamp, NewTender, NewTenderVersion, ServiceType, Tender, TenderParams,
    TenderStatus,
};
use super::schema::{tender_versions, tenders};
use crate::error::CoreError;

/// Input for creating a tender
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenderInput {
    pub name: String,
    pub description: String,
    pub service_type: String,
    pub organization_id: String,
}

// ============================================================================
// Read Operations
// ============================================================================

/// Get a tender by ID
pub fn get_tender(conn: &mut SqliteConnection, tender_id: &str) -> Result<Tender, CoreError> {
    tenders::table
        .filter(tenders::id.eq(tender_id))
        .first(conn)
        .optional()
        .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?
        .ok_or_else(|| CoreError::NotFound(format!("tender {}", tender_id)))
}

/// Check whether a tender row exists
pub fn tender_exists(conn: &mut SqliteConnection, tender_id: &str) -> Result<bool, CoreError> {
    let count: i64 = tenders::table
        .filter(tenders::id.eq(tender_id))
        .count()
        .get_result(conn)
        .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?;
    Ok(count > 0)
}

/// Get just the status column
pub fn get_tender_status(conn: &mut SqliteConnection, tender_id: &str) -> Result<String, CoreError> {
    tenders::table
        .filter(tenders::id.eq(tender_id))
        .select(tenders::status)
        .first(conn)
        .optional()
        .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?
        .ok_or_else(|| CoreError::NotFound(format!("tender {}", tender_id)))
}

/// Fetch the params snapshot stored for an exact historical version
pub fn get_tender_snapshot(
    conn: &mut SqliteConnection,
    tender_id: &str,
    version: i32,
) -> Result<String, CoreError> {
    tender_versions::table
        .filter(tender_versions::tender_id.eq(tender_id))
        .filter(tender_versions::version.eq(version))
        .select(tender_versions::params)
        .first(conn)
        .optional()
        .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?
        .ok_or_else(|| CoreError::VersionNotFound {
            id: tender_id.to_string(),
            version,
        })
}

// ============================================================================
// Write Operations
// ============================================================================

/// Create a tender at version 1 with status Created
pub fn create_tender(
    conn: &mut SqliteConnection,
    input: &CreateTenderInput,
) -> Result<Tender, CoreError> {
    ServiceType::parse(&input.service_type)?;

    let id = uuid::Uuid::new_v4().to_string();
    let created_at = current_timestamp();
    let row = NewTender {
        id: &id,
        name: &input.name,
        description: &input.description,
        service_type: &input.service_type,
        status: TenderStatus::Created.as_str(),
        version: 1,
        organization_id: &input.organization_id,
        created_at: &created_at,
    };

    diesel::insert_into(tenders::table)
        .values(&row)
        .execute(conn)
        .map_err(|e| CoreError::Internal(format!("Insert failed: {}", e)))?;

    get_tender(conn, &id)
}

/// Apply `tender`'s business fields as a new version.
///
/// Runs as one immediate transaction: read the stored row, snapshot its
/// pre-edit fields at the stored version, write the incoming fields with
/// version + 1. SQLite takes the write lock at BEGIN, so two concurrent edits
/// of the same tender serialize instead of both snapshotting from the same
/// version.
pub fn edit_tender(conn: &mut SqliteConnection, tender: &Tender) -> Result<Tender, CoreError> {
    conn.immediate_transaction(|conn| {
        let stored: Tender = tenders::table
            .filter(tenders::id.eq(&tender.id))
            .first(conn)
            .optional()
            .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?
            .ok_or_else(|| CoreError::NotFound(format!("tender {}", tender.id)))?;

        let params = serde_json::to_string(&TenderParams::capture(&stored))
            .map_err(|e| CoreError::Internal(format!("Snapshot encode failed: {}", e)))?;

        diesel::insert_into(tender_versions::table)
            .values(&NewTenderVersion {
                tender_id: &stored.id,
                version: stored.version,
                params: &params,
            })
            .execute(conn)
            .map_err(|e| CoreError::Internal(format!("Snapshot insert failed: {}", e)))?;

        diesel::update(tenders::table.filter(tenders::id.eq(&stored.id)))
            .set((
                tenders::name.eq(&tender.name),
                tenders::description.eq(&tender.description),
                tenders::service_type.eq(&tender.service_type),
                tenders::version.eq(stored.version + 1),
            ))
            .execute(conn)
            .map_err(|e| CoreError::Internal(format!("Update failed: {}", e)))?;

        debug!(
            tender_id = %stored.id,
            from_version = stored.version,
            "Tender edit committed"
        );

        tenders::table
            .filter(tenders::id.eq(&stored.id))
            .first(conn)
            .map_err(|e| CoreError::Internal(format!("Fetch failed: {}", e)))
    })
}

/// Write a new status. Status is not a business field: no snapshot, no
/// version bump.
pub fn change_tender_status(
    conn: &mut SqliteConnection,
    tender_id: &str,
    status: TenderStatus,
) -> Result<Tender, CoreError> {
    let updated = diesel::update(tenders::table.filter(tenders::id.eq(tender_id)))
        .set(tenders::status.eq(status.as_str()))
        .execute(conn)
        .map_err(|e| CoreError::Internal(format!("Update failed: {}", e)))?;

    if updated == 0 {
        return Err(CoreError::NotFound(format!("tender {}", tender_id)));
    }

    get_tender(conn, tender_id)
}
