//! Existence and authorization collaborators
//!
//! The workflow engines call these before mutating state and turn the verdict
//! into `NotFound` / `Forbidden`. Answers come from the `users`,
//! `organizations` and `organization_responsibles` tables; the missing-row
//! case is a typed `false`, never a sentinel error comparison.

use diesel::prelude::*;

use crate::db::schema::{organization_responsibles, organizations, tenders, users};
use crate::db::{bids, tenders as tender_queries};
use crate::error::CoreError;

/// Entity kinds that can answer an existence check.
///
/// Implemented per kind and consumed generically by validation pre-checks.
pub trait CheckExists {
    fn exists(conn: &mut SqliteConnection, id: &str) -> Result<bool, CoreError>;
}

/// Users, keyed by username
pub struct UserKind;

/// Organizations, keyed by UUID
pub struct OrganizationKind;

/// Tenders, keyed by UUID
pub struct TenderKind;

/// Bids, keyed by UUID
pub struct BidKind;

impl CheckExists for UserKind {
    fn exists(conn: &mut SqliteConnection, id: &str) -> Result<bool, CoreError> {
        let count: i64 = users::table
            .filter(users::username.eq(id))
            .count()
            .get_result(conn)
            .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?;
        Ok(count > 0)
    }
}

impl CheckExists for OrganizationKind {
    fn exists(conn: &mut SqliteConnection, id: &str) -> Result<bool, CoreError> {
        let count: i64 = organizations::table
            .filter(organizations::id.eq(id))
            .count()
            .get_result(conn)
            .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?;
        Ok(count > 0)
    }
}

impl CheckExists for TenderKind {
    fn exists(conn: &mut SqliteConnection, id: &str) -> Result<bool, CoreError> {
        tender_queries::tender_exists(conn, id)
    }
}

impl CheckExists for BidKind {
    fn exists(conn: &mut SqliteConnection, id: &str) -> Result<bool, CoreError> {
        bids::bid_exists(conn, id)
    }
}

/// Authorization decisions consumed by the versioning and approval engines.
///
/// A trait so tests and embedders can substitute their own policy; the
/// default [`DbAccessPolicy`] answers from the responsibility tables.
pub trait AccessPolicy: Send + Sync {
    /// May `username` manage (edit, roll back, change status of) entities
    /// owned by `organization_id`?
    fn user_can_manage(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
        organization_id: &str,
    ) -> Result<bool, CoreError>;

    /// May `username` manage a bid authored by (`author_type`, `author_id`)?
    fn user_can_manage_bid(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
        author_type: &str,
        author_id: &str,
    ) -> Result<bool, CoreError>;

    /// May `username` approve bids on `tender_id`? Requires responsibility
    /// for the tender's owning organization.
    fn user_can_approve(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
        tender_id: &str,
    ) -> Result<bool, CoreError>;
}

/// Policy backed by the `organization_responsibles` table
#[derive(Debug, Clone, Copy, Default)]
pub struct DbAccessPolicy;

impl AccessPolicy for DbAccessPolicy {
    fn user_can_manage(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
        organization_id: &str,
    ) -> Result<bool, CoreError> {
        is_responsible(conn, username, organization_id)
    }

    fn user_can_manage_bid(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
        author_type: &str,
        author_id: &str,
    ) -> Result<bool, CoreError> {
        match author_type {
            "User" => Ok(username == author_id),
            "Organization" => is_responsible(conn, username, author_id),
            other => Err(CoreError::InvalidInput(format!(
                "author type '{}' is not valid. Valid values: Organization, User",
                other
            ))),
        }
    }

    fn user_can_approve(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
        tender_id: &str,
    ) -> Result<bool, CoreError> {
        let organization_id: Option<String> = tenders::table
            .filter(tenders::id.eq(tender_id))
            .select(tenders::organization_id)
            .first(conn)
            .optional()
            .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?;

        match organization_id {
            Some(org) => is_responsible(conn, username, &org),
            None => Err(CoreError::NotFound(format!("tender {}", tender_id))),
        }
    }
}

fn is_responsible(
    conn: &mut SqliteConnection,
    username: &str,
    organization_id: &str,
) -> Result<bool, CoreError> {
    let count: i64 = organization_responsibles::table
        .filter(organization_responsibles::organization_id.eq(organization_id))
        .filter(organization_responsibles::username.eq(username))
        .count()
        .get_result(conn)
        .map_err(|e| CoreError::Internal(format!("Query failed: {}", e)))?;
    Ok(count > 0)
}

// ============================================================================
// Directory maintenance
// ============================================================================

/// Register a user
pub fn add_user(conn: &mut SqliteConnection, username: &str) -> Result<(), CoreError> {
    diesel::insert_or_ignore_into(users::table)
        .values(users::username.eq(username))
        .execute(conn)
        .map_err(|e| CoreError::Internal(format!("Insert failed: {}", e)))?;
    Ok(())
}

/// Register an organization
pub fn add_organization(
    conn: &mut SqliteConnection,
    organization_id: &str,
    name: &str,
) -> Result<(), CoreError> {
    diesel::insert_or_ignore_into(organizations::table)
        .values((
            organizations::id.eq(organization_id),
            organizations::name.eq(name),
        ))
        .execute(conn)
        .map_err(|e| CoreError::Internal(format!("Insert failed: {}", e)))?;
    Ok(())
}

/// Make a user responsible for an organization
pub fn add_responsible(
    conn: &mut SqliteConnection,
    organization_id: &str,
    username: &str,
) -> Result<(), CoreError> {
    diesel::insert_or_ignore_into(organization_responsibles::table)
        .values((
            organization_responsibles::organization_id.eq(organization_id),
            organization_responsibles::username.eq(username),
        ))
        .execute(conn)
        .map_err(|e| CoreError::Internal(format!("Insert failed: {}", e)))?;
    Ok(())
}
