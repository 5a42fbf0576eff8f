//! Diesel model definitions and domain enums
//!
//! - Queryable structs: for SELECT queries (reading data)
//! - Insertable structs: for INSERT queries (writing data)
//!
//! Status, decision, service type and author type are TEXT columns in SQLite;
//! the enums below are the closed sets of values those columns may hold.
//! Parsing a value outside the set is an `InvalidInput` failure.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::schema::*;
use crate::error::CoreError;

// ============================================================================
// Timestamp Helpers (SQLite stores timestamps as TEXT)
// ============================================================================

/// Get current UTC timestamp as ISO 8601 string for SQLite TEXT columns
pub fn current_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============================================================================
// Domain Enums
// ============================================================================

/// Tender lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenderStatus {
    Created,
    Published,
    Closed,
}

impl TenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenderStatus::Created => "Created",
            TenderStatus::Published => "Published",
            TenderStatus::Closed => "Closed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Created" => Ok(TenderStatus::Created),
            "Published" => Ok(TenderStatus::Published),
            "Closed" => Ok(TenderStatus::Closed),
            other => Err(CoreError::InvalidInput(format!(
                "tender status '{}' is not valid. Valid values: Created, Published, Closed",
                other
            ))),
        }
    }
}

/// Bid lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidStatus {
    Created,
    Published,
    Canceled,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Created => "Created",
            BidStatus::Published => "Published",
            BidStatus::Canceled => "Canceled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Created" => Ok(BidStatus::Created),
            "Published" => Ok(BidStatus::Published),
            "Canceled" => Ok(BidStatus::Canceled),
            other => Err(CoreError::InvalidInput(format!(
                "bid status '{}' is not valid. Valid values: Created, Published, Canceled",
                other
            ))),
        }
    }
}

/// Type of service a tender procures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    Construction,
    Delivery,
    Manufacture,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Construction => "Construction",
            ServiceType::Delivery => "Delivery",
            ServiceType::Manufacture => "Manufacture",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Construction" => Ok(ServiceType::Construction),
            "Delivery" => Ok(ServiceType::Delivery),
            "Manufacture" => Ok(ServiceType::Manufacture),
            other => Err(CoreError::InvalidInput(format!(
                "service type '{}' is not valid. Valid values: Construction, Delivery, Manufacture",
                other
            ))),
        }
    }
}

/// Who authored a bid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorType {
    Organization,
    User,
}

impl AuthorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorType::Organization => "Organization",
            AuthorType::User => "User",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Organization" => Ok(AuthorType::Organization),
            "User" => Ok(AuthorType::User),
            other => Err(CoreError::InvalidInput(format!(
                "author type '{}' is not valid. Valid values: Organization, User",
                other
            ))),
        }
    }
}

/// Terminal verdict on a bid. Write-once: a bid goes from no decision to
/// exactly one of these and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Approved" => Ok(Decision::Approved),
            "Rejected" => Ok(Decision::Rejected),
            other => Err(CoreError::InvalidInput(format!(
                "decision '{}' is not valid. Valid values: Approved, Rejected",
                other
            ))),
        }
    }
}

// ============================================================================
// Tender Models
// ============================================================================

/// Tender row from SELECT query
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = tenders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Tender {
    pub id: String,
    pub name: String,
    pub description: String,
    pub service_type: String,
    pub status: String,
    pub version: i32,
    pub organization_id: String,
    pub created_at: String,
}

/// New tender for INSERT
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tenders)]
pub struct NewTender<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub service_type: &'a str,
    pub status: &'a str,
    pub version: i32,
    pub organization_id: &'a str,
    pub created_at: &'a str,
}

// ============================================================================
// Bid Models
// ============================================================================

/// Bid row from SELECT query
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = bids)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Bid {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub tender_id: String,
    pub author_type: String,
    pub author_id: String,
    pub version: i32,
    pub decision: Option<String>,
    pub created_at: String,
}

/// New bid for INSERT
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bids)]
pub struct NewBid<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub status: &'a str,
    pub tender_id: &'a str,
    pub author_type: &'a str,
    pub author_id: &'a str,
    pub version: i32,
    pub created_at: &'a str,
}

// ============================================================================
// Version History Models
// ============================================================================

/// Historical tender snapshot row
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tender_versions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TenderVersion {
    pub tender_id: String,
    pub version: i32,
    pub params: String,
}

/// New tender snapshot for INSERT
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tender_versions)]
pub struct NewTenderVersion<'a> {
    pub tender_id: &'a str,
    pub version: i32,
    pub params: &'a str,
}

/// Historical bid snapshot row
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bid_versions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BidVersion {
    pub bid_id: String,
    pub version: i32,
    pub params: String,
}

/// New bid snapshot for INSERT
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bid_versions)]
pub struct NewBidVersion<'a> {
    pub bid_id: &'a str,
    pub version: i32,
    pub params: &'a str,
}

// ============================================================================
// Decision Ledger Models
// ============================================================================

/// One user's vote on a bid
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = bid_decisions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BidDecision {
    pub id: String,
    pub bid_id: String,
    pub username: String,
    pub decision: String,
}

/// New vote for INSERT
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bid_decisions)]
pub struct NewBidDecision<'a> {
    pub id: &'a str,
    pub bid_id: &'a str,
    pub username: &'a str,
    pub decision: &'a str,
}

// ============================================================================
// Snapshot Params Payloads
// ============================================================================

/// Snapshot payload for tender business fields (the `params` JSON blob).
///
/// Every field is optional on decode: a snapshot written before a field
/// existed simply leaves the current value in place, and keys the current
/// schema no longer knows are ignored. Status and organization never ride
/// in a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenderParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
}

impl TenderParams {
    /// Capture the editable fields of a stored tender
    pub fn capture(tender: &Tender) -> Self {
        Self {
            name: Some(tender.name.clone()),
            description: Some(tender.description.clone()),
            service_type: Some(tender.service_type.clone()),
        }
    }

    /// Apply the captured fields onto a live tender, leaving absent fields untouched
    pub fn apply(&self, tender: &mut Tender) {
        if let Some(ref name) = self.name {
            tender.name = name.clone();
        }
        if let Some(ref description) = self.description {
            tender.description = description.clone();
        }
        if let Some(ref service_type) = self.service_type {
            tender.service_type = service_type.clone();
        }
    }
}

/// Snapshot payload for bid business fields. Same decode rules as
/// [`TenderParams`]; decision and status are never part of the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BidParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BidParams {
    /// Capture the editable fields of a stored bid
    pub fn capture(bid: &Bid) -> Self {
        Self {
            name: Some(bid.name.clone()),
            description: Some(bid.description.clone()),
        }
    }

    /// Apply the captured fields onto a live bid, leaving absent fields untouched
    pub fn apply(&self, bid: &mut Bid) {
        if let Some(ref name) = self.name {
            bid.name = name.clone();
        }
        if let Some(ref description) = self.description {
            bid.description = description.clone();
        }
    }
}
