//! Point-in-time views of a company's register.
//!
//! These are what the render pipeline consumes; they are computed by a
//! [`HolderDirectory`](crate::services::directory::HolderDirectory) and
//! never persisted.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Company header data.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyInfo {
    pub id: Uuid,
    pub name: String,
}

/// A security as configured on the company.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityInfo {
    pub id: Uuid,
    pub title: String,
    pub face_value: f64,
    pub track_numbers: bool,
}

/// Individually numbered units of one tracked security held by a holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedUnits {
    pub security_id: Uuid,
    pub security_title: String,
    pub unit_ids: BTreeSet<i64>,
}

/// One shareholder or option holder with counts derived as of the snapshot date.
#[derive(Debug, Clone, PartialEq)]
pub struct HolderRecord {
    pub id: Uuid,
    pub number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub language: Option<String>,
    /// Shares (or options) held.
    pub share_count: i64,
    /// Options vested so far; equals `share_count` for plain shares.
    pub vested_count: i64,
    /// Sum of face values over all units held.
    pub cumulated_face_value: f64,
    /// Share of all issued shares, `None` when not computed.
    pub share_percent: Option<f64>,
    /// Empty unless the company tracks unit numbers.
    pub tracked_units: Vec<TrackedUnits>,
}

/// Everything a render needs, taken at one instant.
#[derive(Debug, Clone)]
pub struct CompanySnapshot {
    pub company: CompanyInfo,
    pub as_of: DateTime<Utc>,
    pub securities: Vec<SecurityInfo>,
    pub shareholders: Vec<HolderRecord>,
    pub option_holders: Vec<HolderRecord>,
}

impl CompanySnapshot {
    /// Whether any security has per-unit tracking enabled.
    pub fn has_tracked_securities(&self) -> bool {
        self.securities.iter().any(|s| s.track_numbers)
    }

    /// Nominal capital held by shareholders.
    pub fn total_capital(&self) -> f64 {
        self.shareholders.iter().map(|h| h.cumulated_face_value).sum()
    }

    /// Nominal capital reserved for option holders.
    pub fn provisioned_capital(&self) -> f64 {
        self.option_holders
            .iter()
            .map(|h| h.cumulated_face_value)
            .sum()
    }

    pub fn total_shares(&self) -> i64 {
        self.shareholders.iter().map(|h| h.share_count).sum()
    }

    pub fn total_options(&self) -> i64 {
        self.option_holders.iter().map(|h| h.share_count).sum()
    }
}
