//! Read access to the company register.
//!
//! [`HolderDirectory`] is the seam between the render pipeline and the
//! domain data. The SeaORM implementation lives in `db::holders`; it loads
//! raw ledger rows and hands them to [`build_snapshot`], which derives counts,
//! percentages, face values and tracked units as of a given instant.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{CompanyInfo, CompanySnapshot, HolderRecord, SecurityInfo, TrackedUnits};
use crate::services::ordering::HolderField;

/// Domain data consumed by rendering and the pre-render sweep.
#[async_trait]
pub trait HolderDirectory: Send + Sync {
    /// Active shareholders and option holders of a company as of `as_of`.
    ///
    /// With a `field_order`, both holder lists come back in the store's
    /// order for that column and are rendered as returned.
    async fn snapshot(
        &self,
        company_id: Uuid,
        as_of: DateTime<Utc>,
        field_order: Option<(HolderField, bool)>,
    ) -> AppResult<Option<CompanySnapshot>>;

    /// Companies with at least `min_shareholders` registered shareholders.
    async fn sweep_candidates(&self, min_shareholders: u64) -> AppResult<Vec<CompanyInfo>>;
}

/// Identity columns of a register entry.
#[derive(Debug, Clone)]
pub struct HolderIdentity {
    pub id: Uuid,
    pub number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub language: Option<String>,
}

/// One movement of units between holders.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub security_id: Uuid,
    pub buyer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub count: i64,
    pub units: BTreeSet<i64>,
    pub bought_at: DateTime<Utc>,
    /// Linear monthly vesting; only meaningful for options.
    pub vesting_months: Option<i32>,
}

#[derive(Default)]
struct Holding {
    count: i64,
    vested: i64,
    units: BTreeSet<i64>,
}

/// Derive the register as of `as_of` from ledger entries.
///
/// Holders keep the order of `holders`. Entries after `as_of` are ignored.
/// Percentages of both shares and options are relative to the issued shares.
pub fn build_snapshot(
    company: CompanyInfo,
    as_of: DateTime<Utc>,
    securities: Vec<SecurityInfo>,
    holders: &[HolderIdentity],
    shares: &[LedgerEntry],
    options: &[LedgerEntry],
) -> CompanySnapshot {
    let share_holdings = accumulate(shares, as_of);
    let option_holdings = accumulate(options, as_of);

    let total_shares: i64 = share_holdings
        .iter()
        .map(|(_, h)| h.count.max(0))
        .sum();

    let shareholders = project(holders, &securities, &share_holdings, total_shares, false);
    let option_holders = project(holders, &securities, &option_holdings, total_shares, true);

    CompanySnapshot {
        company,
        as_of,
        securities,
        shareholders,
        option_holders,
    }
}

type HoldingKey = (Uuid, Uuid);

fn accumulate(entries: &[LedgerEntry], as_of: DateTime<Utc>) -> Vec<(HoldingKey, Holding)> {
    let mut holdings: HashMap<HoldingKey, Holding> = HashMap::new();

    for entry in entries.iter().filter(|e| e.bought_at <= as_of) {
        if let Some(buyer) = entry.buyer_id {
            let holding = holdings.entry((buyer, entry.security_id)).or_default();
            holding.count += entry.count;
            holding.vested += vested_portion(entry, as_of);
            holding.units.extend(entry.units.iter().copied());
        }
        if let Some(seller) = entry.seller_id {
            let holding = holdings.entry((seller, entry.security_id)).or_default();
            holding.count -= entry.count;
            holding.vested -= entry.count;
            for unit in &entry.units {
                holding.units.remove(unit);
            }
        }
    }

    holdings.into_iter().collect()
}

fn vested_portion(entry: &LedgerEntry, as_of: DateTime<Utc>) -> i64 {
    match entry.vesting_months {
        Some(months) if months > 0 => {
            let elapsed = months_between(entry.bought_at, as_of).min(i64::from(months));
            entry.count * elapsed / i64::from(months)
        }
        _ => entry.count,
    }
}

/// Whole calendar months from `start` to `end`, never negative.
fn months_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let mut months = i64::from(end.year() - start.year()) * 12
        + i64::from(end.month()) - i64::from(start.month());
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0)
}

fn project(
    holders: &[HolderIdentity],
    securities: &[SecurityInfo],
    holdings: &[(HoldingKey, Holding)],
    total_shares: i64,
    is_option: bool,
) -> Vec<HolderRecord> {
    let securities_by_id: HashMap<Uuid, &SecurityInfo> =
        securities.iter().map(|s| (s.id, s)).collect();

    let mut by_holder: HashMap<Uuid, Vec<(&SecurityInfo, &Holding)>> = HashMap::new();
    for ((holder_id, security_id), holding) in holdings {
        if let Some(security) = securities_by_id.get(security_id) {
            by_holder
                .entry(*holder_id)
                .or_default()
                .push((*security, holding));
        }
    }

    holders
        .iter()
        .filter_map(|identity| {
            let mut positions = by_holder.remove(&identity.id)?;
            positions.sort_by(|(a, _), (b, _)| a.title.cmp(&b.title));

            let share_count: i64 = positions.iter().map(|(_, h)| h.count).sum();
            if share_count <= 0 {
                return None;
            }

            let vested_count = if is_option {
                positions
                    .iter()
                    .map(|(_, h)| h.vested.clamp(0, h.count))
                    .sum()
            } else {
                share_count
            };

            let cumulated_face_value = positions
                .iter()
                .map(|(s, h)| h.count as f64 * s.face_value)
                .sum();

            let share_percent = (total_shares > 0)
                .then(|| share_count as f64 * 100.0 / total_shares as f64);

            let tracked_units = positions
                .iter()
                .filter(|(s, h)| s.track_numbers && !h.units.is_empty())
                .map(|(s, h)| TrackedUnits {
                    security_id: s.id,
                    security_title: s.title.clone(),
                    unit_ids: h.units.clone(),
                })
                .collect();

            Some(HolderRecord {
                id: identity.id,
                number: identity.number.clone(),
                first_name: identity.first_name.clone(),
                last_name: identity.last_name.clone(),
                email: identity.email.clone(),
                language: identity.language.clone(),
                share_count,
                vested_count,
                cumulated_face_value,
                share_percent,
                tracked_units,
            })
        })
        .collect()
}
