//! Register queries backing the SeaORM [`HolderDirectory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::warn;
use uuid::Uuid;

use crate::entity::{company, option_position, position, security, shareholder};
use crate::error::{AppError, AppResult};
use crate::models::{CompanyInfo, CompanySnapshot, SecurityInfo};
use crate::services::directory::{HolderDirectory, HolderIdentity, LedgerEntry, build_snapshot};
use crate::services::ordering::HolderField;
use crate::services::segments::parse_segments;

use super::DbPool;

impl HolderField {
    fn column(&self) -> shareholder::Column {
        match self {
            Self::LastName => shareholder::Column::LastName,
            Self::Email => shareholder::Column::Email,
            Self::Number => shareholder::Column::Number,
        }
    }
}

impl From<company::Model> for CompanyInfo {
    fn from(m: company::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
        }
    }
}

impl From<security::Model> for SecurityInfo {
    fn from(m: security::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            face_value: m.face_value,
            track_numbers: m.track_numbers,
        }
    }
}

impl From<shareholder::Model> for HolderIdentity {
    fn from(m: shareholder::Model) -> Self {
        Self {
            id: m.id,
            number: m.number,
            first_name: m.first_name,
            last_name: m.last_name,
            email: m.email,
            language: m.language,
        }
    }
}

/// Unit numbers stored on a ledger row. Malformed lists are logged and
/// treated as untracked.
fn ledger_units(id: Uuid, segments: Option<&str>) -> std::collections::BTreeSet<i64> {
    match segments.map(parse_segments) {
        Some(Ok(units)) => units,
        Some(Err(e)) => {
            warn!(position_id = %id, "Ignoring malformed unit numbers: {}", e);
            Default::default()
        }
        None => Default::default(),
    }
}

impl From<position::Model> for LedgerEntry {
    fn from(m: position::Model) -> Self {
        Self {
            units: ledger_units(m.id, m.number_segments.as_deref()),
            security_id: m.security_id,
            buyer_id: m.buyer_id,
            seller_id: m.seller_id,
            count: m.count,
            bought_at: m.bought_at,
            vesting_months: None,
        }
    }
}

impl From<option_position::Model> for LedgerEntry {
    fn from(m: option_position::Model) -> Self {
        Self {
            units: ledger_units(m.id, m.number_segments.as_deref()),
            security_id: m.security_id,
            buyer_id: m.buyer_id,
            seller_id: m.seller_id,
            count: m.count,
            bought_at: m.bought_at,
            vesting_months: m.vesting_months,
        }
    }
}

impl DbPool {
    /// Get a company by ID.
    pub async fn get_company(&self, id: Uuid) -> AppResult<Option<company::Model>> {
        company::Entity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get company: {}", e)))
    }

    /// Insert a company.
    pub async fn insert_company(&self, name: &str) -> AppResult<company::Model> {
        let model = company::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert company: {}", e)))
    }

    /// Insert a security for a company.
    pub async fn insert_security(
        &self,
        company_id: Uuid,
        title: &str,
        face_value: f64,
        track_numbers: bool,
    ) -> AppResult<security::Model> {
        let model = security::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(company_id),
            title: Set(title.to_string()),
            face_value: Set(face_value),
            track_numbers: Set(track_numbers),
            created_at: Set(Utc::now()),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert security: {}", e)))
    }

    /// Register a shareholder.
    pub async fn insert_shareholder(
        &self,
        company_id: Uuid,
        number: &str,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
    ) -> AppResult<shareholder::Model> {
        let model = shareholder::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(company_id),
            number: Set(number.to_string()),
            first_name: Set(first_name.to_string()),
            last_name: Set(last_name.to_string()),
            email: Set(email.map(|s| s.to_string())),
            language: Set(None),
            created_at: Set(Utc::now()),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert shareholder: {}", e)))
    }

    /// Record a share issue (`seller_id = None`) or transfer.
    pub async fn insert_position(&self, entry: NewPosition) -> AppResult<position::Model> {
        let model = position::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(entry.company_id),
            security_id: Set(entry.security_id),
            buyer_id: Set(entry.buyer_id),
            seller_id: Set(entry.seller_id),
            count: Set(entry.count),
            number_segments: Set(entry.number_segments),
            bought_at: Set(entry.bought_at),
            created_at: Set(Utc::now()),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert position: {}", e)))
    }

    /// Record an option grant or transfer.
    pub async fn insert_option_position(
        &self,
        entry: NewPosition,
        vesting_months: Option<i32>,
    ) -> AppResult<option_position::Model> {
        let model = option_position::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(entry.company_id),
            security_id: Set(entry.security_id),
            buyer_id: Set(entry.buyer_id),
            seller_id: Set(entry.seller_id),
            count: Set(entry.count),
            number_segments: Set(entry.number_segments),
            vesting_months: Set(vesting_months),
            bought_at: Set(entry.bought_at),
            created_at: Set(Utc::now()),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert option position: {}", e)))
    }

    async fn load_snapshot(
        &self,
        company_id: Uuid,
        as_of: DateTime<Utc>,
        field_order: Option<(HolderField, bool)>,
    ) -> AppResult<Option<CompanySnapshot>> {
        let Some(company) = self.get_company(company_id).await? else {
            return Ok(None);
        };

        let securities = security::Entity::find()
            .filter(security::Column::CompanyId.eq(company_id))
            .order_by_asc(security::Column::Title)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load securities: {}", e)))?;

        let mut holders_query =
            shareholder::Entity::find().filter(shareholder::Column::CompanyId.eq(company_id));
        if let Some((field, descending)) = field_order {
            let order = if descending { Order::Desc } else { Order::Asc };
            holders_query = holders_query.order_by(field.column(), order);
        }
        let holders: Vec<HolderIdentity> = holders_query
            .order_by_asc(shareholder::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load shareholders: {}", e)))?
            .into_iter()
            .map(HolderIdentity::from)
            .collect();

        let shares: Vec<LedgerEntry> = position::Entity::find()
            .filter(position::Column::CompanyId.eq(company_id))
            .filter(position::Column::BoughtAt.lte(as_of))
            .order_by_asc(position::Column::BoughtAt)
            .order_by_asc(position::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load positions: {}", e)))?
            .into_iter()
            .map(LedgerEntry::from)
            .collect();

        let options: Vec<LedgerEntry> = option_position::Entity::find()
            .filter(option_position::Column::CompanyId.eq(company_id))
            .filter(option_position::Column::BoughtAt.lte(as_of))
            .order_by_asc(option_position::Column::BoughtAt)
            .order_by_asc(option_position::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load option positions: {}", e)))?
            .into_iter()
            .map(LedgerEntry::from)
            .collect();

        Ok(Some(build_snapshot(
            company.into(),
            as_of,
            securities.into_iter().map(SecurityInfo::from).collect(),
            &holders,
            &shares,
            &options,
        )))
    }
}

/// Columns of a new ledger row.
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub company_id: Uuid,
    pub security_id: Uuid,
    pub buyer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub count: i64,
    pub number_segments: Option<String>,
    pub bought_at: DateTime<Utc>,
}

#[async_trait]
impl HolderDirectory for DbPool {
    async fn snapshot(
        &self,
        company_id: Uuid,
        as_of: DateTime<Utc>,
        field_order: Option<(HolderField, bool)>,
    ) -> AppResult<Option<CompanySnapshot>> {
        self.load_snapshot(company_id, as_of, field_order).await
    }

    async fn sweep_candidates(&self, min_shareholders: u64) -> AppResult<Vec<CompanyInfo>> {
        let counts: Vec<(Uuid, i64)> = shareholder::Entity::find()
            .select_only()
            .column(shareholder::Column::CompanyId)
            .column_as(shareholder::Column::Id.count(), "holder_count")
            .group_by(shareholder::Column::CompanyId)
            .into_tuple()
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count shareholders: {}", e)))?;

        let eligible: Vec<Uuid> = counts
            .into_iter()
            .filter(|(_, count)| *count >= 0 && *count as u64 >= min_shareholders)
            .map(|(id, _)| id)
            .collect();

        if eligible.is_empty() {
            return Ok(Vec::new());
        }

        let companies = company::Entity::find()
            .filter(company::Column::Id.is_in(eligible))
            .order_by_asc(company::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load companies: {}", e)))?;

        Ok(companies.into_iter().map(CompanyInfo::from).collect())
    }
}
