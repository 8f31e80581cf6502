//! Share position entity: one transfer (or issue) of shares.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "positions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub security_id: Uuid,
    pub buyer_id: Option<Uuid>,
    /// `None` when the shares were newly issued.
    pub seller_id: Option<Uuid>,
    pub count: i64,
    /// Transferred unit numbers in compressed form (`1-3,5`), tracked securities only.
    pub number_segments: Option<String>,
    pub bought_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
