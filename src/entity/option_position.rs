//! Option position entity: a grant or transfer of options.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "option_positions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub security_id: Uuid,
    pub buyer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub count: i64,
    pub number_segments: Option<String>,
    /// Linear monthly vesting period; `None` means vested at grant.
    pub vesting_months: Option<i32>,
    pub bought_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
