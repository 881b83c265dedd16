use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 每次收益分配的记录
/// - undistributed: 整除后剩余、未分给任何合伙人的零头
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "profit_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub business_id: i64,
    pub month: String,
    pub profit: i64,
    pub per_partner_profit: i64,
    pub partner_count: i32,
    pub undistributed: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
