use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 业务（募资对象）
/// - target_amount: 募资目标，0 表示不设上限
/// - total_raised: 已募集总额，与出资记录在同一事务中累加
/// - max_partners: 合伙人名额上限
/// - slot_price: 每个合伙份额的价格
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "businesses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: Option<i64>,
    pub target_amount: i64,
    pub total_raised: i64,
    pub max_partners: i32,
    pub slot_price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// 剩余可募集额度；无目标时为 None
    pub fn remaining_capacity(&self) -> Option<i64> {
        (self.target_amount > 0).then(|| (self.target_amount - self.total_raised).max(0))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
