use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 合伙记录：用户在某业务中持有的份额以及累计可提取的收益
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "partnerships")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub business_id: i64,
    pub slots: i32,
    pub amount_paid: i64,
    /// 累计收益，只会因审批通过的收益提现而减少
    pub profit_earned: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
