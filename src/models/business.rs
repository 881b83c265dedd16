use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::business_entity as businesses;
use crate::utils::progress_percent;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessRequest {
    #[schema(example = "Lekki Bakery")]
    pub name: String,
    pub description: Option<String>,
    /// 募资目标（最小货币单位），0 或缺省表示不设上限
    #[serde(default)]
    pub target_amount: i64,
    #[schema(example = 10)]
    pub max_partners: i32,
    /// 每个份额的价格（最小货币单位）
    #[schema(example = 50000)]
    pub slot_price: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusinessResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: Option<i64>,
    pub target_amount: i64,
    pub total_raised: i64,
    pub progress_percent: String,
    pub max_partners: i32,
    pub partner_count: u64,
    pub slot_price: i64,
    pub created_at: DateTime<Utc>,
}

impl BusinessResponse {
    pub fn new(b: businesses::Model, partner_count: u64) -> Self {
        Self {
            progress_percent: progress_percent(b.total_raised, b.target_amount),
            id: b.id,
            name: b.name,
            description: b.description,
            creator_id: b.creator_id,
            target_amount: b.target_amount,
            total_raised: b.total_raised,
            max_partners: b.max_partners,
            partner_count,
            slot_price: b.slot_price,
            created_at: b.created_at,
        }
    }
}
