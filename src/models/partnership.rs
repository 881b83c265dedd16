use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::partnership_entity as partnerships;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuyPartnershipRequest {
    /// 购买份额数，默认 1
    #[schema(example = 1)]
    pub slots: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnershipResponse {
    pub id: i64,
    pub user_id: i64,
    pub business_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub slots: i32,
    pub amount_paid: i64,
    pub profit_earned: i64,
    pub created_at: DateTime<Utc>,
}

impl From<partnerships::Model> for PartnershipResponse {
    fn from(p: partnerships::Model) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            business_id: p.business_id,
            business_name: None,
            username: None,
            slots: p.slots,
            amount_paid: p.amount_paid,
            profit_earned: p.profit_earned,
            created_at: p.created_at,
        }
    }
}
