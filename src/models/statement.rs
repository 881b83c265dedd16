use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::statement_entity as statements;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatementRequest {
    #[schema(example = "2025-08")]
    pub month: String,
    pub details: Option<String>,
    #[serde(default)]
    pub revenue: i64,
    #[serde(default)]
    pub expenses: i64,
    /// 缺省时为 revenue - expenses
    pub profit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    pub id: i64,
    pub business_id: i64,
    pub month: String,
    pub details: Option<String>,
    pub revenue: i64,
    pub expenses: i64,
    pub profit: i64,
    pub created_at: DateTime<Utc>,
}

impl From<statements::Model> for StatementResponse {
    fn from(s: statements::Model) -> Self {
        Self {
            id: s.id,
            business_id: s.business_id,
            month: s.month,
            details: s.details,
            revenue: s.revenue,
            expenses: s.expenses,
            profit: s.profit,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocateProfitRequest {
    #[schema(example = 100000)]
    pub total_profit: i64,
    /// 缺省为当前月份（YYYY-MM）
    pub month: Option<String>,
}

/// 一次收益分配的结果
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfitAllocation {
    pub business_id: i64,
    pub month: String,
    pub total_profit: i64,
    pub per_partner_profit: i64,
    pub partner_count: i32,
    /// 整除后的零头
    pub undistributed: i64,
}
