use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entities::{ContributionStatus, contribution_entity as contributions};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContributionRequest {
    #[schema(example = 30000)]
    pub amount: i64,
    #[schema(example = 1)]
    pub business_id: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributionResponse {
    pub id: i64,
    pub user_id: i64,
    pub business_id: i64,
    pub amount: i64,
    pub status: ContributionStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl From<contributions::Model> for ContributionResponse {
    fn from(c: contributions::Model) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            business_id: c.business_id,
            amount: c.amount,
            status: c.status,
            created_at: c.created_at,
            approved_at: c.approved_at,
        }
    }
}

/// 出资成功后的回执
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributionReceipt {
    pub contribution: ContributionResponse,
    pub total_raised: i64,
    /// 两位小数的百分比，无目标时为 "N/A"
    #[schema(example = "55.00")]
    pub progress_percent: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FundingProgress {
    pub business_id: i64,
    pub business_name: String,
    pub target: i64,
    /// 全部出资之和（含待审核）
    pub raised: i64,
    pub approved_raised: i64,
    pub progress_percent: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: i64,
    pub username: String,
    pub name: Option<String>,
    pub total_contributed: i64,
    pub contribution_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// 默认 10，最大 50
    pub limit: Option<u64>,
}
