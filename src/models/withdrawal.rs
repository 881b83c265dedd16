use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entities::{WithdrawalSource, WithdrawalStatus, withdrawal_entity as withdrawals};
use crate::error::{AppError, AppResult};

/// 钱包提现申请
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithdrawalRequest {
    #[schema(example = 20000)]
    pub amount: i64,
    pub business_id: Option<i64>,
}

/// 合伙收益提现申请
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProfitWithdrawalRequest {
    #[schema(example = 5000)]
    pub amount: i64,
}

/// 管理员的审批决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalDecision {
    #[serde(alias = "approve")]
    Approved,
    #[serde(alias = "reject")]
    Rejected,
}

impl WithdrawalDecision {
    /// 状态迁移：只有 pending 可以被决定，终态再次决定返回 AlreadyProcessed
    pub fn apply_to(self, current: WithdrawalStatus) -> AppResult<WithdrawalStatus> {
        match current {
            WithdrawalStatus::Pending => Ok(self.into()),
            WithdrawalStatus::Approved | WithdrawalStatus::Rejected => Err(
                AppError::AlreadyProcessed(format!("Withdrawal already {current}")),
            ),
        }
    }
}

impl From<WithdrawalDecision> for WithdrawalStatus {
    fn from(d: WithdrawalDecision) -> Self {
        match d {
            WithdrawalDecision::Approved => WithdrawalStatus::Approved,
            WithdrawalDecision::Rejected => WithdrawalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateWithdrawalStatusRequest {
    pub status: WithdrawalDecision,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WithdrawalListQuery {
    pub status: Option<WithdrawalStatus>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub source: WithdrawalSource,
    pub business_id: Option<i64>,
    pub partnership_id: Option<i64>,
    pub amount: i64,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<i64>,
}

impl From<withdrawals::Model> for WithdrawalResponse {
    fn from(w: withdrawals::Model) -> Self {
        Self {
            id: w.id,
            user_id: w.user_id,
            username: w.username,
            source: w.source,
            business_id: w.business_id,
            partnership_id: w.partnership_id,
            amount: w.amount,
            status: w.status,
            requested_at: w.requested_at,
            processed_at: w.processed_at,
            processed_by: w.processed_by,
        }
    }
}
