use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::{
    ContributionStatus, WithdrawalStatus, business_entity as businesses,
    contribution_entity as contributions, partnership_entity as partnerships,
    user_entity as users, withdrawal_entity as withdrawals,
};
use crate::error::AppResult;
use crate::models::{DashboardStats, WithdrawalCounts};

#[derive(Clone)]
pub struct AdminService {
    pool: DatabaseConnection,
}

impl AdminService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 管理后台概览
    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        let withdrawals_by = |status: WithdrawalStatus| {
            withdrawals::Entity::find()
                .filter(withdrawals::Column::Status.eq(status))
                .count(&self.pool)
        };

        Ok(DashboardStats {
            total_users: users::Entity::find().count(&self.pool).await?,
            total_businesses: businesses::Entity::find().count(&self.pool).await?,
            total_partnerships: partnerships::Entity::find().count(&self.pool).await?,
            pending_contributions: contributions::Entity::find()
                .filter(contributions::Column::Status.eq(ContributionStatus::Pending))
                .count(&self.pool)
                .await?,
            withdrawals: WithdrawalCounts {
                total: withdrawals::Entity::find().count(&self.pool).await?,
                pending: withdrawals_by(WithdrawalStatus::Pending).await?,
                approved: withdrawals_by(WithdrawalStatus::Approved).await?,
                rejected: withdrawals_by(WithdrawalStatus::Rejected).await?,
            },
        })
    }
}
