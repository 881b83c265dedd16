use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

use crate::entities::{
    ContributionStatus, NotificationKind, business_entity as businesses,
    contribution_entity as contributions, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    ContributionReceipt, ContributionResponse, FundingProgress, LeaderboardEntry,
    PaginatedResponse, PaginationParams,
};
use crate::services::{NotificationService, Outbox};
use crate::utils::progress_percent;

/// 排行榜允许的最大条数
pub const LEADERBOARD_MAX: u64 = 50;

#[derive(Debug, FromQueryResult)]
struct AmountTotal {
    total: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct BusinessTotal {
    business_id: i64,
    total: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct ContributorTotal {
    user_id: i64,
    total: i64,
    contribution_count: i64,
}

/// `CAST(SUM(amount) AS BIGINT)`，PostgreSQL 的 SUM(bigint) 返回 numeric
fn sum_amount() -> SimpleExpr {
    SimpleExpr::from(Func::cast_as(
        Func::sum(Expr::col(contributions::Column::Amount)),
        Alias::new("BIGINT"),
    ))
}

/// 出资服务：出资记录、审核、募资进度与排行榜
#[derive(Clone)]
pub struct ContributionService {
    pool: DatabaseConnection,
    notifications: NotificationService,
    leaderboard_limit: u64,
}

impl ContributionService {
    pub fn new(
        pool: DatabaseConnection,
        notifications: NotificationService,
        leaderboard_limit: u64,
    ) -> Self {
        Self {
            pool,
            notifications,
            leaderboard_limit: leaderboard_limit.clamp(1, LEADERBOARD_MAX),
        }
    }

    /// 记录一笔出资
    ///
    /// 出资记录为 pending，业务的 total_raised 在同一事务中累加；
    /// 有目标额时不允许超过剩余额度（检查放在 UPDATE 条件里，并发出资也不会超募）。
    pub async fn record(
        &self,
        user_id: i64,
        business_id: i64,
        amount: i64,
    ) -> AppResult<ContributionReceipt> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Contribution amount must be positive".into(),
            ));
        }

        let txn = self.pool.begin().await?;

        let business = businesses::Entity::find_by_id(business_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Business not found".into()))?;
        let user = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        if let Some(remaining) = business.remaining_capacity()
            && amount > remaining
        {
            log::warn!(
                "Contribution of {amount} to business {business_id} exceeds remaining {remaining}"
            );
            return Err(AppError::InvalidAmount(format!(
                "Contribution exceeds remaining capacity of {}",
                self.notifications.money(remaining)
            )));
        }

        let now = Utc::now();
        let updated = businesses::Entity::update_many()
            .col_expr(
                businesses::Column::TotalRaised,
                Expr::col(businesses::Column::TotalRaised).add(amount),
            )
            .col_expr(businesses::Column::UpdatedAt, Expr::value(now))
            .filter(businesses::Column::Id.eq(business_id))
            .filter(
                Condition::any()
                    .add(businesses::Column::TargetAmount.lte(0))
                    .add(
                        Expr::col(businesses::Column::TotalRaised)
                            .lte(Expr::col(businesses::Column::TargetAmount).sub(amount)),
                    ),
            )
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(AppError::InvalidAmount(
                "Contribution exceeds remaining capacity".into(),
            ));
        }

        let contribution = contributions::ActiveModel {
            user_id: Set(user_id),
            business_id: Set(business_id),
            amount: Set(amount),
            status: Set(ContributionStatus::Pending),
            created_at: Set(now),
            approved_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let total_raised = businesses::Entity::find_by_id(business_id)
            .one(&txn)
            .await?
            .map(|b| b.total_raised)
            .unwrap_or(business.total_raised + amount);

        let money = self.notifications.money(amount);
        let mut outbox = Outbox::new();
        outbox.notification(
            NotificationService::record(
                &txn,
                user_id,
                NotificationKind::Contribution,
                &format!("You contributed {money} to {}", business.name),
            )
            .await?,
        );
        outbox.notifications(
            NotificationService::record_for_admins(
                &txn,
                NotificationKind::System,
                &format!(
                    "{} contributed {money} to {}",
                    user.display_name(),
                    business.name
                ),
            )
            .await?,
        );

        txn.commit().await?;
        self.notifications.deliver(outbox);

        log::info!(
            "Contribution {} recorded: user {user_id} -> business {business_id}, amount {amount}",
            contribution.id
        );

        Ok(ContributionReceipt {
            contribution: contribution.into(),
            total_raised,
            progress_percent: progress_percent(total_raised, business.target_amount),
        })
    }

    /// 管理员审核出资：pending -> approved
    pub async fn approve(&self, contribution_id: i64) -> AppResult<ContributionResponse> {
        let txn = self.pool.begin().await?;

        let contribution = contributions::Entity::find_by_id(contribution_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Contribution not found".into()))?;
        if contribution.status == ContributionStatus::Approved {
            return Err(AppError::AlreadyProcessed(
                "Contribution already approved".into(),
            ));
        }

        let now = Utc::now();
        let result = contributions::Entity::update_many()
            .set(contributions::ActiveModel {
                status: Set(ContributionStatus::Approved),
                approved_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(contributions::Column::Id.eq(contribution_id))
            .filter(contributions::Column::Status.eq(ContributionStatus::Pending))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::AlreadyProcessed(
                "Contribution already approved".into(),
            ));
        }

        let business_name = businesses::Entity::find_by_id(contribution.business_id)
            .one(&txn)
            .await?
            .map(|b| b.name)
            .unwrap_or_else(|| "a business".to_string());

        let mut outbox = Outbox::new();
        outbox.notification(
            NotificationService::record(
                &txn,
                contribution.user_id,
                NotificationKind::Contribution,
                &format!(
                    "Your contribution of {} to {business_name} has been approved",
                    self.notifications.money(contribution.amount)
                ),
            )
            .await?,
        );

        txn.commit().await?;
        self.notifications.deliver(outbox);
        log::info!("Contribution {contribution_id} approved");

        Ok(ContributionResponse {
            status: ContributionStatus::Approved,
            approved_at: Some(now),
            ..contribution.into()
        })
    }

    /// 募资进度：raised 为全部出资之和（含待审核）
    pub async fn progress(&self, business_id: i64) -> AppResult<FundingProgress> {
        let business = self.find_business(business_id).await?;
        let raised = self.sum_for_business(business_id, None).await?;
        let approved_raised = self
            .sum_for_business(business_id, Some(ContributionStatus::Approved))
            .await?;

        Ok(FundingProgress {
            business_id,
            progress_percent: progress_percent(raised, business.target_amount),
            business_name: business.name,
            target: business.target_amount,
            raised,
            approved_raised,
        })
    }

    /// 全部业务的募资进度（管理员）
    pub async fn all_progress(&self) -> AppResult<Vec<FundingProgress>> {
        let list = businesses::Entity::find()
            .order_by_asc(businesses::Column::Id)
            .all(&self.pool)
            .await?;
        let raised = self.totals_by_business(None).await?;
        let approved = self
            .totals_by_business(Some(ContributionStatus::Approved))
            .await?;

        Ok(list
            .into_iter()
            .map(|b| {
                let raised = raised.get(&b.id).copied().unwrap_or(0);
                FundingProgress {
                    business_id: b.id,
                    progress_percent: progress_percent(raised, b.target_amount),
                    approved_raised: approved.get(&b.id).copied().unwrap_or(0),
                    business_name: b.name,
                    target: b.target_amount,
                    raised,
                }
            })
            .collect())
    }

    /// 按用户汇总出资额，降序排列（同额按用户 ID 升序）
    pub async fn leaderboard(
        &self,
        business_id: i64,
        limit: Option<u64>,
    ) -> AppResult<Vec<LeaderboardEntry>> {
        self.find_business(business_id).await?;
        let limit = limit
            .unwrap_or(self.leaderboard_limit)
            .clamp(1, LEADERBOARD_MAX);

        let totals = contributions::Entity::find()
            .select_only()
            .column(contributions::Column::UserId)
            .column_as(sum_amount(), "total")
            .column_as(
                SimpleExpr::from(Func::cast_as(
                    Func::count(Expr::col(contributions::Column::Id)),
                    Alias::new("BIGINT"),
                )),
                "contribution_count",
            )
            .filter(contributions::Column::BusinessId.eq(business_id))
            .group_by(contributions::Column::UserId)
            .order_by(sum_amount(), Order::Desc)
            .order_by_asc(contributions::Column::UserId)
            .limit(limit)
            .into_model::<ContributorTotal>()
            .all(&self.pool)
            .await?;

        let user_ids: Vec<i64> = totals.iter().map(|t| t.user_id).collect();
        let people: HashMap<i64, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(totals
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                let user = people.get(&t.user_id);
                LeaderboardEntry {
                    rank: i as u32 + 1,
                    user_id: t.user_id,
                    username: user.map(|u| u.username.clone()).unwrap_or_default(),
                    name: user.and_then(|u| u.name.clone()),
                    total_contributed: t.total,
                    contribution_count: t.contribution_count,
                }
            })
            .collect())
    }

    pub async fn list_for_business(&self, business_id: i64) -> AppResult<Vec<ContributionResponse>> {
        self.find_business(business_id).await?;
        let list = contributions::Entity::find()
            .filter(contributions::Column::BusinessId.eq(business_id))
            .order_by_desc(contributions::Column::CreatedAt)
            .order_by_desc(contributions::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn list_mine(&self, user_id: i64) -> AppResult<Vec<ContributionResponse>> {
        let list = contributions::Entity::find()
            .filter(contributions::Column::UserId.eq(user_id))
            .order_by_desc(contributions::Column::CreatedAt)
            .order_by_desc(contributions::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 全部出资记录（管理员，分页）
    pub async fn list_all(
        &self,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<ContributionResponse>> {
        let paginator = contributions::Entity::find()
            .order_by_desc(contributions::Column::CreatedAt)
            .order_by_desc(contributions::Column::Id)
            .paginate(&self.pool, params.page_size());
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(params.page_index()).await?;
        Ok(PaginatedResponse::new(
            items.into_iter().map(Into::into).collect(),
            params.page(),
            params.page_size(),
            total,
        ))
    }

    async fn find_business(&self, business_id: i64) -> AppResult<businesses::Model> {
        businesses::Entity::find_by_id(business_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Business not found".into()))
    }

    async fn sum_for_business(
        &self,
        business_id: i64,
        status: Option<ContributionStatus>,
    ) -> AppResult<i64> {
        sum_contributions(&self.pool, business_id, status).await
    }

    async fn totals_by_business(
        &self,
        status: Option<ContributionStatus>,
    ) -> AppResult<HashMap<i64, i64>> {
        let mut query = contributions::Entity::find()
            .select_only()
            .column(contributions::Column::BusinessId)
            .column_as(sum_amount(), "total")
            .group_by(contributions::Column::BusinessId);
        if let Some(status) = status {
            query = query.filter(contributions::Column::Status.eq(status));
        }
        let rows = query.into_model::<BusinessTotal>().all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.business_id, r.total.unwrap_or(0)))
            .collect())
    }
}

async fn sum_contributions<C: ConnectionTrait>(
    db: &C,
    business_id: i64,
    status: Option<ContributionStatus>,
) -> AppResult<i64> {
    let mut query = contributions::Entity::find()
        .select_only()
        .column_as(sum_amount(), "total")
        .filter(contributions::Column::BusinessId.eq(business_id));
    if let Some(status) = status {
        query = query.filter(contributions::Column::Status.eq(status));
    }
    Ok(query
        .into_model::<AmountTotal>()
        .one(db)
        .await?
        .and_then(|row| row.total)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{UserRole, notification_entity as notifications};
    use crate::realtime::{ConnectionId, RealtimeEvent};
    use crate::test_utils::{create_business, create_user, notification_service, setup_test_db};
    use tokio::sync::mpsc;

    fn service(db: &DatabaseConnection) -> ContributionService {
        let (notifications, _) = notification_service(db);
        ContributionService::new(db.clone(), notifications, 10)
    }

    #[tokio::test]
    async fn test_progress_after_two_contributions() {
        let db = setup_test_db().await;
        let service = service(&db);
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let bayo = create_user(&db, "bayo", UserRole::Partner).await;
        let business = create_business(&db, "Bakery", 1000, 5, 100).await;

        service.record(ada.id, business.id, 300).await.unwrap();
        let receipt = service.record(bayo.id, business.id, 250).await.unwrap();
        assert_eq!(receipt.total_raised, 550);
        assert_eq!(receipt.progress_percent, "55.00");
        assert_eq!(receipt.contribution.status, ContributionStatus::Pending);

        let progress = service.progress(business.id).await.unwrap();
        assert_eq!(progress.raised, 550);
        assert_eq!(progress.approved_raised, 0);
        assert_eq!(progress.progress_percent, "55.00");
        assert_eq!(progress.business_name, "Bakery");
    }

    #[tokio::test]
    async fn test_contribution_cannot_exceed_remaining_capacity() {
        let db = setup_test_db().await;
        let service = service(&db);
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let business = create_business(&db, "Bakery", 1000, 5, 100).await;

        service.record(ada.id, business.id, 900).await.unwrap();
        let err = service.record(ada.id, business.id, 101).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));

        // 恰好补满是允许的
        let receipt = service.record(ada.id, business.id, 100).await.unwrap();
        assert_eq!(receipt.total_raised, 1000);
        assert_eq!(receipt.progress_percent, "100.00");
    }

    #[tokio::test]
    async fn test_no_target_reports_na() {
        let db = setup_test_db().await;
        let service = service(&db);
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let business = create_business(&db, "Open fund", 0, 5, 100).await;

        let receipt = service.record(ada.id, business.id, 5_000_000).await.unwrap();
        assert_eq!(receipt.progress_percent, "N/A");
    }

    #[tokio::test]
    async fn test_invalid_amount_and_missing_business() {
        let db = setup_test_db().await;
        let service = service(&db);
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let business = create_business(&db, "Bakery", 1000, 5, 100).await;

        assert!(matches!(
            service.record(ada.id, business.id, 0).await,
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            service.record(ada.id, 999, 10).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(service.progress(business.id).await.unwrap().raised, 0);
    }

    #[tokio::test]
    async fn test_contribution_notifies_contributor_and_admins() {
        let db = setup_test_db().await;
        let (notifications, presence) = notification_service(&db);
        let service = ContributionService::new(db.clone(), notifications, 10);
        let admin = create_user(&db, "root", UserRole::Admin).await;
        let offline_admin = create_user(&db, "ops", UserRole::Admin).await;
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let business = create_business(&db, "Bakery", 0, 5, 100).await;

        // 只有 root 在线
        let conn = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        presence.open(conn, tx);
        presence.register(admin.id, conn);

        service.record(ada.id, business.id, 300).await.unwrap();

        let mine = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(ada.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].kind, NotificationKind::Contribution);
        assert_eq!(mine[0].message, "You contributed ₦3.00 to Bakery");

        let admin_rows = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(admin.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(admin_rows.len(), 1);
        assert_eq!(admin_rows[0].kind, NotificationKind::System);
        assert_eq!(admin_rows[0].message, "ada contributed ₦3.00 to Bakery");

        let offline_rows = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(offline_admin.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(offline_rows.len(), 1);

        match rx.try_recv().unwrap() {
            RealtimeEvent::NewNotification(push) => {
                assert_eq!(push.user, admin.id);
                assert_eq!(push.kind, NotificationKind::System);
                assert_eq!(push.message, "ada contributed ₦3.00 to Bakery");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_approve_once() {
        let db = setup_test_db().await;
        let service = service(&db);
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let business = create_business(&db, "Bakery", 1000, 5, 100).await;
        let receipt = service.record(ada.id, business.id, 300).await.unwrap();
        service.record(ada.id, business.id, 200).await.unwrap();

        let approved = service.approve(receipt.contribution.id).await.unwrap();
        assert_eq!(approved.status, ContributionStatus::Approved);
        assert!(approved.approved_at.is_some());

        let err = service.approve(receipt.contribution.id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyProcessed(_)));
        assert!(matches!(
            service.approve(999).await,
            Err(AppError::NotFound(_))
        ));

        let progress = service.progress(business.id).await.unwrap();
        assert_eq!(progress.raised, 500);
        assert_eq!(progress.approved_raised, 300);
    }

    #[tokio::test]
    async fn test_leaderboard_groups_and_orders() {
        let db = setup_test_db().await;
        let service = service(&db);
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let bayo = create_user(&db, "bayo", UserRole::Partner).await;
        let chidi = create_user(&db, "chidi", UserRole::Partner).await;
        let business = create_business(&db, "Bakery", 0, 5, 100).await;

        service.record(ada.id, business.id, 100).await.unwrap();
        service.record(bayo.id, business.id, 400).await.unwrap();
        service.record(ada.id, business.id, 300).await.unwrap();
        service.record(chidi.id, business.id, 50).await.unwrap();

        let board = service.leaderboard(business.id, None).await.unwrap();
        let order: Vec<(&str, i64)> = board
            .iter()
            .map(|e| (e.username.as_str(), e.total_contributed))
            .collect();
        // ada 与 bayo 同为 400，按用户 ID 排序
        assert_eq!(order, vec![("ada", 400), ("bayo", 400), ("chidi", 50)]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].contribution_count, 2);

        let top = service.leaderboard(business.id, Some(1)).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_all_progress_covers_businesses_without_contributions() {
        let db = setup_test_db().await;
        let service = service(&db);
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let bakery = create_business(&db, "Bakery", 1000, 5, 100).await;
        create_business(&db, "Farm", 2000, 5, 100).await;

        service.record(ada.id, bakery.id, 250).await.unwrap();

        let all = service.all_progress().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].raised, 250);
        assert_eq!(all[0].progress_percent, "25.00");
        assert_eq!(all[1].raised, 0);
        assert_eq!(all[1].progress_percent, "0.00");
    }
}
