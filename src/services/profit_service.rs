use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::{
    NotificationKind, business_entity as businesses, partnership_entity as partnerships,
    profit_history_entity as profit_history, statement_entity as statements,
};
use crate::error::{AppError, AppResult};
use crate::models::{CreateStatementRequest, ProfitAllocation, StatementResponse};
use crate::services::{NotificationService, Outbox};

/// 将总收益平均分给 n 个合伙人，返回 (每人份额, 未分配零头)
pub fn split_profit(total_profit: i64, partner_count: i64) -> (i64, i64) {
    let per_partner = total_profit / partner_count;
    (per_partner, total_profit - per_partner * partner_count)
}

/// 月度报表与收益分配
#[derive(Clone)]
pub struct ProfitService {
    pool: DatabaseConnection,
    notifications: NotificationService,
}

impl ProfitService {
    pub fn new(pool: DatabaseConnection, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    /// 添加月度报表，profit 缺省为 revenue - expenses
    pub async fn add_statement(
        &self,
        business_id: i64,
        req: CreateStatementRequest,
    ) -> AppResult<StatementResponse> {
        let month = req.month.trim();
        if month.is_empty() {
            return Err(AppError::ValidationError("Month is required".into()));
        }
        if req.revenue < 0 || req.expenses < 0 {
            return Err(AppError::InvalidAmount(
                "Revenue and expenses cannot be negative".into(),
            ));
        }
        self.find_business(business_id).await?;

        let statement = statements::ActiveModel {
            business_id: Set(business_id),
            month: Set(month.to_string()),
            details: Set(req.details),
            revenue: Set(req.revenue),
            expenses: Set(req.expenses),
            profit: Set(req.profit.unwrap_or(req.revenue - req.expenses)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Statement {} added for business {business_id} ({month})", statement.id);
        Ok(statement.into())
    }

    pub async fn list_statements(&self, business_id: i64) -> AppResult<Vec<StatementResponse>> {
        self.find_business(business_id).await?;
        let list = statements::Entity::find()
            .filter(statements::Column::BusinessId.eq(business_id))
            .order_by_desc(statements::Column::CreatedAt)
            .order_by_desc(statements::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 历次收益分配记录
    pub async fn profit_history(&self, business_id: i64) -> AppResult<Vec<ProfitAllocation>> {
        self.find_business(business_id).await?;
        let list = profit_history::Entity::find()
            .filter(profit_history::Column::BusinessId.eq(business_id))
            .order_by_desc(profit_history::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list
            .into_iter()
            .map(|h| ProfitAllocation {
                business_id: h.business_id,
                month: h.month,
                total_profit: h.profit,
                per_partner_profit: h.per_partner_profit,
                partner_count: h.partner_count,
                undistributed: h.undistributed,
            })
            .collect())
    }

    /// 分配收益
    ///
    /// 所有合伙记录的累加、分配记录与通知在同一事务中完成，
    /// 任何一步失败整体回滚，不会出现部分合伙人已入账的情况。
    pub async fn allocate_profit(
        &self,
        business_id: i64,
        total_profit: i64,
        month: Option<String>,
    ) -> AppResult<ProfitAllocation> {
        if total_profit <= 0 {
            return Err(AppError::InvalidAmount(
                "Total profit must be positive".into(),
            ));
        }
        let month = month
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| Utc::now().format("%Y-%m").to_string());

        let txn = self.pool.begin().await?;

        let business = businesses::Entity::find_by_id(business_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Business not found".into()))?;

        let partners = partnerships::Entity::find()
            .filter(partnerships::Column::BusinessId.eq(business_id))
            .order_by_asc(partnerships::Column::Id)
            .all(&txn)
            .await?;
        if partners.is_empty() {
            return Err(AppError::NoPartners);
        }

        let partner_count = partners.len() as i64;
        let (per_partner, undistributed) = split_profit(total_profit, partner_count);
        if per_partner == 0 {
            log::warn!(
                "Profit {total_profit} for business {business_id} is smaller than partner count {partner_count}"
            );
        }

        let now = Utc::now();
        for p in &partners {
            partnerships::Entity::update_many()
                .col_expr(
                    partnerships::Column::ProfitEarned,
                    Expr::col(partnerships::Column::ProfitEarned).add(per_partner),
                )
                .col_expr(partnerships::Column::UpdatedAt, Expr::value(now))
                .filter(partnerships::Column::Id.eq(p.id))
                .exec(&txn)
                .await?;
        }

        profit_history::ActiveModel {
            business_id: Set(business_id),
            month: Set(month.clone()),
            profit: Set(total_profit),
            per_partner_profit: Set(per_partner),
            partner_count: Set(partner_count as i32),
            undistributed: Set(undistributed),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let partner_ids: Vec<i64> = partners.iter().map(|p| p.user_id).collect();
        let mut outbox = Outbox::new();
        outbox.notifications(
            NotificationService::record_many(
                &txn,
                &partner_ids,
                NotificationKind::System,
                &format!(
                    "{} profit from {} has been allocated to you for {month}",
                    self.notifications.money(per_partner),
                    business.name
                ),
            )
            .await?,
        );

        txn.commit().await?;
        self.notifications.deliver(outbox);

        log::info!(
            "Allocated {total_profit} across {partner_count} partners of business {business_id}: {per_partner} each, {undistributed} undistributed"
        );

        Ok(ProfitAllocation {
            business_id,
            month,
            total_profit,
            per_partner_profit: per_partner,
            partner_count: partner_count as i32,
            undistributed,
        })
    }

    async fn find_business(&self, business_id: i64) -> AppResult<businesses::Model> {
        businesses::Entity::find_by_id(business_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Business not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::test_utils::{create_business, create_user, notification_service, setup_test_db};
    use sea_orm::{ConnectionTrait, Statement};

    fn service(db: &DatabaseConnection) -> ProfitService {
        let (notifications, _) = notification_service(db);
        ProfitService::new(db.clone(), notifications)
    }

    async fn add_partner(db: &DatabaseConnection, user_id: i64, business_id: i64) -> partnerships::Model {
        let now = Utc::now();
        partnerships::ActiveModel {
            user_id: Set(user_id),
            business_id: Set(business_id),
            slots: Set(1),
            amount_paid: Set(100),
            profit_earned: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn earned(db: &DatabaseConnection, business_id: i64) -> Vec<i64> {
        partnerships::Entity::find()
            .filter(partnerships::Column::BusinessId.eq(business_id))
            .order_by_asc(partnerships::Column::Id)
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.profit_earned)
            .collect()
    }

    #[test]
    fn test_split_profit_keeps_remainder() {
        assert_eq!(split_profit(1000, 4), (250, 0));
        assert_eq!(split_profit(1000, 3), (333, 1));
        assert_eq!(split_profit(2, 3), (0, 2));
    }

    #[tokio::test]
    async fn test_allocate_evenly_across_partners() {
        let db = setup_test_db().await;
        let service = service(&db);
        let business = create_business(&db, "Bakery", 0, 5, 100).await;
        for name in ["ada", "bayo", "chidi"] {
            let user = create_user(&db, name, UserRole::Partner).await;
            add_partner(&db, user.id, business.id).await;
        }

        let allocation = service
            .allocate_profit(business.id, 1000, Some("2025-08".into()))
            .await
            .unwrap();
        assert_eq!(allocation.per_partner_profit, 333);
        assert_eq!(allocation.undistributed, 1);
        assert_eq!(allocation.partner_count, 3);
        assert_eq!(earned(&db, business.id).await, vec![333, 333, 333]);

        let history = service.profit_history(business.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].month, "2025-08");
        assert_eq!(history[0].total_profit, 1000);
    }

    #[tokio::test]
    async fn test_allocate_without_partners_mutates_nothing() {
        let db = setup_test_db().await;
        let service = service(&db);
        let business = create_business(&db, "Bakery", 0, 5, 100).await;

        let err = service
            .allocate_profit(business.id, 1000, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoPartners));
        assert!(service.profit_history(business.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_allocate_rejects_bad_input() {
        let db = setup_test_db().await;
        let service = service(&db);
        let business = create_business(&db, "Bakery", 0, 5, 100).await;

        assert!(matches!(
            service.allocate_profit(business.id, 0, None).await,
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            service.allocate_profit(999, 100, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failure_mid_allocation_leaves_every_partnership_unchanged() {
        let db = setup_test_db().await;
        let service = service(&db);
        let business = create_business(&db, "Bakery", 0, 5, 100).await;
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let bayo = create_user(&db, "bayo", UserRole::Partner).await;
        add_partner(&db, ada.id, business.id).await;
        let second = add_partner(&db, bayo.id, business.id).await;

        // 第二条合伙记录的更新失败
        db.execute(Statement::from_string(
            db.get_database_backend(),
            format!(
                "CREATE TRIGGER fail_second_partner BEFORE UPDATE ON partnerships \
                 WHEN NEW.id = {} BEGIN SELECT RAISE(ABORT, 'boom'); END;",
                second.id
            ),
        ))
        .await
        .unwrap();

        let err = service
            .allocate_profit(business.id, 1000, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
        assert_eq!(earned(&db, business.id).await, vec![0, 0]);
        assert!(service.profit_history(business.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statements_default_profit() {
        let db = setup_test_db().await;
        let service = service(&db);
        let business = create_business(&db, "Bakery", 0, 5, 100).await;

        let statement = service
            .add_statement(
                business.id,
                CreateStatementRequest {
                    month: "2025-08".into(),
                    details: Some("Strong month".into()),
                    revenue: 5000,
                    expenses: 3000,
                    profit: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(statement.profit, 2000);

        let list = service.list_statements(business.id).await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(matches!(
            service.list_statements(999).await,
            Err(AppError::NotFound(_))
        ));
    }
}
