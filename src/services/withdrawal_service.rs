use chrono::Utc;
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::entities::{
    NotificationKind, WithdrawalSource, WithdrawalStatus, business_entity as businesses,
    partnership_entity as partnerships, user_entity as users, withdrawal_entity as withdrawals,
};
use crate::error::{AppError, AppResult};
use crate::models::{WithdrawalDecision, WithdrawalResponse};
use crate::services::{NotificationService, Outbox, WalletService};

#[derive(Debug, FromQueryResult)]
struct PendingTotal {
    total: Option<i64>,
}

/// 提现服务
///
/// 两条互不影响的流程：
/// - wallet：申请时立即从钱包扣款，驳回时退回
/// - profit：申请时不动余额，审批通过时扣减合伙记录的 profit_earned
#[derive(Clone)]
pub struct WithdrawalService {
    pool: DatabaseConnection,
    notifications: NotificationService,
}

impl WithdrawalService {
    pub fn new(pool: DatabaseConnection, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    /// 钱包提现申请
    pub async fn request_wallet(
        &self,
        user_id: i64,
        amount: i64,
        business_id: Option<i64>,
    ) -> AppResult<WithdrawalResponse> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Withdrawal amount must be positive".into(),
            ));
        }

        let txn = self.pool.begin().await?;
        let user = find_user(&txn, user_id).await?;
        if let Some(business_id) = business_id {
            businesses::Entity::find_by_id(business_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("Business not found".into()))?;
        }

        WalletService::debit(&txn, user_id, amount, "Withdrawal request").await?;

        let withdrawal = withdrawals::ActiveModel {
            user_id: Set(user_id),
            username: Set(user.username.clone()),
            source: Set(WithdrawalSource::Wallet),
            business_id: Set(business_id),
            partnership_id: Set(None),
            amount: Set(amount),
            status: Set(WithdrawalStatus::Pending),
            requested_at: Set(Utc::now()),
            processed_at: Set(None),
            processed_by: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let outbox = self.record_request(&txn, &user, amount).await?;
        txn.commit().await?;
        self.notifications.deliver(outbox);

        log::info!(
            "Wallet withdrawal {} requested by user {user_id}: {amount}",
            withdrawal.id
        );
        Ok(withdrawal.into())
    }

    /// 合伙收益提现申请
    ///
    /// 可提取额 = profit_earned - 该合伙记录下仍在 pending 的收益提现
    pub async fn request_profit(
        &self,
        user_id: i64,
        business_id: i64,
        amount: i64,
    ) -> AppResult<WithdrawalResponse> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Withdrawal amount must be positive".into(),
            ));
        }

        let txn = self.pool.begin().await?;
        let user = find_user(&txn, user_id).await?;

        let partnership = partnerships::Entity::find()
            .filter(partnerships::Column::UserId.eq(user_id))
            .filter(partnerships::Column::BusinessId.eq(business_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("You are not a partner in this business".into()))?;

        let pending = pending_profit_withdrawals(&txn, partnership.id).await?;
        let available = partnership.profit_earned - pending;
        if amount > available {
            log::warn!(
                "Profit withdrawal of {amount} by user {user_id} exceeds available {available}"
            );
            return Err(AppError::InsufficientProfitBalance);
        }

        let withdrawal = withdrawals::ActiveModel {
            user_id: Set(user_id),
            username: Set(user.username.clone()),
            source: Set(WithdrawalSource::Profit),
            business_id: Set(Some(business_id)),
            partnership_id: Set(Some(partnership.id)),
            amount: Set(amount),
            status: Set(WithdrawalStatus::Pending),
            requested_at: Set(Utc::now()),
            processed_at: Set(None),
            processed_by: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let outbox = self.record_request(&txn, &user, amount).await?;
        txn.commit().await?;
        self.notifications.deliver(outbox);

        log::info!(
            "Profit withdrawal {} requested by user {user_id} from business {business_id}: {amount}",
            withdrawal.id
        );
        Ok(withdrawal.into())
    }

    /// 管理员审批
    ///
    /// 状态变更是对 `status = 'pending'` 的条件更新，两个管理员同时操作只有一个会成功。
    pub async fn decide(
        &self,
        withdrawal_id: i64,
        decision: WithdrawalDecision,
        admin_id: i64,
    ) -> AppResult<WithdrawalResponse> {
        let txn = self.pool.begin().await?;

        let withdrawal = withdrawals::Entity::find_by_id(withdrawal_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Withdrawal not found".into()))?;
        let next = decision.apply_to(withdrawal.status)?;

        let now = Utc::now();
        let result = withdrawals::Entity::update_many()
            .set(withdrawals::ActiveModel {
                status: Set(next),
                processed_at: Set(Some(now)),
                processed_by: Set(Some(admin_id)),
                ..Default::default()
            })
            .filter(withdrawals::Column::Id.eq(withdrawal_id))
            .filter(withdrawals::Column::Status.eq(WithdrawalStatus::Pending))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::AlreadyProcessed(
                "Withdrawal already processed".into(),
            ));
        }

        let money = self.notifications.money(withdrawal.amount);
        let message = match (withdrawal.source, next) {
            (WithdrawalSource::Wallet, WithdrawalStatus::Rejected) => {
                WalletService::credit(
                    &txn,
                    withdrawal.user_id,
                    withdrawal.amount,
                    "Refund (withdrawal rejected)",
                )
                .await?;
                format!("Your withdrawal of {money} was rejected and refunded to your wallet")
            }
            (WithdrawalSource::Profit, WithdrawalStatus::Approved) => {
                let partnership_id = withdrawal.partnership_id.ok_or_else(|| {
                    AppError::InternalError("Profit withdrawal without partnership".into())
                })?;
                let debited = partnerships::Entity::update_many()
                    .col_expr(
                        partnerships::Column::ProfitEarned,
                        Expr::col(partnerships::Column::ProfitEarned).sub(withdrawal.amount),
                    )
                    .col_expr(partnerships::Column::UpdatedAt, Expr::value(now))
                    .filter(partnerships::Column::Id.eq(partnership_id))
                    .filter(partnerships::Column::ProfitEarned.gte(withdrawal.amount))
                    .exec(&txn)
                    .await?;
                if debited.rows_affected == 0 {
                    // 事务回滚，申请保持 pending
                    log::warn!(
                        "Profit withdrawal {withdrawal_id} cannot be approved: profit no longer available"
                    );
                    return Err(AppError::InsufficientProfitBalance);
                }
                format!("Your profit withdrawal of {money} has been approved")
            }
            (_, status) => format!("Your withdrawal of {money} has been {status}"),
        };

        let updated = withdrawals::Model {
            status: next,
            processed_at: Some(now),
            processed_by: Some(admin_id),
            ..withdrawal
        };

        let mut outbox = Outbox::new();
        outbox.notification(
            NotificationService::record(
                &txn,
                updated.user_id,
                NotificationKind::Withdrawal,
                &message,
            )
            .await?,
        );
        outbox.withdrawal_update(updated.clone().into());

        txn.commit().await?;
        self.notifications.deliver(outbox);

        log::info!("Withdrawal {withdrawal_id} {next} by admin {admin_id}");
        Ok(updated.into())
    }

    /// 我的提现记录
    pub async fn history(&self, user_id: i64) -> AppResult<Vec<WithdrawalResponse>> {
        let list = withdrawals::Entity::find()
            .filter(withdrawals::Column::UserId.eq(user_id))
            .order_by_desc(withdrawals::Column::RequestedAt)
            .order_by_desc(withdrawals::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 全部提现记录（管理员），可按状态过滤
    pub async fn list(&self, status: Option<WithdrawalStatus>) -> AppResult<Vec<WithdrawalResponse>> {
        let mut query = withdrawals::Entity::find();
        if let Some(status) = status {
            query = query.filter(withdrawals::Column::Status.eq(status));
        }
        let list = query
            .order_by_desc(withdrawals::Column::RequestedAt)
            .order_by_desc(withdrawals::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn record_request<C: ConnectionTrait>(
        &self,
        db: &C,
        user: &users::Model,
        amount: i64,
    ) -> AppResult<Outbox> {
        let money = self.notifications.money(amount);
        let mut outbox = Outbox::new();
        outbox.notification(
            NotificationService::record(
                db,
                user.id,
                NotificationKind::Withdrawal,
                &format!("Your withdrawal request of {money} is pending approval"),
            )
            .await?,
        );
        outbox.notifications(
            NotificationService::record_for_admins(
                db,
                NotificationKind::Withdrawal,
                &format!(
                    "{} requested a withdrawal of {money}",
                    user.display_name()
                ),
            )
            .await?,
        );
        Ok(outbox)
    }
}

async fn find_user<C: ConnectionTrait>(db: &C, user_id: i64) -> AppResult<users::Model> {
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn pending_profit_withdrawals<C: ConnectionTrait>(
    db: &C,
    partnership_id: i64,
) -> AppResult<i64> {
    Ok(withdrawals::Entity::find()
        .select_only()
        .column_as(
            SimpleExpr::from(Func::cast_as(
                Func::sum(Expr::col(withdrawals::Column::Amount)),
                Alias::new("BIGINT"),
            )),
            "total",
        )
        .filter(withdrawals::Column::PartnershipId.eq(partnership_id))
        .filter(withdrawals::Column::Source.eq(WithdrawalSource::Profit))
        .filter(withdrawals::Column::Status.eq(WithdrawalStatus::Pending))
        .into_model::<PendingTotal>()
        .one(db)
        .await?
        .and_then(|row| row.total)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        TransactionKind, UserRole, wallet_transaction_entity as wallet_transactions,
    };
    use crate::realtime::{ConnectionId, RealtimeEvent};
    use crate::test_utils::{
        create_business, create_user, fund_wallet, notification_service, setup_shared_test_db,
        setup_test_db,
    };
    use tokio::sync::mpsc;

    fn service(db: &DatabaseConnection) -> WithdrawalService {
        let (notifications, _) = notification_service(db);
        WithdrawalService::new(db.clone(), notifications)
    }

    async fn balance(db: &DatabaseConnection, user_id: i64) -> i64 {
        WalletService::get_or_create(db, user_id).await.unwrap().balance
    }

    async fn partner_with_profit(
        db: &DatabaseConnection,
        user_id: i64,
        business_id: i64,
        profit: i64,
    ) -> partnerships::Model {
        let now = Utc::now();
        partnerships::ActiveModel {
            user_id: Set(user_id),
            business_id: Set(business_id),
            slots: Set(1),
            amount_paid: Set(100),
            profit_earned: Set(profit),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn profit_of(db: &DatabaseConnection, partnership_id: i64) -> i64 {
        partnerships::Entity::find_by_id(partnership_id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
            .profit_earned
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_requests_cannot_overdraw_wallet() {
        let (db, _dir) = setup_shared_test_db().await;
        let service = service(&db);
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        fund_wallet(&db, ada.id, 100).await;

        let (first, second) = tokio::join!(
            service.request_wallet(ada.id, 80, None),
            service.request_wallet(ada.id, 80, None),
        );
        let succeeded = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1, "first: {first:?}, second: {second:?}");

        assert_eq!(balance(&db, ada.id).await, 20);
        assert_eq!(service.history(ada.id).await.unwrap().len(), 1);

        let wallet = WalletService::get_or_create(&db, ada.id).await.unwrap();
        let ledger: i64 = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet.id))
            .all(&db)
            .await
            .unwrap()
            .iter()
            .map(|t| t.signed_amount())
            .sum();
        assert_eq!(ledger, wallet.balance);
    }

    #[tokio::test]
    async fn test_request_then_reject_restores_balance() {
        let db = setup_test_db().await;
        let service = service(&db);
        let admin = create_user(&db, "root", UserRole::Admin).await;
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        fund_wallet(&db, ada.id, 500).await;

        let w = service.request_wallet(ada.id, 200, None).await.unwrap();
        assert_eq!(w.status, WithdrawalStatus::Pending);
        assert_eq!(w.source, WithdrawalSource::Wallet);
        assert_eq!(balance(&db, ada.id).await, 300);

        let rejected = service
            .decide(w.id, WithdrawalDecision::Rejected, admin.id)
            .await
            .unwrap();
        assert_eq!(rejected.status, WithdrawalStatus::Rejected);
        assert_eq!(rejected.processed_by, Some(admin.id));
        assert_eq!(balance(&db, ada.id).await, 500);

        let wallet = WalletService::get_or_create(&db, ada.id).await.unwrap();
        let last = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet.id))
            .order_by_desc(wallet_transactions::Column::Id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.kind, TransactionKind::Credit);
        assert_eq!(last.amount, 200);
        assert_eq!(last.description.as_deref(), Some("Refund (withdrawal rejected)"));
    }

    #[tokio::test]
    async fn test_approve_keeps_balance_and_second_decision_fails() {
        let db = setup_test_db().await;
        let service = service(&db);
        let admin = create_user(&db, "root", UserRole::Admin).await;
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        fund_wallet(&db, ada.id, 500).await;

        let w = service.request_wallet(ada.id, 200, None).await.unwrap();
        service
            .decide(w.id, WithdrawalDecision::Approved, admin.id)
            .await
            .unwrap();
        assert_eq!(balance(&db, ada.id).await, 300);

        for decision in [WithdrawalDecision::Approved, WithdrawalDecision::Rejected] {
            let err = service.decide(w.id, decision, admin.id).await.unwrap_err();
            assert!(matches!(err, AppError::AlreadyProcessed(_)));
        }
        assert_eq!(balance(&db, ada.id).await, 300);
        assert_eq!(
            service.history(ada.id).await.unwrap()[0].status,
            WithdrawalStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_balance_plus_outstanding_withdrawals_is_conserved() {
        let db = setup_test_db().await;
        let service = service(&db);
        let admin = create_user(&db, "root", UserRole::Admin).await;
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        fund_wallet(&db, ada.id, 1000).await;

        let outstanding = |list: &[WithdrawalResponse]| -> i64 {
            list.iter()
                .filter(|w| w.status != WithdrawalStatus::Rejected)
                .map(|w| w.amount)
                .sum()
        };

        let w = service.request_wallet(ada.id, 400, None).await.unwrap();
        let history = service.history(ada.id).await.unwrap();
        assert_eq!(balance(&db, ada.id).await + outstanding(&history), 1000);

        service
            .decide(w.id, WithdrawalDecision::Approved, admin.id)
            .await
            .unwrap();
        let history = service.history(ada.id).await.unwrap();
        assert_eq!(balance(&db, ada.id).await + outstanding(&history), 1000);
    }

    #[tokio::test]
    async fn test_overdraw_and_invalid_amount_create_nothing() {
        let db = setup_test_db().await;
        let service = service(&db);
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        fund_wallet(&db, ada.id, 100).await;

        assert!(matches!(
            service.request_wallet(ada.id, 101, None).await,
            Err(AppError::InsufficientBalance)
        ));
        assert!(matches!(
            service.request_wallet(ada.id, 0, None).await,
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            service.request_wallet(ada.id, 10, Some(999)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(service.history(ada.id).await.unwrap().is_empty());
        assert_eq!(balance(&db, ada.id).await, 100);
    }

    #[tokio::test]
    async fn test_decide_unknown_withdrawal_is_not_found() {
        let db = setup_test_db().await;
        let service = service(&db);
        let admin = create_user(&db, "root", UserRole::Admin).await;
        assert!(matches!(
            service.decide(42, WithdrawalDecision::Approved, admin.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_profit_withdrawal_counts_pending_requests() {
        let db = setup_test_db().await;
        let service = service(&db);
        let admin = create_user(&db, "root", UserRole::Admin).await;
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let business = create_business(&db, "Bakery", 0, 5, 100).await;
        let p = partner_with_profit(&db, ada.id, business.id, 1000).await;

        let first = service.request_profit(ada.id, business.id, 600).await.unwrap();
        assert_eq!(first.source, WithdrawalSource::Profit);
        assert_eq!(first.partnership_id, Some(p.id));
        // 申请时不动任何余额
        assert_eq!(profit_of(&db, p.id).await, 1000);
        assert_eq!(balance(&db, ada.id).await, 0);

        assert!(matches!(
            service.request_profit(ada.id, business.id, 500).await,
            Err(AppError::InsufficientProfitBalance)
        ));

        service
            .decide(first.id, WithdrawalDecision::Approved, admin.id)
            .await
            .unwrap();
        assert_eq!(profit_of(&db, p.id).await, 400);
        assert_eq!(balance(&db, ada.id).await, 0);

        service.request_profit(ada.id, business.id, 400).await.unwrap();
    }

    #[tokio::test]
    async fn test_profit_rejection_touches_nothing() {
        let db = setup_test_db().await;
        let service = service(&db);
        let admin = create_user(&db, "root", UserRole::Admin).await;
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let business = create_business(&db, "Bakery", 0, 5, 100).await;
        let p = partner_with_profit(&db, ada.id, business.id, 1000).await;

        let w = service.request_profit(ada.id, business.id, 300).await.unwrap();
        service
            .decide(w.id, WithdrawalDecision::Rejected, admin.id)
            .await
            .unwrap();
        assert_eq!(profit_of(&db, p.id).await, 1000);
        assert_eq!(balance(&db, ada.id).await, 0);
    }

    #[tokio::test]
    async fn test_profit_approval_fails_when_profit_is_gone() {
        let db = setup_test_db().await;
        let service = service(&db);
        let admin = create_user(&db, "root", UserRole::Admin).await;
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let business = create_business(&db, "Bakery", 0, 5, 100).await;
        let p = partner_with_profit(&db, ada.id, business.id, 1000).await;

        let w = service.request_profit(ada.id, business.id, 600).await.unwrap();
        let mut am: partnerships::ActiveModel = p.clone().into();
        am.profit_earned = Set(100);
        am.update(&db).await.unwrap();

        let err = service
            .decide(w.id, WithdrawalDecision::Approved, admin.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientProfitBalance));
        assert_eq!(profit_of(&db, p.id).await, 100);
        assert_eq!(
            service.list(Some(WithdrawalStatus::Pending)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_profit_request_requires_partnership() {
        let db = setup_test_db().await;
        let service = service(&db);
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        let business = create_business(&db, "Bakery", 0, 5, 100).await;

        assert!(matches!(
            service.request_profit(ada.id, business.id, 10).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_decision_is_pushed_to_present_requester() {
        let db = setup_test_db().await;
        let (notifications, presence) = notification_service(&db);
        let service = WithdrawalService::new(db.clone(), notifications);
        let admin = create_user(&db, "root", UserRole::Admin).await;
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        fund_wallet(&db, ada.id, 500).await;

        let w = service.request_wallet(ada.id, 200, None).await.unwrap();

        let conn = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        presence.open(conn, tx);
        presence.register(ada.id, conn);

        service
            .decide(w.id, WithdrawalDecision::Rejected, admin.id)
            .await
            .unwrap();

        let mut saw_notification = false;
        let mut saw_update = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                RealtimeEvent::NewNotification(push) => {
                    assert_eq!(push.user, ada.id);
                    saw_notification = true;
                }
                RealtimeEvent::WithdrawalUpdate { withdrawal } => {
                    assert_eq!(withdrawal.id, w.id);
                    assert_eq!(withdrawal.status, WithdrawalStatus::Rejected);
                    saw_update = true;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert!(saw_notification && saw_update);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let db = setup_test_db().await;
        let service = service(&db);
        let admin = create_user(&db, "root", UserRole::Admin).await;
        let ada = create_user(&db, "ada", UserRole::Partner).await;
        fund_wallet(&db, ada.id, 500).await;

        let w1 = service.request_wallet(ada.id, 100, None).await.unwrap();
        service.request_wallet(ada.id, 100, None).await.unwrap();
        service
            .decide(w1.id, WithdrawalDecision::Approved, admin.id)
            .await
            .unwrap();

        assert_eq!(service.list(None).await.unwrap().len(), 2);
        assert_eq!(
            service.list(Some(WithdrawalStatus::Pending)).await.unwrap().len(),
            1
        );
        assert_eq!(
            service.list(Some(WithdrawalStatus::Approved)).await.unwrap()[0].id,
            w1.id
        );
    }
}
