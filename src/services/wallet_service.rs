use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::entities::{
    NotificationKind, TransactionKind, user_entity as users, wallet_entity as wallets,
    wallet_transaction_entity as wallet_transactions,
};
use crate::error::{AppError, AppResult};
use crate::models::{WalletResponse, WalletTransactionResponse};
use crate::services::NotificationService;

/// 钱包展示的最近流水条数
const RECENT_TRANSACTIONS: u64 = 50;

/// 钱包服务
///
/// 余额变动统一通过 `credit` / `debit`，二者都接受任意连接（通常是调用方的事务），
/// 保证余额与流水在同一事务中写入。
#[derive(Clone)]
pub struct WalletService {
    pool: DatabaseConnection,
    notifications: NotificationService,
}

impl WalletService {
    pub fn new(pool: DatabaseConnection, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    /// 获取用户钱包（不存在则创建）
    pub async fn get_or_create<C: ConnectionTrait>(db: &C, user_id: i64) -> AppResult<wallets::Model> {
        if let Some(w) = Self::find_by_user(db, user_id).await? {
            return Ok(w);
        }

        let now = Utc::now();
        // 并发首次访问时由唯一索引兜底
        wallets::Entity::insert(wallets::ActiveModel {
            user_id: Set(user_id),
            balance: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(wallets::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

        Self::find_by_user(db, user_id)
            .await?
            .ok_or_else(|| AppError::InternalError("Wallet missing after creation".into()))
    }

    /// 入账
    pub async fn credit<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        amount: i64,
        description: &str,
    ) -> AppResult<wallet_transactions::Model> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount("Amount must be positive".into()));
        }
        let wallet = Self::get_or_create(db, user_id).await?;

        wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).add(amount),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallets::Column::Id.eq(wallet.id))
            .exec(db)
            .await?;

        Self::append_transaction(db, wallet.id, TransactionKind::Credit, amount, description).await
    }

    /// 扣款：余额检查在 UPDATE 的条件中完成，影响行数为 0 即余额不足
    pub async fn debit<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        amount: i64,
        description: &str,
    ) -> AppResult<wallet_transactions::Model> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount("Amount must be positive".into()));
        }
        let wallet = Self::get_or_create(db, user_id).await?;

        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).sub(amount),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallets::Column::Id.eq(wallet.id))
            .filter(wallets::Column::Balance.gte(amount))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            log::warn!(
                "Debit of {amount} rejected for user {user_id}: balance {}",
                wallet.balance
            );
            return Err(AppError::InsufficientBalance);
        }

        Self::append_transaction(db, wallet.id, TransactionKind::Debit, amount, description).await
    }

    /// 当前用户的钱包及最近流水
    pub async fn get_wallet(&self, user_id: i64) -> AppResult<WalletResponse> {
        let wallet = Self::get_or_create(&self.pool, user_id).await?;
        let transactions = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet.id))
            .order_by_desc(wallet_transactions::Column::Id)
            .limit(RECENT_TRANSACTIONS)
            .all(&self.pool)
            .await?;

        Ok(WalletResponse {
            id: wallet.id,
            user_id: wallet.user_id,
            balance: wallet.balance,
            transactions: transactions.into_iter().map(Into::into).collect(),
        })
    }

    /// 管理员为用户入账（系统内资金的唯一入口）
    pub async fn admin_credit(
        &self,
        user_id: i64,
        amount: i64,
        description: Option<String>,
    ) -> AppResult<WalletTransactionResponse> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount("Amount must be positive".into()));
        }
        let txn = self.pool.begin().await?;
        users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "Wallet top-up".to_string());
        let tx = Self::credit(&txn, user_id, amount, &description).await?;
        txn.commit().await?;

        log::info!("Wallet of user {user_id} credited with {amount}");

        // 入账已提交，提醒失败不影响结果
        let message = format!(
            "Your wallet was credited with {}",
            self.notifications.money(amount)
        );
        if let Err(e) = self
            .notifications
            .notify(user_id, NotificationKind::System, &message)
            .await
        {
            log::warn!("Failed to notify user {user_id} of wallet credit: {e}");
        }

        Ok(tx.into())
    }

    async fn find_by_user<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
    ) -> AppResult<Option<wallets::Model>> {
        Ok(wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(db)
            .await?)
    }

    async fn append_transaction<C: ConnectionTrait>(
        db: &C,
        wallet_id: i64,
        kind: TransactionKind,
        amount: i64,
        description: &str,
    ) -> AppResult<wallet_transactions::Model> {
        let wallet = wallets::Entity::find_by_id(wallet_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Wallet not found".into()))?;

        Ok(wallet_transactions::ActiveModel {
            wallet_id: Set(wallet_id),
            kind: Set(kind),
            amount: Set(amount),
            balance_after: Set(wallet.balance),
            description: Set(Some(description.to_string())),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{UserRole, notification_entity as notifications};
    use crate::realtime::{ConnectionId, RealtimeEvent};
    use crate::test_utils::{create_user, notification_service, setup_test_db};
    use tokio::sync::mpsc;

    fn service(db: &DatabaseConnection) -> WalletService {
        let (notifications, _) = notification_service(db);
        WalletService::new(db.clone(), notifications)
    }

    async fn ledger_sum(db: &DatabaseConnection, wallet_id: i64) -> i64 {
        wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet_id))
            .all(db)
            .await
            .unwrap()
            .iter()
            .map(|t| t.signed_amount())
            .sum()
    }

    #[tokio::test]
    async fn test_wallet_created_lazily_once() {
        let db = setup_test_db().await;
        let user = create_user(&db, "ada", UserRole::Partner).await;

        let first = WalletService::get_or_create(&db, user.id).await.unwrap();
        let second = WalletService::get_or_create(&db, user.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.balance, 0);
    }

    #[tokio::test]
    async fn test_credit_and_debit_keep_balance_equal_to_ledger() {
        let db = setup_test_db().await;
        let user = create_user(&db, "ada", UserRole::Partner).await;

        WalletService::credit(&db, user.id, 500, "Deposit").await.unwrap();
        let debit = WalletService::debit(&db, user.id, 200, "Withdrawal request")
            .await
            .unwrap();
        assert_eq!(debit.kind, TransactionKind::Debit);
        assert_eq!(debit.balance_after, 300);

        let wallet = WalletService::get_or_create(&db, user.id).await.unwrap();
        assert_eq!(wallet.balance, 300);
        assert_eq!(ledger_sum(&db, wallet.id).await, wallet.balance);
    }

    #[tokio::test]
    async fn test_overdraw_is_rejected_without_mutation() {
        let db = setup_test_db().await;
        let user = create_user(&db, "ada", UserRole::Partner).await;
        WalletService::credit(&db, user.id, 100, "Deposit").await.unwrap();

        let err = WalletService::debit(&db, user.id, 101, "Too much")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance));

        let service = service(&db);
        let wallet = service.get_wallet(user.id).await.unwrap();
        assert_eq!(wallet.balance, 100);
        assert_eq!(wallet.transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_amounts_are_invalid() {
        let db = setup_test_db().await;
        let user = create_user(&db, "ada", UserRole::Partner).await;
        for amount in [0, -5] {
            assert!(matches!(
                WalletService::credit(&db, user.id, amount, "x").await,
                Err(AppError::InvalidAmount(_))
            ));
            assert!(matches!(
                WalletService::debit(&db, user.id, amount, "x").await,
                Err(AppError::InvalidAmount(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_admin_credit_requires_existing_user() {
        let db = setup_test_db().await;
        let service = service(&db);
        let err = service.admin_credit(999, 100, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let user = create_user(&db, "ada", UserRole::Partner).await;
        let tx = service.admin_credit(user.id, 100, None).await.unwrap();
        assert_eq!(tx.balance_after, 100);
        assert_eq!(tx.description.as_deref(), Some("Wallet top-up"));
    }

    #[tokio::test]
    async fn test_admin_credit_notifies_and_pushes_to_online_user() {
        let db = setup_test_db().await;
        let (notifications, presence) = notification_service(&db);
        let service = WalletService::new(db.clone(), notifications);
        let user = create_user(&db, "ada", UserRole::Partner).await;

        let conn = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        presence.open(conn, tx);
        presence.register(user.id, conn);

        service
            .admin_credit(user.id, 2500, Some("Cash deposit".into()))
            .await
            .unwrap();

        let rows = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, NotificationKind::System);
        assert_eq!(rows[0].message, "Your wallet was credited with ₦25.00");

        match rx.try_recv().unwrap() {
            RealtimeEvent::NewNotification(push) => {
                assert_eq!(push.user, user.id);
                assert_eq!(push.notification_id, Some(rows[0].id));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
