use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{
    NotificationKind, UserRole, notification_entity as notifications, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    NotificationResponse, PaginatedResponse, PaginationParams, WithdrawalResponse,
};
use crate::realtime::{NotificationPush, PresenceDirectory, RealtimeEvent};
use crate::utils::format_amount;

/// 事务提交后再推送的事件
///
/// 通知行与账务变更在同一事务内写入，推送只能在提交之后进行，
/// 否则客户端可能看到最终被回滚的通知。
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<(i64, RealtimeEvent)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notification(&mut self, push: NotificationPush) {
        self.events
            .push((push.user, RealtimeEvent::NewNotification(push)));
    }

    pub fn notifications(&mut self, pushes: impl IntoIterator<Item = NotificationPush>) {
        for push in pushes {
            self.notification(push);
        }
    }

    pub fn withdrawal_update(&mut self, withdrawal: WithdrawalResponse) {
        self.events.push((
            withdrawal.user_id,
            RealtimeEvent::WithdrawalUpdate { withdrawal },
        ));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// 通知服务：持久化 + 在线推送
#[derive(Clone)]
pub struct NotificationService {
    pool: DatabaseConnection,
    presence: Arc<PresenceDirectory>,
    currency_symbol: String,
}

impl NotificationService {
    pub fn new(
        pool: DatabaseConnection,
        presence: Arc<PresenceDirectory>,
        currency_symbol: String,
    ) -> Self {
        Self {
            pool,
            presence,
            currency_symbol,
        }
    }

    /// 通知文案中的金额
    pub fn money(&self, amount: i64) -> String {
        format_amount(&self.currency_symbol, amount)
    }

    /// 在给定连接（通常为账务事务）中写入一条通知
    pub async fn record<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        kind: NotificationKind,
        message: &str,
    ) -> AppResult<NotificationPush> {
        let model = notifications::ActiveModel {
            user_id: Set(user_id),
            kind: Set(kind),
            message: Set(message.to_string()),
            is_read: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(NotificationPush::from(&model))
    }

    /// 为多个用户写入同一条通知，单条多行 INSERT
    pub async fn record_many<C: ConnectionTrait>(
        db: &C,
        user_ids: &[i64],
        kind: NotificationKind,
        message: &str,
    ) -> AppResult<Vec<NotificationPush>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let rows = user_ids.iter().map(|&user_id| notifications::ActiveModel {
            user_id: Set(user_id),
            kind: Set(kind),
            message: Set(message.to_string()),
            is_read: Set(false),
            created_at: Set(now),
            ..Default::default()
        });
        notifications::Entity::insert_many(rows)
            .exec_without_returning(db)
            .await?;

        // 多行插入不回传主键，推送时不带 notificationId
        Ok(user_ids
            .iter()
            .map(|&user_id| NotificationPush {
                user: user_id,
                notification_id: None,
                kind,
                message: message.to_string(),
                created_at: now,
            })
            .collect())
    }

    /// 通知当前全部管理员
    pub async fn record_for_admins<C: ConnectionTrait>(
        db: &C,
        kind: NotificationKind,
        message: &str,
    ) -> AppResult<Vec<NotificationPush>> {
        let admin_ids: Vec<i64> = users::Entity::find()
            .select_only()
            .column(users::Column::Id)
            .filter(users::Column::Role.eq(UserRole::Admin))
            .order_by_asc(users::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        Self::record_many(db, &admin_ids, kind, message).await
    }

    /// 推送 outbox 中的事件，返回实际送达的条数；不在线的用户直接跳过
    pub fn deliver(&self, outbox: Outbox) -> usize {
        if outbox.is_empty() {
            return 0;
        }
        log::debug!("Delivering {} realtime events", outbox.len());

        let mut delivered = 0;
        for (user_id, event) in outbox.events {
            if self.presence.push(user_id, event) {
                delivered += 1;
            } else {
                log::debug!("User {user_id} offline, push skipped");
            }
        }
        delivered
    }

    /// 独立的写入并推送入口，供不在账务事务内的调用方使用（如管理员入账后的提醒）；
    /// 事务内的通知走 `record` + `Outbox`，提交后再 `deliver`
    pub async fn notify(
        &self,
        user_id: i64,
        kind: NotificationKind,
        message: &str,
    ) -> AppResult<NotificationPush> {
        let push = Self::record(&self.pool, user_id, kind, message).await?;
        let mut outbox = Outbox::new();
        outbox.notification(push.clone());
        self.deliver(outbox);
        Ok(push)
    }

    /// 我的通知，最新的在前
    pub async fn list(
        &self,
        user_id: i64,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<NotificationResponse>> {
        let paginator = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .order_by_desc(notifications::Column::CreatedAt)
            .order_by_desc(notifications::Column::Id)
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

    pub async fn unread_count(&self, user_id: i64) -> AppResult<u64> {
        Ok(notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::IsRead.eq(false))
            .count(&self.pool)
            .await?)
    }

    /// 标记已读，只有接收者本人可以操作
    pub async fn mark_read(&self, user_id: i64, notification_id: i64) -> AppResult<NotificationResponse> {
        let notification = notifications::Entity::find_by_id(notification_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".into()))?;

        if notification.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        if notification.is_read {
            return Ok(notification.into());
        }

        let mut am: notifications::ActiveModel = notification.into();
        am.is_read = Set(true);
        Ok(am.update(&self.pool).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ConnectionId;
    use crate::test_utils::{create_user, notification_service, setup_test_db};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_notify_persists_even_when_offline() {
        let db = setup_test_db().await;
        let (service, _presence) = notification_service(&db);
        let user = create_user(&db, "ada", UserRole::Partner).await;

        let push = service
            .notify(user.id, NotificationKind::System, "Welcome")
            .await
            .unwrap();
        assert!(push.notification_id.is_some());
        assert_eq!(service.unread_count(user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_notify_pushes_when_present() {
        let db = setup_test_db().await;
        let (service, presence) = notification_service(&db);
        let user = create_user(&db, "ada", UserRole::Partner).await;

        let conn = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        presence.open(conn, tx);
        presence.register(user.id, conn);

        service
            .notify(user.id, NotificationKind::Contribution, "You contributed ₦3.00")
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            RealtimeEvent::NewNotification(push) => {
                assert_eq!(push.user, user.id);
                assert_eq!(push.message, "You contributed ₦3.00");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admin_fan_out_reaches_every_admin_only() {
        let db = setup_test_db().await;
        let a1 = create_user(&db, "root", UserRole::Admin).await;
        let a2 = create_user(&db, "ops", UserRole::Admin).await;
        let partner = create_user(&db, "ada", UserRole::Partner).await;

        let pushes = NotificationService::record_for_admins(&db, NotificationKind::System, "New contribution")
            .await
            .unwrap();
        let recipients: Vec<i64> = pushes.iter().map(|p| p.user).collect();
        assert_eq!(recipients, vec![a1.id, a2.id]);

        let (service, _) = notification_service(&db);
        assert_eq!(service.unread_count(a1.id).await.unwrap(), 1);
        assert_eq!(service.unread_count(a2.id).await.unwrap(), 1);
        assert_eq!(service.unread_count(partner.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_only_by_recipient() {
        let db = setup_test_db().await;
        let (service, _) = notification_service(&db);
        let owner = create_user(&db, "ada", UserRole::Partner).await;
        let other = create_user(&db, "bayo", UserRole::Partner).await;

        let push = service
            .notify(owner.id, NotificationKind::System, "hi")
            .await
            .unwrap();
        let id = push.notification_id.unwrap();

        let err = service.mark_read(other.id, id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let read = service.mark_read(owner.id, id).await.unwrap();
        assert!(read.is_read);
        assert_eq!(service.unread_count(owner.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let db = setup_test_db().await;
        let (service, _) = notification_service(&db);
        let user = create_user(&db, "ada", UserRole::Partner).await;
        for msg in ["first", "second", "third"] {
            service
                .notify(user.id, NotificationKind::System, msg)
                .await
                .unwrap();
        }

        let page = service
            .list(user.id, &PaginationParams::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].message, "third");
        assert_eq!(page.items[1].message, "second");
    }

    #[test]
    fn test_outbox_collects_withdrawal_updates_for_requester() {
        let mut outbox = Outbox::new();
        assert!(outbox.is_empty());
        outbox.withdrawal_update(WithdrawalResponse {
            id: 1,
            user_id: 42,
            username: "ada".into(),
            source: crate::entities::WithdrawalSource::Wallet,
            business_id: None,
            partnership_id: None,
            amount: 200,
            status: crate::entities::WithdrawalStatus::Rejected,
            requested_at: Utc::now(),
            processed_at: Some(Utc::now()),
            processed_by: Some(1),
        });
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.events[0].0, 42);
    }
}
