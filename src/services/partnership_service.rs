use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::entities::{
    NotificationKind, business_entity as businesses, partnership_entity as partnerships,
    user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::PartnershipResponse;
use crate::services::{NotificationService, Outbox, WalletService};

#[derive(Clone)]
pub struct PartnershipService {
    pool: DatabaseConnection,
    notifications: NotificationService,
}

impl PartnershipService {
    pub fn new(pool: DatabaseConnection, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    /// 购买合伙份额
    ///
    /// - 新合伙人受 max_partners 限制，已有合伙人追加份额不受限
    /// - 从钱包扣除 slot_price * slots
    pub async fn buy(
        &self,
        user_id: i64,
        business_id: i64,
        slots: Option<i32>,
    ) -> AppResult<PartnershipResponse> {
        let slots = slots.unwrap_or(1);
        if slots <= 0 {
            return Err(AppError::InvalidAmount("Slots must be positive".into()));
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

        let existing = partnerships::Entity::find()
            .filter(partnerships::Column::UserId.eq(user_id))
            .filter(partnerships::Column::BusinessId.eq(business_id))
            .one(&txn)
            .await?;

        if existing.is_none() {
            let count = partnerships::Entity::find()
                .filter(partnerships::Column::BusinessId.eq(business_id))
                .count(&txn)
                .await?;
            if count >= business.max_partners.max(0) as u64 {
                log::warn!("Business {business_id} has no free partner slots ({count})");
                return Err(AppError::SlotsFull);
            }
        }

        let cost = business
            .slot_price
            .checked_mul(slots as i64)
            .ok_or_else(|| AppError::InvalidAmount("Purchase amount too large".into()))?;
        WalletService::debit(&txn, user_id, cost, "Partnership purchase").await?;

        let now = Utc::now();
        let partnership = match existing {
            Some(p) => {
                let slots_total = p.slots + slots;
                let paid_total = p.amount_paid + cost;
                let mut am: partnerships::ActiveModel = p.into();
                am.slots = Set(slots_total);
                am.amount_paid = Set(paid_total);
                am.updated_at = Set(now);
                am.update(&txn).await?
            }
            None => {
                partnerships::ActiveModel {
                    user_id: Set(user_id),
                    business_id: Set(business_id),
                    slots: Set(slots),
                    amount_paid: Set(cost),
                    profit_earned: Set(0),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };

        let money = self.notifications.money(cost);
        let mut outbox = Outbox::new();
        outbox.notification(
            NotificationService::record(
                &txn,
                user_id,
                NotificationKind::System,
                &format!(
                    "You bought {slots} partnership slot(s) in {} for {money}",
                    business.name
                ),
            )
            .await?,
        );
        outbox.notifications(
            NotificationService::record_for_admins(
                &txn,
                NotificationKind::System,
                &format!(
                    "{} bought {slots} partnership slot(s) in {} for {money}",
                    user.display_name(),
                    business.name
                ),
            )
            .await?,
        );

        txn.commit().await?;
        self.notifications.deliver(outbox);
        log::info!("User {user_id} bought {slots} slot(s) in business {business_id}");

        Ok(PartnershipResponse {
            business_name: Some(business.name),
            ..partnership.into()
        })
    }

    pub async fn list_mine(&self, user_id: i64) -> AppResult<Vec<PartnershipResponse>> {
        let list = partnerships::Entity::find()
            .filter(partnerships::Column::UserId.eq(user_id))
            .order_by_asc(partnerships::Column::Id)
            .all(&self.pool)
            .await?;

        let ids: Vec<i64> = list.iter().map(|p| p.business_id).collect();
        let names: HashMap<i64, String> = businesses::Entity::find()
            .filter(businesses::Column::Id.is_in(ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|b| (b.id, b.name))
            .collect();

        Ok(list
            .into_iter()
            .map(|p| PartnershipResponse {
                business_name: names.get(&p.business_id).cloned(),
                ..p.into()
            })
            .collect())
    }

    /// 某业务的全部合伙人（管理员）
    pub async fn list_for_business(&self, business_id: i64) -> AppResult<Vec<PartnershipResponse>> {
        businesses::Entity::find_by_id(business_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Business not found".into()))?;

        let list = partnerships::Entity::find()
            .filter(partnerships::Column::BusinessId.eq(business_id))
            .order_by_asc(partnerships::Column::Id)
            .all(&self.pool)
            .await?;

        let ids: Vec<i64> = list.iter().map(|p| p.user_id).collect();
        let usernames: HashMap<i64, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        Ok(list
            .into_iter()
            .map(|p| PartnershipResponse {
                username: usernames.get(&p.user_id).cloned(),
                ..p.into()
            })
            .collect())
    }
}
