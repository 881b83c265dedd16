use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{
    UserRole, business_entity as businesses, partnership_entity as partnerships,
    user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, JoinedBusiness, UserProfile, UserResponse};
use crate::services::WalletService;

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 管理员创建用户记录
    pub async fn create_user(&self, request: CreateUserRequest) -> AppResult<UserResponse> {
        let username = request.username.trim();
        if username.is_empty() || username.len() > 64 {
            return Err(AppError::ValidationError(
                "Username must be between 1 and 64 characters".into(),
            ));
        }
        if let Some(email) = request.email.as_deref()
            && !email.contains('@')
        {
            return Err(AppError::ValidationError("Invalid email address".into()));
        }

        let taken = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.pool)
            .await?;
        if taken > 0 {
            return Err(AppError::ValidationError("Username already taken".into()));
        }

        let now = Utc::now();
        let user = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(request.email),
            name: Set(request.name.filter(|n| !n.trim().is_empty())),
            role: Set(request.role.unwrap_or(UserRole::Partner)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("User {} created with role {}", user.id, user.role);
        Ok(user.into())
    }

    /// 个人资料：钱包余额与参与的业务都从各自的表派生
    pub async fn get_profile(&self, user_id: i64) -> AppResult<UserProfile> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let wallet = WalletService::get_or_create(&self.pool, user_id).await?;

        let held = partnerships::Entity::find()
            .filter(partnerships::Column::UserId.eq(user_id))
            .order_by_asc(partnerships::Column::Id)
            .all(&self.pool)
            .await?;
        let ids: Vec<i64> = held.iter().map(|p| p.business_id).collect();
        let names: HashMap<i64, String> = businesses::Entity::find()
            .filter(businesses::Column::Id.is_in(ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|b| (b.id, b.name))
            .collect();

        Ok(UserProfile {
            user: user.into(),
            wallet_balance: wallet.balance,
            businesses: held
                .into_iter()
                .map(|p| JoinedBusiness {
                    business_id: p.business_id,
                    business_name: names.get(&p.business_id).cloned().unwrap_or_default(),
                    slots: p.slots,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_business, fund_wallet, setup_test_db};

    fn request(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            name: Some("Ada Obi".into()),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_create_user_defaults_to_partner() {
        let db = setup_test_db().await;
        let service = UserService::new(db.clone());

        let user = service.create_user(request("ada")).await.unwrap();
        assert_eq!(user.role, UserRole::Partner);

        let err = service.create_user(request("ada")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(matches!(
            service.create_user(request("  ")).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_derives_balance_and_businesses() {
        let db = setup_test_db().await;
        let service = UserService::new(db.clone());
        let user = service.create_user(request("ada")).await.unwrap();
        let business = create_business(&db, "Bakery", 0, 5, 100).await;
        fund_wallet(&db, user.id, 700).await;

        let now = Utc::now();
        partnerships::ActiveModel {
            user_id: Set(user.id),
            business_id: Set(business.id),
            slots: Set(2),
            amount_paid: Set(200),
            profit_earned: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let profile = service.get_profile(user.id).await.unwrap();
        assert_eq!(profile.wallet_balance, 700);
        assert_eq!(profile.businesses.len(), 1);
        assert_eq!(profile.businesses[0].business_name, "Bakery");
        assert_eq!(profile.businesses[0].slots, 2);

        assert!(matches!(
            service.get_profile(999).await,
            Err(AppError::NotFound(_))
        ));
    }
}
