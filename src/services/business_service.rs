use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{business_entity as businesses, partnership_entity as partnerships};
use crate::error::{AppError, AppResult};
use crate::models::{BusinessResponse, CreateBusinessRequest};

#[derive(Clone)]
pub struct BusinessService {
    pool: DatabaseConnection,
}

impl BusinessService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        creator_id: i64,
        request: CreateBusinessRequest,
    ) -> AppResult<BusinessResponse> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("Business name is required".into()));
        }
        if request.target_amount < 0 {
            return Err(AppError::InvalidAmount(
                "Target amount cannot be negative".into(),
            ));
        }
        if request.slot_price <= 0 {
            return Err(AppError::InvalidAmount("Slot price must be positive".into()));
        }
        if request.max_partners <= 0 {
            return Err(AppError::ValidationError(
                "Max partners must be positive".into(),
            ));
        }

        let now = Utc::now();
        let business = businesses::ActiveModel {
            name: Set(name.to_string()),
            description: Set(request.description),
            creator_id: Set(Some(creator_id)),
            target_amount: Set(request.target_amount),
            total_raised: Set(0),
            max_partners: Set(request.max_partners),
            slot_price: Set(request.slot_price),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Business {} created by user {creator_id}", business.id);
        Ok(BusinessResponse::new(business, 0))
    }

    pub async fn list(&self) -> AppResult<Vec<BusinessResponse>> {
        let list = businesses::Entity::find()
            .order_by_desc(businesses::Column::CreatedAt)
            .order_by_desc(businesses::Column::Id)
            .all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(list.len());
        for b in list {
            let count = self.partner_count(b.id).await?;
            out.push(BusinessResponse::new(b, count));
        }
        Ok(out)
    }

    pub async fn get(&self, business_id: i64) -> AppResult<BusinessResponse> {
        let business = businesses::Entity::find_by_id(business_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Business not found".into()))?;
        let count = self.partner_count(business_id).await?;
        Ok(BusinessResponse::new(business, count))
    }

    async fn partner_count(&self, business_id: i64) -> AppResult<u64> {
        Ok(partnerships::Entity::find()
            .filter(partnerships::Column::BusinessId.eq(business_id))
            .count(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::test_utils::{create_user, setup_test_db};

    fn request(name: &str) -> CreateBusinessRequest {
        CreateBusinessRequest {
            name: name.to_string(),
            description: Some("Fresh bread daily".into()),
            target_amount: 100_000,
            max_partners: 10,
            slot_price: 5_000,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup_test_db().await;
        let service = BusinessService::new(db.clone());
        let admin = create_user(&db, "root", UserRole::Admin).await;

        let created = service.create(admin.id, request("Bakery")).await.unwrap();
        assert_eq!(created.creator_id, Some(admin.id));
        assert_eq!(created.progress_percent, "0.00");

        let fetched = service.get(created.id).await.unwrap();
        assert_eq!(fetched.name, "Bakery");
        assert_eq!(fetched.partner_count, 0);
        assert_eq!(service.list().await.unwrap().len(), 1);
        assert!(matches!(service.get(999).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let db = setup_test_db().await;
        let service = BusinessService::new(db.clone());
        let admin = create_user(&db, "root", UserRole::Admin).await;

        let mut bad = request(" ");
        assert!(matches!(
            service.create(admin.id, bad.clone()).await,
            Err(AppError::ValidationError(_))
        ));
        bad.name = "Bakery".into();
        bad.slot_price = 0;
        assert!(matches!(
            service.create(admin.id, bad.clone()).await,
            Err(AppError::InvalidAmount(_))
        ));
        bad.slot_price = 100;
        bad.max_partners = 0;
        assert!(matches!(
            service.create(admin.id, bad).await,
            Err(AppError::ValidationError(_))
        ));
    }
}
