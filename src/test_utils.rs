//! 测试辅助：内存 SQLite + 真实迁移，以及常用的种子数据

use std::sync::Arc;

use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

use crate::entities::{UserRole, business_entity as businesses, user_entity as users};
use crate::realtime::PresenceDirectory;
use crate::services::{NotificationService, WalletService};

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect sqlite memory");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

/// 文件型 SQLite，多个连接共享同一个库，用于并发场景；TempDir 析构时删除
pub async fn setup_shared_test_db() -> (DatabaseConnection, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("ledger.db").display()
    );
    let mut options = ConnectOptions::new(url);
    options.max_connections(4).sqlx_logging(false);

    let db = Database::connect(options).await.expect("connect sqlite file");
    Migrator::up(&db, None).await.expect("run migrations");
    (db, dir)
}

pub fn notification_service(db: &DatabaseConnection) -> (NotificationService, Arc<PresenceDirectory>) {
    let presence = Arc::new(PresenceDirectory::new());
    (
        NotificationService::new(db.clone(), presence.clone(), "₦".to_string()),
        presence,
    )
}

pub async fn create_user(db: &DatabaseConnection, username: &str, role: UserRole) -> users::Model {
    let now = Utc::now();
    users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(Some(format!("{username}@example.com"))),
        name: Set(None),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

/// target 为 0 表示不设上限
pub async fn create_business(
    db: &DatabaseConnection,
    name: &str,
    target_amount: i64,
    max_partners: i32,
    slot_price: i64,
) -> businesses::Model {
    let now = Utc::now();
    businesses::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        creator_id: Set(None),
        target_amount: Set(target_amount),
        total_raised: Set(0),
        max_partners: Set(max_partners),
        slot_price: Set(slot_price),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert business")
}

pub async fn fund_wallet(db: &DatabaseConnection, user_id: i64, amount: i64) {
    WalletService::credit(db, user_id, amount, "Test deposit")
        .await
        .expect("fund wallet");
}
