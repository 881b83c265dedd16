pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_users_and_wallets;
mod m20251001_000002_create_businesses;
mod m20251001_000003_create_withdrawals;
mod m20251001_000004_create_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_users_and_wallets::Migration),
            Box::new(m20251001_000002_create_businesses::Migration),
            Box::new(m20251001_000003_create_withdrawals::Migration),
            Box::new(m20251001_000004_create_notifications::Migration),
        ]
    }
}
