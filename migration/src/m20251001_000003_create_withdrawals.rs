use sea_orm_migration::prelude::*;

use super::m20251001_000001_create_users_and_wallets::Users;
use super::m20251001_000002_create_businesses::{Businesses, Partnerships};

/// 提现申请
/// - source = wallet：申请时即从钱包扣款，驳回时退回
/// - source = profit：从合伙收益中提取，审批通过时才扣减 profit_earned
#[derive(DeriveIden)]
enum Withdrawals {
    Table,
    Id,
    UserId,
    Username,
    Source,
    BusinessId,
    PartnershipId,
    Amount,
    Status,
    RequestedAt,
    ProcessedAt,
    ProcessedBy,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Withdrawals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Withdrawals::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Withdrawals::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Withdrawals::Username)
                            .string_len(64)
                            .not_null(),
                    )
                    // wallet | profit
                    .col(ColumnDef::new(Withdrawals::Source).string_len(16).not_null())
                    .col(ColumnDef::new(Withdrawals::BusinessId).big_integer().null())
                    .col(
                        ColumnDef::new(Withdrawals::PartnershipId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Withdrawals::Amount).big_integer().not_null())
                    // pending | approved | rejected
                    .col(
                        ColumnDef::new(Withdrawals::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Withdrawals::RequestedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Withdrawals::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Withdrawals::ProcessedBy).big_integer().null())
                    .check(Expr::col(Withdrawals::Amount).gt(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdrawals_user")
                            .from(Withdrawals::Table, Withdrawals::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdrawals_business")
                            .from(Withdrawals::Table, Withdrawals::BusinessId)
                            .to(Businesses::Table, Businesses::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdrawals_partnership")
                            .from(Withdrawals::Table, Withdrawals::PartnershipId)
                            .to(Partnerships::Table, Partnerships::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_withdrawals_user")
                    .table(Withdrawals::Table)
                    .col(Withdrawals::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_withdrawals_status")
                    .table(Withdrawals::Table)
                    .col(Withdrawals::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Withdrawals::Table).to_owned())
            .await
    }
}
