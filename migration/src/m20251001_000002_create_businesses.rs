use sea_orm_migration::prelude::*;

use super::m20251001_000001_create_users_and_wallets::Users;

#[derive(DeriveIden)]
pub(crate) enum Businesses {
    Table,
    Id,
    Name,
    Description,
    CreatorId,
    TargetAmount,
    TotalRaised,
    MaxPartners,
    SlotPrice,
    CreatedAt,
    UpdatedAt,
}

/// 出资记录，唯一的权威来源（businesses 只保存 total_raised 汇总）
#[derive(DeriveIden)]
enum Contributions {
    Table,
    Id,
    UserId,
    BusinessId,
    Amount,
    Status,
    CreatedAt,
    ApprovedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Partnerships {
    Table,
    Id,
    UserId,
    BusinessId,
    Slots,
    AmountPaid,
    ProfitEarned,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Statements {
    Table,
    Id,
    BusinessId,
    Month,
    Details,
    Revenue,
    Expenses,
    Profit,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProfitHistory {
    Table,
    Id,
    BusinessId,
    Month,
    Profit,
    PerPartnerProfit,
    PartnerCount,
    Undistributed,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Businesses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Businesses::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Businesses::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Businesses::Description).text().null())
                    .col(ColumnDef::new(Businesses::CreatorId).big_integer().null())
                    .col(
                        ColumnDef::new(Businesses::TargetAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Businesses::TotalRaised)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Businesses::MaxPartners)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Businesses::SlotPrice)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Businesses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Businesses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_businesses_creator")
                            .from(Businesses::Table, Businesses::CreatorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Contributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contributions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contributions::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Contributions::BusinessId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Contributions::Amount).big_integer().not_null())
                    // pending | approved
                    .col(
                        ColumnDef::new(Contributions::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Contributions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Contributions::ApprovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .check(Expr::col(Contributions::Amount).gt(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contributions_user")
                            .from(Contributions::Table, Contributions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contributions_business")
                            .from(Contributions::Table, Contributions::BusinessId)
                            .to(Businesses::Table, Businesses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_contributions_business")
                    .table(Contributions::Table)
                    .col(Contributions::BusinessId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Partnerships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Partnerships::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Partnerships::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Partnerships::BusinessId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Partnerships::Slots)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Partnerships::AmountPaid)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Partnerships::ProfitEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Partnerships::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Partnerships::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Partnerships::ProfitEarned).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_partnerships_user")
                            .from(Partnerships::Table, Partnerships::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_partnerships_business")
                            .from(Partnerships::Table, Partnerships::BusinessId)
                            .to(Businesses::Table, Businesses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 一个用户在同一业务下只有一条合伙记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_partnerships_user_business_unique")
                    .table(Partnerships::Table)
                    .col(Partnerships::UserId)
                    .col(Partnerships::BusinessId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Statements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Statements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Statements::BusinessId).big_integer().not_null())
                    .col(ColumnDef::new(Statements::Month).string_len(32).not_null())
                    .col(ColumnDef::new(Statements::Details).text().null())
                    .col(
                        ColumnDef::new(Statements::Revenue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Statements::Expenses)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Statements::Profit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Statements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_statements_business")
                            .from(Statements::Table, Statements::BusinessId)
                            .to(Businesses::Table, Businesses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProfitHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProfitHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProfitHistory::BusinessId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProfitHistory::Month).string_len(32).not_null())
                    .col(ColumnDef::new(ProfitHistory::Profit).big_integer().not_null())
                    .col(
                        ColumnDef::new(ProfitHistory::PerPartnerProfit)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProfitHistory::PartnerCount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProfitHistory::Undistributed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProfitHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profit_history_business")
                            .from(ProfitHistory::Table, ProfitHistory::BusinessId)
                            .to(Businesses::Table, Businesses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProfitHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Statements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Partnerships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contributions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Businesses::Table).to_owned())
            .await?;
        Ok(())
    }
}
