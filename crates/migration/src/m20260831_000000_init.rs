//! Initial schema migration - creates all tables from scratch.
//!
//! Complete schema for Splitledger:
//!
//! - `users`: authentication
//! - `groups`: containers of members and shared expenses
//! - `members`: group participants, with derived balance cache columns
//! - `expenses`: shared costs with a payer and metadata
//! - `expense_shares`: the ordered per-participant split of each expense
//! - `settlements`: suggested repayments, pending or settled

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
}

#[derive(Iden)]
enum Members {
    Table,
    Id,
    GroupId,
    Name,
    Email,
    Phone,
    TotalOwedMinor,
    TotalOwingMinor,
    BalanceMinor,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    GroupId,
    Name,
    AmountMinor,
    PayerId,
    OccurredAt,
    Category,
    Note,
}

#[derive(Iden)]
enum ExpenseShares {
    Table,
    ExpenseId,
    Position,
    MemberId,
    AmountMinor,
}

#[derive(Iden)]
enum Settlements {
    Table,
    Id,
    GroupId,
    FromMemberId,
    ToMemberId,
    AmountMinor,
    Status,
    CreatedAt,
    SettledAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Groups
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Groups::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Groups::Name).string().not_null())
                    .col(ColumnDef::new(Groups::Description).string())
                    .col(ColumnDef::new(Groups::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Members
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Members::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Members::GroupId).string().not_null())
                    .col(ColumnDef::new(Members::Name).string().not_null())
                    .col(ColumnDef::new(Members::Email).string())
                    .col(ColumnDef::new(Members::Phone).string())
                    .col(
                        ColumnDef::new(Members::TotalOwedMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Members::TotalOwingMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Members::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-members-group_id")
                            .from(Members::Table, Members::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-members-group_id-name-unique")
                    .table(Members::Table)
                    .col(Members::GroupId)
                    .col(Members::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::GroupId).string().not_null())
                    .col(ColumnDef::new(Expenses::Name).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::PayerId).string().not_null())
                    .col(ColumnDef::new(Expenses::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::Category).string())
                    .col(ColumnDef::new(Expenses::Note).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-group_id")
                            .from(Expenses::Table, Expenses::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-group_id-occurred_at")
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .col(Expenses::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Expense shares
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseShares::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ExpenseShares::ExpenseId).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseShares::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExpenseShares::MemberId).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseShares::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ExpenseShares::ExpenseId)
                            .col(ExpenseShares::Position),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_shares-expense_id")
                            .from(ExpenseShares::Table, ExpenseShares::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_shares-member_id")
                    .table(ExpenseShares::Table)
                    .col(ExpenseShares::MemberId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Settlements
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Settlements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settlements::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settlements::GroupId).string().not_null())
                    .col(
                        ColumnDef::new(Settlements::FromMemberId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Settlements::ToMemberId).string().not_null())
                    .col(
                        ColumnDef::new(Settlements::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Settlements::Status).string().not_null())
                    .col(
                        ColumnDef::new(Settlements::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Settlements::SettledAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-settlements-group_id")
                            .from(Settlements::Table, Settlements::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-settlements-group_id-status")
                    .table(Settlements::Table)
                    .col(Settlements::GroupId)
                    .col(Settlements::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Settlements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseShares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
