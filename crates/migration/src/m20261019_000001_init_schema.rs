use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(pk_auto(User::Id))
                    .col(string_len(User::Username, 64).unique_key())
                    .col(string_len(User::Email, 120).unique_key())
                    // argon2 PHC string, never the plaintext password.
                    .col(string_len(User::PasswordHash, 128))
                    .col(timestamp(User::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Problem::Table)
                    .if_not_exists()
                    .col(pk_auto(Problem::Id))
                    .col(string_len(Problem::ProblemName, 64))
                    .col(string_len(Problem::ProblemLink, 255).unique_key())
                    .col(string_len(Problem::Keywords, 140).default(""))
                    .col(string_len(Problem::Tags, 140).default(""))
                    .col(string_len(Problem::Platform, 140).default(""))
                    .col(timestamp(Problem::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(Problem::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Marked::Table)
                    .if_not_exists()
                    .col(integer(Marked::UserId))
                    .col(integer(Marked::ProblemId))
                    .primary_key(
                        Index::create()
                            .name("pk-marked")
                            .col(Marked::UserId)
                            .col(Marked::ProblemId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-marked-user_id")
                            .from(Marked::Table, Marked::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-marked-problem_id")
                            .from(Marked::Table, Marked::ProblemId)
                            .to(Problem::Table, Problem::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_problem_problem_name")
                    .table(Problem::Table)
                    .col(Problem::ProblemName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_problem_platform")
                    .table(Problem::Table)
                    .col(Problem::Platform)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_marked_problem_id")
                    .table(Marked::Table)
                    .col(Marked::ProblemId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Marked::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Problem::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Problem {
    Table,
    Id,
    ProblemName,
    ProblemLink,
    Keywords,
    Tags,
    Platform,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Marked {
    Table,
    UserId,
    ProblemId,
}
