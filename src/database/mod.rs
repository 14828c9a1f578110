pub mod error;
pub mod queries;
pub mod repository;

pub use migrations::Migrator;

/// Database migrations module
pub mod migrations {
    use sea_orm_migration::prelude::*;

    /// Main migrator struct for database migrations
    pub struct Migrator;

    #[async_trait::async_trait]
    impl MigratorTrait for Migrator {
        fn migrations() -> Vec<Box<dyn MigrationTrait>> {
            vec![Box::new(tables::Migration)]
        }
    }

    /// Database tables module containing table creation migrations
    pub mod tables {
        use super::*;

        /// Migration struct for creating database tables
        #[derive(DeriveMigrationName)]
        pub struct Migration;

        #[async_trait::async_trait]
        impl MigrationTrait for Migration {
            /// Creates the necessary database tables if they don't exist
            async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
                manager
                    .create_table(
                        Table::create()
                            .table(Users::Table)
                            .if_not_exists()
                            .col(
                                ColumnDef::new(Users::Id)
                                    .integer()
                                    .not_null()
                                    .auto_increment()
                                    .primary_key(),
                            )
                            .col(ColumnDef::new(Users::Email).string().not_null())
                            .col(ColumnDef::new(Users::FirstName).string().not_null())
                            .col(ColumnDef::new(Users::LastName).string().not_null())
                            .col(
                                ColumnDef::new(Users::IsActive)
                                    .boolean()
                                    .not_null()
                                    .default(true),
                            )
                            .to_owned(),
                    )
                    .await?;

                // One row per user; the user id doubles as the primary key
                manager
                    .create_table(
                        Table::create()
                            .table(UserSubscription::Table)
                            .if_not_exists()
                            .col(
                                ColumnDef::new(UserSubscription::UserId)
                                    .integer()
                                    .not_null()
                                    .primary_key(),
                            )
                            .col(
                                ColumnDef::new(UserSubscription::Status)
                                    .integer()
                                    .not_null()
                                    .default(0),
                            )
                            .col(
                                ColumnDef::new(UserSubscription::OptinTime)
                                    .timestamp_with_time_zone()
                                    .null(),
                            )
                            .col(ColumnDef::new(UserSubscription::OptinIp).string().null())
                            .foreign_key(
                                ForeignKey::create()
                                    .from(UserSubscription::Table, UserSubscription::UserId)
                                    .to(Users::Table, Users::Id)
                                    .on_delete(ForeignKeyAction::Cascade),
                            )
                            .to_owned(),
                    )
                    .await?;

                manager
                    .create_table(
                        Table::create()
                            .table(PendingUserSubscription::Table)
                            .if_not_exists()
                            .col(
                                ColumnDef::new(PendingUserSubscription::UserId)
                                    .integer()
                                    .not_null()
                                    .primary_key(),
                            )
                            .col(
                                ColumnDef::new(PendingUserSubscription::MergeVars)
                                    .text()
                                    .null(),
                            )
                            .foreign_key(
                                ForeignKey::create()
                                    .from(
                                        PendingUserSubscription::Table,
                                        PendingUserSubscription::UserId,
                                    )
                                    .to(Users::Table, Users::Id)
                                    .on_delete(ForeignKeyAction::Cascade),
                            )
                            .to_owned(),
                    )
                    .await?;

                Ok(())
            }

            /// Drops the database tables
            async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
                // Dependents first, the users table last
                manager
                    .drop_table(Table::drop().table(PendingUserSubscription::Table).to_owned())
                    .await?;
                manager
                    .drop_table(Table::drop().table(UserSubscription::Table).to_owned())
                    .await?;
                manager
                    .drop_table(Table::drop().table(Users::Table).to_owned())
                    .await?;
                Ok(())
            }
        }

        #[derive(Iden)]
        enum Users {
            Table,
            Id,
            Email,
            FirstName,
            LastName,
            IsActive,
        }

        #[derive(Iden)]
        enum UserSubscription {
            #[iden = "mailchimp_user_subscription"]
            Table,
            UserId,
            Status,
            OptinTime,
            OptinIp,
        }

        #[derive(Iden)]
        enum PendingUserSubscription {
            #[iden = "mailchimp_pending_user_subscription"]
            Table,
            UserId,
            MergeVars,
        }
    }
}
