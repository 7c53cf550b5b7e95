use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Security-question catalog presented at registration.
const SEED_QUESTIONS: &[&str] = &[
    "What is your favorite color?",
    "What is your favorite food?",
    "What is your favorite animal?",
];

/// Role catalog; registrations reference these by name.
const SEED_ROLES: &[&str] = &["User", "Manager", "Admin"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Roles)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(AccessRequests)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(PasswordHistory)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(SecurityQuestions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(UserSecurityAnswers)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        for role in SEED_ROLES {
            let insert = sea_orm_migration::sea_query::Query::insert()
                .into_table(Roles)
                .columns([crate::entities::roles::Column::Name])
                .values_panic([(*role).into()])
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        for question in SEED_QUESTIONS {
            let insert = sea_orm_migration::sea_query::Query::insert()
                .into_table(SecurityQuestions)
                .columns([crate::entities::security_questions::Column::Question])
                .values_panic([(*question).into()])
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserSecurityAnswers).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SecurityQuestions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PasswordHistory).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccessRequests).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles).to_owned())
            .await?;

        Ok(())
    }
}
