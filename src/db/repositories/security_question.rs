use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{security_questions, user_security_answers};

pub struct SecurityQuestionRepository {
    conn: DatabaseConnection,
}

impl SecurityQuestionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<security_questions::Model>> {
        security_questions::Entity::find()
            .all(&self.conn)
            .await
            .context("Failed to list security questions")
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<security_questions::Model>> {
        security_questions::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query security question")
    }

    pub async fn create_answer(
        &self,
        user_id: i32,
        question_id: i32,
        answer_hash: &str,
    ) -> Result<()> {
        let active = user_security_answers::ActiveModel {
            user_id: Set(user_id),
            security_question_id: Set(question_id),
            answer_hash: Set(answer_hash.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert security answer")?;

        Ok(())
    }

    pub async fn answers_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<user_security_answers::Model>> {
        user_security_answers::Entity::find()
            .filter(user_security_answers::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await
            .context("Failed to query security answers")
    }

    /// The catalog entries for the questions a user chose at registration.
    pub async fn questions_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<security_questions::Model>> {
        let answers = self.answers_for_user(user_id).await?;
        let ids: Vec<i32> = answers.iter().map(|a| a.security_question_id).collect();

        security_questions::Entity::find()
            .filter(security_questions::Column::Id.is_in(ids))
            .all(&self.conn)
            .await
            .context("Failed to query questions for user")
    }
}
