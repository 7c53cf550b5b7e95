use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::entities::password_history;

pub struct PasswordHistoryRepository {
    conn: DatabaseConnection,
}

impl PasswordHistoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Appends a new current entry. Callers expire the previous one first so
    /// that exactly one entry per user stays unexpired.
    pub async fn append(&self, user_id: i32, password_hash: &str) -> Result<()> {
        let active = password_history::ActiveModel {
            user_id: Set(user_id),
            password_hash: Set(password_hash.to_string()),
            is_expired: Set(false),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert password history entry")?;

        Ok(())
    }

    /// All hashes ever set for the user, current and superseded alike.
    pub async fn hashes_for_user(&self, user_id: i32) -> Result<Vec<String>> {
        let entries = password_history::Entity::find()
            .filter(password_history::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await
            .context("Failed to query password history")?;

        Ok(entries.into_iter().map(|e| e.password_hash).collect())
    }

    /// Expires the current entry and appends the new one in a single
    /// transaction, so exactly one entry per user stays unexpired even if
    /// the process dies mid-rollover.
    pub async fn supersede(&self, user_id: i32, new_hash: &str) -> Result<()> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to begin password history transaction")?;

        password_history::Entity::update_many()
            .col_expr(password_history::Column::IsExpired, Expr::value(true))
            .filter(password_history::Column::UserId.eq(user_id))
            .filter(password_history::Column::IsExpired.eq(false))
            .exec(&txn)
            .await
            .context("Failed to expire current password history entry")?;

        let active = password_history::ActiveModel {
            user_id: Set(user_id),
            password_hash: Set(new_hash.to_string()),
            is_expired: Set(false),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };
        active
            .insert(&txn)
            .await
            .context("Failed to insert password history entry")?;

        txn.commit()
            .await
            .context("Failed to commit password history rollover")?;

        Ok(())
    }

    pub async fn current_for_user(
        &self,
        user_id: i32,
    ) -> Result<Option<password_history::Model>> {
        password_history::Entity::find()
            .filter(password_history::Column::UserId.eq(user_id))
            .filter(password_history::Column::IsExpired.eq(false))
            .one(&self.conn)
            .await
            .context("Failed to query current password history entry")
    }
}
