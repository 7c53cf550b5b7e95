use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::users;

/// Field bundle for inserting a freshly registered (inactive) user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub profile_picture: Option<String>,
    pub password_expires_at: String,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    pub async fn find_by_reset_token(&self, token: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::PasswordResetToken.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query user by reset token")
    }

    pub async fn create(&self, new_user: NewUser) -> Result<users::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            role_id: Set(new_user.role_id),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            address: Set(new_user.address),
            date_of_birth: Set(new_user.date_of_birth),
            profile_picture: Set(new_user.profile_picture),
            is_active: Set(false),
            is_suspended: Set(false),
            suspension_start: Set(None),
            suspension_end: Set(None),
            login_attempts: Set(0),
            last_password_change_at: Set(now.clone()),
            password_expires_at: Set(new_user.password_expires_at),
            password_reset_token: Set(None),
            password_reset_token_expiry: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to insert user")
    }

    /// Increments the failed-attempt counter in a single UPDATE statement
    /// (no read-modify-write window between concurrent failures) and returns
    /// the post-increment count.
    pub async fn record_failed_attempt(&self, user_id: i32) -> Result<i32> {
        users::Entity::update_many()
            .col_expr(
                users::Column::LoginAttempts,
                Expr::col(users::Column::LoginAttempts).add(1),
            )
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to increment login attempts")?;

        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to re-read login attempts")?
            .ok_or_else(|| anyhow::anyhow!("User {user_id} vanished during attempt tracking"))?;

        Ok(user.login_attempts)
    }

    pub async fn reset_login_attempts(&self, user_id: i32) -> Result<()> {
        users::Entity::update_many()
            .col_expr(users::Column::LoginAttempts, Expr::value(0))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to reset login attempts")?;

        Ok(())
    }

    pub async fn suspend(&self, user_id: i32, start: &str, end: &str) -> Result<()> {
        users::Entity::update_many()
            .col_expr(users::Column::IsSuspended, Expr::value(true))
            .col_expr(users::Column::SuspensionStart, Expr::value(start))
            .col_expr(users::Column::SuspensionEnd, Expr::value(end))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to suspend user")?;

        Ok(())
    }

    /// Lifts a lapsed suspension: clears the flag, nulls both timestamps and
    /// zeroes the attempt counter in one statement.
    pub async fn clear_suspension(&self, user_id: i32) -> Result<()> {
        users::Entity::update_many()
            .col_expr(users::Column::IsSuspended, Expr::value(false))
            .col_expr(users::Column::SuspensionStart, Expr::value(Option::<String>::None))
            .col_expr(users::Column::SuspensionEnd, Expr::value(Option::<String>::None))
            .col_expr(users::Column::LoginAttempts, Expr::value(0))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to clear suspension")?;

        Ok(())
    }

    pub async fn set_active(&self, user_id: i32, active: bool) -> Result<()> {
        users::Entity::update_many()
            .col_expr(users::Column::IsActive, Expr::value(active))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to update user active flag")?;

        Ok(())
    }

    /// Installs a fresh reset token, overwriting (and thereby invalidating)
    /// any prior one.
    pub async fn issue_reset_token(&self, user_id: i32, token: &str, expiry: &str) -> Result<()> {
        users::Entity::update_many()
            .col_expr(users::Column::PasswordResetToken, Expr::value(token))
            .col_expr(users::Column::PasswordResetTokenExpiry, Expr::value(expiry))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to issue reset token")?;

        Ok(())
    }

    /// Applies a password reset and consumes the token in one conditional
    /// UPDATE keyed on the token value. Returns false when the token was
    /// already consumed by a concurrent redemption (first consumer wins).
    pub async fn apply_password_reset(
        &self,
        user_id: i32,
        token: &str,
        new_hash: &str,
        expires_at: &str,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(new_hash))
            .col_expr(users::Column::LastPasswordChangeAt, Expr::value(now.clone()))
            .col_expr(users::Column::PasswordExpiresAt, Expr::value(expires_at))
            .col_expr(
                users::Column::PasswordResetToken,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                users::Column::PasswordResetTokenExpiry,
                Expr::value(Option::<String>::None),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user_id))
            .filter(users::Column::PasswordResetToken.eq(token))
            .exec(&self.conn)
            .await
            .context("Failed to apply password reset")?;

        Ok(result.rows_affected > 0)
    }
}
