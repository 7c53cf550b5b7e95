//! Domain service for the account lifecycle.
//!
//! Covers registration and administrator approval, login with attempt
//! throttling and password aging, and the security-question-gated password
//! reset flow.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::services::suspension::format_remaining;

/// Failures surfaced by account-lifecycle operations. Each variant carries a
/// stable kind; the HTTP boundary maps kinds to status codes.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("Account is suspended, try again {}", format_remaining(*remaining))]
    AccountSuspended { remaining: Duration },

    #[error("Account is not active yet, wait for administrator approval")]
    AccountNotActive,

    #[error("Password has expired and must be reset before logging in")]
    PasswordExpired,

    #[error("Invalid credentials, {remaining_attempts} attempts remaining")]
    InvalidCredentials { remaining_attempts: u32 },

    #[error("This email is already in use. Try another email.")]
    EmailAlreadyInUse,

    #[error("Security questions in a submission must be unique")]
    DuplicateSecurityQuestion,

    #[error("Security question not found")]
    SecurityQuestionNotFound,

    #[error("Role not found")]
    RoleNotFound,

    #[error("Reset token is invalid or has expired")]
    InvalidOrExpiredToken,

    #[error("One or more security answers did not match")]
    SecurityAnswerMismatch,

    #[error("New password must not match a previously used password")]
    PasswordReused,

    #[error("Account has already been approved")]
    AlreadyApproved,

    #[error("Access request has already been rejected")]
    AlreadyRejected,

    #[error("No pending access request found")]
    NoPendingRequest,

    /// The state change committed but the notification did not go out.
    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Registration submission, already past the input-validation gate.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub profile_picture: Option<String>,
    pub security_answers: Vec<AnswerSubmission>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: i32,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub user_id: i32,
    pub username: String,
}

/// Public profile returned on successful login; never carries hashes.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub profile: UserProfile,
    pub session_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetTokenIssued {
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityQuestionDto {
    pub id: i32,
    pub question: String,
}

/// Domain service trait for the account lifecycle.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Creates an inactive account plus a pending access request and
    /// notifies the administrative channel.
    async fn register(
        &self,
        request: RegisterRequest,
    ) -> Result<RegistrationOutcome, AccountError>;

    /// Authenticates a user, enforcing suspension, activation and password
    /// aging before the credential check.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::AccountSuspended`] once
    /// `max_login_attempts` consecutive failures accumulate.
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AccountError>;

    /// Issues a fresh single-use reset token, invalidating any prior one.
    async fn forgot_password(
        &self,
        username: &str,
        email: Option<&str>,
    ) -> Result<ResetTokenIssued, AccountError>;

    /// The security questions assigned to the account behind a live token.
    async fn security_questions_for_token(
        &self,
        token: &str,
    ) -> Result<Vec<SecurityQuestionDto>, AccountError>;

    /// Gate for the reset flow: every assigned question must be answered
    /// correctly. Does not consume the token.
    async fn verify_security_answers(
        &self,
        token: &str,
        answers: &[AnswerSubmission],
    ) -> Result<(), AccountError>;

    /// Finalizes the reset: reuse check, history rollover, token consumed.
    async fn reset_password(&self, token: &str, new_password: &str)
    -> Result<(), AccountError>;

    /// Activates a pending account and resolves its access request.
    async fn approve_user(&self, user_id: i32) -> Result<(), AccountError>;

    /// Terminally rejects a pending account's access request.
    async fn reject_user(&self, user_id: i32) -> Result<(), AccountError>;

    /// Public profile for an authenticated session.
    async fn profile(&self, username: &str) -> Result<UserProfile, AccountError>;

    /// The full security-question catalog offered at registration.
    async fn list_security_questions(&self) -> Result<Vec<SecurityQuestionDto>, AccountError>;
}
