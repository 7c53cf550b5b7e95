//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{NotificationConfig, PolicyConfig, SecurityConfig};
use crate::db::{NewUser, Store};
use crate::db::repositories::access_request::{STATUS_APPROVED, STATUS_REJECTED};
use crate::entities::users;
use crate::services::account_service::{
    AccountError, AccountService, AnswerSubmission, LoginOutcome, RegisterRequest,
    RegistrationOutcome, ResetTokenIssued, SecurityQuestionDto, UserProfile,
};
use crate::services::credentials;
use crate::services::notifier::{Message, Notifier};

pub struct SeaOrmAccountService {
    store: Store,
    notifier: Arc<dyn Notifier>,
    security: SecurityConfig,
    policy: PolicyConfig,
    notifications: NotificationConfig,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(
        store: Store,
        notifier: Arc<dyn Notifier>,
        security: SecurityConfig,
        policy: PolicyConfig,
        notifications: NotificationConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            security,
            policy,
            notifications,
        }
    }

    /// `{first initial}{lastname lowercased}{MM}{YY}`, after the original
    /// scheme this system inherited. Collisions surface as a repository
    /// conflict rather than being silently uniquified.
    fn derive_username(first_name: &str, last_name: &str) -> String {
        let initial = first_name.chars().next().unwrap_or_default();
        let stamp = Utc::now().format("%m%y");
        format!("{}{}{}", initial, last_name.to_lowercase(), stamp)
    }

    fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AccountError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AccountError::Internal(format!("Malformed stored timestamp: {e}")))
    }

    fn password_expiry_from(now: DateTime<Utc>, policy: &PolicyConfig) -> String {
        (now + chrono::Duration::days(policy.password_expiry_days)).to_rfc3339()
    }

    /// Resolves a reset token to its user, enforcing the expiry window.
    async fn user_for_token(&self, token: &str) -> Result<users::Model, AccountError> {
        let user = self
            .store
            .find_user_by_reset_token(token)
            .await?
            .ok_or(AccountError::InvalidOrExpiredToken)?;

        let expiry = user
            .password_reset_token_expiry
            .as_deref()
            .ok_or(AccountError::InvalidOrExpiredToken)?;

        if Utc::now() > Self::parse_timestamp(expiry)? {
            return Err(AccountError::InvalidOrExpiredToken);
        }

        Ok(user)
    }

    /// Lifts a lapsed suspension on the login path; returns the refreshed
    /// record. Suspension is evaluated lazily here rather than by a
    /// background sweep because it only gates login.
    async fn lift_suspension_if_lapsed(
        &self,
        user: users::Model,
    ) -> Result<users::Model, AccountError> {
        if !user.is_suspended {
            return Ok(user);
        }

        let end = user
            .suspension_end
            .as_deref()
            .ok_or_else(|| {
                AccountError::Internal("Suspended user without suspension end".to_string())
            })?;
        let end = Self::parse_timestamp(end)?;
        let now = Utc::now();

        if now < end {
            let remaining = (end - now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            return Err(AccountError::AccountSuspended { remaining });
        }

        self.store.clear_suspension(user.id).await?;
        info!(user_id = user.id, "Suspension window lapsed, cleared on login");

        self.store
            .find_user_by_id(user.id)
            .await?
            .ok_or(AccountError::AccountNotFound)
    }

    async fn handle_failed_attempt(&self, user_id: i32) -> AccountError {
        let attempts = match self.store.record_failed_login(user_id).await {
            Ok(n) => u32::try_from(n).unwrap_or(0),
            Err(e) => return e.into(),
        };

        // Increment first, then compute what is left.
        let max = self.policy.max_login_attempts;
        if attempts >= max {
            let now = Utc::now();
            let window = chrono::Duration::minutes(self.policy.suspension_minutes);
            let end = now + window;

            if let Err(e) = self
                .store
                .suspend_user(user_id, &now.to_rfc3339(), &end.to_rfc3339())
                .await
            {
                return e.into();
            }

            warn!(user_id, attempts, "Account suspended after repeated login failures");

            let remaining = window.to_std().unwrap_or(std::time::Duration::ZERO);
            return AccountError::AccountSuspended { remaining };
        }

        AccountError::InvalidCredentials {
            remaining_attempts: max.saturating_sub(attempts),
        }
    }

    async fn profile_for(&self, user: &users::Model) -> Result<UserProfile, AccountError> {
        let role = self
            .store
            .find_role_by_id(user.role_id)
            .await?
            .ok_or(AccountError::RoleNotFound)?;

        Ok(UserProfile {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: role.name,
            profile_picture: user.profile_picture.clone(),
        })
    }

    async fn notify(&self, message: Message) -> Result<(), AccountError> {
        self.notifier
            .send(message)
            .await
            .map_err(|e| AccountError::Notification(e.to_string()))
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn register(
        &self,
        request: RegisterRequest,
    ) -> Result<RegistrationOutcome, AccountError> {
        // Question ids must be unique within the submission and exist in
        // the catalog before anything is written.
        let mut seen = HashSet::new();
        for answer in &request.security_answers {
            if !seen.insert(answer.question_id) {
                return Err(AccountError::DuplicateSecurityQuestion);
            }
            self.store
                .find_security_question(answer.question_id)
                .await?
                .ok_or(AccountError::SecurityQuestionNotFound)?;
        }

        let role = self
            .store
            .find_role_by_name(&request.role)
            .await?
            .ok_or(AccountError::RoleNotFound)?;

        if self.store.find_user_by_email(&request.email).await?.is_some() {
            return Err(AccountError::EmailAlreadyInUse);
        }

        let password_hash = credentials::hash_secret(&request.password, &self.security).await?;
        let mut answer_hashes = Vec::with_capacity(request.security_answers.len());
        for answer in &request.security_answers {
            let normalized = credentials::normalize_answer(&answer.answer);
            let hash = credentials::hash_secret(&normalized, &self.security).await?;
            answer_hashes.push((answer.question_id, hash));
        }

        let username = Self::derive_username(&request.first_name, &request.last_name);
        let now = Utc::now();

        let user = self
            .store
            .create_user(NewUser {
                username,
                email: request.email.clone(),
                password_hash: password_hash.clone(),
                role_id: role.id,
                first_name: request.first_name.clone(),
                last_name: request.last_name.clone(),
                address: request.address,
                date_of_birth: request.date_of_birth,
                profile_picture: request.profile_picture,
                password_expires_at: Self::password_expiry_from(now, &self.policy),
            })
            .await
            .map_err(|e| {
                // Unique-constraint backstop for a concurrent registration
                // with the same email.
                if e.to_string().contains("UNIQUE constraint") {
                    AccountError::EmailAlreadyInUse
                } else {
                    e.into()
                }
            })?;

        self.store
            .append_password_history(user.id, &password_hash)
            .await?;

        for (question_id, hash) in &answer_hashes {
            self.store
                .create_security_answer(user.id, *question_id, hash)
                .await?;
        }

        self.store.create_access_request(user.id).await?;

        info!(user_id = user.id, username = %user.username, "Registered pending account");

        let base = &self.notifications.public_base_url;
        let body = format!(
            "User account details:\n\
             - First Name: {}\n\
             - Last Name: {}\n\
             - Email: {}\n\
             - Role: {}\n\n\
             Approve: {base}/api/auth/approve-user/{}\n\
             Reject: {base}/api/auth/reject-user/{}\n",
            request.first_name, request.last_name, request.email, request.role, user.id, user.id,
        );

        self.notify(Message {
            to: self.notifications.admin_email.clone(),
            subject: "New user account creation request".to_string(),
            body,
        })
        .await?;

        Ok(RegistrationOutcome {
            user_id: user.id,
            username: user.username,
        })
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AccountError> {
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or(AccountError::AccountNotFound)?;

        let user = self.lift_suspension_if_lapsed(user).await?;

        if !user.is_active {
            return Err(AccountError::AccountNotActive);
        }

        if Utc::now() > Self::parse_timestamp(&user.password_expires_at)? {
            return Err(AccountError::PasswordExpired);
        }

        let is_valid = credentials::verify_secret(password, &user.password_hash).await?;
        if !is_valid {
            return Err(self.handle_failed_attempt(user.id).await);
        }

        self.store.reset_login_attempts(user.id).await?;

        let profile = self.profile_for(&user).await?;
        info!(user_id = user.id, "Login succeeded");

        Ok(LoginOutcome {
            profile,
            session_token: credentials::generate_session_token(),
        })
    }

    async fn forgot_password(
        &self,
        username: &str,
        email: Option<&str>,
    ) -> Result<ResetTokenIssued, AccountError> {
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or(AccountError::AccountNotFound)?;

        // Strict variant: a supplied email must belong to the same account.
        if let Some(email) = email
            && !user.email.eq_ignore_ascii_case(email)
        {
            return Err(AccountError::AccountNotFound);
        }

        let token = credentials::generate_reset_token();
        let expires_at =
            (Utc::now() + chrono::Duration::minutes(self.policy.reset_token_minutes)).to_rfc3339();

        // Overwriting invalidates any token still in flight.
        self.store
            .issue_reset_token(user.id, &token, &expires_at)
            .await?;

        info!(user_id = user.id, "Reset token issued");

        Ok(ResetTokenIssued { token, expires_at })
    }

    async fn security_questions_for_token(
        &self,
        token: &str,
    ) -> Result<Vec<SecurityQuestionDto>, AccountError> {
        let user = self.user_for_token(token).await?;

        let questions = self.store.security_questions_for_user(user.id).await?;

        Ok(questions
            .into_iter()
            .map(|q| SecurityQuestionDto {
                id: q.id,
                question: q.question,
            })
            .collect())
    }

    async fn verify_security_answers(
        &self,
        token: &str,
        answers: &[AnswerSubmission],
    ) -> Result<(), AccountError> {
        let user = self.user_for_token(token).await?;

        let stored = self.store.security_answers_for_user(user.id).await?;

        // The submission must cover exactly the assigned questions; a single
        // miss fails the whole verification.
        if answers.len() != stored.len() {
            return Err(AccountError::SecurityAnswerMismatch);
        }

        for submission in answers {
            let Some(entry) = stored
                .iter()
                .find(|a| a.security_question_id == submission.question_id)
            else {
                return Err(AccountError::SecurityAnswerMismatch);
            };

            let normalized = credentials::normalize_answer(&submission.answer);
            let matched = credentials::verify_secret(&normalized, &entry.answer_hash).await?;
            if !matched {
                return Err(AccountError::SecurityAnswerMismatch);
            }
        }

        Ok(())
    }

    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let user = self.user_for_token(token).await?;

        // Reuse check against every hash ever set for this account; only
        // existence of a match matters, not which entry it was.
        let history = self.store.password_hashes_for_user(user.id).await?;
        for hash in &history {
            if credentials::verify_secret(new_password, hash).await? {
                return Err(AccountError::PasswordReused);
            }
        }

        let new_hash = credentials::hash_secret(new_password, &self.security).await?;
        let expires_at = Self::password_expiry_from(Utc::now(), &self.policy);

        // Conditional on the token still being present: the first concurrent
        // redemption wins and later ones observe an expired token.
        let applied = self
            .store
            .apply_password_reset(user.id, token, &new_hash, &expires_at)
            .await?;
        if !applied {
            return Err(AccountError::InvalidOrExpiredToken);
        }

        self.store.roll_password_history(user.id, &new_hash).await?;

        info!(user_id = user.id, "Password reset completed");

        Ok(())
    }

    async fn approve_user(&self, user_id: i32) -> Result<(), AccountError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AccountError::AccountNotFound)?;

        if user.is_active {
            return Err(AccountError::AlreadyApproved);
        }

        let request = self
            .store
            .find_pending_access_request(user_id)
            .await?
            .ok_or(AccountError::NoPendingRequest)?;

        self.store
            .resolve_access_request(request.id, STATUS_APPROVED)
            .await?;
        self.store.set_user_active(user_id, true).await?;

        info!(user_id, "Access request approved, account activated");

        let body = format!(
            "Your account has been approved. Your username is {}\n\n\
             Log in at {}/login\n",
            user.username, self.notifications.public_base_url,
        );

        self.notify(Message {
            to: user.email,
            subject: "Account approved".to_string(),
            body,
        })
        .await
    }

    async fn reject_user(&self, user_id: i32) -> Result<(), AccountError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AccountError::AccountNotFound)?;

        if self
            .store
            .access_request_with_status_exists(user_id, STATUS_REJECTED)
            .await?
        {
            return Err(AccountError::AlreadyRejected);
        }

        // Resolved requests are terminal: an approved account cannot be
        // rejected after the fact.
        if user.is_active {
            return Err(AccountError::AlreadyApproved);
        }

        let request = self
            .store
            .find_pending_access_request(user_id)
            .await?
            .ok_or(AccountError::NoPendingRequest)?;

        self.store
            .resolve_access_request(request.id, STATUS_REJECTED)
            .await?;

        info!(user_id, "Access request rejected");

        self.notify(Message {
            to: user.email,
            subject: "Account rejected".to_string(),
            body: "Your account request has been rejected.\n".to_string(),
        })
        .await
    }

    async fn profile(&self, username: &str) -> Result<UserProfile, AccountError> {
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or(AccountError::AccountNotFound)?;

        self.profile_for(&user).await
    }

    async fn list_security_questions(&self) -> Result<Vec<SecurityQuestionDto>, AccountError> {
        let questions = self.store.list_security_questions().await?;

        Ok(questions
            .into_iter()
            .map(|q| SecurityQuestionDto {
                id: q.id,
                question: q.question,
            })
            .collect())
    }
}
