use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{access_requests, password_history, roles, security_questions, user_security_answers, users};

pub mod migrator;
pub mod repositories;

pub use repositories::user::NewUser;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // Every pooled connection to an in-memory database would see its own
        // empty copy; a single connection keeps them on the same one.
        let (max_connections, min_connections) = if db_url.contains(":memory:") {
            (1, 1)
        } else {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn access_request_repo(&self) -> repositories::access_request::AccessRequestRepository {
        repositories::access_request::AccessRequestRepository::new(self.conn.clone())
    }

    fn password_history_repo(&self) -> repositories::password_history::PasswordHistoryRepository {
        repositories::password_history::PasswordHistoryRepository::new(self.conn.clone())
    }

    fn security_question_repo(&self) -> repositories::security_question::SecurityQuestionRepository {
        repositories::security_question::SecurityQuestionRepository::new(self.conn.clone())
    }

    fn role_repo(&self) -> repositories::role::RoleRepository {
        repositories::role::RoleRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        self.user_repo().find_by_username(username).await
    }

    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().find_by_id(id).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().find_by_email(email).await
    }

    pub async fn find_user_by_reset_token(&self, token: &str) -> Result<Option<users::Model>> {
        self.user_repo().find_by_reset_token(token).await
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<users::Model> {
        self.user_repo().create(new_user).await
    }

    pub async fn record_failed_login(&self, user_id: i32) -> Result<i32> {
        self.user_repo().record_failed_attempt(user_id).await
    }

    pub async fn reset_login_attempts(&self, user_id: i32) -> Result<()> {
        self.user_repo().reset_login_attempts(user_id).await
    }

    pub async fn suspend_user(&self, user_id: i32, start: &str, end: &str) -> Result<()> {
        self.user_repo().suspend(user_id, start, end).await
    }

    pub async fn clear_suspension(&self, user_id: i32) -> Result<()> {
        self.user_repo().clear_suspension(user_id).await
    }

    pub async fn set_user_active(&self, user_id: i32, active: bool) -> Result<()> {
        self.user_repo().set_active(user_id, active).await
    }

    pub async fn issue_reset_token(&self, user_id: i32, token: &str, expiry: &str) -> Result<()> {
        self.user_repo().issue_reset_token(user_id, token, expiry).await
    }

    pub async fn apply_password_reset(
        &self,
        user_id: i32,
        token: &str,
        new_hash: &str,
        expires_at: &str,
    ) -> Result<bool> {
        self.user_repo()
            .apply_password_reset(user_id, token, new_hash, expires_at)
            .await
    }

    // ========== Access requests ==========

    pub async fn create_access_request(&self, user_id: i32) -> Result<access_requests::Model> {
        self.access_request_repo().create_pending(user_id).await
    }

    pub async fn find_pending_access_request(
        &self,
        user_id: i32,
    ) -> Result<Option<access_requests::Model>> {
        self.access_request_repo().find_pending_for_user(user_id).await
    }

    pub async fn access_request_with_status_exists(
        &self,
        user_id: i32,
        status: &str,
    ) -> Result<bool> {
        self.access_request_repo().has_with_status(user_id, status).await
    }

    pub async fn resolve_access_request(&self, request_id: i32, status: &str) -> Result<()> {
        self.access_request_repo().resolve(request_id, status).await
    }

    // ========== Password history ==========

    pub async fn append_password_history(&self, user_id: i32, hash: &str) -> Result<()> {
        self.password_history_repo().append(user_id, hash).await
    }

    pub async fn password_hashes_for_user(&self, user_id: i32) -> Result<Vec<String>> {
        self.password_history_repo().hashes_for_user(user_id).await
    }

    pub async fn roll_password_history(&self, user_id: i32, new_hash: &str) -> Result<()> {
        self.password_history_repo().supersede(user_id, new_hash).await
    }

    pub async fn current_password_entry(
        &self,
        user_id: i32,
    ) -> Result<Option<password_history::Model>> {
        self.password_history_repo().current_for_user(user_id).await
    }

    // ========== Security questions ==========

    pub async fn list_security_questions(&self) -> Result<Vec<security_questions::Model>> {
        self.security_question_repo().list().await
    }

    pub async fn find_security_question(
        &self,
        id: i32,
    ) -> Result<Option<security_questions::Model>> {
        self.security_question_repo().find_by_id(id).await
    }

    pub async fn create_security_answer(
        &self,
        user_id: i32,
        question_id: i32,
        answer_hash: &str,
    ) -> Result<()> {
        self.security_question_repo()
            .create_answer(user_id, question_id, answer_hash)
            .await
    }

    pub async fn security_answers_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<user_security_answers::Model>> {
        self.security_question_repo().answers_for_user(user_id).await
    }

    pub async fn security_questions_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<security_questions::Model>> {
        self.security_question_repo().questions_for_user(user_id).await
    }

    // ========== Roles ==========

    pub async fn find_role_by_name(&self, name: &str) -> Result<Option<roles::Model>> {
        self.role_repo().find_by_name(name).await
    }

    pub async fn find_role_by_id(&self, id: i32) -> Result<Option<roles::Model>> {
        self.role_repo().find_by_id(id).await
    }
}
