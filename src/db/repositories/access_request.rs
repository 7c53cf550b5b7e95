use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::access_requests;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";

pub struct AccessRequestRepository {
    conn: DatabaseConnection,
}

impl AccessRequestRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create_pending(&self, user_id: i32) -> Result<access_requests::Model> {
        let active = access_requests::ActiveModel {
            user_id: Set(user_id),
            status: Set(STATUS_PENDING.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            resolved_at: Set(None),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert access request")
    }

    pub async fn find_pending_for_user(
        &self,
        user_id: i32,
    ) -> Result<Option<access_requests::Model>> {
        access_requests::Entity::find()
            .filter(access_requests::Column::UserId.eq(user_id))
            .filter(access_requests::Column::Status.eq(STATUS_PENDING))
            .one(&self.conn)
            .await
            .context("Failed to query pending access request")
    }

    pub async fn has_with_status(&self, user_id: i32, status: &str) -> Result<bool> {
        let found = access_requests::Entity::find()
            .filter(access_requests::Column::UserId.eq(user_id))
            .filter(access_requests::Column::Status.eq(status))
            .one(&self.conn)
            .await
            .context("Failed to query access request by status")?;

        Ok(found.is_some())
    }

    /// Terminally resolves a pending request. Resolved requests are never
    /// transitioned again.
    pub async fn resolve(&self, request_id: i32, status: &str) -> Result<()> {
        let request = access_requests::Entity::find_by_id(request_id)
            .one(&self.conn)
            .await
            .context("Failed to load access request for resolution")?
            .ok_or_else(|| anyhow::anyhow!("Access request {request_id} not found"))?;

        let mut active: access_requests::ActiveModel = request.into();
        active.status = Set(status.to_string());
        active.resolved_at = Set(Some(chrono::Utc::now().to_rfc3339()));
        active.update(&self.conn).await?;

        Ok(())
    }
}
