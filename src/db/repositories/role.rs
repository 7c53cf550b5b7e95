use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::roles;

pub struct RoleRepository {
    conn: DatabaseConnection,
}

impl RoleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<roles::Model>> {
        roles::Entity::find()
            .filter(roles::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query role by name")
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<roles::Model>> {
        roles::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query role by ID")
    }
}
