use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Derived at registration: `{first initial}{lastname}{MM}{YY}`.
    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub role_id: i32,

    pub first_name: String,

    pub last_name: String,

    pub address: Option<String>,

    pub date_of_birth: Option<String>,

    pub profile_picture: Option<String>,

    /// False until an administrator approves the access request.
    pub is_active: bool,

    pub is_suspended: bool,

    /// Both set while suspended, both null otherwise.
    pub suspension_start: Option<String>,

    pub suspension_end: Option<String>,

    /// Consecutive failed login attempts since the last success.
    pub login_attempts: i32,

    pub last_password_change_at: String,

    pub password_expires_at: String,

    /// Both set while a reset is in flight, both null otherwise.
    #[sea_orm(unique)]
    pub password_reset_token: Option<String>,

    pub password_reset_token_expiry: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::roles::Entity",
        from = "Column::RoleId",
        to = "super::roles::Column::Id"
    )]
    Role,
}

impl Related<super::roles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
