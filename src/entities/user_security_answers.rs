use sea_orm::entity::prelude::*;

/// A user's chosen security question and the hash of their case-normalized
/// answer. One to three per user.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_security_answers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub security_question_id: i32,

    /// Argon2id hash of the trimmed, lowercased answer
    pub answer_hash: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::security_questions::Entity",
        from = "Column::SecurityQuestionId",
        to = "super::security_questions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SecurityQuestion,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::security_questions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SecurityQuestion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
