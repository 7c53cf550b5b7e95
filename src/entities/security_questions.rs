use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "security_questions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub question: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_security_answers::Entity")]
    UserSecurityAnswers,
}

impl Related<super::user_security_answers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSecurityAnswers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
