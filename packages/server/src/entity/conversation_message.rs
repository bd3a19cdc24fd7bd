use common::{MessageKind, MessageRole};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversation_message")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub conversation_id: i32,
    #[sea_orm(belongs_to, from = "conversation_id", to = "id")]
    pub conversation: HasOne<super::conversation::Entity>,

    pub role: MessageRole,
    pub kind: MessageKind,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    /// Proposed `TaskList` when `kind` is `task`.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub tasks: Option<serde_json::Value>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
