use common::Difficulty;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ai_task_item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub task_id: i32,
    #[sea_orm(belongs_to, from = "task_id", to = "id")]
    pub task: HasOne<super::ai_task::Entity>,

    pub position: i32,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub difficulty: Difficulty,
    #[sea_orm(column_type = "Text")]
    pub tips: String,
    pub is_completed: bool,
}

impl ActiveModelBehavior for ActiveModel {}
