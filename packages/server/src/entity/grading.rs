use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "grading")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "submission_marker")]
    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,
    #[sea_orm(unique_key = "submission_marker")]
    pub marker_id: i32,

    pub marks: i32,
    #[sea_orm(column_type = "Text")]
    pub justification: String,
    #[sea_orm(column_type = "Text")]
    pub formative_feedback: String,
    /// JSON array of `{category, grade}` in rubric order.
    #[sea_orm(column_type = "JsonBinary")]
    pub summative_assessment: serde_json::Value,

    pub graded_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
