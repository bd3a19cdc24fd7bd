use common::SubmissionSlot;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "project_slot")]
    pub project_id: i32,
    #[sea_orm(belongs_to, from = "project_id", to = "id")]
    pub project: HasOne<super::project::Entity>,
    #[sea_orm(unique_key = "project_slot")]
    pub slot: SubmissionSlot,

    pub file_name: String,
    pub s3_key: String,
    /// Saved after the project's deadline for this slot.
    pub is_late: bool,

    /// Released once every marker has graded; see `FinalGradeStrategy`.
    pub final_marks: Option<i32>,

    #[sea_orm(has_many)]
    pub gradings: HasMany<super::grading::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
