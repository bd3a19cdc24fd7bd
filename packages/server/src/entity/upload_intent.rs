use common::SubmissionSlot;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An upload URL handed to a student and not yet confirmed with metadata.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upload_intent")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub s3_key: String,

    pub project_id: i32,
    pub slot: SubmissionSlot,
    pub student_id: i32,

    pub issued_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
