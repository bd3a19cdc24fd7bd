use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A student's application to a project. The composite key makes a second
/// application by the same student a constraint violation.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_application")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub project_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i32,
    #[sea_orm(belongs_to, from = "project_id", to = "id")]
    pub project: Option<super::project::Entity>,
    #[sea_orm(belongs_to, from = "student_id", to = "id")]
    pub student: Option<super::user::Entity>,

    pub applied_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
