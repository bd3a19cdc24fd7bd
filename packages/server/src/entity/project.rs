use common::{MarkerRoster, ProjectStatus, ProjectType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub project_type: ProjectType,
    pub status: ProjectStatus,
    /// Department of the creating supervisor.
    pub department: String,

    pub supervisor_first_id: i32,
    pub supervisor_second_id: Option<i32>,
    pub third_marker_id: Option<i32>,
    /// A student holds at most one project.
    #[sea_orm(unique)]
    pub assigned_student_id: Option<i32>,

    pub deadline_first: Option<DateTimeUtc>,
    pub deadline_second: Option<DateTimeUtc>,
    pub deadline_third: Option<DateTimeUtc>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::comment::Entity>,

    #[sea_orm(has_many, via = "project_application")]
    pub applicants: HasMany<super::user::Entity>,

    pub created_at: DateTimeUtc,
    pub assigned_at: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn roster(&self) -> MarkerRoster {
        MarkerRoster::new(
            self.supervisor_first_id,
            self.supervisor_second_id,
            self.third_marker_id,
        )
    }

    /// Deadline the given slot is due by, if one is set.
    pub fn deadline_for(&self, slot: common::SubmissionSlot) -> Option<DateTimeUtc> {
        match slot {
            common::SubmissionSlot::DraftProposal => self.deadline_first,
            common::SubmissionSlot::Presentation => self.deadline_second,
            common::SubmissionSlot::Thesis => self.deadline_third,
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
