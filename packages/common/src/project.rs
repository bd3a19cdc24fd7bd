#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work a project offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "research_and_development"))]
    ResearchAndDevelopment,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "applied"))]
    Applied,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "theoretical"))]
    Theoretical,
}

/// Lifecycle of a project: `Available -> Assigned -> Completed`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "available"))]
    Available,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "assigned"))]
    Assigned,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "completed"))]
    Completed,
}

impl ProjectStatus {
    pub const ALL: &'static [ProjectStatus] = &[Self::Available, Self::Assigned, Self::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position a supervisor holds on a project's marker roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MarkerRelation {
    FirstSupervisor,
    SecondMarker,
    ThirdMarker,
}

/// The up to three supervisors eligible to grade a project's submissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerRoster {
    pub first: i32,
    pub second: Option<i32>,
    pub third: Option<i32>,
}

impl MarkerRoster {
    pub fn new(first: i32, second: Option<i32>, third: Option<i32>) -> Self {
        Self {
            first,
            second,
            third,
        }
    }

    /// The roster position held by `user_id`, if any.
    pub fn relation_of(&self, user_id: i32) -> Option<MarkerRelation> {
        if self.first == user_id {
            Some(MarkerRelation::FirstSupervisor)
        } else if self.second == Some(user_id) {
            Some(MarkerRelation::SecondMarker)
        } else if self.third == Some(user_id) {
            Some(MarkerRelation::ThirdMarker)
        } else {
            None
        }
    }

    pub fn contains(&self, user_id: i32) -> bool {
        self.relation_of(user_id).is_some()
    }

    /// Number of markers on the roster (1..=3).
    pub fn size(&self) -> usize {
        1 + usize::from(self.second.is_some()) + usize::from(self.third.is_some())
    }

    pub fn members(&self) -> Vec<i32> {
        std::iter::once(self.first)
            .chain(self.second)
            .chain(self.third)
            .collect()
    }
}
