use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three fixed deliverable positions of a project.
///
/// Stored by zero-based index; the HTTP API addresses slots by their
/// one-based `submission_number`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "i32", db_type = "Integer")
)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionSlot {
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 0))]
    DraftProposal,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 1))]
    Presentation,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 2))]
    Thesis,
}

impl SubmissionSlot {
    pub const ALL: &'static [SubmissionSlot] =
        &[Self::DraftProposal, Self::Presentation, Self::Thesis];

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::DraftProposal),
            1 => Some(Self::Presentation),
            2 => Some(Self::Thesis),
            _ => None,
        }
    }

    /// Parse a one-based submission number (1..=3).
    pub fn from_number(number: i32) -> Option<Self> {
        Self::from_index(number - 1)
    }

    pub fn index(&self) -> i32 {
        match self {
            Self::DraftProposal => 0,
            Self::Presentation => 1,
            Self::Thesis => 2,
        }
    }

    pub fn number(&self) -> i32 {
        self.index() + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DraftProposal => "Draft Proposal",
            Self::Presentation => "Presentation",
            Self::Thesis => "Thesis",
        }
    }
}

impl fmt::Display for SubmissionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
