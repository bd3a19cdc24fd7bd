use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::validate_department;
use crate::error::AppError;

/// One deadline of a department's academic calendar.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, utoipa::ToSchema)]
pub struct CalendarDeadline {
    /// 1 = Draft Proposal, 2 = Presentation, 3 = Thesis.
    #[schema(example = 1, minimum = 1, maximum = 3)]
    pub submission_number: i32,
    pub deadline: DateTime<Utc>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCalendarRequest {
    #[schema(example = "Computer Science")]
    pub department: String,
    pub deadlines: Vec<CalendarDeadline>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateCalendarRequest {
    #[schema(example = "Computer Science")]
    pub department: String,
    pub deadlines: Vec<CalendarDeadline>,
    /// Also overwrite the deadlines of every project in the department.
    #[serde(default)]
    pub apply_to_projects: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CalendarResponse {
    pub department: String,
    /// Ordered by submission number.
    pub deadlines: Vec<CalendarDeadline>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UpdateCalendarResponse {
    pub calendar: CalendarResponse,
    /// Number of projects whose deadlines were overwritten.
    pub updated_projects: u64,
}

/// Check a calendar and return its three deadlines ordered by submission number.
///
/// Exactly one deadline per submission number 1-3, none in the past, strictly
/// increasing.
pub fn validate_calendar(
    department: &str,
    deadlines: &[CalendarDeadline],
    now: DateTime<Utc>,
) -> Result<[DateTime<Utc>; 3], AppError> {
    validate_department(department)?;

    let mut slots: [Option<DateTime<Utc>>; 3] = [None; 3];
    for d in deadlines {
        let idx = match d.submission_number {
            1..=3 => (d.submission_number - 1) as usize,
            n => {
                return Err(AppError::Validation(format!(
                    "Invalid submission_number {n}: must be 1, 2 or 3"
                )));
            }
        };
        if slots[idx].replace(d.deadline).is_some() {
            return Err(AppError::Validation(format!(
                "Duplicate deadline for submission {}",
                d.submission_number
            )));
        }
    }

    let [Some(first), Some(second), Some(third)] = slots else {
        return Err(AppError::Validation(
            "A calendar needs deadlines for submissions 1, 2 and 3".into(),
        ));
    };
    if first <= now || second <= now || third <= now {
        return Err(AppError::Validation(
            "Calendar deadlines cannot be in the past".into(),
        ));
    }
    if first >= second || second >= third {
        return Err(AppError::Validation(
            "Deadlines must be strictly increasing by submission number".into(),
        ));
    }
    Ok([first, second, third])
}
