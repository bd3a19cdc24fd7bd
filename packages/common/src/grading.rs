//! Multi-marker grading rules.
//!
//! A submission is graded independently by every supervisor on its project's
//! marker roster. Each marker owns at most one grading per submission. Once as
//! many gradings have arrived as there are markers on the roster, the
//! submission is complete and a final grade may be released to the student.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::project::{MarkerRelation, MarkerRoster};

pub const MIN_MARKS: i32 = 0;
pub const MAX_MARKS: i32 = 100;

/// Letter grade band derived from a 0-100 mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum GradeLetter {
    #[serde(rename = "A*")]
    AStar,
    A,
    B,
    C,
    D,
    F,
    G,
}

impl GradeLetter {
    pub const ALL: &'static [GradeLetter] = &[
        Self::AStar,
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::F,
        Self::G,
    ];

    /// Band for `marks`, or `None` when outside 0-100.
    pub fn from_marks(marks: i32) -> Option<Self> {
        if !(MIN_MARKS..=MAX_MARKS).contains(&marks) {
            return None;
        }
        Some(match marks {
            80.. => Self::AStar,
            70..=79 => Self::A,
            60..=69 => Self::B,
            50..=59 => Self::C,
            40..=49 => Self::D,
            30..=39 => Self::F,
            _ => Self::G,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AStar => "A*",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
            Self::G => "G",
        }
    }
}

impl fmt::Display for GradeLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GradeLetter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("Invalid grade '{s}'. Valid values: A*, A, B, C, D, F, G"))
    }
}

/// Rubric categories assessing the sections of the work.
pub const SECTION_CATEGORIES: [&str; 13] = [
    "Abstract",
    "Introduction",
    "Aims and Objectives",
    "Literature Review",
    "Methodology",
    "Requirements Analysis",
    "Design",
    "Implementation",
    "Testing",
    "Evaluation",
    "Results and Discussion",
    "Conclusion",
    "Future Work",
];

/// Rubric categories assessing the overall quality of the work.
pub const QUALITY_CATEGORIES: [&str; 4] = [
    "Presentation and Structure",
    "Referencing",
    "Critical Analysis",
    "Originality",
];

/// All 17 rubric categories in their canonical order.
pub fn rubric() -> impl Iterator<Item = &'static str> {
    SECTION_CATEGORIES
        .iter()
        .chain(QUALITY_CATEGORIES.iter())
        .copied()
}

/// Position of a category in the rubric, matched case-insensitively.
pub fn rubric_position(category: &str) -> Option<usize> {
    let category = category.trim();
    rubric().position(|c| c.eq_ignore_ascii_case(category))
}

/// One line of a summative assessment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AssessmentEntry {
    #[schema(example = "Literature Review")]
    pub category: String,
    pub grade: GradeLetter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RubricError {
    UnknownCategory(String),
    DuplicateCategory(String),
}

impl fmt::Display for RubricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCategory(c) => write!(f, "Unknown assessment category '{c}'"),
            Self::DuplicateCategory(c) => write!(f, "Duplicate assessment category '{c}'"),
        }
    }
}

impl std::error::Error for RubricError {}

/// Validate a summative assessment against the rubric.
///
/// Category names are replaced by their canonical spelling and the entries are
/// returned in rubric order. Partial assessments are accepted.
pub fn normalize_assessment(
    entries: Vec<AssessmentEntry>,
) -> Result<Vec<AssessmentEntry>, RubricError> {
    let mut positioned: Vec<(usize, AssessmentEntry)> = Vec::with_capacity(entries.len());
    for entry in entries {
        let pos = rubric_position(&entry.category)
            .ok_or_else(|| RubricError::UnknownCategory(entry.category.trim().to_string()))?;
        if positioned.iter().any(|(p, _)| *p == pos) {
            return Err(RubricError::DuplicateCategory(entry.category.trim().to_string()));
        }
        let canonical = rubric().nth(pos).unwrap_or_default().to_string();
        positioned.push((
            pos,
            AssessmentEntry {
                category: canonical,
                grade: entry.grade,
            },
        ));
    }
    positioned.sort_by_key(|(pos, _)| *pos);
    Ok(positioned.into_iter().map(|(_, e)| e).collect())
}

/// Number of gradings a submission needs: one per marker on the roster.
pub fn required_gradings(roster: &MarkerRoster) -> usize {
    roster.size()
}

/// Derived grading state of a submission. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Completeness {
    /// Gradings received so far (one per distinct marker).
    pub received: usize,
    /// Gradings needed before the submission is fully assessed.
    pub required: usize,
    pub is_complete: bool,
}

impl Completeness {
    pub fn evaluate(roster: &MarkerRoster, received: usize) -> Self {
        let required = required_gradings(roster);
        Self {
            received,
            required,
            is_complete: received >= required,
        }
    }
}

/// Marks awarded by one roster member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerMarks {
    pub relation: MarkerRelation,
    pub marks: i32,
}

/// Released result of a fully assessed submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct FinalGrade {
    pub marks: i32,
    pub grade: GradeLetter,
}

impl FinalGrade {
    pub fn from_marks(marks: i32) -> Option<Self> {
        GradeLetter::from_marks(marks).map(|grade| Self { marks, grade })
    }
}

/// How the gradings of a complete submission collapse into one final grade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalGradeStrategy {
    /// Mean of all markers' marks, rounded half up.
    #[default]
    Average,
    /// The first supervisor's marks.
    FirstMarker,
    /// No automatic result; an admin records the moderated marks.
    Moderated,
}

impl FinalGradeStrategy {
    /// Compute the final grade from the gradings of a complete submission.
    pub fn resolve(&self, gradings: &[MarkerMarks]) -> Option<FinalGrade> {
        match self {
            Self::Average => {
                if gradings.is_empty() {
                    return None;
                }
                let n = gradings.len() as i32;
                let sum: i32 = gradings.iter().map(|g| g.marks).sum();
                FinalGrade::from_marks((2 * sum + n) / (2 * n))
            }
            Self::FirstMarker => gradings
                .iter()
                .find(|g| g.relation == MarkerRelation::FirstSupervisor)
                .and_then(|g| FinalGrade::from_marks(g.marks)),
            Self::Moderated => None,
        }
    }
}
