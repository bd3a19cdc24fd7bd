pub mod comment;
pub mod config;
pub mod grading;
pub mod project;
pub mod role;
pub mod slot;
pub mod storage;
pub mod task;

pub use comment::CommentThread;
pub use grading::{Completeness, FinalGrade, FinalGradeStrategy, GradeLetter};
pub use project::{MarkerRelation, MarkerRoster, ProjectStatus, ProjectType};
pub use role::Role;
pub use slot::SubmissionSlot;
pub use task::{Difficulty, MessageKind, MessageRole, Progress, TaskList, TaskStatus, TaskStep};
