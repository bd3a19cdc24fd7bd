use chrono::{DateTime, Utc};
use common::{Difficulty, MessageKind, MessageRole, Progress, TaskList, TaskStatus, TaskStep};
use serde::{Deserialize, Serialize};

use super::shared::{validate_length, validate_title};
use crate::error::AppError;

pub const MAX_PROMPT_CHARS: usize = 4000;
pub const MAX_TASK_STEPS: usize = 50;
pub const MAX_TAGS: usize = 20;
/// Conversation titles are the first prompt cut to this many characters.
pub const TITLE_CHARS: usize = 80;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    /// Continue this conversation; omit to start a new one.
    pub conversation_id: Option<i32>,
    #[schema(example = "Help me plan my literature review")]
    pub prompt: String,
}

pub fn validate_prompt(prompt: &str) -> Result<(), AppError> {
    let len = prompt.chars().count();
    if prompt.trim().is_empty() || len > MAX_PROMPT_CHARS {
        return Err(AppError::Validation(format!(
            "Prompt must be 1-{MAX_PROMPT_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn conversation_title(prompt: &str) -> String {
    prompt.trim().chars().take(TITLE_CHARS).collect()
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub id: i32,
    pub role: MessageRole,
    pub kind: MessageKind,
    pub content: String,
    /// Present when `kind` is `task`.
    pub tasks: Option<TaskList>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConversationResponse {
    pub id: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Oldest first.
    pub messages: Vec<MessageResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConversationSummary {
    pub id: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SaveTaskRequest {
    #[schema(example = "Literature review")]
    pub title: String,
    /// The goal the plan was generated for.
    pub goal: String,
    pub tasks: Vec<TaskStep>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub fn validate_save_task(payload: &SaveTaskRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_length(&payload.goal, "Goal", 1, MAX_PROMPT_CHARS)?;
    if payload.tasks.is_empty() || payload.tasks.len() > MAX_TASK_STEPS {
        return Err(AppError::Validation(format!(
            "A task plan needs 1-{MAX_TASK_STEPS} steps"
        )));
    }
    for step in &payload.tasks {
        validate_length(&step.description, "Step description", 1, 1000)?;
        if step.tips.chars().count() > 2000 {
            return Err(AppError::Validation(
                "Step tips must be at most 2000 characters".into(),
            ));
        }
    }
    if payload.tags.len() > MAX_TAGS {
        return Err(AppError::Validation(format!("At most {MAX_TAGS} tags")));
    }
    for tag in &payload.tags {
        validate_length(tag, "Tag", 1, 50)?;
    }
    if let Some(notes) = &payload.notes
        && notes.chars().count() > 5000
    {
        return Err(AppError::Validation(
            "Notes must be at most 5000 characters".into(),
        ));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
}

/// Body of `PATCH /ai/tasks/{id}/progress`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateProgressRequest {
    pub item_id: i32,
    pub completed: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TaskItemResponse {
    pub id: i32,
    /// Zero-based order within the plan.
    pub position: i32,
    pub description: String,
    pub difficulty: Difficulty,
    pub tips: String,
    pub is_completed: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AiTaskResponse {
    pub id: i32,
    pub title: String,
    pub goal: String,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub status: TaskStatus,
    pub progress: Progress,
    pub items: Vec<TaskItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
