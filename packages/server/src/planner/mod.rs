mod openai;

pub use openai::HttpTaskPlanner;

use async_trait::async_trait;
use common::{MessageRole, TaskList};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Planner is not configured: {0}")]
    NotConfigured(String),

    #[error("Planner request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Planner returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Planner returned an empty reply")]
    EmptyReply,
}

/// One prior message of a conversation, oldest first.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

/// What the planner answered: free text, or a structured breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerReply {
    Text(String),
    Tasks(TaskList),
}

impl PlannerReply {
    /// Interpret raw assistant output. JSON of the form `{"tasks": [...]}`,
    /// optionally inside a Markdown code fence, becomes a task list.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let body = strip_code_fence(trimmed);
        match serde_json::from_str::<TaskList>(body) {
            Ok(list) if !list.tasks.is_empty() => PlannerReply::Tasks(list),
            _ => PlannerReply::Text(trimmed.to_string()),
        }
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Turns a student's goal into a conversation reply or a task breakdown.
#[async_trait]
pub trait TaskPlanner: Send + Sync {
    /// `history` holds the whole conversation including the new prompt as its last turn.
    async fn reply(&self, history: &[ChatTurn]) -> Result<PlannerReply, PlannerError>;
}
