use chrono::{DateTime, Utc};
use common::{CommentThread, Role};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::utils::html::escape_html;

pub const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddCommentRequest {
    pub project_id: i32,
    /// 1-1000 characters. Stored HTML-escaped.
    #[schema(example = "Please expand the methodology section.")]
    pub message: String,
}

/// Check the length of a comment and return it HTML-escaped for storage.
pub fn prepare_comment_message(message: &str) -> Result<String, AppError> {
    let len = message.chars().count();
    if len == 0 || len > MAX_COMMENT_CHARS || message.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "Message must be 1-{MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(escape_html(message))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub project_id: i32,
    pub thread: CommentThread,
    pub sender_id: i32,
    pub sender_name: Option<String>,
    pub sender_role: Option<Role>,
    /// HTML-escaped message text.
    pub message: String,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
}
