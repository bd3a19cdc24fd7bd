use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{CommentThread, MarkerRelation, MarkerRoster, Role};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{comment, project};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::comment::*;
use crate::state::AppState;
use crate::utils::project::{find_project, load_users};

/// Whether the caller takes part in the given thread of a project.
fn is_participant(
    auth_user: &AuthUser,
    roster: &MarkerRoster,
    assigned_student_id: Option<i32>,
    thread: CommentThread,
) -> bool {
    match thread {
        CommentThread::Supervision => {
            roster.relation_of(auth_user.user_id) == Some(MarkerRelation::FirstSupervisor)
                || assigned_student_id == Some(auth_user.user_id)
        }
        CommentThread::Marking => match auth_user.role {
            Role::Admin => true,
            Role::Supervisor => roster.contains(auth_user.user_id),
            Role::Student => false,
        },
    }
}

fn check_participant(
    auth_user: &AuthUser,
    project: &project::Model,
    thread: CommentThread,
) -> Result<(), AppError> {
    if is_participant(auth_user, &project.roster(), project.assigned_student_id, thread) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

async fn post_comment(
    state: &AppState,
    auth_user: &AuthUser,
    thread: CommentThread,
    payload: AddCommentRequest,
) -> Result<CommentResponse, AppError> {
    let message = prepare_comment_message(&payload.message)?;
    let project = find_project(&state.db, payload.project_id).await?;
    check_participant(auth_user, &project, thread)?;

    let saved = comment::ActiveModel {
        project_id: Set(project.id),
        thread: Set(thread),
        sender_id: Set(auth_user.user_id),
        message: Set(message),
        is_edited: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(comment_id = saved.id, ?thread, "Comment added");
    let mut responses = comment_responses(&state.db, vec![saved]).await?;
    responses
        .pop()
        .ok_or_else(|| AppError::Internal("Comment response was not built".into()))
}

async fn thread_comments(
    state: &AppState,
    auth_user: &AuthUser,
    project_id: i32,
    thread: CommentThread,
) -> Result<Vec<CommentResponse>, AppError> {
    let project = find_project(&state.db, project_id).await?;
    check_participant(auth_user, &project, thread)?;

    let comments = comment::Entity::find()
        .filter(comment::Column::ProjectId.eq(project.id))
        .filter(comment::Column::Thread.eq(thread))
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
        .all(&state.db)
        .await?;
    comment_responses(&state.db, comments).await
}

async fn comment_responses<C: ConnectionTrait>(
    db: &C,
    comments: Vec<comment::Model>,
) -> Result<Vec<CommentResponse>, AppError> {
    let senders = load_users(db, comments.iter().map(|c| c.sender_id)).await?;
    Ok(comments
        .into_iter()
        .map(|c| {
            let sender = senders.get(&c.sender_id);
            CommentResponse {
                id: c.id,
                project_id: c.project_id,
                thread: c.thread,
                sender_id: c.sender_id,
                sender_name: sender.map(|u| u.name.clone()),
                sender_role: sender.map(|u| u.role),
                message: c.message,
                is_edited: c.is_edited,
                created_at: c.created_at,
            }
        })
        .collect())
}

#[utoipa::path(
    post,
    path = "/comment/add-comment",
    tag = "Comments",
    operation_id = "addSupervisionComment",
    summary = "Post to the supervision thread",
    description = "Between the first supervisor and the assigned student. Messages are 1-1000 characters and stored HTML-escaped.",
    request_body = AddCommentRequest,
    responses(
        (status = 201, description = "Comment posted", body = CommentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(project_id = payload.project_id, sender_id = auth_user.user_id))]
pub async fn add_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = post_comment(&state, &auth_user, CommentThread::Supervision, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/comment/show-comments/{id}",
    tag = "Comments",
    operation_id = "listSupervisionComments",
    summary = "Read the supervision thread",
    description = "Oldest first.",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Comments", body = Vec<CommentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(project_id = id))]
pub async fn show_comments(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    thread_comments(&state, &auth_user, id, CommentThread::Supervision)
        .await
        .map(Json)
}

#[utoipa::path(
    post,
    path = "/comment/add-admin-discussion-comment",
    tag = "Comments",
    operation_id = "addMarkingComment",
    summary = "Post to the marking thread",
    description = "Between the marker roster and admins. Students have no access.",
    request_body = AddCommentRequest,
    responses(
        (status = 201, description = "Comment posted", body = CommentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(project_id = payload.project_id, sender_id = auth_user.user_id))]
pub async fn add_marking_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = post_comment(&state, &auth_user, CommentThread::Marking, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/comment/admin-discussion-comments/{id}",
    tag = "Comments",
    operation_id = "listMarkingComments",
    summary = "Read the marking thread",
    description = "Oldest first.",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Comments", body = Vec<CommentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(project_id = id))]
pub async fn marking_comments(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    thread_comments(&state, &auth_user, id, CommentThread::Marking)
        .await
        .map(Json)
}
