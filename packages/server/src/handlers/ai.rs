use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{MessageKind, MessageRole, Progress, Role, TaskList, TaskStatus};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{ai_task, ai_task_item, conversation, conversation_message};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::ai::*;
use crate::planner::{ChatTurn, PlannerReply};
use crate::state::AppState;

async fn find_own_conversation<C: ConnectionTrait>(
    db: &C,
    student_id: i32,
    id: i32,
) -> Result<conversation::Model, AppError> {
    conversation::Entity::find_by_id(id)
        .filter(conversation::Column::StudentId.eq(student_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation not found".into()))
}

async fn load_messages<C: ConnectionTrait>(
    db: &C,
    conversation_id: i32,
) -> Result<Vec<conversation_message::Model>, AppError> {
    Ok(conversation_message::Entity::find()
        .filter(conversation_message::Column::ConversationId.eq(conversation_id))
        .order_by_asc(conversation_message::Column::Id)
        .all(db)
        .await?)
}

fn message_response(m: conversation_message::Model) -> MessageResponse {
    let tasks = m
        .tasks
        .and_then(|v| serde_json::from_value::<TaskList>(v).ok());
    MessageResponse {
        id: m.id,
        role: m.role,
        kind: m.kind,
        content: m.content,
        tasks,
        created_at: m.created_at,
    }
}

fn conversation_response(
    c: conversation::Model,
    messages: Vec<conversation_message::Model>,
) -> ConversationResponse {
    ConversationResponse {
        id: c.id,
        title: c.title,
        created_at: c.created_at,
        updated_at: c.updated_at,
        messages: messages.into_iter().map(message_response).collect(),
    }
}

fn task_response(task: ai_task::Model, items: Vec<ai_task_item::Model>) -> AiTaskResponse {
    let progress = Progress::from_flags(items.iter().map(|i| i.is_completed));
    let tags = serde_json::from_value(task.tags).unwrap_or_else(|e| {
        tracing::warn!(task_id = task.id, error = %e, "Stored tags are unreadable");
        Vec::new()
    });
    AiTaskResponse {
        id: task.id,
        title: task.title,
        goal: task.goal,
        tags,
        due_date: task.due_date,
        notes: task.notes,
        status: task.status,
        progress,
        items: items
            .into_iter()
            .map(|i| TaskItemResponse {
                id: i.id,
                position: i.position,
                description: i.description,
                difficulty: i.difficulty,
                tips: i.tips,
                is_completed: i.is_completed,
            })
            .collect(),
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

async fn load_items<C: ConnectionTrait>(
    db: &C,
    task_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<ai_task_item::Model>>, AppError> {
    let mut grouped: HashMap<i32, Vec<ai_task_item::Model>> = HashMap::new();
    if task_ids.is_empty() {
        return Ok(grouped);
    }
    let items = ai_task_item::Entity::find()
        .filter(ai_task_item::Column::TaskId.is_in(task_ids))
        .order_by_asc(ai_task_item::Column::Position)
        .all(db)
        .await?;
    for item in items {
        grouped.entry(item.task_id).or_default().push(item);
    }
    Ok(grouped)
}

#[utoipa::path(
    post,
    path = "/ai/chat",
    tag = "AI",
    operation_id = "aiChat",
    summary = "Send a prompt to the task planner",
    description = "Students only. Omitting `conversation_id` starts a new conversation titled after the prompt. The prompt and the planner's reply are stored together only when the planner answers; a planner failure stores nothing and can be retried.",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Conversation including the new reply", body = ConversationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Conversation not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Planner unavailable (UPSTREAM_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(student_id = auth_user.user_id, conversation_id = ?payload.conversation_id))]
pub async fn chat(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChatRequest>,
) -> Result<Json<ConversationResponse>, AppError> {
    auth_user.require_role(Role::Student)?;
    validate_prompt(&payload.prompt)?;

    let existing = match payload.conversation_id {
        Some(id) => Some(find_own_conversation(&state.db, auth_user.user_id, id).await?),
        None => None,
    };
    let mut history: Vec<ChatTurn> = match &existing {
        Some(c) => load_messages(&state.db, c.id)
            .await?
            .into_iter()
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content,
            })
            .collect(),
        None => Vec::new(),
    };
    history.push(ChatTurn {
        role: MessageRole::User,
        content: payload.prompt.clone(),
    });

    let reply = state.planner.reply(&history).await?;
    let (kind, content, tasks) = match reply {
        PlannerReply::Text(text) => (MessageKind::Text, text, None),
        PlannerReply::Tasks(list) => {
            let value = serde_json::to_value(&list)
                .map_err(|e| AppError::Internal(format!("Task list serialization error: {}", e)))?;
            (MessageKind::Task, value.to_string(), Some(value))
        }
    };

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;
    let conversation = match existing {
        Some(c) => {
            let mut active: conversation::ActiveModel = c.into();
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            conversation::ActiveModel {
                student_id: Set(auth_user.user_id),
                title: Set(conversation_title(&payload.prompt)),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    conversation_message::Entity::insert_many([
        conversation_message::ActiveModel {
            conversation_id: Set(conversation.id),
            role: Set(MessageRole::User),
            kind: Set(MessageKind::Text),
            content: Set(payload.prompt),
            tasks: Set(None),
            created_at: Set(now),
            ..Default::default()
        },
        conversation_message::ActiveModel {
            conversation_id: Set(conversation.id),
            role: Set(MessageRole::Assistant),
            kind: Set(kind),
            content: Set(content),
            tasks: Set(tasks),
            created_at: Set(now),
            ..Default::default()
        },
    ])
    .exec_without_returning(&txn)
    .await?;
    let messages = load_messages(&txn, conversation.id).await?;
    txn.commit().await?;

    tracing::info!(conversation_id = conversation.id, ?kind, "Planner replied");
    Ok(Json(conversation_response(conversation, messages)))
}

#[utoipa::path(
    get,
    path = "/ai/conversations",
    tag = "AI",
    operation_id = "listConversations",
    summary = "The caller's conversations",
    description = "Most recently active first.",
    responses(
        (status = 200, description = "Conversations", body = Vec<ConversationSummary>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(student_id = auth_user.user_id))]
pub async fn list_conversations(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    auth_user.require_role(Role::Student)?;
    let conversations = conversation::Entity::find()
        .filter(conversation::Column::StudentId.eq(auth_user.user_id))
        .order_by_desc(conversation::Column::UpdatedAt)
        .order_by_desc(conversation::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(
        conversations
            .into_iter()
            .map(|c| ConversationSummary {
                id: c.id,
                title: c.title,
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/ai/conversations/{id}",
    tag = "AI",
    operation_id = "getConversation",
    summary = "One conversation with all messages",
    params(("id" = i32, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Conversation", body = ConversationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Conversation not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(student_id = auth_user.user_id, conversation_id = id))]
pub async fn get_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ConversationResponse>, AppError> {
    auth_user.require_role(Role::Student)?;
    let conversation = find_own_conversation(&state.db, auth_user.user_id, id).await?;
    let messages = load_messages(&state.db, conversation.id).await?;
    Ok(Json(conversation_response(conversation, messages)))
}

#[utoipa::path(
    get,
    path = "/ai/tasks",
    tag = "AI",
    operation_id = "listTasks",
    summary = "The caller's saved task plans",
    description = "Newest first, optionally filtered by status.",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Task plans with progress", body = Vec<AiTaskResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(student_id = auth_user.user_id))]
pub async fn list_tasks(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<AiTaskResponse>>, AppError> {
    auth_user.require_role(Role::Student)?;
    let mut select = ai_task::Entity::find().filter(ai_task::Column::StudentId.eq(auth_user.user_id));
    if let Some(status) = query.status {
        select = select.filter(ai_task::Column::Status.eq(status));
    }
    let tasks = select
        .order_by_desc(ai_task::Column::CreatedAt)
        .order_by_desc(ai_task::Column::Id)
        .all(&state.db)
        .await?;

    let mut items = load_items(&state.db, tasks.iter().map(|t| t.id).collect()).await?;
    Ok(Json(
        tasks
            .into_iter()
            .map(|t| {
                let own = items.remove(&t.id).unwrap_or_default();
                task_response(t, own)
            })
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/ai/tasks/save",
    tag = "AI",
    operation_id = "saveTaskPlan",
    summary = "Save a task plan",
    description = "Usually a breakdown proposed in a conversation, possibly edited. Steps keep the given order.",
    request_body = SaveTaskRequest,
    responses(
        (status = 201, description = "Task plan saved", body = AiTaskResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(student_id = auth_user.user_id, steps = payload.tasks.len()))]
pub async fn save_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SaveTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_role(Role::Student)?;
    validate_save_task(&payload)?;

    let tags: Vec<String> = payload.tags.iter().map(|t| t.trim().to_string()).collect();
    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;
    let task = ai_task::ActiveModel {
        student_id: Set(auth_user.user_id),
        title: Set(payload.title.trim().to_string()),
        goal: Set(payload.goal.trim().to_string()),
        tags: Set(serde_json::json!(tags)),
        due_date: Set(payload.due_date),
        notes: Set(payload.notes),
        status: Set(TaskStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let rows = payload
        .tasks
        .into_iter()
        .zip(0..)
        .map(|(step, position)| ai_task_item::ActiveModel {
            task_id: Set(task.id),
            position: Set(position),
            description: Set(step.description),
            difficulty: Set(step.difficulty),
            tips: Set(step.tips),
            is_completed: Set(false),
            ..Default::default()
        });
    ai_task_item::Entity::insert_many(rows)
        .exec_without_returning(&txn)
        .await?;
    let mut items = load_items(&txn, vec![task.id]).await?;
    txn.commit().await?;

    tracing::info!(task_id = task.id, "Task plan saved");
    let own = items.remove(&task.id).unwrap_or_default();
    Ok((StatusCode::CREATED, Json(task_response(task, own))))
}

#[utoipa::path(
    patch,
    path = "/ai/tasks/{id}/progress",
    tag = "AI",
    operation_id = "updateTaskProgress",
    summary = "Tick or untick a step",
    description = "Owner only. The plan becomes `completed` when every step is done and `active` again when one is unticked.",
    params(("id" = i32, Path, description = "Task plan ID")),
    request_body = UpdateProgressRequest,
    responses(
        (status = 200, description = "Updated task plan", body = AiTaskResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Task plan or step not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(student_id = auth_user.user_id, task_id = id, item_id = payload.item_id))]
pub async fn update_progress(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateProgressRequest>,
) -> Result<Json<AiTaskResponse>, AppError> {
    auth_user.require_role(Role::Student)?;

    let txn = state.db.begin().await?;
    let task = ai_task::Entity::find_by_id(id)
        .filter(ai_task::Column::StudentId.eq(auth_user.user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Task plan not found".into()))?;

    let updated = ai_task_item::Entity::update_many()
        .col_expr(
            ai_task_item::Column::IsCompleted,
            sea_orm::sea_query::Expr::value(payload.completed),
        )
        .filter(ai_task_item::Column::Id.eq(payload.item_id))
        .filter(ai_task_item::Column::TaskId.eq(task.id))
        .exec(&txn)
        .await?;
    if updated.rows_affected == 0 {
        return Err(AppError::NotFound("Task step not found".into()));
    }

    let mut items = load_items(&txn, vec![task.id]).await?;
    let own = items.remove(&task.id).unwrap_or_default();
    let status = Progress::from_flags(own.iter().map(|i| i.is_completed)).status();

    let mut active: ai_task::ActiveModel = task.into();
    active.status = Set(status);
    active.updated_at = Set(chrono::Utc::now());
    let task = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(?status, "Task progress updated");
    Ok(Json(task_response(task, own)))
}
