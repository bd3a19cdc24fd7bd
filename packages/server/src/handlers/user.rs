use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{ProjectStatus, Role};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, Query as SeaQuery};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{
    ai_task, ai_task_item, comment, conversation, conversation_message, project,
    project_application, upload_intent, user,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::auth::map_email_conflict;
use crate::models::auth::normalize_email;
use crate::models::shared::{Pagination, escape_like, page_params};
use crate::models::user::*;
use crate::state::AppState;
use crate::utils::hash;
use crate::utils::project::find_user;

/// Subquery selecting the IDs of every assigned student.
fn assigned_student_ids() -> sea_orm::sea_query::SelectStatement {
    SeaQuery::select()
        .column(project::Column::AssignedStudentId)
        .from(project::Entity)
        .and_where(project::Column::AssignedStudentId.is_not_null())
        .to_owned()
}

#[utoipa::path(
    post,
    path = "/user/register",
    tag = "Users",
    operation_id = "createUser",
    summary = "Create a user of any role",
    description = "Admin only. Students need a `student_id`; only supervisors may carry a `supervisor_title`.",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(email = %payload.email, role = %payload.role))]
pub async fn create_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_role(Role::Admin)?;
    validate_create_user(&payload)?;

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let now = chrono::Utc::now();
    let model = user::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        email: Set(normalize_email(&payload.email)),
        password: Set(hash),
        role: Set(payload.role),
        department: Set(payload.department.trim().to_string()),
        student_id: Set(payload.student_id.map(|s| s.trim().to_string())),
        supervisor_title: Set(payload.supervisor_title.map(|s| s.trim().to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(map_email_conflict)?;

    tracing::info!(user_id = model.id, "User created by admin");
    Ok((StatusCode::CREATED, Json(UserResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/user/all-users",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List users with pagination",
    description = "Admin only. Ordered by newest first. Optional role filter and name/email search.",
    params(UserListQuery),
    responses(
        (status = 200, description = "Page of users", body = UserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    auth_user.require_role(Role::Admin)?;
    let (page, per_page) = page_params(query.page, query.limit);

    let mut select = user::Entity::find();
    if let Some(role) = query.role {
        select = select.filter(user::Column::Role.eq(role));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Name)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Email)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let total_pages = total.div_ceil(per_page);

    let data = select
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(UserListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/user/all",
    tag = "Users",
    operation_id = "listAllUsers",
    summary = "List every user",
    description = "Admin only. Unpaged, ordered by name.",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn all_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    auth_user.require_role(Role::Admin)?;
    let users = user::Entity::find()
        .order_by_asc(user::Column::Name)
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/user/stats",
    tag = "Users",
    operation_id = "userStats",
    summary = "Counts of users per role and projects per status",
    responses(
        (status = 200, description = "Counters", body = UserStatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserStatsResponse>, AppError> {
    auth_user.require_role(Role::Admin)?;
    let db = &state.db;

    let count_role = |role: Role| {
        user::Entity::find()
            .filter(user::Column::Role.eq(role))
            .count(db)
    };
    let count_status = |status: ProjectStatus| {
        project::Entity::find()
            .filter(project::Column::Status.eq(status))
            .count(db)
    };

    let unassigned_students = user::Entity::find()
        .filter(user::Column::Role.eq(Role::Student))
        .filter(user::Column::Id.not_in_subquery(assigned_student_ids()))
        .count(db)
        .await?;

    Ok(Json(UserStatsResponse {
        users: RoleCounts {
            students: count_role(Role::Student).await?,
            supervisors: count_role(Role::Supervisor).await?,
            admins: count_role(Role::Admin).await?,
        },
        unassigned_students,
        projects: ProjectStatusCounts {
            available: count_status(ProjectStatus::Available).await?,
            assigned: count_status(ProjectStatus::Assigned).await?,
            completed: count_status(ProjectStatus::Completed).await?,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/user/students",
    tag = "Users",
    operation_id = "listStudents",
    summary = "List students",
    description = "Supervisors and admins. `unassigned=true` returns students without a project.",
    params(StudentListQuery),
    responses(
        (status = 200, description = "Students ordered by name", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(unassigned = ?query.unassigned))]
pub async fn list_students(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<StudentListQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    auth_user.require_any_role(&[Role::Supervisor, Role::Admin])?;

    let mut select = user::Entity::find().filter(user::Column::Role.eq(Role::Student));
    match query.unassigned {
        Some(true) => {
            select = select.filter(user::Column::Id.not_in_subquery(assigned_student_ids()));
        }
        Some(false) => {
            select = select.filter(user::Column::Id.in_subquery(assigned_student_ids()));
        }
        None => {}
    }
    if let Some(department) = query.department.as_deref().map(str::trim)
        && !department.is_empty()
    {
        select = select.filter(user::Column::Department.eq(department));
    }

    let students = select
        .order_by_asc(user::Column::Name)
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(students.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/user/all-supervisors",
    tag = "Users",
    operation_id = "listSupervisors",
    summary = "List supervisors",
    responses(
        (status = 200, description = "Supervisors ordered by name", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_supervisors(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let supervisors = user::Entity::find()
        .filter(user::Column::Role.eq(Role::Supervisor))
        .order_by_asc(user::Column::Name)
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(supervisors.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/user/{id}",
    tag = "Users",
    operation_id = "updateUser",
    summary = "Update a user",
    description = "Admin only. Partial update; the role cannot change. `null` clears `student_id` or `supervisor_title`.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_role(Role::Admin)?;
    validate_update_user(&payload)?;

    let existing = find_user(&state.db, id).await?;

    let student_id = match &payload.student_id {
        Some(v) => v.as_deref().map(str::trim),
        None => existing.student_id.as_deref(),
    };
    let supervisor_title = match &payload.supervisor_title {
        Some(v) => v.as_deref().map(str::trim),
        None => existing.supervisor_title.as_deref(),
    };
    validate_role_fields(existing.role, student_id, supervisor_title)?;
    let student_id = student_id.map(str::to_string);
    let supervisor_title = supervisor_title.map(str::to_string);

    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(email) = payload.email {
        active.email = Set(normalize_email(&email));
    }
    if let Some(password) = payload.password {
        let hash = hash::hash_password(&password)
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
        active.password = Set(hash);
    }
    if let Some(department) = payload.department {
        active.department = Set(department.trim().to_string());
    }
    active.student_id = Set(student_id);
    active.supervisor_title = Set(supervisor_title);
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await.map_err(map_email_conflict)?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/user/{id}",
    tag = "Users",
    operation_id = "deleteUser",
    summary = "Delete a user",
    description = "Admin only. Refused with 409 while any project references the user as a marker or as its assigned student. Otherwise the user's applications, comments, pending uploads, conversations and task plans are removed with the account.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "User is still referenced by a project (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_role(Role::Admin)?;
    if id == auth_user.user_id {
        return Err(AppError::Conflict("You cannot delete your own account".into()));
    }

    let txn = state.db.begin().await?;
    find_user(&txn, id).await?;

    let referencing = project::Entity::find()
        .filter(
            Condition::any()
                .add(project::Column::SupervisorFirstId.eq(id))
                .add(project::Column::SupervisorSecondId.eq(id))
                .add(project::Column::ThirdMarkerId.eq(id))
                .add(project::Column::AssignedStudentId.eq(id)),
        )
        .count(&txn)
        .await?;
    if referencing > 0 {
        return Err(AppError::Conflict(format!(
            "User is referenced by {referencing} project(s); reassign them first"
        )));
    }

    project_application::Entity::delete_many()
        .filter(project_application::Column::StudentId.eq(id))
        .exec(&txn)
        .await?;
    comment::Entity::delete_many()
        .filter(comment::Column::SenderId.eq(id))
        .exec(&txn)
        .await?;
    upload_intent::Entity::delete_many()
        .filter(upload_intent::Column::StudentId.eq(id))
        .exec(&txn)
        .await?;
    conversation_message::Entity::delete_many()
        .filter(
            conversation_message::Column::ConversationId.in_subquery(
                SeaQuery::select()
                    .column(conversation::Column::Id)
                    .from(conversation::Entity)
                    .and_where(conversation::Column::StudentId.eq(id))
                    .to_owned(),
            ),
        )
        .exec(&txn)
        .await?;
    conversation::Entity::delete_many()
        .filter(conversation::Column::StudentId.eq(id))
        .exec(&txn)
        .await?;
    ai_task_item::Entity::delete_many()
        .filter(
            ai_task_item::Column::TaskId.in_subquery(
                SeaQuery::select()
                    .column(ai_task::Column::Id)
                    .from(ai_task::Entity)
                    .and_where(ai_task::Column::StudentId.eq(id))
                    .to_owned(),
            ),
        )
        .exec(&txn)
        .await?;
    ai_task::Entity::delete_many()
        .filter(ai_task::Column::StudentId.eq(id))
        .exec(&txn)
        .await?;
    user::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
