use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{ProjectStatus, Role};
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{academic_calendar, project, project_application};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::project::*;
use crate::state::AppState;
use crate::utils::project::{
    check_project_visible, find_project, find_project_for_update, find_user, project_responses,
    require_owner_or_admin,
};

async fn single_response<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    model: project::Model,
) -> Result<ProjectResponse, AppError> {
    project_responses(db, auth_user, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Project response was not built".into()))
}

#[utoipa::path(
    post,
    path = "/project/create",
    tag = "Projects",
    operation_id = "createProject",
    summary = "Create a project",
    description = "Supervisors only. The project starts `available` in the supervisor's department, with deadlines copied from the department's academic calendar when one exists.",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_role(Role::Supervisor)?;
    validate_create_project(&payload)?;

    let supervisor = find_user(&state.db, auth_user.user_id).await?;

    let calendar = academic_calendar::Entity::find()
        .filter(academic_calendar::Column::Department.eq(&supervisor.department))
        .all(&state.db)
        .await?;
    let deadline = |n: i32| {
        calendar
            .iter()
            .find(|c| c.submission_number == n)
            .map(|c| c.deadline)
    };

    let now = chrono::Utc::now();
    let model = project::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description.trim().to_string()),
        project_type: Set(payload.project_type),
        status: Set(ProjectStatus::Available),
        department: Set(supervisor.department.clone()),
        supervisor_first_id: Set(supervisor.id),
        supervisor_second_id: Set(None),
        third_marker_id: Set(None),
        assigned_student_id: Set(None),
        deadline_first: Set(deadline(1)),
        deadline_second: Set(deadline(2)),
        deadline_third: Set(deadline(3)),
        created_at: Set(now),
        assigned_at: Set(None),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(project_id = model.id, "Project created");
    let response = single_response(&state.db, &auth_user, model).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/project",
    tag = "Projects",
    operation_id = "listProjects",
    summary = "List projects visible to the caller",
    description = "Students get the available projects of their department. Supervisors get every project of their department, admins every project; both may filter by `status`. Newest first.",
    params(ProjectListQuery),
    responses(
        (status = 200, description = "Projects", body = Vec<ProjectResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(role = %auth_user.role))]
pub async fn list_projects(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<Vec<ProjectResponse>>, AppError> {
    let mut select = project::Entity::find();
    match auth_user.role {
        Role::Student => {
            let me = find_user(&state.db, auth_user.user_id).await?;
            select = select
                .filter(project::Column::Status.eq(ProjectStatus::Available))
                .filter(project::Column::Department.eq(me.department));
        }
        Role::Supervisor => {
            let me = find_user(&state.db, auth_user.user_id).await?;
            select = select.filter(project::Column::Department.eq(me.department));
            if let Some(status) = query.status {
                select = select.filter(project::Column::Status.eq(status));
            }
        }
        Role::Admin => {
            if let Some(status) = query.status {
                select = select.filter(project::Column::Status.eq(status));
            }
        }
    }

    let projects = select
        .order_by_desc(project::Column::CreatedAt)
        .order_by_desc(project::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(project_responses(&state.db, &auth_user, projects).await?))
}

#[utoipa::path(
    get,
    path = "/project/supervisor/all",
    tag = "Projects",
    operation_id = "listSupervisorProjects",
    summary = "Projects the caller marks",
    description = "Projects where the calling supervisor is first supervisor, second marker or third marker, annotated with `relation`.",
    responses(
        (status = 200, description = "Projects", body = Vec<ProjectResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_supervisor_projects(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectResponse>>, AppError> {
    auth_user.require_role(Role::Supervisor)?;
    let me = auth_user.user_id;
    let projects = project::Entity::find()
        .filter(
            Condition::any()
                .add(project::Column::SupervisorFirstId.eq(me))
                .add(project::Column::SupervisorSecondId.eq(me))
                .add(project::Column::ThirdMarkerId.eq(me)),
        )
        .order_by_desc(project::Column::CreatedAt)
        .order_by_desc(project::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(project_responses(&state.db, &auth_user, projects).await?))
}

#[utoipa::path(
    get,
    path = "/project/student/current",
    tag = "Projects",
    operation_id = "currentStudentProject",
    summary = "The caller's assigned project",
    responses(
        (status = 200, description = "Assigned project", body = ProjectResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No project assigned (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn current_student_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProjectResponse>, AppError> {
    auth_user.require_role(Role::Student)?;
    let model = project::Entity::find()
        .filter(project::Column::AssignedStudentId.eq(auth_user.user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("No project assigned".into()))?;
    Ok(Json(single_response(&state.db, &auth_user, model).await?))
}

#[utoipa::path(
    get,
    path = "/project/{id}",
    tag = "Projects",
    operation_id = "getProject",
    summary = "Get a project by ID",
    description = "Returns 404 (not 403) for projects the caller cannot see.",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project details", body = ProjectResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProjectResponse>, AppError> {
    let model = find_project(&state.db, id).await?;
    check_project_visible(&state.db, &auth_user, &model).await?;
    Ok(Json(single_response(&state.db, &auth_user, model).await?))
}

#[utoipa::path(
    put,
    path = "/project/apply",
    tag = "Projects",
    operation_id = "applyToProject",
    summary = "Apply to a project",
    description = "Students only. A student applies to a project at most once; the store's primary key on (project, student) rejects duplicates even under concurrent calls.",
    request_body = ApplyRequest,
    responses(
        (status = 200, description = "Application recorded", body = ProjectResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Other department or not a student (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already applied, already assigned or project not available (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(project_id = payload.id, student_id = auth_user.user_id))]
pub async fn apply(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ApplyRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    auth_user.require_role(Role::Student)?;

    let student = find_user(&state.db, auth_user.user_id).await?;
    let model = find_project(&state.db, payload.id).await?;

    if model.department != student.department {
        return Err(AppError::PermissionDenied);
    }
    if model.status != ProjectStatus::Available {
        return Err(AppError::Conflict("Project is not open for applications".into()));
    }
    let holds_project = project::Entity::find()
        .filter(project::Column::AssignedStudentId.eq(student.id))
        .count(&state.db)
        .await?
        > 0;
    if holds_project {
        return Err(AppError::Conflict("You are already assigned to a project".into()));
    }

    let application = project_application::ActiveModel {
        project_id: Set(model.id),
        student_id: Set(student.id),
        applied_at: Set(chrono::Utc::now()),
    };
    match application.insert(&state.db).await {
        Ok(_) => {}
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Conflict("Already applied to this project".into()));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!("Student applied");
    Ok(Json(single_response(&state.db, &auth_user, model).await?))
}

#[utoipa::path(
    put,
    path = "/project/assign",
    tag = "Projects",
    operation_id = "assignStudent",
    summary = "Assign a student to a project",
    description = "First supervisor (the student must have applied) or admin. The assignment is a compare-and-set on an empty slot: a second assignment fails without changing the project.",
    request_body = AssignStudentRequest,
    responses(
        (status = 200, description = "Student assigned", body = ProjectResponse),
        (status = 400, description = "Target is not a student (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project or student not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Project already assigned, student did not apply or already holds a project (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(project_id = payload.id, student_id = payload.student_id))]
pub async fn assign_student(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AssignStudentRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    let txn = state.db.begin().await?;
    let model = find_project_for_update(&txn, payload.id).await?;
    require_owner_or_admin(&auth_user, &model)?;

    let student = find_user(&txn, payload.student_id).await?;
    if student.role != Role::Student {
        return Err(AppError::Validation("Only students can be assigned".into()));
    }
    if model.assigned_student_id.is_some() || model.status != ProjectStatus::Available {
        return Err(AppError::Conflict("Project already has an assigned student".into()));
    }
    if !auth_user.is_admin()
        && project_application::Entity::find_by_id((model.id, student.id))
            .one(&txn)
            .await?
            .is_none()
    {
        return Err(AppError::Conflict("Student has not applied to this project".into()));
    }

    let now = chrono::Utc::now();
    let result = project::Entity::update_many()
        .col_expr(project::Column::AssignedStudentId, Expr::value(student.id))
        .col_expr(project::Column::AssignedAt, Expr::value(now))
        .col_expr(
            project::Column::Status,
            Expr::value(ProjectStatus::Assigned.as_str()),
        )
        .col_expr(project::Column::UpdatedAt, Expr::value(now))
        .filter(project::Column::Id.eq(model.id))
        .filter(project::Column::AssignedStudentId.is_null())
        .exec(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("Student is already assigned to another project".into())
            }
            _ => AppError::from(e),
        })?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict("Project already has an assigned student".into()));
    }

    let updated = find_project(&txn, model.id).await?;
    txn.commit().await?;

    tracing::info!("Student assigned");
    Ok(Json(single_response(&state.db, &auth_user, updated).await?))
}

#[derive(Clone, Copy)]
enum MarkerSlot {
    Second,
    Third,
}

impl MarkerSlot {
    fn column(self) -> project::Column {
        match self {
            Self::Second => project::Column::SupervisorSecondId,
            Self::Third => project::Column::ThirdMarkerId,
        }
    }

    fn current(self, model: &project::Model) -> Option<i32> {
        match self {
            Self::Second => model.supervisor_second_id,
            Self::Third => model.third_marker_id,
        }
    }
}

async fn assign_marker(
    state: &AppState,
    auth_user: &AuthUser,
    project_id: i32,
    supervisor_id: i32,
    slot: MarkerSlot,
) -> Result<project::Model, AppError> {
    let txn = state.db.begin().await?;
    let model = find_project_for_update(&txn, project_id).await?;
    require_owner_or_admin(auth_user, &model)?;

    let marker = find_user(&txn, supervisor_id).await?;
    if marker.role != Role::Supervisor {
        return Err(AppError::Validation("Markers must be supervisors".into()));
    }
    if matches!(slot, MarkerSlot::Third) && model.supervisor_second_id.is_none() {
        return Err(AppError::Conflict(
            "A third marker needs a second marker first".into(),
        ));
    }
    if slot.current(&model).is_some() {
        return Err(AppError::Conflict("This marker slot is already filled".into()));
    }
    if model.roster().contains(marker.id) {
        return Err(AppError::Conflict(
            "Supervisor is already on this project's marker roster".into(),
        ));
    }

    let result = project::Entity::update_many()
        .col_expr(slot.column(), Expr::value(marker.id))
        .col_expr(project::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(project::Column::Id.eq(model.id))
        .filter(slot.column().is_null())
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict("This marker slot is already filled".into()));
    }

    let updated = find_project(&txn, model.id).await?;
    txn.commit().await?;
    Ok(updated)
}

#[utoipa::path(
    put,
    path = "/project/{id}/assign-supervisor-second",
    tag = "Projects",
    operation_id = "assignSecondMarker",
    summary = "Add the second marker",
    description = "First supervisor or admin. The supervisor must not already be on the roster.",
    params(("id" = i32, Path, description = "Project ID")),
    request_body = AssignMarkerRequest,
    responses(
        (status = 200, description = "Second marker set", body = ProjectResponse),
        (status = 400, description = "Target is not a supervisor (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project or supervisor not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Slot filled or supervisor already on roster (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, supervisor_id = payload.supervisor_id))]
pub async fn assign_second_marker(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AssignMarkerRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    let updated =
        assign_marker(&state, &auth_user, id, payload.supervisor_id, MarkerSlot::Second).await?;
    tracing::info!("Second marker assigned");
    Ok(Json(single_response(&state.db, &auth_user, updated).await?))
}

#[utoipa::path(
    put,
    path = "/project/{id}/assign-third-marker",
    tag = "Projects",
    operation_id = "assignThirdMarker",
    summary = "Add the third marker",
    description = "First supervisor or admin. Requires a second marker.",
    params(("id" = i32, Path, description = "Project ID")),
    request_body = AssignMarkerRequest,
    responses(
        (status = 200, description = "Third marker set", body = ProjectResponse),
        (status = 400, description = "Target is not a supervisor (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project or supervisor not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "No second marker, slot filled or supervisor already on roster (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, supervisor_id = payload.supervisor_id))]
pub async fn assign_third_marker(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AssignMarkerRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    let updated =
        assign_marker(&state, &auth_user, id, payload.supervisor_id, MarkerSlot::Third).await?;
    tracing::info!("Third marker assigned");
    Ok(Json(single_response(&state.db, &auth_user, updated).await?))
}

#[utoipa::path(
    put,
    path = "/project/{id}/update-deadlines",
    tag = "Projects",
    operation_id = "updateDeadlines",
    summary = "Override a project's deadlines",
    description = "Admin only. Past deadlines are allowed; they must be strictly increasing.",
    params(("id" = i32, Path, description = "Project ID")),
    request_body = UpdateDeadlinesRequest,
    responses(
        (status = 200, description = "Deadlines updated", body = ProjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_deadlines(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateDeadlinesRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    auth_user.require_role(Role::Admin)?;
    validate_deadlines(&payload)?;

    let model = find_project(&state.db, id).await?;
    let mut active: project::ActiveModel = model.into();
    active.deadline_first = Set(Some(payload.first));
    active.deadline_second = Set(Some(payload.second));
    active.deadline_third = Set(Some(payload.third));
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(Json(single_response(&state.db, &auth_user, updated).await?))
}

#[utoipa::path(
    put,
    path = "/project/{id}/complete",
    tag = "Projects",
    operation_id = "completeProject",
    summary = "Mark an assigned project as completed",
    description = "Admin only. Moves `assigned` to `completed`; any other state answers 409.",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project completed", body = ProjectResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Project is not assigned (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn complete_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProjectResponse>, AppError> {
    auth_user.require_role(Role::Admin)?;
    find_project(&state.db, id).await?;

    let result = project::Entity::update_many()
        .col_expr(
            project::Column::Status,
            Expr::value(ProjectStatus::Completed.as_str()),
        )
        .col_expr(project::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(project::Column::Id.eq(id))
        .filter(project::Column::Status.eq(ProjectStatus::Assigned))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Only assigned projects can be completed".into(),
        ));
    }

    let updated = find_project(&state.db, id).await?;
    tracing::info!(project_id = id, "Project completed");
    Ok(Json(single_response(&state.db, &auth_user, updated).await?))
}
