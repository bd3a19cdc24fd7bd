use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::Role;
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{academic_calendar, project};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::calendar::*;
use crate::state::AppState;

fn calendar_response(department: String, rows: Vec<academic_calendar::Model>) -> CalendarResponse {
    let mut deadlines: Vec<CalendarDeadline> = rows
        .into_iter()
        .map(|r| CalendarDeadline {
            submission_number: r.submission_number,
            deadline: r.deadline,
        })
        .collect();
    deadlines.sort_by_key(|d| d.submission_number);
    CalendarResponse {
        department,
        deadlines,
    }
}

#[utoipa::path(
    post,
    path = "/project/calendars",
    tag = "Academic Calendars",
    operation_id = "createCalendar",
    summary = "Create a department's academic calendar",
    description = "Admin only. Exactly one future deadline for each submission number 1-3, strictly increasing. New projects of the department copy these deadlines.",
    request_body = CreateCalendarRequest,
    responses(
        (status = 201, description = "Calendar created", body = CalendarResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Department already has a calendar (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(department = %payload.department))]
pub async fn create_calendar(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCalendarRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_role(Role::Admin)?;
    let now = chrono::Utc::now();
    let deadlines = validate_calendar(&payload.department, &payload.deadlines, now)?;
    let department = payload.department.trim().to_string();

    let txn = state.db.begin().await?;
    let existing = academic_calendar::Entity::find()
        .filter(academic_calendar::Column::Department.eq(&department))
        .count(&txn)
        .await?;
    if existing > 0 {
        return Err(AppError::Conflict(
            "This department already has a calendar; update it instead".into(),
        ));
    }

    let rows = deadlines
        .iter()
        .zip(1..)
        .map(|(deadline, number)| academic_calendar::ActiveModel {
            department: Set(department.clone()),
            submission_number: Set(number),
            deadline: Set(*deadline),
            updated_at: Set(now),
        });
    match academic_calendar::Entity::insert_many(rows)
        .exec_without_returning(&txn)
        .await
    {
        Ok(_) => {}
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Conflict(
                "This department already has a calendar; update it instead".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    let rows = academic_calendar::Entity::find()
        .filter(academic_calendar::Column::Department.eq(&department))
        .all(&txn)
        .await?;
    txn.commit().await?;

    tracing::info!("Academic calendar created");
    Ok((StatusCode::CREATED, Json(calendar_response(department, rows))))
}

#[utoipa::path(
    get,
    path = "/project/all/calendars",
    tag = "Academic Calendars",
    operation_id = "listCalendars",
    summary = "List every department's calendar",
    responses(
        (status = 200, description = "Calendars ordered by department", body = Vec<CalendarResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_calendars(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CalendarResponse>>, AppError> {
    let rows = academic_calendar::Entity::find()
        .order_by_asc(academic_calendar::Column::Department)
        .order_by_asc(academic_calendar::Column::SubmissionNumber)
        .all(&state.db)
        .await?;

    let mut by_department: BTreeMap<String, Vec<academic_calendar::Model>> = BTreeMap::new();
    for row in rows {
        by_department
            .entry(row.department.clone())
            .or_default()
            .push(row);
    }
    Ok(Json(
        by_department
            .into_iter()
            .map(|(department, rows)| calendar_response(department, rows))
            .collect(),
    ))
}

#[utoipa::path(
    put,
    path = "/project/update/calendar",
    tag = "Academic Calendars",
    operation_id = "updateCalendar",
    summary = "Replace a department's academic calendar",
    description = "Admin only. Same rules as creation. With `apply_to_projects` every project of the department gets the new deadlines too.",
    request_body = UpdateCalendarRequest,
    responses(
        (status = 200, description = "Calendar updated", body = UpdateCalendarResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Department has no calendar (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(department = %payload.department, apply = payload.apply_to_projects))]
pub async fn update_calendar(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateCalendarRequest>,
) -> Result<Json<UpdateCalendarResponse>, AppError> {
    auth_user.require_role(Role::Admin)?;
    let now = chrono::Utc::now();
    let deadlines = validate_calendar(&payload.department, &payload.deadlines, now)?;
    let department = payload.department.trim().to_string();

    let txn = state.db.begin().await?;
    let existing = academic_calendar::Entity::find()
        .filter(academic_calendar::Column::Department.eq(&department))
        .count(&txn)
        .await?;
    if existing == 0 {
        return Err(AppError::NotFound("Calendar not found".into()));
    }

    for (deadline, number) in deadlines.iter().zip(1..) {
        let row = academic_calendar::ActiveModel {
            department: Set(department.clone()),
            submission_number: Set(number),
            deadline: Set(*deadline),
            updated_at: Set(now),
        };
        academic_calendar::Entity::insert(row)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    academic_calendar::Column::Department,
                    academic_calendar::Column::SubmissionNumber,
                ])
                .update_columns([
                    academic_calendar::Column::Deadline,
                    academic_calendar::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
    }

    let updated_projects = if payload.apply_to_projects {
        let [first, second, third] = deadlines;
        project::Entity::update_many()
            .col_expr(project::Column::DeadlineFirst, Expr::value(first))
            .col_expr(project::Column::DeadlineSecond, Expr::value(second))
            .col_expr(project::Column::DeadlineThird, Expr::value(third))
            .col_expr(project::Column::UpdatedAt, Expr::value(now))
            .filter(project::Column::Department.eq(&department))
            .exec(&txn)
            .await?
            .rows_affected
    } else {
        0
    };

    let rows = academic_calendar::Entity::find()
        .filter(academic_calendar::Column::Department.eq(&department))
        .all(&txn)
        .await?;
    txn.commit().await?;

    tracing::info!(updated_projects, "Academic calendar updated");
    Ok(Json(UpdateCalendarResponse {
        calendar: calendar_response(department, rows),
        updated_projects,
    }))
}
