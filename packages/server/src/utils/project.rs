use std::collections::{HashMap, HashSet};

use common::Role;
use sea_orm::sea_query::LockType;
use sea_orm::*;

use crate::entity::{project, project_application, user};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::project::{Deadlines, ProjectResponse};
use crate::models::shared::UserSummary;

/// Look up a user by ID, returning 404 if not found.
pub async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Look up a project by ID, returning 404 if not found.
pub async fn find_project<C: ConnectionTrait>(db: &C, id: i32) -> Result<project::Model, AppError> {
    project::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

pub async fn find_project_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<project::Model, AppError> {
    project::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

/// Verify the caller may see the project.
///
/// Admins see everything; supervisors see their department and every project
/// they mark; students see available projects of their department, projects
/// they applied to, and the project they are assigned to. Inaccessible
/// projects answer 404.
pub async fn check_project_visible<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    project: &project::Model,
) -> Result<(), AppError> {
    let visible = match auth_user.role {
        Role::Admin => true,
        Role::Supervisor => {
            project.roster().contains(auth_user.user_id)
                || find_user(db, auth_user.user_id).await?.department == project.department
        }
        Role::Student => {
            if project.assigned_student_id == Some(auth_user.user_id) {
                true
            } else if project_application::Entity::find_by_id((project.id, auth_user.user_id))
                .one(db)
                .await?
                .is_some()
            {
                true
            } else {
                project.status == common::ProjectStatus::Available
                    && find_user(db, auth_user.user_id).await?.department == project.department
            }
        }
    };
    if visible {
        Ok(())
    } else {
        Err(AppError::NotFound("Project not found".into()))
    }
}

/// Caller must be the first supervisor of the project or an admin.
pub fn require_owner_or_admin(
    auth_user: &AuthUser,
    project: &project::Model,
) -> Result<(), AppError> {
    match auth_user.role {
        Role::Admin => Ok(()),
        Role::Supervisor if project.supervisor_first_id == auth_user.user_id => Ok(()),
        Role::Supervisor | Role::Student => Err(AppError::PermissionDenied),
    }
}

/// Load the given users keyed by ID. Unknown IDs are skipped.
pub async fn load_users<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, user::Model>, AppError> {
    let ids: HashSet<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

/// Build full project responses with people resolved, as seen by `viewer`.
pub async fn project_responses<C: ConnectionTrait>(
    db: &C,
    viewer: &AuthUser,
    projects: Vec<project::Model>,
) -> Result<Vec<ProjectResponse>, AppError> {
    if projects.is_empty() {
        return Ok(Vec::new());
    }
    let project_ids: Vec<i32> = projects.iter().map(|p| p.id).collect();

    let mut applications = project_application::Entity::find()
        .filter(project_application::Column::ProjectId.is_in(project_ids))
        .order_by_asc(project_application::Column::AppliedAt)
        .order_by_asc(project_application::Column::StudentId);
    if matches!(viewer.role, Role::Student) {
        applications =
            applications.filter(project_application::Column::StudentId.eq(viewer.user_id));
    }
    let applications = applications.all(db).await?;

    let people = projects
        .iter()
        .flat_map(|p| {
            p.roster()
                .members()
                .into_iter()
                .chain(p.assigned_student_id)
        })
        .chain(applications.iter().map(|a| a.student_id));
    let users = load_users(db, people).await?;
    let summary = |id: Option<i32>| id.and_then(|id| users.get(&id)).map(UserSummary::from);

    let mut applied: HashMap<i32, Vec<UserSummary>> = HashMap::new();
    for a in &applications {
        if let Some(u) = users.get(&a.student_id) {
            applied
                .entry(a.project_id)
                .or_default()
                .push(UserSummary::from(u));
        }
    }

    Ok(projects
        .into_iter()
        .map(|p| ProjectResponse {
            supervisor_first: summary(Some(p.supervisor_first_id)),
            supervisor_second: summary(p.supervisor_second_id),
            third_marker: summary(p.third_marker_id),
            assigned_student: summary(p.assigned_student_id),
            applied_students: applied.remove(&p.id).unwrap_or_default(),
            deadlines: Deadlines {
                first: p.deadline_first,
                second: p.deadline_second,
                third: p.deadline_third,
            },
            relation: p.roster().relation_of(viewer.user_id),
            id: p.id,
            title: p.title,
            description: p.description,
            project_type: p.project_type,
            status: p.status,
            department: p.department,
            created_at: p.created_at,
            assigned_at: p.assigned_at,
            updated_at: p.updated_at,
        })
        .collect())
}
