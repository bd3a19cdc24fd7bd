use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(project_routes())
        .merge(calendar_routes())
        .merge(submission_routes())
        .merge(comment_routes())
        .merge(ai_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::user::create_user))
        .routes(routes!(handlers::user::list_users))
        .routes(routes!(handlers::user::all_users))
        .routes(routes!(handlers::user::stats))
        .routes(routes!(handlers::user::list_students))
        .routes(routes!(handlers::user::list_supervisors))
        .routes(routes!(handlers::user::update_user, handlers::user::delete_user))
}

fn project_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::project::create_project))
        .routes(routes!(handlers::project::list_projects))
        .routes(routes!(handlers::project::list_supervisor_projects))
        .routes(routes!(handlers::project::current_student_project))
        .routes(routes!(handlers::project::get_project))
        .routes(routes!(handlers::project::apply))
        .routes(routes!(handlers::project::assign_student))
        .routes(routes!(handlers::project::assign_second_marker))
        .routes(routes!(handlers::project::assign_third_marker))
        .routes(routes!(handlers::project::update_deadlines))
        .routes(routes!(handlers::project::complete_project))
}

fn calendar_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::calendar::create_calendar))
        .routes(routes!(handlers::calendar::list_calendars))
        .routes(routes!(handlers::calendar::update_calendar))
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::submission::generate_upload_url))
        .routes(routes!(handlers::submission::save_submission))
        .routes(routes!(handlers::submission::submission_detail))
        .routes(routes!(handlers::submission::generate_download_url))
        .routes(routes!(handlers::submission::grade_submission))
        .routes(routes!(handlers::submission::moderate_submission))
        .routes(routes!(handlers::submission::supervisor_dashboard))
}

fn comment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::comment::add_comment))
        .routes(routes!(handlers::comment::show_comments))
        .routes(routes!(handlers::comment::add_marking_comment))
        .routes(routes!(handlers::comment::marking_comments))
}

fn ai_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::ai::chat))
        .routes(routes!(handlers::ai::list_conversations))
        .routes(routes!(handlers::ai::get_conversation))
        .routes(routes!(handlers::ai::list_tasks))
        .routes(routes!(handlers::ai::save_task))
        .routes(routes!(handlers::ai::update_progress))
}
