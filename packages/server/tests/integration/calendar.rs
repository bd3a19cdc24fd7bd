use chrono::{Duration, Utc};
use serde_json::json;

use crate::common::{DEPARTMENT, TestApp, routes};

#[tokio::test]
async fn new_projects_inherit_the_department_calendar() {
    let app = TestApp::spawn().await;
    let res = app.create_calendar(DEPARTMENT).await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["deadlines"].as_array().unwrap().len(), 3);

    let supervisor = app.create_supervisor("turing", DEPARTMENT).await;
    let id = app.create_project(&supervisor, "Graph databases").await;
    let res = app.get_with_token(&routes::project(id), &supervisor.token).await;

    assert!(res.body["deadlines"]["first"].is_string());
    assert!(res.body["deadlines"]["second"].is_string());
    assert!(res.body["deadlines"]["third"].is_string());
}

#[tokio::test]
async fn projects_without_a_calendar_have_no_deadlines() {
    let app = TestApp::spawn().await;
    let supervisor = app.create_supervisor("turing", DEPARTMENT).await;

    let id = app.create_project(&supervisor, "Graph databases").await;
    let res = app.get_with_token(&routes::project(id), &supervisor.token).await;

    assert!(res.body["deadlines"]["first"].is_null());
}

#[tokio::test]
async fn one_calendar_per_department() {
    let app = TestApp::spawn().await;
    assert_eq!(app.create_calendar(DEPARTMENT).await.status, 201);

    let res = app.create_calendar(DEPARTMENT).await;

    assert_eq!(res.status, 409);
}

#[tokio::test]
async fn calendar_deadlines_must_be_future_complete_and_ordered() {
    let app = TestApp::spawn().await;
    let now = Utc::now();

    let cases = [
        json!([
            {"submission_number": 1, "deadline": now - Duration::days(1)},
            {"submission_number": 2, "deadline": now + Duration::days(2)},
            {"submission_number": 3, "deadline": now + Duration::days(3)},
        ]),
        json!([
            {"submission_number": 1, "deadline": now + Duration::days(1)},
            {"submission_number": 2, "deadline": now + Duration::days(2)},
        ]),
        json!([
            {"submission_number": 1, "deadline": now + Duration::days(3)},
            {"submission_number": 2, "deadline": now + Duration::days(2)},
            {"submission_number": 3, "deadline": now + Duration::days(4)},
        ]),
    ];
    for deadlines in cases {
        let res = app
            .post_with_token(
                routes::CALENDARS,
                &json!({"department": DEPARTMENT, "deadlines": deadlines}),
                &app.admin.token,
            )
            .await;
        assert_eq!(res.status, 400, "{}", res.text);
    }
}

#[tokio::test]
async fn update_can_propagate_to_existing_projects() {
    let app = TestApp::spawn().await;
    app.create_calendar(DEPARTMENT).await;
    let supervisor = app.create_supervisor("turing", DEPARTMENT).await;
    let id = app.create_project(&supervisor, "Graph databases").await;
    let later = Utc::now() + Duration::days(100);

    let res = app
        .put_with_token(
            routes::UPDATE_CALENDAR,
            &json!({
                "department": DEPARTMENT,
                "deadlines": [
                    {"submission_number": 1, "deadline": later},
                    {"submission_number": 2, "deadline": later + Duration::days(1)},
                    {"submission_number": 3, "deadline": later + Duration::days(2)},
                ],
                "apply_to_projects": true,
            }),
            &app.admin.token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["updated_projects"], 1);

    let project = app.get_with_token(&routes::project(id), &supervisor.token).await;
    assert_eq!(
        project.body["deadlines"]["first"],
        res.body["calendar"]["deadlines"][0]["deadline"]
    );

    let res = app.get_with_token(routes::ALL_CALENDARS, &supervisor.token).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn updating_an_unknown_department_is_not_found() {
    let app = TestApp::spawn().await;
    let now = Utc::now();

    let res = app
        .put_with_token(
            routes::UPDATE_CALENDAR,
            &json!({
                "department": "Nowhere",
                "deadlines": [
                    {"submission_number": 1, "deadline": now + Duration::days(1)},
                    {"submission_number": 2, "deadline": now + Duration::days(2)},
                    {"submission_number": 3, "deadline": now + Duration::days(3)},
                ],
            }),
            &app.admin.token,
        )
        .await;

    assert_eq!(res.status, 404);
}
