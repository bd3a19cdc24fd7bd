use chrono::{Duration, Utc};
use serde_json::json;

use crate::common::{DEPARTMENT, TestApp, routes};

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn supervisor_creates_an_available_project_in_their_department() {
        let app = TestApp::spawn().await;
        let supervisor = app.create_supervisor("turing", DEPARTMENT).await;

        let id = app.create_project(&supervisor, "Graph databases").await;
        let res = app.get_with_token(&routes::project(id), &supervisor.token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "available");
        assert_eq!(res.body["department"], DEPARTMENT);
        assert_eq!(res.body["supervisor_first"]["id"], supervisor.id);
        assert_eq!(res.body["relation"], "first_supervisor");
        assert!(res.body["assigned_student"].is_null());
    }

    #[tokio::test]
    async fn students_cannot_create_projects() {
        let app = TestApp::spawn().await;
        let student = app.register_student("ada", DEPARTMENT).await;

        let res = app
            .post_with_token(
                routes::CREATE_PROJECT,
                &json!({
                    "title": "Mine",
                    "description": "A project of my own",
                    "project_type": "applied",
                }),
                &student.token,
            )
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn apply_then_assign_moves_the_project_to_assigned() {
        let app = TestApp::spawn().await;
        let supervisor = app.create_supervisor("turing", DEPARTMENT).await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let bob = app.register_student("bob", DEPARTMENT).await;
        let id = app.create_project(&supervisor, "Graph databases").await;

        assert_eq!(app.apply(&ada, id).await.status, 200);
        assert_eq!(app.apply(&bob, id).await.status, 200);

        let res = app.get_with_token(&routes::project(id), &supervisor.token).await;
        assert_eq!(res.body["applied_students"].as_array().unwrap().len(), 2);

        let res = app.get_with_token(&routes::project(id), &ada.token).await;
        let seen = res.body["applied_students"].as_array().unwrap();
        assert_eq!(seen.len(), 1, "a student only sees their own application");
        assert_eq!(seen[0]["id"], ada.id);

        let res = app.assign(&supervisor, id, ada.id).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "assigned");
        assert_eq!(res.body["assigned_student"]["id"], ada.id);
        assert!(res.body["assigned_at"].is_string());

        let res = app.get_with_token(routes::CURRENT_PROJECT, &ada.token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], id);

        let res = app.assign(&supervisor, id, bob.id).await;
        assert_eq!(res.status, 409, "an assigned project cannot be reassigned");

        let carol = app.register_student("carol", DEPARTMENT).await;
        let res = app.apply(&carol, id).await;
        assert_eq!(res.status, 409, "assigned projects take no applications");
    }

    #[tokio::test]
    async fn applying_twice_conflicts() {
        let app = TestApp::spawn().await;
        let supervisor = app.create_supervisor("turing", DEPARTMENT).await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let id = app.create_project(&supervisor, "Graph databases").await;

        assert_eq!(app.apply(&ada, id).await.status, 200);
        let res = app.apply(&ada, id).await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn concurrent_applications_record_one() {
        let app = TestApp::spawn().await;
        let supervisor = app.create_supervisor("turing", DEPARTMENT).await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let id = app.create_project(&supervisor, "Graph databases").await;

        let (a, b, c, d, e) = tokio::join!(
            app.apply(&ada, id),
            app.apply(&ada, id),
            app.apply(&ada, id),
            app.apply(&ada, id),
            app.apply(&ada, id),
        );
        let statuses = [a.status, b.status, c.status, d.status, e.status];

        assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1, "{statuses:?}");
        assert_eq!(statuses.iter().filter(|s| **s == 409).count(), 4, "{statuses:?}");
        let res = app.get_with_token(&routes::project(id), &supervisor.token).await;
        let applied = res.body["applied_students"].as_array().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0]["id"], ada.id);
    }

    #[tokio::test]
    async fn concurrent_assignments_pick_one_student() {
        let app = TestApp::spawn().await;
        let supervisor = app.create_supervisor("turing", DEPARTMENT).await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let bob = app.register_student("bob", DEPARTMENT).await;
        let id = app.create_project(&supervisor, "Graph databases").await;
        assert_eq!(app.apply(&ada, id).await.status, 200);
        assert_eq!(app.apply(&bob, id).await.status, 200);

        let (for_ada, for_bob) = tokio::join!(
            app.assign(&supervisor, id, ada.id),
            app.assign(&supervisor, id, bob.id),
        );

        let (winner, loser) = match (for_ada.status, for_bob.status) {
            (200, 409) => (&ada, &bob),
            (409, 200) => (&bob, &ada),
            other => panic!("expected exactly one assignment, got {other:?}"),
        };
        let res = app.get_with_token(&routes::project(id), &supervisor.token).await;
        assert_eq!(res.body["status"], "assigned");
        assert_eq!(res.body["assigned_student"]["id"], winner.id);

        let res = app.get_with_token(routes::CURRENT_PROJECT, &winner.token).await;
        assert_eq!(res.status, 200);
        let res = app.get_with_token(routes::CURRENT_PROJECT, &loser.token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn students_only_apply_within_their_department() {
        let app = TestApp::spawn().await;
        let supervisor = app.create_supervisor("turing", DEPARTMENT).await;
        let outsider = app.register_student("ada", "Mathematics").await;
        let id = app.create_project(&supervisor, "Graph databases").await;

        let res = app.apply(&outsider, id).await;
        assert_eq!(res.status, 403);

        let res = app.get_with_token(&routes::project(id), &outsider.token).await;
        assert_eq!(res.status, 404, "other departments' projects are hidden");
    }

    #[tokio::test]
    async fn a_student_holds_at_most_one_project() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let other = app.create_project(&scenario.supervisor, "Second topic").await;

        let res = app.apply(&scenario.student, other).await;
        assert_eq!(res.status, 409);

        let res = app.assign(&app.admin, other, scenario.student.id).await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn supervisors_assign_only_applicants_but_admins_assign_anyone() {
        let app = TestApp::spawn().await;
        let supervisor = app.create_supervisor("turing", DEPARTMENT).await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let id = app.create_project(&supervisor, "Graph databases").await;

        let res = app.assign(&supervisor, id, ada.id).await;
        assert_eq!(res.status, 409);

        let res = app.assign(&app.admin, id, ada.id).await;
        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn only_the_owner_assigns() {
        let app = TestApp::spawn().await;
        let owner = app.create_supervisor("turing", DEPARTMENT).await;
        let other = app.create_supervisor("hopper", DEPARTMENT).await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let id = app.create_project(&owner, "Graph databases").await;
        app.apply(&ada, id).await;

        let res = app.assign(&other, id, ada.id).await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn admin_completes_an_assigned_project_once() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        let res = app
            .put_with_token(&routes::complete(scenario.project_id), &json!({}), &app.admin.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "completed");

        let res = app
            .put_with_token(&routes::complete(scenario.project_id), &json!({}), &app.admin.token)
            .await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn listing_is_scoped_by_role() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let open = app.create_project(&scenario.supervisor, "Open topic").await;
        let outsider = app.create_supervisor("hopper", "Mathematics").await;
        app.create_project(&outsider, "Algebra").await;

        let res = app.get_with_token(routes::PROJECTS, &app.admin.token).await;
        assert_eq!(res.body.as_array().unwrap().len(), 3);

        let res = app.get_with_token(routes::SUPERVISOR_PROJECTS, &scenario.supervisor.token).await;
        assert_eq!(res.body.as_array().unwrap().len(), 2);

        let newcomer = app.register_student("newcomer", DEPARTMENT).await;
        let res = app.get_with_token(routes::PROJECTS, &newcomer.token).await;
        let ids: Vec<i64> = res.body.as_array().unwrap().iter().map(|p| p["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![open as i64]);
    }
}

mod markers {
    use super::*;

    #[tokio::test]
    async fn roster_grows_second_then_third() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let second = app.create_supervisor("hopper", DEPARTMENT).await;
        let third = app.create_supervisor("lovelace", "Mathematics").await;

        let res = app.add_marker(scenario.project_id, &third, true).await;
        assert_eq!(res.status, 409, "third marker needs a second marker");

        let res = app.add_marker(scenario.project_id, &second, false).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["supervisor_second"]["id"], second.id);

        let res = app.add_marker(scenario.project_id, &third, true).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["third_marker"]["id"], third.id);

        let res = app.get_with_token(&routes::project(scenario.project_id), &third.token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["relation"], "third_marker");
    }

    #[tokio::test]
    async fn roster_members_are_distinct_supervisors() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        let res = app
            .add_marker(scenario.project_id, &scenario.supervisor, false)
            .await;
        assert_eq!(res.status, 409);

        let res = app.add_marker(scenario.project_id, &scenario.student, false).await;
        assert_eq!(res.status, 400);

        let second = app.create_supervisor("hopper", DEPARTMENT).await;
        let other = app.create_supervisor("knuth", DEPARTMENT).await;
        assert_eq!(app.add_marker(scenario.project_id, &second, false).await.status, 200);
        let res = app.add_marker(scenario.project_id, &other, false).await;
        assert_eq!(res.status, 409, "a filled slot is not overwritten");
    }
}

mod deadlines {
    use super::*;

    #[tokio::test]
    async fn admin_sets_strictly_increasing_deadlines() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let now = Utc::now();

        let res = app
            .put_with_token(
                &routes::update_deadlines(scenario.project_id),
                &json!({
                    "first": now + Duration::days(3),
                    "second": now + Duration::days(2),
                    "third": now + Duration::days(9),
                }),
                &app.admin.token,
            )
            .await;
        assert_eq!(res.status, 400);

        let res = app
            .put_with_token(
                &routes::update_deadlines(scenario.project_id),
                &json!({
                    "first": now + Duration::days(1),
                    "second": now + Duration::days(2),
                    "third": now + Duration::days(3),
                }),
                &app.admin.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["deadlines"]["third"].is_string());
    }

    #[tokio::test]
    async fn supervisors_cannot_change_deadlines() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let now = Utc::now();

        let res = app
            .put_with_token(
                &routes::update_deadlines(scenario.project_id),
                &json!({
                    "first": now + Duration::days(1),
                    "second": now + Duration::days(2),
                    "third": now + Duration::days(3),
                }),
                &scenario.supervisor.token,
            )
            .await;

        assert_eq!(res.status, 403);
    }
}
