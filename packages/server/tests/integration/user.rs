use serde_json::json;

use crate::common::{DEPARTMENT, PASSWORD, TestApp, routes};

mod administration {
    use super::*;

    #[tokio::test]
    async fn admin_creates_supervisors_with_a_title() {
        let app = TestApp::spawn().await;

        let supervisor = app.create_supervisor("turing", DEPARTMENT).await;
        let res = app.get_with_token(routes::ME, &supervisor.token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["role"], "supervisor");
        assert_eq!(res.body["supervisor_title"], "Dr");
    }

    #[tokio::test]
    async fn students_cannot_create_users() {
        let app = TestApp::spawn().await;
        let student = app.register_student("ada", DEPARTMENT).await;

        let res = app
            .post_with_token(
                routes::CREATE_USER,
                &json!({
                    "name": "Mallory",
                    "email": "mallory@uni.test",
                    "password": PASSWORD,
                    "role": "admin",
                    "department": DEPARTMENT,
                }),
                &student.token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn a_student_account_needs_a_student_id() {
        let app = TestApp::spawn().await;

        let res = app
            .post_with_token(
                routes::CREATE_USER,
                &json!({
                    "name": "Bob",
                    "email": "bob@uni.test",
                    "password": PASSWORD,
                    "role": "student",
                    "department": DEPARTMENT,
                }),
                &app.admin.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn user_list_is_paged_and_searchable() {
        let app = TestApp::spawn().await;
        app.register_student("alice", DEPARTMENT).await;
        app.register_student("albert", DEPARTMENT).await;
        app.register_student("bob", DEPARTMENT).await;

        let res = app
            .get_with_token(
                &format!("{}?page=1&limit=2&role=student", routes::ALL_USERS_PAGED),
                &app.admin.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);

        let res = app
            .get_with_token(
                &format!("{}?search=AL", routes::ALL_USERS_PAGED),
                &app.admin.token,
            )
            .await;
        assert_eq!(res.body["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn update_changes_profile_fields() {
        let app = TestApp::spawn().await;
        let student = app.register_student("ada", DEPARTMENT).await;

        let res = app
            .put_with_token(
                &routes::user(student.id),
                &json!({"name": "Ada King", "department": "Mathematics"}),
                &app.admin.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Ada King");
        assert_eq!(res.body["department"], "Mathematics");
        assert_eq!(res.body["role"], "student");
    }

    #[tokio::test]
    async fn stats_count_roles_and_unassigned_students() {
        let app = TestApp::spawn().await;
        app.create_calendar(DEPARTMENT).await;
        let assigned = app.assigned_project().await;
        app.register_student("idle", DEPARTMENT).await;

        let res = app.get_with_token(routes::USER_STATS, &app.admin.token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["users"]["students"], 2);
        assert_eq!(res.body["users"]["supervisors"], 1);
        assert_eq!(res.body["users"]["admins"], 1);
        assert_eq!(res.body["unassigned_students"], 1);
        assert_eq!(res.body["projects"]["assigned"], 1);

        let res = app
            .get_with_token(
                &format!("{}?unassigned=true", routes::STUDENTS),
                &assigned.supervisor.token,
            )
            .await;
        let students = res.body.as_array().unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0]["name"], "idle");
    }

    #[tokio::test]
    async fn everyone_can_list_supervisors() {
        let app = TestApp::spawn().await;
        app.create_supervisor("turing", DEPARTMENT).await;
        let student = app.register_student("ada", DEPARTMENT).await;

        let res = app.get_with_token(routes::SUPERVISORS, &student.token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body.as_array().unwrap().len(), 1);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn unreferenced_user_is_deleted_with_their_data() {
        let app = TestApp::spawn().await;
        let student = app.register_student("ada", DEPARTMENT).await;
        let res = app
            .post_with_token(routes::CHAT, &json!({"prompt": "hello"}), &student.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app
            .delete_with_token(&routes::user(student.id), &app.admin.token)
            .await;
        assert_eq!(res.status, 204, "{}", res.text);

        let res = app.get_with_token(routes::ME, &student.token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn user_referenced_by_a_project_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        for id in [scenario.student.id, scenario.supervisor.id] {
            let res = app.delete_with_token(&routes::user(id), &app.admin.token).await;
            assert_eq!(res.status, 409);
            assert_eq!(res.body["code"], "CONFLICT");
        }
    }

    #[tokio::test]
    async fn admin_cannot_delete_themselves() {
        let app = TestApp::spawn().await;

        let res = app
            .delete_with_token(&routes::user(app.admin.id), &app.admin.token)
            .await;

        assert_eq!(res.status, 409);
    }
}
