use serde_json::json;

use crate::common::{DEPARTMENT, TestApp, routes};

mod supervision {
    use super::*;

    #[tokio::test]
    async fn student_and_supervisor_share_the_thread_in_order() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        let res = app
            .post_with_token(
                routes::ADD_COMMENT,
                &json!({"project_id": scenario.project_id, "message": "Draft is up"}),
                &scenario.student.token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["thread"], "supervision");
        assert_eq!(res.body["sender_id"], scenario.student.id);
        assert_eq!(res.body["sender_role"], "student");
        assert_eq!(res.body["is_edited"], false);

        app.post_with_token(
            routes::ADD_COMMENT,
            &json!({"project_id": scenario.project_id, "message": "Thanks, reading it now"}),
            &scenario.supervisor.token,
        )
        .await;

        let res = app
            .get_with_token(&routes::comments(scenario.project_id), &scenario.student.token)
            .await;
        assert_eq!(res.status, 200);
        let messages: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["message"].as_str().unwrap())
            .collect();
        assert_eq!(messages, vec!["Draft is up", "Thanks, reading it now"]);
    }

    #[tokio::test]
    async fn markup_is_stored_escaped() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        let res = app
            .post_with_token(
                routes::ADD_COMMENT,
                &json!({"project_id": scenario.project_id, "message": "<b>\"bold\" & 'brave'</b>"}),
                &scenario.student.token,
            )
            .await;

        assert_eq!(
            res.body["message"],
            "&lt;b&gt;&quot;bold&quot; &amp; &#x27;brave&#x27;&lt;/b&gt;"
        );
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_messages() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        for message in [String::new(), "   ".to_string(), "x".repeat(1001)] {
            let res = app
                .post_with_token(
                    routes::ADD_COMMENT,
                    &json!({"project_id": scenario.project_id, "message": message}),
                    &scenario.student.token,
                )
                .await;
            assert_eq!(res.status, 400);
        }
    }

    #[tokio::test]
    async fn other_markers_and_admins_stay_out() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let second = app.create_supervisor("second", DEPARTMENT).await;
        app.add_marker(scenario.project_id, &second, false).await;
        let classmate = app.register_student("bob", DEPARTMENT).await;

        for outsider in [&second, &app.admin, &classmate] {
            let res = app
                .post_with_token(
                    routes::ADD_COMMENT,
                    &json!({"project_id": scenario.project_id, "message": "hello"}),
                    &outsider.token,
                )
                .await;
            assert_eq!(res.status, 403);

            let res = app
                .get_with_token(&routes::comments(scenario.project_id), &outsider.token)
                .await;
            assert_eq!(res.status, 403);
        }
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        let res = app
            .get_with_token(&routes::comments(scenario.project_id + 100), &scenario.student.token)
            .await;

        assert_eq!(res.status, 404);
    }
}

mod marking {
    use super::*;

    #[tokio::test]
    async fn roster_and_admins_discuss_without_the_student() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let second = app.create_supervisor("second", DEPARTMENT).await;
        app.add_marker(scenario.project_id, &second, false).await;

        for (sender, message) in [
            (&second, "I'd give it a B"),
            (&app.admin, "Please agree a mark"),
            (&scenario.supervisor, "B works for me"),
        ] {
            let res = app
                .post_with_token(
                    routes::ADD_MARKING_COMMENT,
                    &json!({"project_id": scenario.project_id, "message": message}),
                    &sender.token,
                )
                .await;
            assert_eq!(res.status, 201, "{}", res.text);
            assert_eq!(res.body["thread"], "marking");
        }

        let res = app
            .get_with_token(&routes::marking_comments(scenario.project_id), &app.admin.token)
            .await;
        let thread = res.body.as_array().unwrap();
        assert_eq!(thread.len(), 3);
        assert_eq!(thread[1]["sender_role"], "admin");
        assert_eq!(thread[2]["message"], "B works for me");

        let res = app
            .get_with_token(&routes::comments(scenario.project_id), &scenario.supervisor.token)
            .await;
        assert_eq!(res.body.as_array().unwrap().len(), 0, "threads are separate");

        let res = app
            .get_with_token(
                &routes::marking_comments(scenario.project_id),
                &scenario.student.token,
            )
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .post_with_token(
                routes::ADD_MARKING_COMMENT,
                &json!({"project_id": scenario.project_id, "message": "What's my mark?"}),
                &scenario.student.token,
            )
            .await;
        assert_eq!(res.status, 403);
    }
}
