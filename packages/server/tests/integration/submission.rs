use chrono::{Duration, Utc};
use serde_json::json;

use crate::common::{DEPARTMENT, TestApp, routes};

fn download_path(key: &str) -> String {
    format!("{}?s3_key={}", routes::DOWNLOAD_URL, key)
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn assigned_student_uploads_and_saves_a_slot() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        let res = app
            .submit(&scenario.student, scenario.project_id, 1, "proposal_v1.pdf")
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["submission_number"], 1);
        assert_eq!(res.body["label"], "Draft Proposal");
        assert_eq!(res.body["file_name"], "proposal_v1.pdf");
        assert_eq!(res.body["is_late"], false);
        assert_eq!(res.body["completeness"]["received"], 0);
        assert_eq!(res.body["completeness"]["required"], 1);
        assert!(res.body["final_grade"].is_null());

        let key = res.body["s3_key"].as_str().unwrap();
        assert!(key.starts_with(&format!("submissions/{}/1/", scenario.project_id)));
        assert!(key.ends_with("-proposal_v1.pdf"));
    }

    #[tokio::test]
    async fn upload_url_is_signed_for_the_matching_content_type() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        let res = app
            .post_with_token(
                routes::UPLOAD_URL,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 2,
                    "file_name": "slides.zip",
                    "file_type": "application/zip",
                }),
                &scenario.student.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let url = res.body["upload_url"].as_str().unwrap();
        assert!(url.contains("method=PUT"));
        assert!(url.contains("content-type=application/zip"));
        assert_eq!(res.body["file_name"], "slides.zip");
    }

    #[tokio::test]
    async fn rejects_bad_names_types_and_slots() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        let cases = [
            ("thesis final.pdf", "application/pdf", 1),
            ("../etc/passwd.pdf", "application/pdf", 1),
            ("thesis.exe", "application/octet-stream", 1),
            ("thesis.pdf", "application/zip", 1),
            ("thesis.pdf", "application/pdf", 4),
        ];
        for (file_name, file_type, number) in cases {
            let res = app
                .post_with_token(
                    routes::UPLOAD_URL,
                    &json!({
                        "project_id": scenario.project_id,
                        "submission_number": number,
                        "file_name": file_name,
                        "file_type": file_type,
                    }),
                    &scenario.student.token,
                )
                .await;
            assert_eq!(res.status, 400, "{file_name} {file_type} {number}: {}", res.text);
        }
    }

    #[tokio::test]
    async fn only_the_assigned_student_uploads() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let other = app.register_student("mallory", DEPARTMENT).await;

        let res = app
            .post_with_token(
                routes::UPLOAD_URL,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 1,
                    "file_name": "proposal.pdf",
                    "file_type": "application/pdf",
                }),
                &other.token,
            )
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .post_with_token(
                routes::UPLOAD_URL,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 1,
                    "file_name": "proposal.pdf",
                    "file_type": "application/pdf",
                }),
                &scenario.supervisor.token,
            )
            .await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn save_requires_an_issued_key() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let forged = format!("submissions/{}/1/forged-proposal.pdf", scenario.project_id);
        app.storage.put(&forged, b"%PDF".to_vec()).await;

        let res = app
            .post_with_token(
                routes::SAVE_SUBMISSION,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 1,
                    "s3_key": forged,
                    "file_name": "proposal.pdf",
                }),
                &scenario.student.token,
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
    }

    #[tokio::test]
    async fn save_requires_the_object_to_exist() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let url = app
            .post_with_token(
                routes::UPLOAD_URL,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 1,
                    "file_name": "proposal.pdf",
                    "file_type": "application/pdf",
                }),
                &scenario.student.token,
            )
            .await;
        let key = url.body["s3_key"].as_str().unwrap();

        let save = json!({
            "project_id": scenario.project_id,
            "submission_number": 1,
            "s3_key": key,
            "file_name": "proposal.pdf",
        });
        let res = app
            .post_with_token(routes::SAVE_SUBMISSION, &save, &scenario.student.token)
            .await;
        assert_eq!(res.status, 400, "nothing was uploaded yet");

        let mut other_slot = save.clone();
        other_slot["submission_number"] = json!(2);
        app.storage.put(key, b"%PDF".to_vec()).await;
        let res = app
            .post_with_token(routes::SAVE_SUBMISSION, &other_slot, &scenario.student.token)
            .await;
        assert_eq!(res.status, 400, "a key is bound to the slot it was issued for");

        let res = app
            .post_with_token(routes::SAVE_SUBMISSION, &save, &scenario.student.token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn reupload_replaces_an_ungraded_slot_and_removes_the_old_file() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;

        let first = app
            .submit(&scenario.student, scenario.project_id, 1, "proposal_v1.pdf")
            .await;
        let old_key = first.body["s3_key"].as_str().unwrap().to_string();
        let second = app
            .submit(&scenario.student, scenario.project_id, 1, "proposal_v2.pdf")
            .await;

        assert_eq!(second.status, 201, "{}", second.text);
        assert_eq!(second.id(), first.id(), "the slot keeps its submission");
        assert_eq!(second.body["file_name"], "proposal_v2.pdf");
        let keys = app.storage.keys().await;
        assert!(!keys.contains(&old_key));
        assert_eq!(keys.len(), 1);
    }

    #[tokio::test]
    async fn graded_slot_cannot_be_replaced() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        app.submit(&scenario.student, scenario.project_id, 1, "proposal.pdf")
            .await;
        assert_eq!(
            app.grade(&scenario.supervisor, scenario.project_id, 1, 65).await.status,
            200
        );

        let res = app
            .post_with_token(
                routes::UPLOAD_URL,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 1,
                    "file_name": "proposal_v2.pdf",
                    "file_type": "application/pdf",
                }),
                &scenario.student.token,
            )
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn grading_between_upload_and_save_keeps_the_graded_file() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        app.submit(&scenario.student, scenario.project_id, 1, "proposal_v1.pdf")
            .await;
        let url = app
            .post_with_token(
                routes::UPLOAD_URL,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 1,
                    "file_name": "proposal_v2.pdf",
                    "file_type": "application/pdf",
                }),
                &scenario.student.token,
            )
            .await;
        assert_eq!(url.status, 200, "{}", url.text);
        let key = url.body["s3_key"].as_str().unwrap().to_string();
        app.storage.put(&key, b"%PDF".to_vec()).await;

        assert_eq!(
            app.grade(&scenario.supervisor, scenario.project_id, 1, 65).await.status,
            200
        );
        let res = app
            .post_with_token(
                routes::SAVE_SUBMISSION,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 1,
                    "s3_key": key,
                    "file_name": "proposal_v2.pdf",
                }),
                &scenario.student.token,
            )
            .await;

        assert_eq!(res.status, 409, "{}", res.text);
        let detail = app.detail(&scenario.student, scenario.project_id).await;
        assert_eq!(detail.body["submissions"][0]["file_name"], "proposal_v1.pdf");
    }

    #[tokio::test]
    async fn expired_upload_urls_cannot_be_saved() {
        use sea_orm::{ActiveModelTrait, EntityTrait, Set};
        use server::entity::upload_intent;

        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let url = app
            .post_with_token(
                routes::UPLOAD_URL,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 1,
                    "file_name": "proposal.pdf",
                    "file_type": "application/pdf",
                }),
                &scenario.student.token,
            )
            .await;
        let key = url.body["s3_key"].as_str().unwrap().to_string();
        app.storage.put(&key, b"%PDF".to_vec()).await;

        let intent = upload_intent::Entity::find_by_id(key.clone())
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        let mut stale: upload_intent::ActiveModel = intent.into();
        stale.issued_at = Set(Utc::now() - Duration::days(2));
        stale.update(&app.db).await.unwrap();

        let res = app
            .post_with_token(
                routes::SAVE_SUBMISSION,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 1,
                    "s3_key": key,
                    "file_name": "proposal.pdf",
                }),
                &scenario.student.token,
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        let detail = app.detail(&scenario.student, scenario.project_id).await;
        assert_eq!(detail.body["submissions"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn completed_projects_take_no_uploads() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        app.put_with_token(
            &routes::complete(scenario.project_id),
            &json!({}),
            &app.admin.token,
        )
        .await;

        let res = app
            .post_with_token(
                routes::UPLOAD_URL,
                &json!({
                    "project_id": scenario.project_id,
                    "submission_number": 1,
                    "file_name": "proposal.pdf",
                    "file_type": "application/pdf",
                }),
                &scenario.student.token,
            )
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn submissions_after_the_deadline_are_flagged_late() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let now = Utc::now();
        let res = app
            .put_with_token(
                &routes::update_deadlines(scenario.project_id),
                &json!({
                    "first": now - Duration::days(2),
                    "second": now + Duration::days(5),
                    "third": now + Duration::days(10),
                }),
                &app.admin.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let late = app
            .submit(&scenario.student, scenario.project_id, 1, "proposal.pdf")
            .await;
        let on_time = app
            .submit(&scenario.student, scenario.project_id, 2, "slides.pdf")
            .await;

        assert_eq!(late.body["is_late"], true);
        assert_eq!(on_time.body["is_late"], false);
    }
}

mod access {
    use super::*;

    #[tokio::test]
    async fn detail_is_limited_to_participants() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        app.submit(&scenario.student, scenario.project_id, 1, "proposal.pdf")
            .await;
        let colleague = app.create_supervisor("hopper", DEPARTMENT).await;
        let classmate = app.register_student("bob", DEPARTMENT).await;

        for viewer in [&scenario.student, &scenario.supervisor, &app.admin] {
            let res = app.detail(viewer, scenario.project_id).await;
            assert_eq!(res.status, 200, "{}", res.text);
            assert_eq!(res.body["submissions"].as_array().unwrap().len(), 1);
            assert_eq!(res.body["final_grade_strategy"], "average");
        }
        for outsider in [&colleague, &classmate] {
            let res = app.detail(outsider, scenario.project_id).await;
            assert_eq!(res.status, 403);
        }
    }

    #[tokio::test]
    async fn download_url_for_visible_keys_only() {
        let app = TestApp::spawn().await;
        let scenario = app.assigned_project().await;
        let saved = app
            .submit(&scenario.student, scenario.project_id, 1, "proposal.pdf")
            .await;
        let key = saved.body["s3_key"].as_str().unwrap();

        let res = app
            .get_with_token(&download_path(key), &scenario.supervisor.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let url = res.body["download_url"].as_str().unwrap();
        assert!(url.contains("filename=proposal.pdf"));

        let res = app
            .get_with_token(
                &format!("{}&file_name=renamed.pdf", download_path(key)),
                &scenario.student.token,
            )
            .await;
        assert_eq!(res.status, 200);
        assert!(
            res.body["download_url"]
                .as_str()
                .unwrap()
                .contains("filename=renamed.pdf")
        );

        let outsider = app.register_student("bob", DEPARTMENT).await;
        let res = app.get_with_token(&download_path(key), &outsider.token).await;
        assert_eq!(res.status, 404, "hidden keys look unknown");

        let res = app
            .get_with_token(&download_path("submissions/1/1/nope.pdf"), &app.admin.token)
            .await;
        assert_eq!(res.status, 404);
    }
}
