use std::sync::Arc;

use ::common::storage::ObjectStore;
use chrono::Duration;
use serde_json::json;
use server::config::ReconcileConfig;
use server::reconcile::{spawn_upload_reconciler, sweep_expired_uploads};

use crate::common::{TestApp, routes};

#[tokio::test]
async fn sweeps_abandoned_uploads_but_keeps_saved_files() {
    let app = TestApp::spawn().await;
    let scenario = app.assigned_project().await;
    let saved = app
        .submit(&scenario.student, scenario.project_id, 1, "proposal.pdf")
        .await;
    let saved_key = saved.body["s3_key"].as_str().unwrap().to_string();

    let abandoned = app
        .post_with_token(
            routes::UPLOAD_URL,
            &json!({
                "project_id": scenario.project_id,
                "submission_number": 2,
                "file_name": "slides.pdf",
                "file_type": "application/pdf",
            }),
            &scenario.student.token,
        )
        .await;
    let abandoned_key = abandoned.body["s3_key"].as_str().unwrap().to_string();
    app.storage.put(&abandoned_key, b"%PDF".to_vec()).await;

    let never_uploaded = app
        .post_with_token(
            routes::UPLOAD_URL,
            &json!({
                "project_id": scenario.project_id,
                "submission_number": 3,
                "file_name": "thesis.pdf",
                "file_type": "application/pdf",
            }),
            &scenario.student.token,
        )
        .await;
    assert_eq!(never_uploaded.status, 200);

    let report = sweep_expired_uploads(&app.db, app.storage.as_ref(), Duration::seconds(-1))
        .await
        .unwrap();

    assert_eq!(report.expired, 2);
    assert_eq!(report.objects_deleted, 1);
    assert_eq!(app.storage.keys().await, vec![saved_key]);

    let again = sweep_expired_uploads(&app.db, app.storage.as_ref(), Duration::seconds(-1))
        .await
        .unwrap();
    assert_eq!(again.expired, 0);
}

#[tokio::test]
async fn fresh_intents_survive_the_grace_period() {
    let app = TestApp::spawn().await;
    let scenario = app.assigned_project().await;
    app.post_with_token(
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

    let report = sweep_expired_uploads(&app.db, app.storage.as_ref(), Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(report.expired, 0);
}

#[tokio::test]
async fn reconciler_task_only_runs_when_enabled_and_stops_on_abort() {
    let app = TestApp::spawn().await;
    let storage: Arc<dyn ObjectStore> = app.storage.clone();

    let disabled = ReconcileConfig {
        enabled: false,
        ..ReconcileConfig::default()
    };
    assert!(spawn_upload_reconciler(app.db.clone(), Arc::clone(&storage), disabled).is_none());

    let enabled = ReconcileConfig {
        enabled: true,
        interval_secs: 3600,
        grace_secs: 86400,
    };
    let handle = spawn_upload_reconciler(app.db.clone(), storage, enabled)
        .expect("enabled reconciler should be spawned");
    handle.abort();
    let err = handle.await.unwrap_err();
    assert!(err.is_cancelled());
}
