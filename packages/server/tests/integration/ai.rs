use std::sync::atomic::Ordering;

use serde_json::json;

use crate::common::{DEPARTMENT, TestApp, routes};

mod conversations {
    use super::*;

    #[tokio::test]
    async fn chat_starts_and_continues_a_conversation() {
        let app = TestApp::spawn().await;
        let ada = app.register_student("ada", DEPARTMENT).await;

        let res = app
            .post_with_token(routes::CHAT, &json!({"prompt": "hello there"}), &ada.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "hello there");
        let messages = res.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["kind"], "text");
        assert_eq!(messages[1]["content"], "turns=1 echo=hello there");
        let id = res.id();

        let res = app
            .post_with_token(
                routes::CHAT,
                &json!({"conversation_id": id, "prompt": "and again"}),
                &ada.token,
            )
            .await;
        assert_eq!(res.id(), id);
        let messages = res.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3]["content"], "turns=3 echo=and again");
    }

    #[tokio::test]
    async fn task_breakdowns_come_back_structured() {
        let app = TestApp::spawn().await;
        let ada = app.register_student("ada", DEPARTMENT).await;

        let res = app
            .post_with_token(
                routes::CHAT,
                &json!({"prompt": "plan my literature review"}),
                &ada.token,
            )
            .await;

        let reply = &res.body["messages"][1];
        assert_eq!(reply["kind"], "task");
        assert_eq!(reply["tasks"]["tasks"][0]["description"], "Collect sources");
        assert_eq!(reply["tasks"]["tasks"][1]["difficulty"], "Hard");
        let stored: serde_json::Value =
            serde_json::from_str(reply["content"].as_str().unwrap()).unwrap();
        assert_eq!(stored, reply["tasks"]);
    }

    #[tokio::test]
    async fn planner_failure_stores_nothing() {
        let app = TestApp::spawn().await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        app.planner.failing.store(true, Ordering::SeqCst);

        let res = app
            .post_with_token(routes::CHAT, &json!({"prompt": "hello"}), &ada.token)
            .await;
        assert_eq!(res.status, 502);
        assert_eq!(res.body["code"], "UPSTREAM_ERROR");

        let res = app.get_with_token(routes::CONVERSATIONS, &ada.token).await;
        assert_eq!(res.body.as_array().unwrap().len(), 0);

        app.planner.failing.store(false, Ordering::SeqCst);
        let res = app
            .post_with_token(routes::CHAT, &json!({"prompt": "hello"}), &ada.token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn conversations_are_private() {
        let app = TestApp::spawn().await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let bob = app.register_student("bob", DEPARTMENT).await;
        let res = app
            .post_with_token(routes::CHAT, &json!({"prompt": "hello"}), &ada.token)
            .await;
        let id = res.id();

        let res = app.get_with_token(&routes::conversation(id), &ada.token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["messages"].as_array().unwrap().len(), 2);

        let res = app.get_with_token(&routes::conversation(id), &bob.token).await;
        assert_eq!(res.status, 404);

        let res = app
            .post_with_token(
                routes::CHAT,
                &json!({"conversation_id": id, "prompt": "hijack"}),
                &bob.token,
            )
            .await;
        assert_eq!(res.status, 404);

        let res = app.get_with_token(routes::CONVERSATIONS, &bob.token).await;
        assert_eq!(res.body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn students_only_and_prompts_are_validated() {
        let app = TestApp::spawn().await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let supervisor = app.create_supervisor("turing", DEPARTMENT).await;

        let res = app
            .post_with_token(routes::CHAT, &json!({"prompt": "hello"}), &supervisor.token)
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .post_with_token(routes::CHAT, &json!({"prompt": "  "}), &ada.token)
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn most_recent_conversation_first() {
        let app = TestApp::spawn().await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let older = app
            .post_with_token(routes::CHAT, &json!({"prompt": "first topic"}), &ada.token)
            .await
            .id();
        let newer = app
            .post_with_token(routes::CHAT, &json!({"prompt": "second topic"}), &ada.token)
            .await
            .id();
        app.post_with_token(
            routes::CHAT,
            &json!({"conversation_id": older, "prompt": "back to this"}),
            &ada.token,
        )
        .await;

        let res = app.get_with_token(routes::CONVERSATIONS, &ada.token).await;

        let ids: Vec<i64> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![older as i64, newer as i64]);
    }
}

mod tasks {
    use super::*;

    fn plan() -> serde_json::Value {
        json!({
            "title": "Literature review",
            "goal": "plan my literature review",
            "tasks": [
                {"description": "Collect sources", "difficulty": "Easy", "tips": "Surveys first"},
                {"description": "Write the chapter", "difficulty": "Hard", "tips": ""},
            ],
            "tags": ["writing"],
        })
    }

    #[tokio::test]
    async fn save_list_and_tick_off_steps() {
        let app = TestApp::spawn().await;
        let ada = app.register_student("ada", DEPARTMENT).await;

        let res = app.post_with_token(routes::SAVE_TASK, &plan(), &ada.token).await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "active");
        assert_eq!(res.body["progress"]["total"], 2);
        assert_eq!(res.body["progress"]["percentage"], 0);
        assert_eq!(res.body["tags"], json!(["writing"]));
        let task_id = res.id();
        let items = res.body["items"].as_array().unwrap();
        assert_eq!(items[0]["position"], 0);
        assert_eq!(items[1]["description"], "Write the chapter");
        let first = items[0]["id"].as_i64().unwrap();
        let second = items[1]["id"].as_i64().unwrap();

        let res = app
            .patch_with_token(
                &routes::task_progress(task_id),
                &json!({"item_id": first, "completed": true}),
                &ada.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["progress"]["percentage"], 50);
        assert_eq!(res.body["status"], "active");

        let res = app
            .patch_with_token(
                &routes::task_progress(task_id),
                &json!({"item_id": second, "completed": true}),
                &ada.token,
            )
            .await;
        assert_eq!(res.body["status"], "completed");
        assert_eq!(res.body["progress"]["percentage"], 100);

        let res = app
            .get_with_token(&format!("{}?status=completed", routes::TASKS), &ada.token)
            .await;
        assert_eq!(res.body.as_array().unwrap().len(), 1);

        let res = app
            .patch_with_token(
                &routes::task_progress(task_id),
                &json!({"item_id": second, "completed": false}),
                &ada.token,
            )
            .await;
        assert_eq!(res.body["status"], "active");

        let res = app
            .get_with_token(&format!("{}?status=completed", routes::TASKS), &ada.token)
            .await;
        assert_eq!(res.body.as_array().unwrap().len(), 0);
        let res = app.get_with_token(routes::TASKS, &ada.token).await;
        assert_eq!(res.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn plans_belong_to_their_student() {
        let app = TestApp::spawn().await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let bob = app.register_student("bob", DEPARTMENT).await;
        let res = app.post_with_token(routes::SAVE_TASK, &plan(), &ada.token).await;
        let task_id = res.id();
        let item = res.body["items"][0]["id"].clone();

        let res = app
            .patch_with_token(
                &routes::task_progress(task_id),
                &json!({"item_id": item, "completed": true}),
                &bob.token,
            )
            .await;
        assert_eq!(res.status, 404);

        let res = app
            .patch_with_token(
                &routes::task_progress(task_id),
                &json!({"item_id": 999_999, "completed": true}),
                &ada.token,
            )
            .await;
        assert_eq!(res.status, 404);

        let res = app.get_with_token(routes::TASKS, &bob.token).await;
        assert_eq!(res.body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn a_plan_needs_steps() {
        let app = TestApp::spawn().await;
        let ada = app.register_student("ada", DEPARTMENT).await;
        let mut empty = plan();
        empty["tasks"] = json!([]);

        let res = app.post_with_token(routes::SAVE_TASK, &empty, &ada.token).await;

        assert_eq!(res.status, 400);
    }
}
