mod common;

use serde_json::json;
use taskdeck_core::api::TasksApi;
use taskdeck_core::models::{CreateTask, TaskQuery, TaskStatus, UpdateTask};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use common::{task_json, Harness};

#[tokio::test]
async fn test_list_sends_filters() {
    let h = Harness::with_tokens("tok1", "ref1").await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "5"))
        .and(query_param("status", "COMPLETED"))
        .and(query_param("search", "milk"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [task_json("t1", "Buy milk", "COMPLETED")],
            "pagination": {"page": 2, "limit": 5, "total": 6, "totalPages": 2}
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let page = TasksApi::new(h.api.clone())
        .list(&TaskQuery {
            page: Some(2),
            limit: Some(5),
            status: Some(TaskStatus::Completed),
            search: Some("milk".into()),
        })
        .await
        .unwrap();

    assert_eq!(page.tasks.len(), 1);
    assert!(page.tasks[0].is_completed());
    assert!(!page.pagination.has_next());
}

#[tokio::test]
async fn test_create_update_toggle_delete() {
    let h = Harness::with_tokens("tok1", "ref1").await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_json(json!({"title": "Write report", "status": "PENDING"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(task_json("t9", "Write report", "PENDING")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/tasks/t9"))
        .and(body_json(json!({"description": "quarterly"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json("t9", "Write report", "PENDING")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/tasks/t9/toggle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json("t9", "Write report", "COMPLETED")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/tasks/t9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    let tasks = TasksApi::new(h.api.clone());

    let created = tasks
        .create(&CreateTask {
            title: "Write report".into(),
            description: None,
            status: Some(TaskStatus::Pending),
        })
        .await
        .unwrap();
    assert_eq!(created.id, "t9");

    let updated = tasks
        .update(
            "t9",
            &UpdateTask {
                description: Some("quarterly".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Pending);

    let toggled = tasks.toggle("t9").await.unwrap();
    assert_eq!(toggled.status, TaskStatus::Completed);

    tasks.delete("t9").await.unwrap();
}

#[tokio::test]
async fn test_write_is_replayed_with_same_body_after_refresh() {
    let h = Harness::with_tokens("tok1", "ref1").await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"accessToken": "tok2", "refreshToken": "ref2"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(header("authorization", "Bearer tok2"))
        .and(body_json(json!({"title": "x"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(task_json("t1", "x", "PENDING")))
        .expect(1)
        .mount(&h.server)
        .await;

    let task = TasksApi::new(h.api.clone())
        .create(&CreateTask {
            title: "x".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(task.title, "x");
}
