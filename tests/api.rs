//! Black-box HTTP tests: bind the router on an ephemeral port and drive it
//! with a real client.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use serde_json::{json, Value};

use taskd::api::routes::{router, AppState};
use taskd::store::TaskStore;
use taskd::task::{PID_MAX, PID_MIN};

struct TestApp {
    base: String,
    client: reqwest::Client,
    _dir: tempfile::TempDir,
}

impl TestApp {
    async fn spawn() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(dir.path().join("tasks.db")).unwrap();
        let state = Arc::new(AppState { store });
        let app = router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    async fn create_task(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/tasks", self.base))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn complete_task(&self, id: i64) -> reqwest::Response {
        self.client
            .patch(format!("{}/tasks/{id}", self.base))
            .send()
            .await
            .unwrap()
    }

    async fn list_tasks(&self, query: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/tasks{query}", self.base))
            .send()
            .await
            .unwrap()
    }
}

fn backup_request() -> Value {
    json!({
        "name": "Backup",
        "owner": "admin",
        "command": "rsync -avz /data /backup"
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn().await;
    let resp = app
        .client
        .get(format!("{}/health", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_returns_full_record_with_defaults() {
    let app = TestApp::spawn().await;
    let resp = app.create_task(backup_request()).await;
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.unwrap();
    let id = body["id"].as_i64().unwrap();
    assert!((PID_MIN..=PID_MAX).contains(&id));
    assert_eq!(body["name"], "Backup");
    assert_eq!(body["owner"], "admin");
    assert_eq!(body["command"], "rsync -avz /data /backup");
    assert_eq!(body["status"], "running");
    assert_eq!(body["priority"], 3);
    assert!(body["updated_at"].is_null());
    assert!(body["created_at"].is_string());
}

#[tokio::test]
async fn complete_transitions_once_then_conflicts() {
    let app = TestApp::spawn().await;
    let created: Value = app.create_task(backup_request()).await.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    let resp = app.complete_task(id).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "completed");

    let created_at = DateTime::parse_from_rfc3339(body["created_at"].as_str().unwrap()).unwrap();
    let updated_at = DateTime::parse_from_rfc3339(body["updated_at"].as_str().unwrap()).unwrap();
    assert!(updated_at >= created_at);

    // Second completion is rejected and leaves the record untouched.
    let resp = app.complete_task(id).await;
    assert_eq!(resp.status(), 409);
    let error: Value = resp.json().await.unwrap();
    assert_eq!(error["detail"], "Task already completed");

    let listed: Value = app.list_tasks("").await.json().await.unwrap();
    assert_eq!(listed[0]["updated_at"], body["updated_at"]);
}

#[tokio::test]
async fn complete_unknown_task_is_404() {
    let app = TestApp::spawn().await;
    let resp = app.complete_task(999_999).await;
    assert_eq!(resp.status(), 404);
    let error: Value = resp.json().await.unwrap();
    assert_eq!(error["detail"], "Task not found");
}

#[tokio::test]
async fn list_filters_by_status_newest_first() {
    let app = TestApp::spawn().await;
    let mut ids = Vec::new();
    for name in ["first", "second", "third"] {
        let body: Value = app
            .create_task(json!({
                "name": name,
                "owner": "admin",
                "command": format!("echo {name}")
            }))
            .await
            .json()
            .await
            .unwrap();
        ids.push(body["id"].as_i64().unwrap());
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    app.complete_task(ids[1]).await;

    let resp = app.list_tasks("?status=running").await;
    assert_eq!(resp.status(), 200);
    let running: Value = resp.json().await.unwrap();
    let running_ids: Vec<i64> = running
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(running_ids, vec![ids[2], ids[0]]);

    let completed: Value = app.list_tasks("?status=completed").await.json().await.unwrap();
    assert_eq!(completed.as_array().unwrap().len(), 1);
    assert_eq!(completed[0]["id"].as_i64().unwrap(), ids[1]);

    let all: Value = app.list_tasks("").await.json().await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn invalid_status_filter_is_422() {
    let app = TestApp::spawn().await;
    let resp = app.list_tasks("?status=zombie").await;
    assert_eq!(resp.status(), 422);
    let error: Value = resp.json().await.unwrap();
    assert!(error["detail"].as_str().unwrap().contains("zombie"));
}

#[tokio::test]
async fn out_of_range_priority_is_422() {
    let app = TestApp::spawn().await;
    let resp = app
        .create_task(json!({
            "name": "Backup",
            "owner": "admin",
            "command": "rsync -avz /data /backup",
            "priority": 9
        }))
        .await;
    assert_eq!(resp.status(), 422);
    let error: Value = resp.json().await.unwrap();
    assert!(error["detail"].as_str().unwrap().contains("Priority"));

    // Nothing was persisted.
    let all: Value = app.list_tasks("").await.json().await.unwrap();
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_required_field_is_422() {
    let app = TestApp::spawn().await;
    let resp = app
        .create_task(json!({
            "name": "",
            "owner": "admin",
            "command": "true"
        }))
        .await;
    assert_eq!(resp.status(), 422);
    let error: Value = resp.json().await.unwrap();
    assert!(error["detail"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn missing_required_field_is_422() {
    let app = TestApp::spawn().await;
    let resp = app
        .create_task(json!({
            "name": "Backup",
            "owner": "admin"
        }))
        .await;
    assert_eq!(resp.status(), 422);
}
