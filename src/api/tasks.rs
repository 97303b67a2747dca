//! Task registry API endpoints.
//!
//! Provides the task surface:
//! - List / filter tasks
//! - Create task
//! - Mark a task as completed
//!
//! Input validation happens here, before any store call; the store only ever
//! sees well-formed values.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::store::NewTask;
use crate::task::{Task, TaskStatus, DEFAULT_PRIORITY};

use super::error::ApiError;

/// Create task routes.
pub fn routes() -> Router<Arc<super::routes::AppState>> {
    Router::new()
        .route("/", get(list_tasks))
        .route("/", post(create_task))
        .route("/:id", patch(complete_task))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Human-readable name
    pub name: String,
    /// Priority from 0 (lowest) to 5 (highest); defaults to 3
    #[serde(default)]
    pub priority: Option<i64>,
    /// Owner of the task
    pub owner: String,
    /// Command line (free text, never executed)
    pub command: String,
}

impl CreateTaskRequest {
    /// Check field constraints and produce the validated insert payload.
    fn validate(self) -> Result<NewTask, ApiError> {
        for (field, value) in [
            ("name", &self.name),
            ("owner", &self.owner),
            ("command", &self.command),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::Validation(format!(
                    "Field '{field}' must be a non-empty string"
                )));
            }
        }
        let priority = self.priority.unwrap_or(DEFAULT_PRIORITY);
        if !(0..=5).contains(&priority) {
            return Err(ApiError::Validation(format!(
                "Priority must be between 0 and 5, got {priority}"
            )));
        }
        Ok(NewTask {
            name: self.name,
            priority,
            owner: self.owner,
            command: self.command,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListTasksParams {
    /// Filter by status (running/completed); parsed by hand so an invalid
    /// value is a 422, not a generic extractor rejection
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: i64,
    pub name: String,
    pub priority: i64,
    pub owner: String,
    pub command: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Task> for TaskResponse {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            name: t.name,
            priority: t.priority,
            owner: t.owner,
            command: t.command,
            status: t.status,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /tasks - List all tasks, optionally filtered by status.
async fn list_tasks(
    State(state): State<Arc<super::routes::AppState>>,
    Query(params): Query<ListTasksParams>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let filter = match params.status.as_deref() {
        None => None,
        Some(raw) => Some(raw.parse::<TaskStatus>().map_err(|_| {
            ApiError::Validation(format!(
                "Invalid status filter '{raw}' (expected 'running' or 'completed')"
            ))
        })?),
    };

    let tasks = state.store.list(filter).await?;
    let responses: Vec<TaskResponse> = tasks.into_iter().map(Into::into).collect();
    Ok(Json(responses))
}

/// POST /tasks - Create a new task with a freshly allocated PID.
async fn create_task(
    State(state): State<Arc<super::routes::AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let new = req.validate()?;
    let task = state.store.create(new).await?;

    tracing::info!("Created task {} ({}) for {}", task.id, task.name, task.owner);

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// PATCH /tasks/:id - Mark a task as completed.
///
/// Returns 409 Conflict if the task is already completed.
async fn complete_task(
    State(state): State<Arc<super::routes::AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state.store.complete(id).await?;

    tracing::info!("Completed task {} ({})", task.id, task.name);

    Ok(Json(task.into()))
}
