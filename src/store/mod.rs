//! SQLite-backed task persistence.
//!
//! The [`TaskStore`] is a session factory: it is created once at startup and
//! holds only the database path. Every operation opens its own connection,
//! scoped to that single call and closed when the call returns, success or
//! failure. Sessions are never shared across requests.
//!
//! PID uniqueness is enforced twice: a read-only existence probe before the
//! insert, and the `INTEGER PRIMARY KEY` constraint at the storage level. A
//! probe/insert race therefore surfaces as a constraint violation, which
//! consumes one of the bounded allocation attempts instead of overwriting
//! the winning row.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::task::{Task, TaskStatus, PID_MAX, PID_MIN};

/// Maximum attempts to find a free PID before giving up.
pub const PID_ATTEMPTS: usize = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors surfaced by the task store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blocking task join error: {0}")]
    Join(String),
    #[error("task {0} not found")]
    NotFound(i64),
    #[error("task {0} already completed")]
    AlreadyCompleted(i64),
    #[error("unable to allocate a unique PID after {PID_ATTEMPTS} attempts")]
    PidExhausted,
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Fields supplied by the client when creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub priority: i64,
    pub owner: String,
    pub command: String,
}

/// Handle to the tasks database.
///
/// Cheap to clone; connections are opened per operation, not held here.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Open the store, creating the database file and schema if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self { path };
        let conn = store.session()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (\
               id INTEGER PRIMARY KEY,\
               name TEXT NOT NULL,\
               priority INTEGER NOT NULL DEFAULT 3,\
               owner TEXT NOT NULL,\
               command TEXT NOT NULL,\
               status TEXT NOT NULL DEFAULT 'running',\
               created_at TEXT NOT NULL,\
               updated_at TEXT\
             );\
             CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);\
             CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);",
        )?;
        Ok(store)
    }

    /// Open a fresh request-scoped connection.
    ///
    /// WAL mode lets concurrent sessions coexist; the busy timeout covers
    /// brief writer contention instead of failing immediately.
    fn session(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA synchronous=NORMAL;\
             PRAGMA busy_timeout=5000;",
        )?;
        Ok(conn)
    }

    /// Insert a new task under a freshly allocated PID.
    pub async fn create(&self, new: NewTask) -> Result<Task, StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.session()?;
            insert_with_fresh_pid(&conn, &new)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }

    /// List tasks, optionally filtered by status, newest first.
    pub async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<Task>, StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.session()?;
            let mut tasks = Vec::new();
            match status {
                None => {
                    let mut stmt = conn
                        .prepare("SELECT * FROM tasks ORDER BY created_at DESC")?;
                    let rows = stmt.query_map([], row_to_task)?;
                    for task in rows {
                        tasks.push(task?);
                    }
                }
                Some(filter) => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM tasks WHERE status = ?1 ORDER BY created_at DESC",
                    )?;
                    let rows = stmt.query_map(params![filter.as_str()], row_to_task)?;
                    for task in rows {
                        tasks.push(task?);
                    }
                }
            }
            Ok(tasks)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }

    /// Apply the `running → completed` transition to a task.
    ///
    /// The guard and the write are one conditional UPDATE, so two concurrent
    /// completions cannot both apply the transition; the loser sees
    /// [`StoreError::AlreadyCompleted`] and the row keeps the winner's
    /// `updated_at`.
    pub async fn complete(&self, id: i64) -> Result<Task, StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.session()?;
            let now = Utc::now();
            let rows = conn.execute(
                "UPDATE tasks SET status = ?1, updated_at = ?2 \
                 WHERE id = ?3 AND status = ?4",
                params![
                    TaskStatus::Completed.as_str(),
                    encode_timestamp(&now),
                    id,
                    TaskStatus::Running.as_str(),
                ],
            )?;
            if rows == 0 {
                // Distinguish "no such task" from "already completed".
                let existing: Option<String> = conn
                    .query_row("SELECT status FROM tasks WHERE id = ?1", params![id], |r| {
                        r.get(0)
                    })
                    .optional()?;
                return match existing {
                    None => Err(StoreError::NotFound(id)),
                    Some(_) => Err(StoreError::AlreadyCompleted(id)),
                };
            }
            fetch_task(&conn, id)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Draw candidate PIDs until one inserts cleanly or the attempt budget runs
/// out. A primary-key violation (probe/insert race with another session)
/// counts as a failed attempt.
fn insert_with_fresh_pid(conn: &Connection, new: &NewTask) -> Result<Task, StoreError> {
    let mut rng = rand::thread_rng();
    for _ in 0..PID_ATTEMPTS {
        let pid: i64 = rng.gen_range(PID_MIN..=PID_MAX);
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)",
            params![pid],
            |r| r.get(0),
        )?;
        if taken {
            continue;
        }
        let created_at = Utc::now();
        let result = conn.execute(
            "INSERT INTO tasks (id, name, priority, owner, command, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
            params![
                pid,
                new.name,
                new.priority,
                new.owner,
                new.command,
                TaskStatus::Running.as_str(),
                encode_timestamp(&created_at),
            ],
        );
        match result {
            Ok(_) => return fetch_task(conn, pid),
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(StoreError::PidExhausted)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn fetch_task(conn: &Connection, id: i64) -> Result<Task, StoreError> {
    conn.query_row("SELECT * FROM tasks WHERE id = ?1", params![id], row_to_task)
        .optional()?
        .ok_or(StoreError::NotFound(id))
}

/// Fixed-precision RFC 3339 so lexicographic and chronological order agree.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let status_raw: String = row.get("status")?;
    let status = status_raw.parse::<TaskStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_raw: String = row.get("created_at")?;
    let updated_raw: Option<String> = row.get("updated_at")?;
    Ok(Task {
        id: row.get("id")?,
        name: row.get("name")?,
        priority: row.get("priority")?,
        owner: row.get("owner")?,
        command: row.get("command")?,
        status,
        created_at: decode_timestamp(6, &created_raw)?,
        updated_at: updated_raw
            .map(|raw| decode_timestamp(7, &raw))
            .transpose()?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
