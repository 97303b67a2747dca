//! Task domain types.
//!
//! A task models a Unix-style "process": a PID, a command string, an owner,
//! a priority, and a lifecycle status. Nothing is ever executed; the command
//! and priority are inert metadata.
//!
//! The status enum is deliberately closed: every transition and filter site
//! matches exhaustively, so adding or removing a state is a compile-time
//! checked change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// PID range
// ─────────────────────────────────────────────────────────────────────────────

/// Lowest assignable PID.
pub const PID_MIN: i64 = 1000;
/// Highest assignable PID (inclusive).
pub const PID_MAX: i64 = 99999;

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a task.
///
/// Tasks start `Running` and move to `Completed` exactly once; there is no
/// transition out of `Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task is live (initial state)
    Running,
    /// Task finished (terminal state)
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a status string outside the closed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task
// ─────────────────────────────────────────────────────────────────────────────

/// Default priority assigned when a creation request omits one.
pub const DEFAULT_PRIORITY: i64 = 3;

/// A persisted task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unix-like PID, unique for the lifetime of the table
    pub id: i64,
    /// Human-readable name
    pub name: String,
    /// Priority from 0 (lowest) to 5 (highest)
    pub priority: i64,
    /// Owner of the task
    pub owner: String,
    /// Command line (free text, never executed)
    pub command: String,
    /// Current lifecycle state
    pub status: TaskStatus,
    /// Creation timestamp, immutable
    pub created_at: DateTime<Utc>,
    /// Set only by the completion transition
    pub updated_at: Option<DateTime<Utc>>,
}
