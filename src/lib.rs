//! # taskd
//!
//! A Unix-inspired task registry exposed over HTTP. Tasks simulate
//! processes: each carries a PID, a command string, an owner, a priority,
//! and a lifecycle status. Nothing is ever executed.
//!
//! ## Operations
//! - **Create** tasks (`POST /tasks`) - allocates a unique PID in
//!   [1000, 99999] with bounded collision retry
//! - **List / filter** tasks (`GET /tasks`) - optional status filter,
//!   newest first
//! - **Complete** tasks (`PATCH /tasks/{id}`) - one-way
//!   `running -> completed` transition, 409 on repeat
//!
//! ## Modules
//! - `api`: axum router, handlers, and HTTP error mapping
//! - `config`: environment-driven process configuration
//! - `store`: SQLite persistence with per-request sessions
//! - `task`: domain types

pub mod api;
pub mod config;
pub mod store;
pub mod task;

pub use config::Config;
