//! teamdeck - Collaborative Task Planning Library
//!
//! This library provides the core functionality for the teamdeck CLI tool:
//! shared kanban boards, timeline roadmaps, delegated subtasks, and the
//! notification relay that connects them.
//!
//! # Core Concepts
//!
//! - **Boards**: Owner-administered kanban boards with ordered columns,
//!   ordered tasks, and board-scoped tags
//! - **Roadmaps**: Timeline planning with quarters, milestones, and
//!   range-positioned tasks grouped into categories and rows
//! - **Subtasks**: Work delegated from an owner to an assignee, gated by a
//!   confirm/reject handshake and a role-based permission matrix
//! - **Notifications**: Persisted per-recipient records with best-effort
//!   realtime push to connected actors
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `teamdeck.toml`
//! - `error`: Error types and result aliases
//! - `ordering`: Dense zero-based ordering for reorderable lists
//! - `board`: Board aggregate and its operations
//! - `roadmap`: Roadmap aggregate and its operations
//! - `delegation`: Delegated tasks, subtasks, and the role matrix
//! - `notify`: Notification persistence, connections, and push delivery
//! - `storage`: File storage, transactions, and the user registry
//! - `lock`: File locking and atomic operations for concurrency safety

pub mod board;
pub mod cli;
pub mod config;
pub mod delegation;
pub mod error;
pub mod id;
pub mod lock;
pub mod notify;
pub mod ordering;
pub mod output;
pub mod roadmap;
pub mod storage;

pub use error::{Error, Result};
