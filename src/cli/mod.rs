//! Command-line interface for teamdeck
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::board::BoardService;
use crate::config::Config;
use crate::delegation::TaskService;
use crate::error::{Error, Result};
use crate::notify::{ConnectionDirectory, NoopChannel, NotificationRelay};
use crate::output::OutputOptions;
use crate::roadmap::RoadmapService;
use crate::storage::Storage;

mod board;
mod init;
mod notify;
mod roadmap;
mod task;
mod user;

/// teamdeck - Collaborative Task Planning
///
/// A CLI for shared kanban boards, timeline roadmaps, delegated subtasks,
/// and notifications, backed by a file-based data directory.
#[derive(Parser, Debug)]
#[command(name = "teamdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the data directory (defaults to current directory)
    #[arg(long, global = true, env = "TEAMDECK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Actor identity for operations
    #[arg(long, global = true, env = "TEAMDECK_ACTOR")]
    pub actor: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a data directory
    Init,

    /// User registry management
    #[command(subcommand)]
    User(UserCommands),

    /// Kanban board management
    #[command(subcommand)]
    Board(BoardCommands),

    /// Timeline roadmap management
    #[command(subcommand)]
    Roadmap(RoadmapCommands),

    /// Personal tasks, delegation, and subtasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Notification inbox
    #[command(subcommand)]
    Notify(NotifyCommands),
}

/// User registry subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a user
    Add {
        /// User id
        id: String,

        /// Display name
        name: String,
    },

    /// List registered users
    Ls,
}

/// Board subcommands
#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Create a board owned by the actor
    New {
        /// Board title
        title: String,

        /// Board description
        #[arg(long)]
        description: Option<String>,
    },

    /// List boards the actor is a member of
    Ls,

    /// Show a board
    Show {
        /// Board id
        board: String,
    },

    /// Edit board title or description (owner only)
    Edit {
        /// Board id
        board: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a board and its tags (owner only)
    Rm {
        /// Board id
        board: String,
    },

    /// Add a member (owner only)
    Invite {
        /// Board id
        board: String,

        /// User id to add
        user: String,
    },

    /// Remove a member (owner only)
    Kick {
        /// Board id
        board: String,

        /// User id to remove
        user: String,
    },

    /// Leave a board the actor is a member of
    Leave {
        /// Board id
        board: String,
    },

    /// Append a column
    ColumnNew {
        /// Board id
        board: String,

        /// Column title
        title: String,
    },

    /// Retitle or reorder a column
    ColumnEdit {
        /// Board id
        board: String,

        /// Column id
        column: String,

        #[arg(long)]
        title: Option<String>,

        /// New position in the column list
        #[arg(long)]
        order: Option<usize>,
    },

    /// Delete a column and its tasks
    ColumnRm {
        /// Board id
        board: String,

        /// Column id
        column: String,
    },

    /// Append a task to a column
    TaskNew {
        /// Board id
        board: String,

        /// Column id
        column: String,

        /// Task title
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Assignee user id (repeatable)
        #[arg(long = "assignee")]
        assignees: Vec<String>,

        /// Tag id (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Edit or reorder a task within its column
    TaskEdit {
        /// Board id
        board: String,

        /// Column id
        column: String,

        /// Task id
        task: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Replace the assignee list (repeatable)
        #[arg(long = "assignee")]
        assignees: Option<Vec<String>>,

        /// Replace the tag list (repeatable)
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,

        /// New position within the column
        #[arg(long)]
        order: Option<usize>,
    },

    /// Delete a task
    TaskRm {
        /// Board id
        board: String,

        /// Column id
        column: String,

        /// Task id
        task: String,
    },

    /// Move a task to another column
    TaskMove {
        /// Board id
        board: String,

        /// Source column id
        from: String,

        /// Destination column id
        to: String,

        /// Task id
        task: String,

        /// Position in the destination column (defaults to the end)
        #[arg(long)]
        order: Option<usize>,
    },

    /// Create a tag scoped to a board
    TagNew {
        /// Board id
        board: String,

        /// Tag title
        title: String,

        /// Display color
        #[arg(long, default_value = "#6b7280")]
        color: String,
    },

    /// List a board's tags
    TagLs {
        /// Board id
        board: String,
    },

    /// Edit a tag
    TagEdit {
        /// Board id
        board: String,

        /// Tag id
        tag: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a tag and prune every reference to it
    TagRm {
        /// Board id
        board: String,

        /// Tag id
        tag: String,
    },
}

/// Roadmap subcommands
#[derive(Subcommand, Debug)]
pub enum RoadmapCommands {
    /// Create a roadmap owned by the actor
    New {
        /// Roadmap title
        title: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// List roadmaps the actor is a member of
    Ls,

    /// Show a roadmap
    Show {
        /// Roadmap id
        roadmap: String,
    },

    /// Edit roadmap title or description (owner only)
    Edit {
        /// Roadmap id
        roadmap: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a roadmap (owner only)
    Rm {
        /// Roadmap id
        roadmap: String,
    },

    /// Add a member (owner only)
    Invite {
        /// Roadmap id
        roadmap: String,

        /// User id to add
        user: String,
    },

    /// Remove a member (owner only)
    Kick {
        /// Roadmap id
        roadmap: String,

        /// User id to remove
        user: String,
    },

    /// Leave a roadmap the actor is a member of
    Leave {
        /// Roadmap id
        roadmap: String,
    },

    /// Append a quarter
    QuarterNew {
        roadmap: String,
        title: String,
    },

    /// Retitle or reorder a quarter
    QuarterEdit {
        roadmap: String,
        quarter: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        order: Option<usize>,
    },

    /// Delete a quarter
    QuarterRm {
        roadmap: String,
        quarter: String,
    },

    /// Append a milestone
    MilestoneNew {
        roadmap: String,
        title: String,
    },

    /// Retitle or reorder a milestone
    MilestoneEdit {
        roadmap: String,
        milestone: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        order: Option<usize>,
    },

    /// Delete a milestone
    MilestoneRm {
        roadmap: String,
        milestone: String,
    },

    /// Append a category
    CategoryNew {
        roadmap: String,
        title: String,
    },

    /// Retitle or reorder a category
    CategoryEdit {
        roadmap: String,
        category: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        order: Option<usize>,
    },

    /// Delete a category and its rows
    CategoryRm {
        roadmap: String,
        category: String,
    },

    /// Append a row to a category
    RowNew {
        roadmap: String,
        category: String,
        title: String,
    },

    /// Retitle or reorder a row
    RowEdit {
        roadmap: String,
        category: String,
        row: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        order: Option<usize>,
    },

    /// Delete a row and its tasks
    RowRm {
        roadmap: String,
        category: String,
        row: String,
    },

    /// Add a range-positioned task to a row
    TaskNew {
        roadmap: String,
        category: String,
        row: String,
        title: String,

        /// Completion percentage (0-100)
        #[arg(long, default_value = "0")]
        progress: u8,

        /// Range start (unix millis)
        #[arg(long)]
        start: i64,

        /// Range end (unix millis)
        #[arg(long)]
        end: i64,

        /// Status: planned, in_progress, done
        #[arg(long, default_value = "planned")]
        status: String,
    },

    /// Edit a task
    TaskEdit {
        roadmap: String,
        category: String,
        row: String,
        task: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        progress: Option<u8>,

        #[arg(long)]
        start: Option<i64>,

        #[arg(long)]
        end: Option<i64>,

        /// Status: planned, in_progress, done
        #[arg(long)]
        status: Option<String>,
    },

    /// Delete a task
    TaskRm {
        roadmap: String,
        category: String,
        row: String,
        task: String,
    },

    /// Move a task to another row with a new range
    TaskMove {
        roadmap: String,

        /// Source category id
        from_category: String,

        /// Source row id
        from_row: String,

        /// Task id
        task: String,

        /// Destination category id
        to_category: String,

        /// Destination row id
        to_row: String,

        /// New range start (unix millis)
        #[arg(long)]
        start: i64,

        /// New range end (unix millis)
        #[arg(long)]
        end: i64,
    },
}

/// Task and subtask subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task owned by the actor
    New {
        /// Task title
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Category id (repeatable; must be owned by the actor)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Related link (repeatable)
        #[arg(long = "link")]
        links: Vec<String>,

        /// Deadline as an RFC 3339 timestamp
        #[arg(long)]
        deadline: Option<String>,
    },

    /// List the actor's tasks
    Ls,

    /// Show a task
    Show {
        /// Task id
        task: String,
    },

    /// Edit a task
    Edit {
        /// Task id
        task: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Replace the category list (repeatable)
        #[arg(long = "category")]
        categories: Option<Vec<String>>,

        /// Replace the link list (repeatable)
        #[arg(long = "link")]
        links: Option<Vec<String>>,

        /// Deadline as an RFC 3339 timestamp
        #[arg(long)]
        deadline: Option<String>,

        /// Set the completion flag
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Delete a task (its subtasks remain)
    Rm {
        /// Task id
        task: String,
    },

    /// Create a personal category label
    CategoryNew {
        /// Category title
        title: String,
    },

    /// List the actor's categories
    CategoryLs,

    /// Delete a category label
    CategoryRm {
        /// Category id
        category: String,
    },

    /// Delegate a subtask under one of the actor's tasks
    SubtaskNew {
        /// Parent task id
        task: String,

        /// Subtask title
        title: String,

        /// Assignee user id (assigning to yourself auto-confirms)
        #[arg(long)]
        assignee: String,

        #[arg(long)]
        description: Option<String>,

        /// Category id (repeatable; must be owned by the actor)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Related link (repeatable)
        #[arg(long = "link")]
        links: Vec<String>,

        /// Deadline as an RFC 3339 timestamp
        #[arg(long)]
        deadline: Option<String>,
    },

    /// Show a subtask (owner or assignee)
    SubtaskShow {
        /// Subtask id
        subtask: String,
    },

    /// Edit a subtask under the role permission matrix
    SubtaskEdit {
        /// Subtask id
        subtask: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Replace the category list (repeatable)
        #[arg(long = "category")]
        categories: Option<Vec<String>>,

        /// Replace the link list (repeatable)
        #[arg(long = "link")]
        links: Option<Vec<String>>,

        /// Deadline as an RFC 3339 timestamp
        #[arg(long)]
        deadline: Option<String>,

        /// Set the completion flag
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Remove a subtask (owner only)
    SubtaskRm {
        /// Subtask id
        subtask: String,
    },

    /// Confirm a subtask delegated to the actor
    Confirm {
        /// Subtask id
        subtask: String,
    },

    /// Reject a subtask delegated to the actor (permanent)
    Reject {
        /// Subtask id
        subtask: String,
    },

    /// List subtasks assigned to the actor
    Inbox,
}

/// Notification subcommands
#[derive(Subcommand, Debug)]
pub enum NotifyCommands {
    /// List the actor's notifications, newest first
    Ls {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },

    /// Mark a notification as read
    Read {
        /// Notification id
        id: String,
    },
}

/// Shared state for command implementations: opened storage, loaded config,
/// actor identity, and output options.
pub struct CliContext {
    pub storage: Storage,
    pub config: Config,
    pub actor: Option<String>,
    pub out: OutputOptions,
}

impl CliContext {
    fn open(
        data_dir: Option<PathBuf>,
        actor: Option<String>,
        json: bool,
        quiet: bool,
    ) -> Result<Self> {
        let data_dir = match data_dir {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        let config = Config::load(&data_dir)?;
        let storage = Storage::new(data_dir);
        Ok(Self {
            storage,
            config,
            actor,
            out: OutputOptions { json, quiet },
        })
    }

    /// Actor identity, required for most operations
    pub fn actor(&self) -> Result<&str> {
        self.actor.as_deref().ok_or_else(|| {
            Error::BadRequest(
                "actor is required; pass --actor or set TEAMDECK_ACTOR".to_string(),
            )
        })
    }

    pub fn boards(&self) -> BoardService {
        BoardService::new(self.storage.clone(), self.config.limits.clone())
    }

    pub fn roadmaps(&self) -> RoadmapService {
        RoadmapService::new(self.storage.clone(), self.config.limits.clone())
    }

    pub fn relay(&self) -> NotificationRelay {
        // The CLI has no live connections; pushes fall through to storage.
        NotificationRelay::new(
            self.storage.clone(),
            Arc::new(ConnectionDirectory::new()),
            Arc::new(NoopChannel),
            self.config.notifications.clone(),
        )
    }

    pub fn tasks(&self) -> TaskService {
        TaskService::new(self.storage.clone(), self.relay())
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = CliContext::open(self.data_dir, self.actor, self.json, self.quiet)?;
        match self.command {
            Commands::Init => init::run(&ctx),
            Commands::User(cmd) => match cmd {
                UserCommands::Add { id, name } => user::run_add(&ctx, &id, &name),
                UserCommands::Ls => user::run_ls(&ctx),
            },
            Commands::Board(cmd) => board::run(&ctx, cmd),
            Commands::Roadmap(cmd) => roadmap::run(&ctx, cmd),
            Commands::Task(cmd) => task::run(&ctx, cmd),
            Commands::Notify(cmd) => match cmd {
                NotifyCommands::Ls { unread } => notify::run_ls(&ctx, unread),
                NotifyCommands::Read { id } => notify::run_read(&ctx, &id),
            },
        }
    }
}
