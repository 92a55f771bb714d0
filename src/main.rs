//! teamdeck - Collaborative Task Planning CLI
//!
//! A standalone CLI for shared kanban boards, timeline roadmaps, delegated
//! subtasks, and notifications, backed by a file-based data directory.

use clap::Parser;
use teamdeck::cli::Cli;
use teamdeck::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Tracing is opt-in via RUST_LOG.
    // Keep startup robust in CI/robot envs: ignore invalid/huge filters.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(exit_code(err.status_code()));
    }
}

/// Collapse status codes into conventional process exit codes
fn exit_code(status: u16) -> i32 {
    match status {
        400 | 404 | 409 | 422 => 2,
        403 => 3,
        _ => 1,
    }
}
