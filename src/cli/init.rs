//! teamdeck init command implementation
//!
//! Creates the data directory layout and a default config file.

use std::path::{Path, PathBuf};

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};

use super::CliContext;

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    directories: bool,
}

pub fn run(ctx: &CliContext) -> Result<()> {
    let data_dir = ctx.storage.data_dir().to_path_buf();

    let already_initialized = ctx.storage.is_initialized();
    ctx.storage.init_all()?;
    let created_config = ensure_config(&data_dir)?;

    let report = InitReport {
        data_dir: data_dir.clone(),
        created: InitCreated {
            config: created_config,
            directories: !already_initialized,
        },
    };

    let header = if already_initialized && !created_config {
        "teamdeck init: nothing to do".to_string()
    } else {
        "teamdeck init: initialized data directory".to_string()
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("data_dir", data_dir.display().to_string());
    human.push_summary(
        "created",
        match (created_config, !already_initialized) {
            (true, true) => format!("{CONFIG_FILE}, directories"),
            (true, false) => CONFIG_FILE.to_string(),
            (false, true) => "directories".to_string(),
            (false, false) => "none".to_string(),
        },
    );
    human.push_next_step("teamdeck user add <id> <name>");
    human.push_next_step("teamdeck board new <title> --actor <id>");

    emit_success(ctx.out, "init", &report, Some(&human))?;
    Ok(())
}

fn ensure_config(data_dir: &Path) -> Result<bool> {
    let config_path = data_dir.join(CONFIG_FILE);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::BadRequest(format!(
                "{} exists but is not a file: {}",
                CONFIG_FILE,
                config_path.display()
            )));
        }
        return Ok(false);
    }

    let config = Config::default();
    let rendered = toml::to_string_pretty(&config)
        .map_err(|err| Error::InvalidConfig(err.to_string()))?;
    std::fs::write(&config_path, rendered)?;
    Ok(true)
}
