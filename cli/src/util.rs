use std::{path::PathBuf, process::exit};

use grader_core::Config;

use crate::cmd::GlobalArgs;

pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Failed to get current dir: {}", e);
        exit(1);
    })
}

/// `--config` if given, else the nearest `grader.toml`, else defaults.
pub fn load_config(global_args: &GlobalArgs) -> anyhow::Result<Config> {
    match &global_args.config {
        Some(path) => Config::from_toml_file(path.clone()),
        None => Config::from_file_finding_in_ancestors_or_default(current_dir()),
    }
}
