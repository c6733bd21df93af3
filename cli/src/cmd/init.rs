use std::{path::PathBuf, process::ExitCode};

use colored::Colorize as _;
use grader_core::action;

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Where to write `grader.toml` (defaults to the current dir)
    #[arg()]
    pub dir: Option<PathBuf>,
}

pub fn exec(args: &Args, _global_args: &GlobalArgs) -> SubcmdResult {
    let dir = args.dir.clone().unwrap_or_else(util::current_dir);
    let path = action::init_config(dir)?;
    println!(
        "{}",
        format!("Created {}", path.to_string_lossy()).green()
    );
    Ok(ExitCode::SUCCESS)
}
