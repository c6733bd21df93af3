use std::{path::PathBuf, process::ExitCode};

use grader_core::action;

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Source dir to scan (overrides `lint.source_dir`)
    #[arg()]
    pub source_dir: Option<PathBuf>,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let mut cfg = util::load_config(global_args)?;
    if let Some(dir) = &args.source_dir {
        cfg.lint.source_dir = dir.clone();
    }

    let violations = action::do_lint(&cfg)?;
    Ok(if violations.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
