use std::{path::PathBuf, process::ExitCode};

use grader_core::action::{self, GradeOptions, ReportFormat};

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Directory holding `<name>.<input_ext>` / `<name>.<output_ext>` pairs
    #[arg(short = 'd', long)]
    pub dir: Option<PathBuf>,

    /// Per-run wall-clock limit in seconds
    #[arg(short = 't', long)]
    pub timeout: Option<f64>,

    /// Number of test cases to run concurrently
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Skip the memory-safety pass
    #[arg(long)]
    pub no_memcheck: bool,

    /// Skip linting and building; test the existing executable
    #[arg(long)]
    pub no_build: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let mut cfg = util::load_config(global_args)?;

    if let Some(dir) = &args.dir {
        cfg.test.dir = dir.clone();
    }
    if let Some(secs) = args.timeout {
        cfg.test.timeout_secs = secs;
    }
    if let Some(jobs) = args.jobs {
        cfg.test.jobs = jobs;
    }
    if args.no_memcheck {
        cfg.memcheck.enabled = false;
    }

    let opts = GradeOptions {
        skip_build: args.no_build,
        format: if args.json {
            ReportFormat::Json
        } else {
            ReportFormat::Human
        },
    };
    let report = action::do_grade(&cfg, opts).await?;

    Ok(if report.has_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
