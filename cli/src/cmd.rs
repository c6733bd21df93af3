pub mod init;
pub mod lint;
pub mod normalize;
pub mod run;

use std::{path::PathBuf, process::ExitCode};

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Config file to use instead of the nearest `grader.toml`
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    #[command(alias("r"))]
    Run(run::Args),
    Init(init::Args),
    Lint(lint::Args),
    Normalize(normalize::Args),
}

pub type SubcmdResult = anyhow::Result<ExitCode>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Run(args) => run::exec(args, self).await,
            Init(args) => init::exec(args, self),
            Lint(args) => lint::exec(args, self),
            Normalize(args) => normalize::exec(args, self),
        }
    }
}
