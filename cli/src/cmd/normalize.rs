use std::{io::Read as _, path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use grader_core::{fsutil, normalize::normalize};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// File to normalize; reads stdin when omitted
    #[arg()]
    pub file: Option<PathBuf>,
}

pub fn exec(args: &Args, _global_args: &GlobalArgs) -> SubcmdResult {
    let text = match &args.file {
        Some(path) => fsutil::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    println!("{}", normalize(&text));
    Ok(ExitCode::SUCCESS)
}
