use std::process::ExitCode;

use clap::Parser;
use grader_cli::cmd::GlobalArgs;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = GlobalArgs::parse();
    app.exec_subcmd().await.unwrap_or_else(|e| {
        eprintln!("Error: {:?}", e);
        ExitCode::FAILURE
    })
}
