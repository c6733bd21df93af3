pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use error::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::build::{Builder, CommandBuilder};
use crate::config::Config;
use crate::fsutil;
use crate::lint::{self, LintViolation};
use crate::style;
use crate::suite::{self, BuildStatus, SuiteObserver, SuiteReport};
use crate::testing::{display_command, TestCase, TestReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GradeOptions {
    pub skip_build: bool,
    pub format: ReportFormat,
}

/// Build, run every test case and print the report.
pub async fn do_grade(cfg: &Config, opts: GradeOptions) -> Result<SuiteReport> {
    cfg.validate().context("Invalid configuration")?;

    let command_builder = CommandBuilder::new(cfg.build.command.clone())
        .execution_time_limit(cfg.build.timeout());
    let builder: Option<&dyn Builder> = if opts.skip_build {
        None
    } else {
        log::info!("Building: {}", display_command(&cfg.build.command));
        Some(&command_builder)
    };

    match opts.format {
        ReportFormat::Human => {
            let mut observer = ProgressObserver::default();
            let report = suite::run_suite(cfg, builder, &mut observer).await;
            observer.finish();
            let report = report?;
            style::print_suite_report(&report);
            Ok(report)
        }
        ReportFormat::Json => {
            let report = suite::run_suite(cfg, builder, &mut ()).await?;
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{}", json);
            Ok(report)
        }
    }
}

pub fn do_lint(cfg: &Config) -> Result<Vec<LintViolation>> {
    let violations = lint::scan_dir(&cfg.lint.source_dir, &cfg.lint.include)
        .context("Failed to scan source files")?;
    for v in &violations {
        println!("{}", v.to_string().bright_red());
    }
    if violations.is_empty() {
        println!("{}", "No diagnostic suppression found".green());
    }
    Ok(violations)
}

/// Write the example config into `dir`.
pub fn init_config(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(Config::FILENAME);
    fsutil::write_new_with_mkdir(&path, Config::example_toml())
        .context("Failed to write example config")?;
    Ok(path)
}

#[derive(Default)]
struct ProgressObserver {
    bar: Option<ProgressBar>,
}

impl ProgressObserver {
    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl SuiteObserver for ProgressObserver {
    fn on_build_finished(&mut self, status: &BuildStatus) {
        if let BuildStatus::Passed { output } = status {
            if !output.trim().is_empty() {
                println!("{}", output.trim_end().dimmed());
            }
            println!("{}", "Build succeeded".green());
        }
    }

    fn on_discovered(&mut self, testcases: &[TestCase]) {
        let style = ProgressStyle::default_bar()
            .template("{spinner} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new(testcases.len() as u64)
            .with_style(style)
            .with_message("Running testcases ...");
        bar.enable_steady_tick(Duration::from_millis(80));
        self.bar = Some(bar);
    }

    fn on_report(&mut self, report: &TestReport) {
        let line = style::format_test_result_line(report);
        match &self.bar {
            Some(bar) => {
                bar.println(line);
                bar.inc(1);
            }
            None => println!("{}", line),
        }
    }
}
