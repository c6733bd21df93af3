use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::{ensure, Context as _};
use rust_embed::RustEmbed;
use serde::Deserialize;

use crate::fsutil;
use crate::serdable::GlobPattern;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub build: BuildConfig,
    pub lint: LintConfig,
    pub test: TestConfig,
    pub memcheck: MemcheckConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub command: Vec<String>,
    pub timeout_secs: f64,
    pub fail_on_warnings: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    pub source_dir: PathBuf,
    pub include: Vec<GlobPattern>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    pub dir: PathBuf,
    pub executable: Vec<String>,
    pub input_ext: String,
    pub output_ext: String,
    pub timeout_secs: f64,
    pub jobs: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemcheckConfig {
    pub enabled: bool,
    pub shell: PathBuf,
    /// Shell fragment naming the tool, e.g. `valgrind`.
    pub tool: String,
    pub flags: Vec<String>,
    pub error_exitcode: i32,
    pub clean_marker: String,
    pub disable_core_dumps: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: vec!["make".to_owned()],
            timeout_secs: 300.0,
            fail_on_warnings: true,
        }
    }
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            include: ["*.c", "*.h"]
                .iter()
                .map(|p| GlobPattern::parse(p).expect("static glob"))
                .collect(),
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("tests"),
            executable: vec!["./interpreter".to_owned()],
            input_ext: "scm".to_owned(),
            output_ext: "output".to_owned(),
            timeout_secs: 10.0,
            jobs: 1,
        }
    }
}

impl Default for MemcheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            shell: PathBuf::from("/bin/sh"),
            tool: "valgrind".to_owned(),
            flags: vec![
                "--leak-check=full".to_owned(),
                "--show-leak-kinds=all".to_owned(),
                "--errors-for-leak-kinds=all".to_owned(),
            ],
            error_exitcode: 99,
            clean_marker: "ERROR SUMMARY: 0 errors from 0 contexts".to_owned(),
            disable_core_dumps: true,
        }
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "grader.toml";

    pub fn example_toml() -> String {
        let file = Asset::get(Self::FILENAME).expect("embedded example config");
        String::from_utf8_lossy(file.data.as_ref()).into_owned()
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file in ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// Load the nearest config file, or the built-in defaults if there is none.
    pub fn from_file_finding_in_ancestors_or_default(
        cur_dir: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        match Self::find_file_in_ancestors(&cur_dir) {
            Some(path) => {
                log::info!("Using config {}", path.to_string_lossy());
                Self::from_toml_file(path)
            }
            None => {
                log::info!(
                    "No '{}' found from {}; using defaults",
                    Self::FILENAME,
                    cur_dir.as_ref().to_string_lossy()
                );
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let positive = |secs: f64| secs.is_finite() && secs > 0.0;
        ensure!(
            positive(self.build.timeout_secs),
            "build.timeout_secs must be a positive number (got {})",
            self.build.timeout_secs
        );
        ensure!(
            positive(self.test.timeout_secs),
            "test.timeout_secs must be a positive number (got {})",
            self.test.timeout_secs
        );
        ensure!(self.test.jobs >= 1, "test.jobs must be at least 1");
        ensure!(!self.build.command.is_empty(), "build.command must not be empty");
        ensure!(
            !self.test.executable.is_empty(),
            "test.executable must not be empty"
        );
        ensure!(
            !self.test.input_ext.is_empty() && !self.test.output_ext.is_empty(),
            "test.input_ext and test.output_ext must not be empty"
        );
        ensure!(
            self.test.input_ext != self.test.output_ext,
            "test.input_ext and test.output_ext must differ (both '{}')",
            self.test.input_ext
        );
        Ok(())
    }
}

impl BuildConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

impl TestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}
