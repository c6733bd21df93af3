//! Drives a whole grading run: lint and build, discover test cases, run each
//! one (optionally under memcheck) and collect the reports.

use std::sync::Arc;

use anyhow::{ensure, Context as _};
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::build::{check_build, BuildFailure, Builder};
use crate::config::Config;
use crate::lint;
use crate::normalize::NormalizedText;
use crate::serdable::ser;
use crate::testing::{
    ExtensionPairFinder, JudgeCode, MemoryChecker, ProcessRunner, TestCase, TestReport,
    Termination,
};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildStatus {
    Passed {
        output: String,
    },
    Skipped,
    Failed {
        #[serde(serialize_with = "ser::display")]
        failure: BuildFailure,
        output: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub build: BuildStatus,
    /// In discovery order. Empty when the build failed.
    pub tests: Vec<TestReport>,
}

impl SuiteReport {
    pub fn build_failed(&self) -> bool {
        matches!(self.build, BuildStatus::Failed { .. })
    }

    pub fn num_failed(&self) -> usize {
        self.tests.iter().filter(|t| t.failed()).count()
    }

    /// The overall result of the run.
    pub fn has_failure(&self) -> bool {
        self.build_failed() || self.num_failed() > 0
    }
}

/// Progress hooks, called from the collecting task only.
pub trait SuiteObserver {
    fn on_build_finished(&mut self, _status: &BuildStatus) {}
    fn on_discovered(&mut self, _testcases: &[TestCase]) {}
    /// Called in completion order, which differs from report order when `jobs > 1`.
    fn on_report(&mut self, _report: &TestReport) {}
}

impl SuiteObserver for () {}

/// Run the suite. `builder == None` skips linting and building.
///
/// Only infrastructure problems (unreadable test dir, unspawnable build) are
/// returned as `Err`; a failed build or failing tests are part of the report.
pub async fn run_suite(
    cfg: &Config,
    builder: Option<&dyn Builder>,
    observer: &mut impl SuiteObserver,
) -> anyhow::Result<SuiteReport> {
    let build = match builder {
        Some(builder) => verify_build(cfg, builder).await?,
        None => BuildStatus::Skipped,
    };
    observer.on_build_finished(&build);
    if let BuildStatus::Failed { failure, .. } = &build {
        log::error!("{}", failure);
        return Ok(SuiteReport {
            build,
            tests: Vec::new(),
        });
    }

    let finder = ExtensionPairFinder::new(&cfg.test.input_ext, &cfg.test.output_ext);
    let testcases =
        TestCase::enumerate(&cfg.test.dir, &finder).context("Failed to find testcases")?;
    ensure!(
        !testcases.is_empty(),
        "No testcases found in {}",
        cfg.test.dir.to_string_lossy()
    );
    log::info!("Found {} testcases", testcases.len());
    observer.on_discovered(&testcases);

    let grader = Arc::new(TestcaseGrader::from_config(cfg));
    let tests = run_testcases(grader, testcases, cfg.test.jobs, observer).await?;
    Ok(SuiteReport { build, tests })
}

/// Lint the sources, then build. Any finding is a [`BuildFailure`].
pub async fn verify_build(cfg: &Config, builder: &dyn Builder) -> anyhow::Result<BuildStatus> {
    let violations = lint::scan_dir(&cfg.lint.source_dir, &cfg.lint.include)
        .context("Failed to scan source files")?;
    if !violations.is_empty() {
        let output = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        return Ok(BuildStatus::Failed {
            failure: BuildFailure::SuppressedDiagnostics(violations),
            output,
        });
    }

    let build = builder.build().await.context("Failed to run build command")?;
    Ok(match check_build(&build, cfg.build.fail_on_warnings) {
        Ok(()) => BuildStatus::Passed {
            output: build.output,
        },
        Err(failure) => BuildStatus::Failed {
            failure,
            output: build.output,
        },
    })
}

/// Grade `testcases` on a pool of `jobs` workers. Reports come back in the
/// order of `testcases` regardless of completion order.
pub async fn run_testcases(
    grader: Arc<TestcaseGrader>,
    testcases: Vec<TestCase>,
    jobs: usize,
    observer: &mut impl SuiteObserver,
) -> anyhow::Result<Vec<TestReport>> {
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();
    let num_testcases = testcases.len();

    for (index, testcase) in testcases.into_iter().enumerate() {
        let grader = grader.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .context("Worker pool closed")?;
            let report = grader.grade(&testcase).await;
            anyhow::Ok((index, report))
        });
    }

    let mut slots: Vec<Option<TestReport>> = vec![None; num_testcases];
    while let Some(joined) = tasks.join_next().await {
        let (index, report) = joined.context("Test worker panicked")??;
        observer.on_report(&report);
        slots[index] = Some(report);
    }
    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .context("Some testcase produced no report")
}

/// Runs one test case: functional run + comparison, then memcheck if enabled.
#[derive(Debug, Clone)]
pub struct TestcaseGrader {
    executable: Vec<String>,
    runner: ProcessRunner,
    memcheck: Option<MemoryChecker>,
}

impl TestcaseGrader {
    pub fn from_config(cfg: &Config) -> Self {
        let limit = cfg.test.timeout();
        let memcheck = cfg
            .memcheck
            .enabled
            .then(|| MemoryChecker::new(cfg.memcheck.clone()).execution_time_limit(limit));
        Self {
            executable: cfg.test.executable.clone(),
            runner: ProcessRunner::new().execution_time_limit(limit),
            memcheck,
        }
    }

    /// Never fails; harness errors become a [`JudgeCode::IE`] report.
    pub async fn grade(&self, testcase: &TestCase) -> TestReport {
        match self.try_grade(testcase).await {
            Ok(report) => report,
            Err(e) => {
                log::error!("Testcase {}: {:#}", testcase.name(), e);
                TestReport::internal_error(testcase.name(), &e)
            }
        }
    }

    async fn try_grade(&self, testcase: &TestCase) -> anyhow::Result<TestReport> {
        let expected = testcase
            .read_reference()
            .map(NormalizedText::new)
            .context("Failed to read reference output")?;
        let input = Some(testcase.input_path());

        let outcome = self.runner.run(&self.executable, input).await?;
        let (judge, actual) = match outcome.comparable_text() {
            Some(text) => {
                let actual = NormalizedText::new(text);
                let judge = if actual == expected {
                    JudgeCode::AC
                } else {
                    JudgeCode::WA
                };
                (judge, actual)
            }
            None => {
                let judge = match outcome.termination {
                    Termination::TimedOut => JudgeCode::TLE,
                    _ => JudgeCode::RE,
                };
                (judge, NormalizedText::new(outcome.display_text()))
            }
        };

        let (memcheck, error) = match &self.memcheck {
            None => (None, None),
            Some(checker) => match checker.check(&self.executable, input).await {
                Ok(verdict) => (Some(verdict), None),
                Err(e) => {
                    log::error!("Testcase {}: memcheck: {:#}", testcase.name(), e);
                    (None, Some(format!("memcheck: {:#}", e)))
                }
            },
        };

        Ok(TestReport {
            name: testcase.name().to_owned(),
            judge,
            expected,
            actual,
            raw_output: outcome.display_text().to_owned(),
            execution_time: outcome.execution_time,
            memcheck,
            error,
        })
    }
}
