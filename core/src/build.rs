use async_trait::async_trait;
use lazy_regex::{lazy_regex, Lazy, Regex};

use crate::lint::LintViolation;
use crate::testing::{ExecutionOutcome, ProcessRunner, Termination};

/// Compiler diagnostics such as `main.c:3:5: warning: ...`, `cc1: warning: ...`
/// or `/usr/bin/ld: warning: ...`.
static RE_WARNING_DIAGNOSTIC: Lazy<Regex> =
    lazy_regex!(r"(?m)^[^\s:][^:\n]*(?::\d+)*:\s*warning\s*:");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub termination: Termination,
    /// Merged stdout and stderr of the build.
    pub output: String,
    pub warnings: usize,
}

impl BuildOutput {
    pub fn from_outcome(outcome: ExecutionOutcome) -> Self {
        Self {
            warnings: count_warnings(&outcome.output),
            termination: outcome.termination,
            output: outcome.output,
        }
    }
}

#[async_trait]
pub trait Builder: Send + Sync {
    async fn build(&self) -> anyhow::Result<BuildOutput>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildFailure {
    #[error("Please do not disable warnings ({} suppression(s) found)", .0.len())]
    SuppressedDiagnostics(Vec<LintViolation>),

    #[error("Compile error: exitcode={}", fmt_exit_code(.exit_code))]
    Compile { exit_code: Option<i32> },

    #[error("Compile error: process crashed")]
    Crashed,

    #[error("Build timed out")]
    TimedOut,

    #[error("Test failed because of {count} compiler warning(s)")]
    Warnings { count: usize },
}

/// Runs a build command (e.g. `make`) through [`ProcessRunner`].
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    argv: Vec<String>,
    runner: ProcessRunner,
}

impl CommandBuilder {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            runner: ProcessRunner::new(),
        }
    }

    pub fn execution_time_limit(mut self, limit: std::time::Duration) -> Self {
        self.runner = self.runner.execution_time_limit(limit);
        self
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    async fn build(&self) -> anyhow::Result<BuildOutput> {
        let outcome = self.runner.run(&self.argv, None).await?;
        Ok(BuildOutput::from_outcome(outcome))
    }
}

fn fmt_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (killed by signal)".to_owned(), |c| c.to_string())
}

pub fn count_warnings(output: &str) -> usize {
    RE_WARNING_DIAGNOSTIC.find_iter(output).count()
}

pub fn check_build(build: &BuildOutput, fail_on_warnings: bool) -> Result<(), BuildFailure> {
    match build.termination {
        Termination::TimedOut => return Err(BuildFailure::TimedOut),
        Termination::CrashedBySignal { .. } => return Err(BuildFailure::Crashed),
        Termination::Normal { exit_code: Some(0) } => (),
        Termination::Normal { exit_code } => return Err(BuildFailure::Compile { exit_code }),
    }
    if fail_on_warnings && build.warnings > 0 {
        return Err(BuildFailure::Warnings {
            count: build.warnings,
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    fn output(exit_code: Option<i32>, text: &str) -> BuildOutput {
        BuildOutput::from_outcome(ExecutionOutcome {
            output: text.into(),
            termination: Termination::Normal { exit_code },
            execution_time: Duration::from_millis(1),
        })
    }

    #[test]
    fn counts_compiler_warnings_only() {
        let log = "\
clang -g -Wall -c main.c
main.c:12:9: warning: unused variable 'x' [-Wunused-variable]
main.c: In function 'eval':
interpreter.c:40: warning: implicit declaration
cc1: warning: command-line option ignored
/usr/bin/ld: warning: creating DT_TEXTREL
echo \"no warnings here\"
printf(\"warning: %d\", x);
";
        assert_eq!(count_warnings(log), 4);
        assert_eq!(count_warnings("gcc -o interpreter main.o\n"), 0);
    }

    #[test]
    fn check_build_classifies_failures() {
        assert!(check_build(&output(Some(0), "ok\n"), true).is_ok());
        assert!(matches!(
            check_build(&output(Some(2), "make: *** Error 1\n"), true),
            Err(BuildFailure::Compile { exit_code: Some(2) })
        ));

        let warned = output(Some(0), "main.c:1:1: warning: x\n");
        assert!(matches!(
            check_build(&warned, true),
            Err(BuildFailure::Warnings { count: 1 })
        ));
        assert!(check_build(&warned, false).is_ok());

        let timed_out = BuildOutput {
            termination: Termination::TimedOut,
            output: String::new(),
            warnings: 0,
        };
        assert!(matches!(
            check_build(&timed_out, true),
            Err(BuildFailure::TimedOut)
        ));
    }

    #[tokio::test]
    async fn command_builder_captures_output() {
        let builder = CommandBuilder::new(vec![
            "sh".into(),
            "-c".into(),
            "echo 'x.c:1:2: warning: hm' >&2; exit 0".into(),
        ])
        .execution_time_limit(Duration::from_secs(5));
        let out = builder.build().await.unwrap();
        assert_eq!(out.warnings, 1);
        assert_eq!(out.termination, Termination::Normal { exit_code: Some(0) });
        assert!(out.output.contains("warning: hm"));
    }
}
