use std::{borrow::Cow, path::Path, time::Duration};

use serde::Serialize;

use super::{result::*, runner::ProcessRunner};
use crate::config::MemcheckConfig;

/// Outcome of re-running a submission under memory instrumentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemorySafetyVerdict {
    pub output: String,
    pub termination: Termination,
    pub is_unsafe: bool,
}

impl MemorySafetyVerdict {
    /// The tool passes the wrapped program's exit code through when it finds
    /// nothing, so only the clean marker in the output counts as safe.
    pub fn from_outcome(outcome: ExecutionOutcome, clean_marker: &str) -> Self {
        match outcome.termination {
            Termination::TimedOut => Self {
                output: TIMED_OUT_TEXT.to_owned(),
                termination: outcome.termination,
                is_unsafe: true,
            },
            Termination::CrashedBySignal { .. } => Self {
                output: outcome.output,
                termination: outcome.termination,
                is_unsafe: true,
            },
            Termination::Normal { .. } => Self {
                is_unsafe: !scan_clean_marker(&outcome.output, clean_marker),
                output: outcome.output,
                termination: outcome.termination,
            },
        }
    }
}

pub fn scan_clean_marker(output: &str, clean_marker: &str) -> bool {
    !clean_marker.is_empty() && output.contains(clean_marker)
}

#[derive(Debug, Clone)]
pub struct MemoryChecker {
    cfg: MemcheckConfig,
    runner: ProcessRunner,
}

impl MemoryChecker {
    pub fn new(cfg: MemcheckConfig) -> Self {
        Self {
            cfg,
            runner: ProcessRunner::new(),
        }
    }

    pub fn execution_time_limit(mut self, limit: Duration) -> Self {
        self.runner = self.runner.execution_time_limit(limit);
        self
    }

    /// Shell command line wrapping `argv` with the instrumentation tool.
    pub fn compose_command_line<S: AsRef<str>>(&self, argv: &[S]) -> String {
        let mut parts: Vec<Cow<str>> = Vec::with_capacity(argv.len() + self.cfg.flags.len() + 2);
        parts.push(Cow::Borrowed(self.cfg.tool.as_str()));
        parts.extend(self.cfg.flags.iter().map(|f| shell_quote(f)));
        parts.push(Cow::Owned(format!(
            "--error-exitcode={}",
            self.cfg.error_exitcode
        )));
        parts.extend(argv.iter().map(|a| shell_quote(a.as_ref())));

        let line = parts.join(" ");
        if self.cfg.disable_core_dumps {
            format!("ulimit -c 0 && {}", line)
        } else {
            line
        }
    }

    pub async fn check<S: AsRef<str>>(
        &self,
        argv: &[S],
        stdin_file: Option<&Path>,
    ) -> anyhow::Result<MemorySafetyVerdict> {
        let cmdline = self.compose_command_line(argv);
        let shell = self.cfg.shell.to_string_lossy();
        let outcome = self
            .runner
            .run(&[&*shell, "-c", cmdline.as_str()], stdin_file)
            .await?;
        Ok(MemorySafetyVerdict::from_outcome(
            outcome,
            &self.cfg.clean_marker,
        ))
    }
}

/// Quote `s` for a POSIX shell unless it is made of plainly safe characters.
pub fn shell_quote(s: &str) -> Cow<str> {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c);
    if !s.is_empty() && s.chars().all(is_safe) {
        Cow::Borrowed(s)
    } else {
        // terminate ' -> escaped ' -> reopen '
        Cow::Owned(format!("'{}'", s.replace('\'', r"'\''")))
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    const MARKER: &str = "ERROR SUMMARY: 0 errors from 0 contexts";

    fn normal(output: &str) -> ExecutionOutcome {
        ExecutionOutcome {
            output: output.into(),
            termination: Termination::Normal { exit_code: Some(1) },
            execution_time: Duration::from_millis(10),
        }
    }

    #[test]
    fn marker_present_means_safe() {
        let out = format!("==1== HEAP SUMMARY:\n==1== {} (suppressed: 0 from 0)\n", MARKER);
        let v = MemorySafetyVerdict::from_outcome(normal(&out), MARKER);
        assert!(!v.is_unsafe);
    }

    #[test]
    fn marker_missing_means_unsafe() {
        for out in [
            "",
            "==1== ERROR SUMMARY: 3 errors from 2 contexts",
            "==1== ERROR SUMMARY: 0 errors from 0 con",
        ] {
            let v = MemorySafetyVerdict::from_outcome(normal(out), MARKER);
            assert!(v.is_unsafe, "output: {:?}", out);
        }
    }

    #[test]
    fn timeout_is_unsafe_with_sentinel() {
        let v = MemorySafetyVerdict::from_outcome(
            ExecutionOutcome {
                output: String::new(),
                termination: Termination::TimedOut,
                execution_time: Duration::from_secs(10),
            },
            MARKER,
        );
        assert!(v.is_unsafe);
        assert_eq!(v.output, TIMED_OUT_TEXT);
    }

    #[test]
    fn composes_default_command_line() {
        let checker = MemoryChecker::new(MemcheckConfig::default());
        assert_eq!(
            checker.compose_command_line(&["./interpreter"]),
            "ulimit -c 0 && valgrind --leak-check=full --show-leak-kinds=all \
             --errors-for-leak-kinds=all --error-exitcode=99 ./interpreter"
        );
    }

    #[test]
    fn quotes_unsafe_arguments() {
        assert_eq!(shell_quote("./a.out"), "./a.out");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[tokio::test]
    async fn check_runs_wrapped_command_through_shell() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-memcheck.sh");
        // Stands in for the instrumentation tool: drops flags, runs the program, reports clean.
        fs::write(
            &tool,
            format!(
                "while [ \"${{1#--}}\" != \"$1\" ]; do shift; done\n\"$@\"\necho '{}'\n",
                MARKER
            ),
        )
        .unwrap();
        let input = dir.path().join("in.scm");
        fs::write(&input, "hello\n").unwrap();

        let cfg = MemcheckConfig {
            tool: format!("sh {}", tool.display()),
            ..MemcheckConfig::default()
        };
        let checker = MemoryChecker::new(cfg).execution_time_limit(Duration::from_secs(5));
        let v = checker.check(&["cat"], Some(&input)).await.unwrap();
        assert!(!v.is_unsafe, "{}", v.output);
        assert!(v.output.starts_with("hello\n"));
    }

    #[tokio::test]
    async fn check_flags_unclean_tool_output() {
        let cfg = MemcheckConfig {
            tool: "echo".into(),
            flags: vec![],
            ..MemcheckConfig::default()
        };
        let checker = MemoryChecker::new(cfg).execution_time_limit(Duration::from_secs(5));
        let v = checker.check(&["./interpreter"], None).await.unwrap();
        assert!(v.is_unsafe);
        assert_eq!(v.output, "--error-exitcode=99 ./interpreter\n");
    }
}
