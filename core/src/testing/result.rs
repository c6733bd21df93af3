use std::time::Duration;

use nix::sys::signal::Signal;
use serde::Serialize;

use super::memcheck::MemorySafetyVerdict;
use crate::normalize::NormalizedText;
use crate::serdable::ser;

pub const TIMED_OUT_TEXT: &str = "Timed out";
pub const SEGFAULT_TEXT: &str = "Segmentation fault";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    Normal {
        exit_code: Option<i32>,
    },
    TimedOut,
    CrashedBySignal {
        #[serde(serialize_with = "ser::signal_name")]
        signal: Signal,
    },
}

/// Result of one process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Merged stdout and stderr, decoded lossily. Empty on timeout.
    pub output: String,
    pub termination: Termination,
    pub execution_time: Duration,
}

impl ExecutionOutcome {
    /// Text usable for output comparison. `None` when the run did not complete
    /// normally, so such a run never matches any reference.
    pub fn comparable_text(&self) -> Option<&str> {
        match self.termination {
            Termination::Normal { .. } => Some(&self.output),
            Termination::TimedOut | Termination::CrashedBySignal { .. } => None,
        }
    }

    /// Text for human-facing reports.
    pub fn display_text(&self) -> &str {
        match self.termination {
            Termination::Normal { .. } => &self.output,
            Termination::TimedOut => TIMED_OUT_TEXT,
            Termination::CrashedBySignal { .. } => SEGFAULT_TEXT,
        }
    }

    pub fn is_success(&self) -> bool {
        self.termination == Termination::Normal { exit_code: Some(0) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum JudgeCode {
    /// Output matched.
    AC,
    /// Output differed.
    WA,
    TLE,
    /// Crashed by segmentation fault.
    RE,
    /// The harness itself could not run the case.
    IE,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub name: String,
    pub judge: JudgeCode,
    pub expected: NormalizedText,
    pub actual: NormalizedText,
    /// Unnormalized output (or the sentinel text), kept for diagnosis.
    pub raw_output: String,
    #[serde(serialize_with = "ser::duration_as_millis")]
    pub execution_time: Duration,
    pub memcheck: Option<MemorySafetyVerdict>,
    pub error: Option<String>,
}

impl TestReport {
    pub fn internal_error(name: impl Into<String>, err: &anyhow::Error) -> Self {
        Self {
            name: name.into(),
            judge: JudgeCode::IE,
            expected: NormalizedText::default(),
            actual: NormalizedText::default(),
            raw_output: String::new(),
            execution_time: Duration::ZERO,
            memcheck: None,
            error: Some(format!("{:#}", err)),
        }
    }

    pub fn is_memory_unsafe(&self) -> bool {
        self.memcheck.as_ref().map_or(false, |v| v.is_unsafe)
    }

    pub fn failed(&self) -> bool {
        self.judge != JudgeCode::AC || self.is_memory_unsafe() || self.error.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn outcome(termination: Termination) -> ExecutionOutcome {
        ExecutionOutcome {
            output: "partial (1 2".into(),
            termination,
            execution_time: Duration::from_millis(3),
        }
    }

    #[test]
    fn sentinels_are_not_comparable() {
        let t = outcome(Termination::TimedOut);
        assert_eq!(t.comparable_text(), None);
        assert_eq!(t.display_text(), TIMED_OUT_TEXT);

        let c = outcome(Termination::CrashedBySignal {
            signal: Signal::SIGSEGV,
        });
        assert_eq!(c.comparable_text(), None);
        assert_eq!(c.display_text(), SEGFAULT_TEXT);
    }

    #[test]
    fn normal_exit_keeps_output_regardless_of_code() {
        let o = outcome(Termination::Normal { exit_code: Some(1) });
        assert_eq!(o.comparable_text(), Some("partial (1 2"));
        assert!(!o.is_success());
        assert!(outcome(Termination::Normal { exit_code: Some(0) }).is_success());
    }

    #[test]
    fn report_fails_on_memory_violation_even_if_output_matched() {
        let mut r = TestReport::internal_error("t", &anyhow::anyhow!("boom"));
        r.judge = JudgeCode::AC;
        r.error = None;
        assert!(!r.failed());

        r.memcheck = Some(MemorySafetyVerdict {
            output: "definitely lost".into(),
            termination: Termination::Normal { exit_code: Some(99) },
            is_unsafe: true,
        });
        assert!(r.failed());
    }

    #[test]
    fn termination_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Termination::CrashedBySignal {
            signal: Signal::SIGSEGV,
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"crashed_by_signal","signal":"SIGSEGV"}"#);
    }
}
