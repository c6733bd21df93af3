use std::{
    ffi::OsStr,
    fs::File,
    os::unix::process::{CommandExt, ExitStatusExt},
    path::Path,
    process::Stdio,
    time::Duration,
};

use anyhow::{bail, Context as _};
use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::{self, Pid},
};
use tokio::{io::AsyncReadExt, process::Command};

use super::result::*;

/// Runs one external command with a wall-clock limit, capturing stdout and
/// stderr into a single stream.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    execution_time_limit: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub const DEFAULT_EXEC_TIME_LIMIT: Duration = Duration::from_secs(10);

    pub fn new() -> Self {
        Self {
            execution_time_limit: Self::DEFAULT_EXEC_TIME_LIMIT,
        }
    }

    pub fn execution_time_limit(mut self, limit: Duration) -> Self {
        self.execution_time_limit = limit;
        self
    }

    pub fn get_exec_time_limit(&self) -> Duration {
        self.execution_time_limit
    }

    /// Run `argv` with `stdin_file` (or nothing) as standard input.
    ///
    /// Any exit code counts as a normal termination. A run killed by SIGSEGV
    /// is reported as a crash, and one exceeding the limit is killed together
    /// with its whole process group.
    pub async fn run<S>(
        &self,
        argv: &[S],
        stdin_file: Option<&Path>,
    ) -> anyhow::Result<ExecutionOutcome>
    where
        S: AsRef<OsStr>,
    {
        let Some((program, args)) = argv.split_first() else {
            bail!("Empty command line")
        };
        let cmdline = display_command(argv);

        let stdin = match stdin_file {
            Some(path) => File::open(path).map(Stdio::from).with_context(|| {
                format!("Failed to open input file {}", path.to_string_lossy())
            })?,
            None => Stdio::null(),
        };

        let (pipe_reader, pipe_writer) = unistd::pipe().context("Failed to create output pipe")?;
        let stderr_writer = pipe_writer
            .try_clone()
            .context("Failed to duplicate output pipe")?;

        log::debug!("Spawning: {}", cmdline);
        let mut proc = {
            let mut std_cmd = std::process::Command::new(program);
            std_cmd
                .args(args)
                .stdin(stdin)
                .stdout(pipe_writer)
                .stderr(stderr_writer)
                .process_group(0);
            let mut cmd = Command::from(std_cmd);
            cmd.kill_on_drop(true);
            cmd.spawn()
                .with_context(|| format!("Failed to spawn '{}'", cmdline))?
            // `cmd` drops here, closing our copies of the write end; otherwise EOF never arrives.
        };
        // Taken now: `Child::id` turns `None` once the child is reaped, while
        // its background processes may still hold the pipe.
        let pgid = proc
            .id()
            .map(|pid| Pid::from_raw(pid as i32))
            .context("Spawned process has no pid")?;

        let mut output = tokio::fs::File::from_std(File::from(pipe_reader));
        let mut output_buf = Vec::new();

        let start_at = tokio::time::Instant::now();
        let res = tokio::time::timeout(self.execution_time_limit, async {
            tokio::try_join!(output.read_to_end(&mut output_buf), proc.wait())
                .context("Failed to communicate with subprocess")
        })
        .await;
        let execution_time = start_at.elapsed();

        let outcome = match res {
            Err(_) => {
                kill_process_group(pgid, &mut proc).await;
                ExecutionOutcome {
                    output: String::new(),
                    termination: Termination::TimedOut,
                    execution_time,
                }
            }

            Ok(Err(e)) => bail!(e),

            Ok(Ok((_, exit_status))) => {
                let termination = match exit_status.signal().map(Signal::try_from) {
                    Some(Ok(Signal::SIGSEGV)) => Termination::CrashedBySignal {
                        signal: Signal::SIGSEGV,
                    },
                    _ => Termination::Normal {
                        exit_code: exit_status.code(),
                    },
                };
                ExecutionOutcome {
                    output: String::from_utf8_lossy(&output_buf).into_owned(),
                    termination,
                    execution_time,
                }
            }
        };
        Ok(outcome)
    }
}

async fn kill_process_group(pgid: Pid, proc: &mut tokio::process::Child) {
    // The child leads its own group (process_group(0)), so its pid is the pgid.
    // The group outlives a reaped leader as long as any member is alive.
    if let Err(e) = signal::killpg(pgid, Signal::SIGKILL) {
        if e != Errno::ESRCH {
            log::warn!("Failed to kill process group {}: {}", pgid, e);
        }
    }
    proc.kill()
        .await
        .unwrap_or_else(|e| log::warn!("Failed to kill timed-out process: {:#}", e));
}

pub fn display_command<S: AsRef<OsStr>>(argv: &[S]) -> String {
    argv.iter()
        .map(|a| a.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
