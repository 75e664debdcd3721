//! Bounded subprocess execution and command cascades.
//!
//! Every external command runs with a wall-clock timeout. Stdout and stderr
//! go to anonymous temp files rather than pipes so a chatty child can never
//! deadlock the parent. A `CommandCascade` tries a preference-ordered list of
//! commands and settles on the first one that is present and succeeds.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::errors::{GateError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished (or killed) subprocess.
#[derive(Debug)]
pub struct RunOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run `program` with `args` in `cwd`, killing it after `timeout`.
///
/// A missing binary maps to `GateError::CommandNotFound` so callers can
/// cascade to an alternative; a timeout maps to `GateError::CommandTimeout`.
pub fn run_with_timeout(
    program: &str,
    args: &[String],
    cwd: impl AsRef<Path>,
    timeout: Duration,
) -> Result<RunOutput> {
    let mut stdout_file = tempfile::tempfile()?;
    let mut stderr_file = tempfile::tempfile()?;

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd.as_ref())
        .stdin(Stdio::null())
        .stdout(stdout_file.try_clone()?)
        .stderr(stderr_file.try_clone()?)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GateError::CommandNotFound(program.to_string())
            } else {
                GateError::Io(e)
            }
        })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if started.elapsed() >= timeout {
                    // Best effort; the process may have exited in between.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(GateError::CommandTimeout(timeout, program.to_string()));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    };

    let mut stdout = String::new();
    let mut stderr = String::new();
    stdout_file.seek(SeekFrom::Start(0))?;
    stdout_file.read_to_string(&mut stdout)?;
    stderr_file.seek(SeekFrom::Start(0))?;
    stderr_file.read_to_string(&mut stderr)?;

    debug!(
        program,
        exit = ?status.code(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Command finished"
    );

    Ok(RunOutput {
        exit_code: status.code(),
        stdout,
        stderr,
    })
}

// ── Command cascades ─────────────────────────────────────────────────────────

/// How a cascade run ended.
#[derive(Debug)]
pub enum CascadeOutcome {
    /// A command ran; payload is the command string and its output.
    Ran { command: String, output: RunOutput },
    /// Every candidate was missing from the environment.
    NoRunner,
}

/// A preference-ordered list of shell-ish command strings.
///
/// Candidates are split with `shlex`, so quoted arguments survive. Missing
/// binaries, timeouts, and non-zero exits all cascade to the next candidate;
/// the first candidate that exits 0 settles the outcome. When every
/// candidate ran but failed, the last failing run is reported so callers
/// still see real output; `NoRunner` means nothing could be executed at all.
pub struct CommandCascade {
    label: &'static str,
    candidates: Vec<String>,
    cwd: PathBuf,
    timeout: Duration,
}

impl CommandCascade {
    pub fn new(
        label: &'static str,
        candidates: &[&str],
        cwd: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            label,
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
            cwd: cwd.into(),
            timeout,
        }
    }

    /// The standard test-runner cascade for Python projects.
    pub fn tests(cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::new(
            "tests",
            &[
                "pytest -q",
                "python -m pytest -q",
                "python -m unittest discover",
            ],
            cwd,
            timeout,
        )
    }

    /// The standard lint cascade.
    pub fn lint(cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::new(
            "lint",
            &["ruff check .", "flake8 .", "python -m pyflakes ."],
            cwd,
            timeout,
        )
    }

    pub fn run(&self) -> Result<CascadeOutcome> {
        let mut last_failure: Option<(String, RunOutput)> = None;
        for candidate in &self.candidates {
            let Some(parts) = shlex::split(candidate) else {
                warn!(candidate, "Unparseable command string, skipping");
                continue;
            };
            let Some((program, args)) = parts.split_first() else {
                continue;
            };
            match run_with_timeout(program, args, &self.cwd, self.timeout) {
                Ok(output) if output.success() => {
                    return Ok(CascadeOutcome::Ran {
                        command: candidate.clone(),
                        output,
                    });
                }
                Ok(output) => {
                    debug!(candidate, exit = ?output.exit_code, "Candidate failed, trying next");
                    last_failure = Some((candidate.clone(), output));
                }
                Err(GateError::CommandNotFound(_)) => {
                    debug!(candidate, "Not installed, trying next");
                }
                Err(GateError::CommandTimeout(timeout, _)) => {
                    warn!(candidate, ?timeout, "Candidate timed out, trying next");
                }
                Err(e) => return Err(e),
            }
        }
        if let Some((command, output)) = last_failure {
            return Ok(CascadeOutcome::Ran { command, output });
        }
        warn!(label = self.label, "No runnable command found in cascade");
        Ok(CascadeOutcome::NoRunner)
    }
}
