//! The external solver seam.
//!
//! Adjudication itself happens in a separate program. [`Adjudicator`] hides
//! how it is reached; [`ProcessAdjudicator`] runs it as a child process with
//! a hard deadline.

use std::io::{self, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::protocol::solver::SolverOutputError;

/// How often a running solver is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long pipe threads get to wind down after a killed solver.
const KILL_GRACE: Duration = Duration::from_millis(200);

/// Why an adjudication attempt produced no usable verdicts.
#[derive(Debug, Error)]
pub enum AdjudicationError {
    #[error("failed to start solver '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("solver i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("solver did not answer within {0:?}")]
    Timeout(Duration),

    #[error("solver reported: {0}")]
    Diagnostic(String),

    #[error("solver exited with {0}")]
    Exit(ExitStatus),

    #[error("unreadable solver output: {0}")]
    Output(#[from] SolverOutputError),
}

/// Runs one solver invocation: board and orders in, verdicts out.
pub trait Adjudicator {
    fn run(&self, input: &str) -> Result<String, AdjudicationError>;
}

impl<F> Adjudicator for F
where
    F: Fn(&str) -> Result<String, AdjudicationError>,
{
    fn run(&self, input: &str) -> Result<String, AdjudicationError> {
        self(input)
    }
}

/// Runs the solver as a child process.
#[derive(Debug, Clone)]
pub struct ProcessAdjudicator {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ProcessAdjudicator {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        ProcessAdjudicator {
            program: program.into(),
            args,
            timeout,
        }
    }
}

fn joined<T>(handle: thread::JoinHandle<io::Result<T>>) -> io::Result<T> {
    handle
        .join()
        .map_err(|_| io::Error::other("solver pipe thread panicked"))?
}

fn drain(mut pipe: impl Read + Send + 'static) -> thread::JoinHandle<io::Result<String>> {
    thread::spawn(move || {
        let mut buf = String::new();
        pipe.read_to_string(&mut buf)?;
        Ok(buf)
    })
}

/// Joins `handle` if it finishes before `until` and reports whether it did.
///
/// A thread still blocked at the deadline is left detached: a grandchild of
/// the solver can hold the pipe open long after the solver itself is gone.
fn settle<T>(handle: thread::JoinHandle<T>, until: Instant) -> bool {
    while !handle.is_finished() {
        if Instant::now() >= until {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
    let _ = handle.join();
    true
}

impl Adjudicator for ProcessAdjudicator {
    fn run(&self, input: &str) -> Result<String, AdjudicationError> {
        let start = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| AdjudicationError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let missing = || io::Error::other("solver pipe unavailable");
        let mut stdin = child.stdin.take().ok_or_else(missing)?;
        let stdout = drain(child.stdout.take().ok_or_else(missing)?);
        let stderr = drain(child.stderr.take().ok_or_else(missing)?);

        // Closing stdin once written tells the solver the batch is complete.
        let input = input.to_owned();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let deadline = start + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                log::warn!("{} still running after {:?}, killing it", self.program, self.timeout);
                let _ = child.kill();
                let _ = child.wait();
                let grace = Instant::now() + KILL_GRACE;
                let settled = [settle(writer, grace), settle(stdout, grace), settle(stderr, grace)];
                let stuck = settled.iter().filter(|done| !**done).count();
                if stuck > 0 {
                    log::warn!("{}: {stuck} pipe thread(s) still blocked after kill, detaching", self.program);
                }
                return Err(AdjudicationError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        match joined(writer) {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
            _ => {}
        }
        let out = joined(stdout)?;
        let err = joined(stderr)?;
        log::debug!("{} finished with {status} in {:?}", self.program, start.elapsed());

        if !err.trim().is_empty() {
            return Err(AdjudicationError::Diagnostic(err.trim().to_string()));
        }
        if !status.success() {
            return Err(AdjudicationError::Exit(status));
        }
        Ok(out)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout_ms: u64) -> ProcessAdjudicator {
        ProcessAdjudicator::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            Duration::from_millis(timeout_ms),
        )
    }

    #[test]
    fn solver_reads_stdin_and_answers() {
        let out = sh("cat", 5000).run("Vie A Austria\n\n\n").unwrap();
        assert_eq!(out, "Vie A Austria\n\n\n");
    }

    #[test]
    fn diagnostics_fail_the_attempt() {
        let err = sh("cat >/dev/null; echo 'bad order' >&2; echo '1: SUCCEEDS'", 5000)
            .run("x\n")
            .unwrap_err();
        assert!(matches!(err, AdjudicationError::Diagnostic(ref d) if d == "bad order"));
    }

    #[test]
    fn nonzero_exit_fails_the_attempt() {
        let err = sh("cat >/dev/null; exit 3", 5000).run("x\n").unwrap_err();
        assert!(matches!(err, AdjudicationError::Exit(s) if s.code() == Some(3)));
    }

    #[test]
    fn slow_solver_times_out() {
        let started = Instant::now();
        let err = sh("exec sleep 5", 100).run("").unwrap_err();
        assert!(matches!(err, AdjudicationError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn timeout_does_not_wait_for_grandchildren() {
        let started = Instant::now();
        let err = sh("sleep 5 & sleep 5", 100).run("").unwrap_err();
        assert!(matches!(err, AdjudicationError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let adj = ProcessAdjudicator::new("/nonexistent/solver", Vec::new(), Duration::from_secs(1));
        assert!(matches!(adj.run(""), Err(AdjudicationError::Spawn { .. })));
    }

    #[test]
    fn closures_are_adjudicators() {
        let canned = |_: &str| -> Result<String, AdjudicationError> { Ok("\n".to_string()) };
        assert_eq!(canned.run("anything").unwrap(), "\n");
    }
}
