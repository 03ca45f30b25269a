//! Runner - executes generated programs in an external interpreter
//!
//! Code is fed to `<interpreter> -` over stdin; stdout is the text the output
//! parser consumes. Nothing is sandboxed: the interpreter runs with the
//! caller's privileges.

use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL_MS: u64 = 20;

/// How long pipe readers get to hit EOF once the process group is killed
const DRAIN_GRACE_MS: u64 = 200;

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Interpreter executable (looked up on PATH)
    pub interpreter: String,
    /// Wall-clock limit for one run
    pub timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Captured output of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Runner errors
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to start {interpreter}: {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Execution timed out after {secs} seconds")]
    Timeout { secs: u64, stdout: String },

    #[error("Execution failed (exit code {}): {}", exit_label(.code), last_line(.stderr))]
    Failed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl RunError {
    /// Whatever the program printed before failing
    pub fn partial_stdout(&self) -> Option<&str> {
        match self {
            RunError::Timeout { stdout, .. } | RunError::Failed { stdout, .. } => Some(stdout.as_str()),
            _ => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Last non-empty line, which for Python is the exception message
fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
}

/// Something that can execute a program and capture its output
pub trait CodeRunner: Send + Sync {
    fn run(&self, code: &str) -> Result<RunOutput, RunError>;
}

/// Runs code with a Python interpreter subprocess
pub struct PythonRunner {
    interpreter: String,
    timeout: Duration,
}

impl PythonRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn spawn(&self) -> Result<Child, RunError> {
        let mut command = Command::new(&self.interpreter);
        command
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so a timeout also reaches anything the program spawned
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command.spawn().map_err(|source| RunError::Spawn {
            interpreter: self.interpreter.clone(),
            source,
        })
    }
}

/// SIGKILL the whole process group led by `pid`
#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) takes no pointers; a stale group id only yields ESRCH
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!("Process group {} already gone", pgid);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

/// Pipe reader that keeps whatever arrived, even if EOF never comes
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

impl Drain {
    fn start<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = thread::spawn(move || {
            let Some(mut pipe) = pipe else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
        });
        Self { buf, handle }
    }

    /// Wait for EOF until `deadline`; false if the pipe is still open
    fn wait_until(&self, deadline: Instant) -> bool {
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
        }
        true
    }

    /// Everything read so far. A reader still blocked on the pipe is detached.
    fn take(self) -> String {
        let bytes = self.buf.lock().map(|buf| buf.clone()).unwrap_or_default();
        if self.handle.is_finished() {
            let _ = self.handle.join();
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn grace_deadline() -> Instant {
    Instant::now() + Duration::from_millis(DRAIN_GRACE_MS)
}

impl CodeRunner for PythonRunner {
    fn run(&self, code: &str) -> Result<RunOutput, RunError> {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut child = self.spawn()?;
        let pid = child.id();
        info!("Running generated code with {}", self.interpreter);

        let stdout = Drain::start(child.stdout.take());
        let stderr = Drain::start(child.stderr.take());

        // Written off-thread: an interpreter that never reads must not stall the timeout
        if let Some(mut stdin) = child.stdin.take() {
            let code = code.to_string();
            thread::spawn(move || {
                // A program that exits early closes its stdin; that is not our error
                if let Err(e) = stdin.write_all(code.as_bytes()) {
                    debug!("Interpreter closed stdin early: {}", e);
                }
            });
        }

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    kill_group(pid);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e.into());
                }
            }
            if Instant::now() >= deadline {
                warn!("Generated code exceeded {}s, killing", self.timeout.as_secs());
                kill_group(pid);
                let _ = child.kill();
                let _ = child.wait();
                stdout.wait_until(grace_deadline());
                return Err(RunError::Timeout {
                    secs: self.timeout.as_secs(),
                    stdout: stdout.take(),
                });
            }
            thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
        };

        // Background processes can hold the pipes open past the interpreter's exit
        if !(stdout.wait_until(deadline) && stderr.wait_until(deadline)) {
            warn!("Output still open after exit, killing leftover processes");
            kill_group(pid);
            let grace = grace_deadline();
            stdout.wait_until(grace);
            stderr.wait_until(grace);
        }

        let stdout = stdout.take();
        let stderr = stderr.take();
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            exit = ?status.code(),
            stdout_bytes = stdout.len(),
            duration_ms,
            "Interpreter finished"
        );

        if status.success() {
            Ok(RunOutput {
                stdout,
                stderr,
                duration_ms,
            })
        } else {
            Err(RunError::Failed {
                code: status.code(),
                stdout,
                stderr,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_line_skips_blank() {
        assert_eq!(last_line("Traceback\n  ...\nZeroDivisionError: division by zero\n\n"), "ZeroDivisionError: division by zero");
        assert_eq!(last_line(""), "");
    }

    #[test]
    fn test_failed_error_message() {
        let err = RunError::Failed {
            code: Some(1),
            stdout: "x = 1\n".to_string(),
            stderr: "Traceback\nNameError: name 'y' is not defined\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Execution failed (exit code 1): NameError: name 'y' is not defined"
        );
        assert_eq!(err.partial_stdout(), Some("x = 1\n"));
    }

    #[test]
    fn test_missing_interpreter_is_spawn_error() {
        let runner = PythonRunner::new(&RunnerConfig {
            interpreter: "orca-no-such-interpreter".to_string(),
            timeout_secs: 5,
        });
        assert!(matches!(runner.run("print(1)"), Err(RunError::Spawn { .. })));
    }

    #[cfg(unix)]
    fn sh_runner(timeout_secs: u64) -> PythonRunner {
        PythonRunner::new(&RunnerConfig {
            interpreter: "sh".to_string(),
            timeout_secs,
        })
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_stdout() {
        let output = sh_runner(5).run("echo x = 1").unwrap();
        assert_eq!(output.stdout, "x = 1\n");
        assert_eq!(output.stderr, "");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_keeps_both_streams() {
        match sh_runner(5).run("echo x = 1; echo err >&2; exit 3") {
            Err(RunError::Failed { code, stdout, stderr }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stdout, "x = 1\n");
                assert_eq!(stderr, "err\n");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_interpreter() {
        let start = Instant::now();
        let result = sh_runner(1).run("exec sleep 5");
        assert!(matches!(result, Err(RunError::Timeout { secs: 1, .. })));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_reaches_child_processes() {
        // `sleep` inherits stdout; killing only the shell would leave the pipe open
        let start = Instant::now();
        match sh_runner(1).run("echo x = 1; sleep 6; echo done") {
            Err(RunError::Timeout { stdout, .. }) => assert_eq!(stdout, "x = 1\n"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_background_process_does_not_outlive_limit() {
        let start = Instant::now();
        let output = sh_runner(1).run("sleep 6 &\necho x = 2").unwrap();
        assert_eq!(output.stdout, "x = 2\n");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_when_interpreter_never_reads_stdin() {
        // Far larger than a pipe buffer, and `sleep` never reads it
        let code = format!("exec sleep 5\n{}", "#".repeat(1 << 20));
        let start = Instant::now();
        assert!(matches!(sh_runner(1).run(&code), Err(RunError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
