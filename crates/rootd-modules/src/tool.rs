//! External tool execution with per-call timeouts.
//!
//! Privileged modules never format shell strings; every action that reaches
//! the operating system goes through a [`ToolCommand`] built from an argv
//! vector. The runner spawns the child with piped stdio, drains stdout and
//! stderr on dedicated reader threads so a chatty tool cannot deadlock on a
//! full pipe, and polls for exit against a deadline, killing the child when
//! the budget is exhausted. A slow tool therefore stalls only the connection
//! worker that invoked it, never the daemon.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::ModuleError;

const TOOL_TARGET: &str = "rootd_modules::tool";

/// Default time budget for a tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval while waiting for a child to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One external command invocation with its argument vector and budget.
///
/// # Example
///
/// ```no_run
/// use rootd_modules::ToolCommand;
///
/// let output = ToolCommand::new("firewall-cmd")
///     .arg("--get-default-zone")
///     .run()
///     .unwrap();
/// assert!(output.success());
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Creates a command with the default timeout and no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Overrides the time budget.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the program name.
    #[must_use]
    pub const fn program(&self) -> &str {
        self.program.as_str()
    }

    /// Runs the command to completion, capturing its output.
    ///
    /// A non-zero exit status is not an error at this layer; callers inspect
    /// [`ToolOutput::success`] and decide how to report it.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::ToolSpawn`] when the program cannot be started
    /// and [`ModuleError::ToolTimeout`] when it outlives its budget.
    pub fn run(&self) -> Result<ToolOutput, ModuleError> {
        debug!(
            target: TOOL_TARGET,
            program = %self.program,
            args = ?self.args,
            "spawning external tool"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ModuleError::ToolSpawn {
                command: self.program.clone(),
                message: source.to_string(),
                source: Some(Arc::new(source)),
            })?;

        let stdout_reader = spawn_drain(child.stdout.take());
        let stderr_reader = spawn_drain(child.stderr.take());

        let status = self.wait_for_exit(&mut child)?;
        let stdout = join_drain(stdout_reader);
        let stderr = join_drain(stderr_reader);

        debug!(
            target: TOOL_TARGET,
            program = %self.program,
            status,
            "external tool exited"
        );

        Ok(ToolOutput {
            status,
            stdout,
            stderr,
        })
    }

    /// Polls the child for exit, killing it when the deadline passes.
    fn wait_for_exit(&self, child: &mut Child) -> Result<i32, ModuleError> {
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status.code().unwrap_or(-1)),
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        warn!(
                            target: TOOL_TARGET,
                            program = %self.program,
                            timeout_secs = self.timeout.as_secs(),
                            "tool timed out, killing process"
                        );
                        drop(child.kill());
                        drop(child.wait());
                        return Err(ModuleError::ToolTimeout {
                            command: self.program.clone(),
                            timeout_secs: self.timeout.as_secs(),
                        });
                    }
                    thread::sleep(EXIT_POLL_INTERVAL);
                }
                Err(source) => {
                    return Err(ModuleError::ToolSpawn {
                        command: self.program.clone(),
                        message: source.to_string(),
                        source: Some(Arc::new(source)),
                    });
                }
            }
        }
    }
}

/// Captured output of a completed tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    status: i32,
    stdout: String,
    stderr: String,
}

impl ToolOutput {
    /// Returns `true` when the tool exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.status == 0
    }

    /// Returns the process exit status.
    #[must_use]
    pub const fn status(&self) -> i32 {
        self.status
    }

    /// Returns the captured standard output.
    #[must_use]
    pub const fn stdout(&self) -> &str {
        self.stdout.as_str()
    }

    /// Returns the captured standard error.
    #[must_use]
    pub const fn stderr(&self) -> &str {
        self.stderr.as_str()
    }

    /// Maps a non-zero exit into [`ModuleError::ToolFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::ToolFailed`] carrying the captured stderr when
    /// the tool exited unsuccessfully.
    pub fn require_success(self, command: &str) -> Result<Self, ModuleError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ModuleError::ToolFailed {
                command: command.to_owned(),
                status: self.status,
                stderr: self.stderr.trim().to_owned(),
            })
        }
    }
}

fn spawn_drain<R: Read + Send + 'static>(source: Option<R>) -> Option<JoinHandle<String>> {
    source.map(|mut reader| {
        thread::spawn(move || {
            let mut buffer = String::new();
            if reader.read_to_string(&mut buffer).is_err() {
                buffer.clear();
            }
            buffer
        })
    })
}

fn join_drain(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|reader| reader.join().ok())
        .unwrap_or_default()
}
