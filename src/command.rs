//! Builder for executing external tool commands with timeout support.
//!
//! Every transcoder and probe invocation goes through [`ToolCommand`], which
//! turns the exit-code contract of the external programs into a typed
//! `Result`: spawn failures, timeouts and non-zero exits all become
//! [`ShrinkError::Tool`] carrying the tail of the tool's stderr.

use crate::error::ShrinkError;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Lines of stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 12;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// ```no_run
/// # async fn example() -> Result<(), media_mirror::ShrinkError> {
/// use media_mirror::command::ToolCommand;
/// use std::path::PathBuf;
///
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
///     .arg("/path/to/clip.mov")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append multiple arguments.
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Short name of the program, used in messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`ShrinkError::Tool`] when the process cannot be spawned, exits
    /// with a non-zero status, or runs longer than the timeout (the child is
    /// killed in that case).
    pub async fn execute(&self) -> Result<ToolOutput, ShrinkError> {
        let tool = self.program_name();
        debug!("Running {} {:?}", self.program.display(), self.args);

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ShrinkError::Tool {
                tool: tool.clone(),
                message: format!("failed to spawn: {e}"),
            })?;

        let start_time = Instant::now();
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;
        let elapsed = start_time.elapsed();

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ShrinkError::Tool {
                    tool,
                    message: format!("I/O error waiting for process: {e}"),
                })
            }
            // dropping the future drops the child, kill_on_drop reaps it
            Err(_) => {
                return Err(ShrinkError::Tool {
                    tool,
                    message: format!("timed out after {:?}", self.timeout),
                })
            }
        };

        let tool_output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            return Err(ShrinkError::Tool {
                tool,
                message: format!(
                    "exited with {} after {:.1}s: {}",
                    output.status,
                    elapsed.as_secs_f64(),
                    stderr_tail(&tool_output.stderr)
                ),
            });
        }

        debug!("{} completed in {:.1}s", tool, elapsed.as_secs_f64());
        Ok(tool_output)
    }
}

/// Last few non-empty lines of a tool's stderr.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join(" | ");
    if tail.is_empty() {
        "(no diagnostic output)".to_string()
    } else {
        tail
    }
}
