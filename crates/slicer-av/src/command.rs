//! Builder for executing external tool commands with timeout support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use slicer_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> slicer_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-v").arg("error")
///     .arg("-show_entries").arg("format=duration")
///     .arg("/path/to/song.mp3")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            current_dir: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Run the process from the given working directory.
    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`slicer_core::Error::Tool`] if the process times out (message
    ///   includes the timeout duration).
    /// - Returns [`slicer_core::Error::Tool`] if the process exits with a non-zero
    ///   status (message is the trimmed stderr).
    /// - Returns [`slicer_core::Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> slicer_core::Result<ToolOutput> {
        self.execute_with_lines(|_| {}).await
    }

    /// Execute the command, handing every stdout line to `on_line` as soon as
    /// it is read. The full stdout is still returned in the [`ToolOutput`].
    pub async fn execute_with_lines(
        &self,
        mut on_line: impl FnMut(&str) + Send,
    ) -> slicer_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!("Running {} {}", program_name, self.args.join(" "));

        let mut child = cmd.spawn().map_err(|e| slicer_core::Error::Tool {
            tool: program_name.clone(),
            message: format!("failed to spawn: {e}"),
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Drain stderr concurrently so a chatty process cannot block on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf).await;
            }
            buf
        });

        let run = async {
            let mut collected = String::new();
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    on_line(&line);
                    collected.push_str(&line);
                    collected.push('\n');
                }
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, collected))
        };

        let result = tokio::time::timeout(self.timeout, run).await;

        match result {
            Ok(Ok((status, stdout))) => {
                let stderr = stderr_task.await.unwrap_or_default();
                let tool_output = ToolOutput {
                    status,
                    stdout,
                    stderr: String::from_utf8_lossy(&stderr).to_string(),
                };

                if !status.success() {
                    return Err(slicer_core::Error::Tool {
                        tool: program_name,
                        message: failure_message(status, &tool_output.stderr),
                    });
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(slicer_core::Error::Tool {
                tool: program_name,
                message: format!("I/O error waiting for process: {e}"),
            }),
            Err(_elapsed) => {
                // The child is dropped with `kill_on_drop`, which terminates it.
                stderr_task.abort();
                Err(slicer_core::Error::Tool {
                    tool: program_name,
                    message: format!("timed out after {:?}", self.timeout),
                })
            }
        }
    }
}

/// The last non-empty stderr line is usually the actual reason; fall back
/// to the exit status when stderr is empty.
fn failure_message(status: ExitStatus, stderr: &str) -> String {
    match stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) => line.to_string(),
        None => format!("exited with status {status}"),
    }
}
