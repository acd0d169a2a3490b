//! Ledger command execution
//!
//! Every read and write against the marketplace is a ledger CLI invocation run
//! through the system shell. [`LedgerClient`] never fails: launch errors and
//! timeouts come back as the command's "output", so parsers downstream must
//! tolerate arbitrary text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::console::{preview, DIM, RESET, YELLOW};
use crate::trajectory::{TrajectoryEvent, TrajectoryRecorder};

/// Captured output of a ledger command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[cfg(test)]
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into(),
            stderr: String::new(),
        }
    }

    /// Trimmed stdout, or trimmed stderr when stdout is empty
    pub fn text(&self) -> String {
        let stdout = self.stdout.trim();
        if stdout.is_empty() {
            self.stderr.trim().to_string()
        } else {
            stdout.to_string()
        }
    }
}

/// Runs a command line against the ledger
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<CommandOutput>;
}

/// Runs commands through the system shell
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    shell_arg: String,
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        // Determine shell
        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("bash", "-c")
        };

        Self {
            shell: shell.to_string(),
            shell_arg: shell_arg.to_string(),
            timeout,
        }
    }

    /// Use a different shell program
    #[cfg(test)]
    pub fn with_shell(mut self, shell: impl Into<String>, shell_arg: impl Into<String>) -> Self {
        self.shell = shell.into();
        self.shell_arg = shell_arg.into();
        self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg(&self.shell_arg)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                anyhow::anyhow!("Command timed out after {} seconds", self.timeout.as_secs())
            })?
            .context("Failed to execute command")?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Client for the ledger CLI
#[derive(Clone)]
pub struct LedgerClient {
    runner: Arc<dyn CommandRunner>,
    recorder: TrajectoryRecorder,
    echo: bool,
}

impl LedgerClient {
    pub fn new(runner: Arc<dyn CommandRunner>, recorder: TrajectoryRecorder) -> Self {
        Self {
            runner,
            recorder,
            echo: true,
        }
    }

    /// Print commands and output previews to the console
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Read state from the ledger without recording it
    pub async fn query(&self, command: &str) -> String {
        self.invoke(command, false).await
    }

    /// Run a command and record it in the trajectory
    pub async fn execute(&self, command: &str) -> String {
        self.invoke(command, true).await
    }

    async fn invoke(&self, command: &str, record: bool) -> String {
        if self.echo {
            println!("{}$ {}{}", DIM, command, RESET);
        }

        match self.runner.run(command).await {
            Ok(output) => {
                let text = output.text();
                debug!(command, output_len = text.len(), "Ledger command finished");
                if self.echo {
                    println!("Output: {}", preview(&text));
                }
                if record {
                    self.recorder.record(
                        TrajectoryEvent::Command,
                        json!({"cmd": command, "output": text}),
                    );
                }
                text
            }
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(command, error = %error, "Ledger command failed");
                if self.echo {
                    println!("{}Error: {}{}", YELLOW, error, RESET);
                }
                if record {
                    self.recorder.record(
                        TrajectoryEvent::Error,
                        json!({"cmd": command, "error": error}),
                    );
                }
                error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{read_trajectory, FailingRunner, ScriptedLedger};

    fn shell() -> ShellRunner {
        ShellRunner::new(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_shell_echo() {
        let output = shell().run("echo 'hello world'").await.unwrap();
        assert_eq!(output.text(), "hello world");
    }

    #[tokio::test]
    async fn test_shell_prefers_stdout() {
        let output = shell().run("echo out; echo err >&2").await.unwrap();
        assert_eq!(output.text(), "out");
    }

    #[tokio::test]
    async fn test_shell_stderr_when_stdout_empty() {
        let output = shell().run("echo 'error message' >&2; exit 1").await.unwrap();
        assert_eq!(output.text(), "error message");
    }

    #[tokio::test]
    async fn test_shell_timeout() {
        let runner = ShellRunner::new(Duration::from_secs(1));
        let err = runner.run("sleep 10").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_launch_failure_becomes_output() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TrajectoryRecorder::new(dir.path(), "alice");
        let runner = shell().with_shell("/nonexistent/shell-binary", "-c");
        let client = LedgerClient::new(Arc::new(runner), recorder.clone()).with_echo(false);

        let output = client.execute("swechaind query bank balances alice").await;
        assert!(output.contains("Failed to execute command"));

        let entries = read_trajectory(recorder.path());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, TrajectoryEvent::Error);
        assert_eq!(entries[0].data["cmd"], "swechaind query bank balances alice");
    }

    #[tokio::test]
    async fn test_execute_records_full_output_query_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TrajectoryRecorder::new(dir.path(), "alice");
        let long = "x".repeat(250);
        let ledger = ScriptedLedger::new().respond("list-auction", &long);
        let client = LedgerClient::new(Arc::new(ledger), recorder.clone()).with_echo(false);

        assert_eq!(client.query("swechaind query issuemarket list-auction").await, long);
        assert!(read_trajectory(recorder.path()).is_empty());

        assert_eq!(client.execute("swechaind query issuemarket list-auction").await, long);
        let entries = read_trajectory(recorder.path());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, TrajectoryEvent::Command);
        assert_eq!(entries[0].data["output"].as_str().unwrap().len(), 250);
    }

    #[tokio::test]
    async fn test_query_failure_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TrajectoryRecorder::new(dir.path(), "alice");
        let client = LedgerClient::new(Arc::new(FailingRunner), recorder.clone()).with_echo(false);

        let output = client.query("swechaind query bank balances alice").await;
        assert!(output.contains("ledger unavailable"));
        assert!(read_trajectory(recorder.path()).is_empty());
    }
}
