use crate::config::HandlerConfig;
use crate::error::{Result, WorkflowError};
use crate::policy::Action;
use crate::types::HandlerKey;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

// ---------------------------------------------------------------------------
// PhaseHandler
// ---------------------------------------------------------------------------

/// What a handler reports back on success. The orchestrator only relies on
/// success vs. failure; the output is kept for logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOutput {
    pub output: String,
}

/// A persona: performs one workflow phase's side effects.
///
/// Retries, cancellation and timeouts are the handler's own business; the
/// orchestrator calls `execute` once per step and waits for it.
pub trait PhaseHandler {
    fn execute(&self, action: &Action) -> Result<HandlerOutput>;
}

impl<F> PhaseHandler for F
where
    F: Fn(&Action) -> Result<HandlerOutput>,
{
    fn execute(&self, action: &Action) -> Result<HandlerOutput> {
        self(action)
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A secret forwarded to handler processes under its original variable name.
#[derive(Clone)]
pub struct Credential {
    pub env_var: String,
    value: String,
}

impl Credential {
    pub fn new(env_var: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
            value: value.into(),
        }
    }

    /// Read the credential from the process environment, if set and non-empty.
    pub fn from_env(env_var: &str) -> Option<Self> {
        std::env::var(env_var)
            .ok()
            .filter(|v| !v.is_empty())
            .map(|v| Self::new(env_var, v))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("env_var", &self.env_var)
            .field("value", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CommandHandler
// ---------------------------------------------------------------------------

/// Runs a persona as `sh -c <command>` in the project root.
///
/// The action is passed through the environment:
/// `HANDOVER_HANDLER`, `HANDOVER_PROMPT`, `HANDOVER_SOURCE_ARTIFACT` and
/// `HANDOVER_NEXT_PHASE`. A non-zero exit, a spawn failure or a timeout is a
/// handler failure.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    key: HandlerKey,
    command: String,
    root: PathBuf,
    timeout: Option<Duration>,
    credential: Option<Credential>,
}

impl CommandHandler {
    pub fn new(key: HandlerKey, command: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            key,
            command: command.into(),
            root: root.into(),
            timeout: None,
            credential: None,
        }
    }

    pub fn from_config(
        key: HandlerKey,
        config: &HandlerConfig,
        root: &Path,
        credential: Option<Credential>,
    ) -> Self {
        Self::new(key, config.command.clone(), root)
            .with_timeout(match config.timeout_seconds {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            })
            .with_credential(credential)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    fn fail(&self, reason: impl Into<String>) -> WorkflowError {
        WorkflowError::HandlerFailed {
            handler: self.key,
            reason: reason.into(),
        }
    }
}

impl PhaseHandler for CommandHandler {
    fn execute(&self, action: &Action) -> Result<HandlerOutput> {
        if self.command.trim().is_empty() {
            return Err(self.fail("handler command is empty"));
        }

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .current_dir(&self.root)
            .env("HANDOVER_HANDLER", action.handler.as_str())
            .env("HANDOVER_PROMPT", &action.prompt)
            .env("HANDOVER_SOURCE_ARTIFACT", &action.source_artifact)
            .env("HANDOVER_NEXT_PHASE", &action.next_phase)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref cred) = self.credential {
            cmd.env(&cred.env_var, &cred.value);
        }
        // Own process group, so a timeout kills everything the command started.
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(handler = %self.key, command = %self.command, "spawning handler");
        let (success, code, output) = run_with_timeout(cmd, self.timeout).map_err(|e| self.fail(e))?;

        if success {
            Ok(HandlerOutput { output })
        } else {
            let mut reason = match code {
                Some(c) => format!("exited with code {c}"),
                None => "terminated by signal".to_string(),
            };
            if !output.is_empty() {
                reason.push_str(": ");
                reason.push_str(last_line(&output));
            }
            Err(self.fail(reason))
        }
    }
}

/// Spawn `cmd` and wait for it, killing it after `timeout`.
/// Returns (success, exit code, combined output) or a failure description.
///
/// stdout/stderr are drained on dedicated threads so a chatty handler cannot
/// fill a pipe buffer and deadlock; the wait happens on a third thread so the
/// timeout can be enforced with `recv_timeout`.
fn run_with_timeout(
    mut cmd: Command,
    timeout: Option<Duration>,
) -> std::result::Result<(bool, Option<i32>, String), String> {
    let mut child = cmd.spawn().map_err(|e| format!("failed to spawn: {e}"))?;
    let child_pid = child.id();

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_thread = std::thread::spawn(move || read_all(stdout_handle));
    let stderr_thread = std::thread::spawn(move || read_all(stderr_handle));

    let wait_result = match timeout {
        None => child.wait(),
        Some(timeout_dur) => {
            let (tx, rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(child.wait());
            });
            match rx.recv_timeout(timeout_dur) {
                Ok(result) => result,
                Err(_) => {
                    kill_process_group(child_pid);
                    return Err(format!("timed out after {timeout_dur:?}"));
                }
            }
        }
    };

    let stdout_buf = stdout_thread.join().unwrap_or_default();
    let stderr_buf = stderr_thread.join().unwrap_or_default();
    let status = wait_result.map_err(|e| format!("wait failed: {e}"))?;

    Ok((
        status.success(),
        status.code(),
        combine_output(&stdout_buf, &stderr_buf),
    ))
}

fn read_all<R: std::io::Read>(handle: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut r) = handle {
        let _ = r.read_to_string(&mut buf);
    }
    buf
}

/// Combine stdout/stderr and cap to 10KB (keeping the tail).
fn combine_output(stdout: &str, stderr: &str) -> String {
    let output = if stderr.is_empty() {
        stdout.to_string()
    } else if stdout.is_empty() {
        stderr.to_string()
    } else {
        format!("{stdout}\n{stderr}")
    };
    const MAX_OUTPUT: usize = 10 * 1024;
    let trimmed = output.trim();
    if trimmed.len() > MAX_OUTPUT {
        let mut start = trimmed.len() - MAX_OUTPUT;
        while !trimmed.is_char_boundary(start) {
            start += 1;
        }
        trimmed[start..].to_string()
    } else {
        trimmed.to_string()
    }
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default().trim()
}

/// SIGKILL the process group led by `pgid`. Best-effort; errors are ignored.
fn kill_process_group(pgid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg("--")
        .arg(format!("-{pgid}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
