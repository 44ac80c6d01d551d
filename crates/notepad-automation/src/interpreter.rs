//! Command-interpreter bridge.
//!
//! Every script runs in a fresh interpreter process: the body is streamed to
//! stdin, stdout and stderr are drained concurrently, and the process is
//! killed if it outlives the script's budget.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::errors::AutomationError;
use crate::script::AutomationScript;

#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run `script` to completion and return its trimmed stdout.
    async fn execute(&self, script: &AutomationScript) -> Result<String, AutomationError>;
}

/// Non-interactive, profile-free, policy-bypassing invocation reading the
/// script from stdin.
pub const POWERSHELL_ARGS: [&str; 6] = [
    "-NoProfile",
    "-NonInteractive",
    "-ExecutionPolicy",
    "Bypass",
    "-Command",
    "-",
];

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug, Clone)]
pub struct PowerShell {
    program: String,
    args: Vec<String>,
}

impl PowerShell {
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_args(program, POWERSHELL_ARGS)
    }

    /// Any interpreter that reads its program from stdin works here.
    pub fn with_args<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Run a raw body under `script.timeout`. Split out from
    /// [`ScriptRunner::execute`] so the bridge can be driven without the
    /// PowerShell rendering.
    pub async fn run_body(
        &self,
        body: &str,
        script: &AutomationScript,
    ) -> Result<String, AutomationError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(target_os = "windows")]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = command
            .spawn()
            .map_err(|e| AutomationError::Spawn(format!("{}: {e}", self.program)))?;
        debug!(
            "[{}] spawned {} (pid={:?}, {} bytes of script)",
            script.name,
            self.program,
            child.id(),
            body.len()
        );

        let stdout = child.stdout.take().map(|s| tokio::spawn(drain(s)));
        let stderr = child.stderr.take().map(|s| tokio::spawn(drain(s)));
        let feeder = child
            .stdin
            .take()
            .map(|stdin| tokio::spawn(feed(stdin, body.to_owned(), script.name)));

        let background: Vec<AbortHandle> = [
            stdout.as_ref().map(|task| task.abort_handle()),
            stderr.as_ref().map(|task| task.abort_handle()),
            feeder.as_ref().map(|task| task.abort_handle()),
        ]
        .into_iter()
        .flatten()
        .collect();

        // The budget covers feeding stdin, the run itself and draining the
        // output pipes, which a leftover grandchild may hold open.
        let run = async {
            let status = child.wait().await?;
            let stdout = collect(stdout).await;
            let stderr = collect(stderr).await;
            Ok::<_, std::io::Error>((status, stdout, stderr))
        };
        let outcome = tokio::time::timeout(script.timeout, run).await;

        let (status, stdout, stderr) = match outcome {
            Ok(finished) => finished?,
            Err(_) => {
                warn!(
                    "[{}] exceeded {}ms, killing interpreter",
                    script.name,
                    script.timeout.as_millis()
                );
                background.iter().for_each(AbortHandle::abort);
                if matches!(child.try_wait(), Ok(None)) {
                    if let Err(e) = child.kill().await {
                        warn!("[{}] failed to kill interpreter: {}", script.name, e);
                    }
                }
                return Err(AutomationError::Timeout {
                    timeout_ms: script.timeout.as_millis() as u64,
                });
            }
        };

        if status.success() {
            Ok(stdout.trim().to_string())
        } else {
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                match status.code() {
                    Some(code) => format!("{} exited with code {code}", self.program),
                    None => format!("{} was terminated by a signal", self.program),
                }
            } else {
                stderr.to_string()
            };
            debug!("[{}] failed: {}", script.name, message);
            Err(AutomationError::InterpreterFailure(message))
        }
    }
}

impl Default for PowerShell {
    fn default() -> Self {
        Self::new("powershell.exe")
    }
}

#[async_trait]
impl ScriptRunner for PowerShell {
    async fn execute(&self, script: &AutomationScript) -> Result<String, AutomationError> {
        self.run_body(&script.render(), script).await
    }
}

async fn feed(mut stdin: ChildStdin, body: String, name: &'static str) {
    // A child that dies early closes its end; the exit status tells the real
    // story.
    if let Err(e) = stdin.write_all(body.as_bytes()).await {
        debug!("[{}] stdin write failed: {}", name, e);
    }
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        debug!("output stream closed with error: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn collect(handle: Option<tokio::task::JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}
