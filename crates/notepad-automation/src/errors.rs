use thiserror::Error;

/// Failures surfaced by the automation core.
///
/// `WindowNotReady` and `Timeout` are deliberately distinct: the former means
/// the focus budget ran out before the target exposed a window, the latter
/// means an interpreter process overran its execution budget and was killed.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Script timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Script failed: {0}")]
    InterpreterFailure(String),

    #[error("Window not ready{} after {} attempts", fmt_pid(.pid), .attempts)]
    WindowNotReady { pid: Option<u32>, attempts: u32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_pid(pid: &Option<u32>) -> String {
    match pid {
        Some(pid) => format!(" (pid={pid})"),
        None => String::new(),
    }
}
