//! Processes and top-level windows of the target application.

use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{debug, info};

use crate::errors::AutomationError;
use crate::platforms;

/// A process of the target application, known only by id. The OS owns its
/// lifetime; it is re-resolved on every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedProcess {
    pub pid: u32,
    pub name: String,
    /// Seconds since the epoch, used to pick the newest instance.
    pub started_at: u64,
}

/// Opaque top-level window reference. Zero means "not ready yet", never an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub const NOT_READY: WindowHandle = WindowHandle(0);

    pub fn is_ready(self) -> bool {
        self.0 != 0
    }
}

/// Entry of `list_windows`, serialized with the field names callers expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSummary {
    #[serde(rename = "Id")]
    pub id: u32,
    #[serde(rename = "MainWindowTitle")]
    pub title: String,
}

pub trait ProcessHost: Send + Sync {
    fn find_process(&self, pid: u32) -> Option<ManagedProcess>;

    /// Running processes whose executable name matches `name`, ignoring case
    /// and a trailing `.exe`.
    fn processes_named(&self, name: &str) -> Vec<ManagedProcess>;

    /// Current main window of `pid`, or [`WindowHandle::NOT_READY`].
    fn main_window(&self, pid: u32) -> WindowHandle;

    fn window_title(&self, window: WindowHandle) -> String;

    /// Bring `window` to the foreground. `Ok(false)` means the request was
    /// issued but the window manager did not grant foreground.
    fn activate(&self, window: WindowHandle) -> Result<bool, AutomationError>;

    /// Start `program` detached from this process and return only its id.
    fn spawn_detached(&self, program: &str, args: &[String]) -> Result<u32, AutomationError>;
}

pub fn normalize_process_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

/// Production host: `sysinfo` for processes, Win32 for windows.
pub struct SystemProcessHost {
    system: Mutex<System>,
}

impl Default for SystemProcessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProcessHost {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn to_managed(pid: Pid, process: &sysinfo::Process) -> ManagedProcess {
        ManagedProcess {
            pid: pid.as_u32(),
            name: process.name().to_string_lossy().to_string(),
            started_at: process.start_time(),
        }
    }
}

impl ProcessHost for SystemProcessHost {
    fn find_process(&self, pid: u32) -> Option<ManagedProcess> {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        let pid = Pid::from_u32(pid);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        system.process(pid).map(|p| Self::to_managed(pid, p))
    }

    fn processes_named(&self, name: &str) -> Vec<ManagedProcess> {
        let wanted = normalize_process_name(name);
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        // Name and start time come with every refresh kind.
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );
        system
            .processes()
            .iter()
            .filter(|(_, p)| normalize_process_name(&p.name().to_string_lossy()) == wanted)
            .map(|(pid, p)| Self::to_managed(*pid, p))
            .collect()
    }

    fn main_window(&self, pid: u32) -> WindowHandle {
        WindowHandle(platforms::main_window_for_pid(pid))
    }

    fn window_title(&self, window: WindowHandle) -> String {
        platforms::window_title(window.0)
    }

    fn activate(&self, window: WindowHandle) -> Result<bool, AutomationError> {
        platforms::bring_window_to_front(window.0)
    }

    fn spawn_detached(&self, program: &str, args: &[String]) -> Result<u32, AutomationError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        platforms::detach(&mut command);

        let child = command
            .spawn()
            .map_err(|e| AutomationError::Spawn(format!("{program}: {e}")))?;
        let pid = child.id();
        // Dropping the handle neither waits for nor kills the process.
        drop(child);

        info!("Spawned {} detached (pid={})", program, pid);
        debug!("spawn args: {:?}", args);
        Ok(pid)
    }
}
