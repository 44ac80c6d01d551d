//! In-memory stand-ins for the process host and the interpreter bridge.
//!
//! Compiled for this crate's tests and, behind the `testing` feature, for
//! dependents that want to exercise the sequencer without a desktop.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use crate::errors::AutomationError;
use crate::interpreter::ScriptRunner;
use crate::process::{normalize_process_name, ManagedProcess, ProcessHost, WindowHandle};
use crate::script::AutomationScript;

#[derive(Default)]
struct HostState {
    processes: BTreeMap<u32, ManagedProcess>,
    windows: HashMap<u32, (WindowHandle, String)>,
    /// pid -> (handle, polls until it shows up)
    pending: HashMap<u32, (WindowHandle, u32)>,
    polls: HashMap<u32, u32>,
    activations: Vec<WindowHandle>,
    spawned: Vec<(String, Vec<String>)>,
    next_pid: u32,
    spawn_with_window: bool,
    fail_spawn: bool,
    fail_activate: bool,
}

/// Scriptable [`ProcessHost`].
pub struct FakeHost {
    state: Mutex<HostState>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                next_pid: 4000,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_process(&self, pid: u32, name: &str, started_at: u64) {
        self.state().processes.insert(
            pid,
            ManagedProcess {
                pid,
                name: name.to_string(),
                started_at,
            },
        );
    }

    pub fn set_window(&self, pid: u32, handle: isize, title: &str) {
        self.state()
            .windows
            .insert(pid, (WindowHandle(handle), title.to_string()));
    }

    /// The window of `pid` becomes visible on the `polls`-th query.
    pub fn window_after_polls(&self, pid: u32, handle: isize, polls: u32) {
        self.state()
            .pending
            .insert(pid, (WindowHandle(handle), polls));
    }

    /// Spawned processes get a window right away.
    pub fn spawn_with_window(&self, enabled: bool) {
        self.state().spawn_with_window = enabled;
    }

    pub fn fail_spawn(&self, fail: bool) {
        self.state().fail_spawn = fail;
    }

    pub fn fail_activate(&self, fail: bool) {
        self.state().fail_activate = fail;
    }

    pub fn window_polls(&self, pid: u32) -> u32 {
        self.state().polls.get(&pid).copied().unwrap_or(0)
    }

    pub fn activations(&self) -> Vec<WindowHandle> {
        self.state().activations.clone()
    }

    pub fn spawned(&self) -> Vec<(String, Vec<String>)> {
        self.state().spawned.clone()
    }
}

impl ProcessHost for FakeHost {
    fn find_process(&self, pid: u32) -> Option<ManagedProcess> {
        self.state().processes.get(&pid).cloned()
    }

    fn processes_named(&self, name: &str) -> Vec<ManagedProcess> {
        let wanted = normalize_process_name(name);
        self.state()
            .processes
            .values()
            .filter(|p| normalize_process_name(&p.name) == wanted)
            .cloned()
            .collect()
    }

    fn main_window(&self, pid: u32) -> WindowHandle {
        let mut state = self.state();
        let polls = {
            let count = state.polls.entry(pid).or_insert(0);
            *count += 1;
            *count
        };
        if !state.processes.contains_key(&pid) {
            return WindowHandle::NOT_READY;
        }
        if let Some((handle, after)) = state.pending.get(&pid).copied() {
            if polls >= after {
                state.pending.remove(&pid);
                state.windows.insert(pid, (handle, String::new()));
            }
        }
        state
            .windows
            .get(&pid)
            .map(|(h, _)| *h)
            .unwrap_or(WindowHandle::NOT_READY)
    }

    fn window_title(&self, window: WindowHandle) -> String {
        self.state()
            .windows
            .values()
            .find(|(h, _)| *h == window)
            .map(|(_, t)| t.clone())
            .unwrap_or_default()
    }

    fn activate(&self, window: WindowHandle) -> Result<bool, AutomationError> {
        let mut state = self.state();
        if state.fail_activate {
            return Err(AutomationError::Platform("activation refused".to_string()));
        }
        state.activations.push(window);
        Ok(true)
    }

    fn spawn_detached(&self, program: &str, args: &[String]) -> Result<u32, AutomationError> {
        let mut state = self.state();
        if state.fail_spawn {
            return Err(AutomationError::Spawn(format!("{program}: not found")));
        }
        state.next_pid += 1;
        let pid = state.next_pid;
        state.spawned.push((program.to_string(), args.to_vec()));
        state.processes.insert(
            pid,
            ManagedProcess {
                pid,
                name: program.to_string(),
                started_at: u64::from(pid),
            },
        );
        if state.spawn_with_window {
            state
                .windows
                .insert(pid, (WindowHandle(pid as isize * 16), "Untitled - Notepad".to_string()));
        }
        Ok(pid)
    }
}

/// [`ScriptRunner`] that records scripts instead of running them.
#[derive(Default)]
pub struct RecordingRunner {
    scripts: Mutex<Vec<AutomationScript>>,
    failures: Mutex<VecDeque<AutomationError>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next script fails with `error` (after being recorded).
    pub fn fail_next(&self, error: AutomationError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    pub fn scripts(&self) -> Vec<AutomationScript> {
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ScriptRunner for RecordingRunner {
    async fn execute(&self, script: &AutomationScript) -> Result<String, AutomationError> {
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(script.clone());
        match self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            Some(error) => Err(error),
            None => Ok(String::new()),
        }
    }
}
