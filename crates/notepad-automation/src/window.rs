//! Window acquisition: finding a window that appears some time after spawn.

use std::time::Duration;
use tracing::debug;

use crate::process::{ManagedProcess, ProcessHost, WindowHandle, WindowSummary};

/// Outcome of a best-effort wait. Never an error: a missing window at this
/// stage is normal and later operations poll again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowReadiness {
    Ready(WindowHandle),
    NotReady,
}

impl WindowReadiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, WindowReadiness::Ready(_))
    }
}

/// Poll `pid` up to `retries` times, `interval` apart, until it exposes a
/// main window.
pub async fn await_main_window(
    host: &dyn ProcessHost,
    pid: u32,
    retries: u32,
    interval: Duration,
) -> WindowReadiness {
    for attempt in 1..=retries {
        if host.find_process(pid).is_some() {
            let handle = host.main_window(pid);
            if handle.is_ready() {
                debug!("pid {} main window ready on attempt {}", pid, attempt);
                return WindowReadiness::Ready(handle);
            }
        }
        if attempt < retries {
            tokio::time::sleep(interval).await;
        }
    }
    debug!("pid {} has no main window after {} attempts", pid, retries);
    WindowReadiness::NotReady
}

/// Newest instance wins; pid breaks ties between equal start times.
pub fn most_recent(processes: Vec<ManagedProcess>) -> Option<ManagedProcess> {
    processes
        .into_iter()
        .max_by_key(|p| (p.started_at, p.pid))
}

/// The process an operation should act on: `pid` when given, otherwise the
/// most recently started instance of `process_name`.
pub fn resolve_target(
    host: &dyn ProcessHost,
    process_name: &str,
    pid: Option<u32>,
) -> Option<ManagedProcess> {
    match pid {
        Some(pid) => host.find_process(pid),
        None => most_recent(host.processes_named(process_name)),
    }
}

/// Instances of `process_name` that currently have a main window.
pub fn visible_windows(host: &dyn ProcessHost, process_name: &str) -> Vec<WindowSummary> {
    let mut processes = host.processes_named(process_name);
    processes.sort_by_key(|p| (p.started_at, p.pid));
    processes
        .into_iter()
        .filter_map(|p| {
            let handle = host.main_window(p.pid);
            handle.is_ready().then(|| WindowSummary {
                id: p.pid,
                title: host.window_title(handle),
            })
        })
        .collect()
}
