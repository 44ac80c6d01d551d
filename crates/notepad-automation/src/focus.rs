use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::AutomationConfig;
use crate::errors::AutomationError;
use crate::process::{ManagedProcess, ProcessHost, WindowHandle};
use crate::window::resolve_target;

/// A window that was just brought to the foreground. Valid for the current
/// operation only; nothing caches it across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusedWindow {
    pub process: ManagedProcess,
    pub window: WindowHandle,
}

/// Puts the target window in front before any key reaches it.
///
/// Unlike the warm-up wait after launch, running out of budget here is a
/// hard `WindowNotReady` error.
#[derive(Clone)]
pub struct FocusController {
    host: Arc<dyn ProcessHost>,
    config: Arc<AutomationConfig>,
}

impl FocusController {
    pub fn new(host: Arc<dyn ProcessHost>, config: Arc<AutomationConfig>) -> Self {
        Self { host, config }
    }

    pub async fn focus(&self, pid: Option<u32>) -> Result<FocusedWindow, AutomationError> {
        let retries = self.config.focus_retries;

        for attempt in 1..=retries {
            // Re-resolve every round: without a pid, a newer instance may
            // have appeared since the last poll.
            if let Some(process) = resolve_target(self.host.as_ref(), &self.config.process_name, pid)
            {
                let window = self.host.main_window(process.pid);
                if window.is_ready() {
                    debug!(
                        "focus: pid {} window {:#x} ready on attempt {}",
                        process.pid, window.0, attempt
                    );
                    if !self.host.activate(window)? {
                        warn!(
                            "focus: foreground not granted for pid {} (window {:#x})",
                            process.pid, window.0
                        );
                    }
                    tokio::time::sleep(self.config.focus_settle()).await;
                    return Ok(FocusedWindow { process, window });
                }
            }

            if attempt < retries {
                tokio::time::sleep(self.config.focus_interval()).await;
            }
        }

        warn!(
            "focus: no window for {:?} within {:?} ({} attempts)",
            pid,
            self.config.focus_budget(),
            retries
        );
        Err(AutomationError::WindowNotReady {
            pid,
            attempts: retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;
    use std::time::Duration;

    fn controller(host: Arc<FakeHost>) -> FocusController {
        FocusController::new(host, Arc::new(AutomationConfig::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn nonexistent_pid_fails_within_budget() {
        let host = Arc::new(FakeHost::new());
        let config = AutomationConfig::default();
        let started = tokio::time::Instant::now();

        let err = controller(host.clone()).focus(Some(31337)).await.unwrap_err();

        assert!(matches!(
            err,
            AutomationError::WindowNotReady {
                pid: Some(31337),
                attempts: 50
            }
        ));
        assert!(started.elapsed() <= config.focus_budget());
        assert!(host.activations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn activates_once_window_appears() {
        let host = Arc::new(FakeHost::new());
        host.add_process(12, "notepad.exe", 10);
        host.window_after_polls(12, 0x500, 4);

        let started = tokio::time::Instant::now();
        let focused = controller(host.clone()).focus(Some(12)).await.unwrap();

        assert_eq!(focused.window, WindowHandle(0x500));
        assert_eq!(focused.process.pid, 12);
        assert_eq!(host.activations(), vec![WindowHandle(0x500)]);
        // three intervals of polling plus the settle delay
        assert_eq!(started.elapsed(), Duration::from_millis(3 * 100 + 150));
    }

    #[tokio::test(start_paused = true)]
    async fn without_pid_targets_newest_instance() {
        let host = Arc::new(FakeHost::new());
        host.add_process(1, "notepad.exe", 100);
        host.set_window(1, 0x10, "old");
        host.add_process(2, "notepad.exe", 200);
        host.set_window(2, 0x20, "new");

        let focused = controller(host.clone()).focus(None).await.unwrap();
        assert_eq!(focused.window, WindowHandle(0x20));
    }

    #[tokio::test(start_paused = true)]
    async fn no_running_instance_is_window_not_ready() {
        let host = Arc::new(FakeHost::new());
        let err = controller(host).focus(None).await.unwrap_err();
        assert!(matches!(
            err,
            AutomationError::WindowNotReady { pid: None, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn activation_error_propagates() {
        let host = Arc::new(FakeHost::new());
        host.add_process(3, "notepad.exe", 1);
        host.set_window(3, 0x30, "doc");
        host.fail_activate(true);

        let err = controller(host).focus(Some(3)).await.unwrap_err();
        assert!(matches!(err, AutomationError::Platform(_)));
    }
}
