//! High-level editor actions.
//!
//! Every window-targeting action runs focus -> build script -> execute. The
//! window is resolved again on each call; only process ids survive between
//! calls.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::AutomationConfig;
use crate::errors::AutomationError;
use crate::focus::{FocusController, FocusedWindow};
use crate::interpreter::ScriptRunner;
use crate::process::{ProcessHost, WindowSummary};
use crate::script::{keys, AutomationScript};
use crate::window::{await_main_window, visible_windows, WindowReadiness};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    SavedAs(String),
}

#[derive(Clone)]
pub struct Sequencer {
    runner: Arc<dyn ScriptRunner>,
    host: Arc<dyn ProcessHost>,
    focus: FocusController,
    config: Arc<AutomationConfig>,
}

fn require_non_empty(name: &str, value: &str) -> Result<(), AutomationError> {
    if value.is_empty() {
        return Err(AutomationError::InvalidArgument(format!(
            "'{name}' is required and must not be empty"
        )));
    }
    Ok(())
}

impl Sequencer {
    pub fn new(
        runner: Arc<dyn ScriptRunner>,
        host: Arc<dyn ProcessHost>,
        config: AutomationConfig,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            focus: FocusController::new(host.clone(), config.clone()),
            runner,
            host,
            config,
        }
    }

    fn script(&self, name: &'static str) -> AutomationScript {
        AutomationScript::new(name, self.config.script_timeout())
    }

    fn settle(&self) -> Duration {
        Duration::from_millis(self.config.settle_delay_ms)
    }

    /// Launch the editor, optionally on `file_path`, and give its window a
    /// chance to appear before returning the new pid.
    pub async fn open(&self, file_path: Option<&str>) -> Result<u32, AutomationError> {
        let args: Vec<String> = file_path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| vec![p.to_string()])
            .unwrap_or_default();

        let pid = self.host.spawn_detached(&self.config.application, &args)?;

        match await_main_window(
            self.host.as_ref(),
            pid,
            self.config.window_warmup_retries,
            self.config.warmup_interval(),
        )
        .await
        {
            WindowReadiness::Ready(window) => {
                info!("Opened pid {} with window {:#x}", pid, window.0)
            }
            WindowReadiness::NotReady => {
                debug!("Opened pid {}; window not up yet, later calls will poll", pid)
            }
        }
        Ok(pid)
    }

    /// Running instances with a window. Never fails; an empty list covers
    /// "nothing open".
    pub fn list_windows(&self) -> Vec<WindowSummary> {
        visible_windows(self.host.as_ref(), &self.config.process_name)
    }

    /// Paste `text` through the clipboard, which handles multi-line and
    /// non-ASCII content more reliably than typing it.
    pub async fn paste_text(
        &self,
        text: &str,
        pid: Option<u32>,
    ) -> Result<FocusedWindow, AutomationError> {
        require_non_empty("text", text)?;
        let focused = self.focus.focus(pid).await?;

        let script = self
            .script("paste_text")
            .set_clipboard(text)
            .send_keys(keys::PASTE)
            .sleep(self.settle());
        self.runner.execute(&script).await?;

        info!("Pasted {} chars into pid {}", text.chars().count(), focused.process.pid);
        Ok(focused)
    }

    /// Inject a raw SendKeys specification.
    pub async fn send_keys(
        &self,
        keys: &str,
        pid: Option<u32>,
    ) -> Result<FocusedWindow, AutomationError> {
        require_non_empty("keys", keys)?;
        let focused = self.focus.focus(pid).await?;

        let script = self.script("send_keys").send_keys(keys);
        self.runner.execute(&script).await?;
        Ok(focused)
    }

    /// Save the document; with `file_path`, drive the "Save As" dialog:
    /// save chord, paste the path over the file name field, confirm.
    pub async fn save(
        &self,
        file_path: Option<&str>,
        pid: Option<u32>,
    ) -> Result<SaveOutcome, AutomationError> {
        let file_path = file_path.map(str::trim).filter(|p| !p.is_empty());
        self.focus.focus(pid).await?;

        let Some(path) = file_path else {
            let script = self.script("save_file").send_keys(keys::SAVE);
            self.runner.execute(&script).await?;
            return Ok(SaveOutcome::Saved);
        };

        let script = self
            .script("save_file_as")
            .send_keys(keys::SAVE)
            .sleep(self.settle())
            .set_clipboard(path)
            .send_keys(keys::SELECT_ALL)
            .send_keys(keys::PASTE)
            .sleep(self.settle())
            .send_keys(keys::CONFIRM);
        self.runner.execute(&script).await?;
        Ok(SaveOutcome::SavedAs(path.to_string()))
    }

    /// Close the window and answer the unsaved-changes prompt if it shows
    /// up. Only focus failures are reported; the keystrokes are best-effort
    /// because the prompt may or may not appear.
    pub async fn close(&self, pid: Option<u32>, dont_save: bool) -> Result<(), AutomationError> {
        let focused = self.focus.focus(pid).await?;

        let response = if dont_save {
            self.config.dialog_dont_save_key.as_str()
        } else {
            self.config.dialog_save_key.as_str()
        };
        let script = self
            .script("close")
            .send_keys(keys::CLOSE_WINDOW)
            .sleep(self.settle())
            .send_keys(response);

        if let Err(e) = self.runner.execute(&script).await {
            warn!(
                "close: ignoring failure for pid {}: {}",
                focused.process.pid, e
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::WindowHandle;
    use crate::script::ScriptStep;
    use crate::testing::{FakeHost, RecordingRunner};

    fn setup() -> (Arc<FakeHost>, Arc<RecordingRunner>, Sequencer) {
        let host = Arc::new(FakeHost::new());
        let runner = Arc::new(RecordingRunner::new());
        let sequencer = Sequencer::new(runner.clone(), host.clone(), AutomationConfig::default());
        (host, runner, sequencer)
    }

    fn with_window(host: &FakeHost, pid: u32) {
        host.add_process(pid, "notepad.exe", u64::from(pid));
        host.set_window(pid, pid as isize * 2, "Untitled - Notepad");
    }

    #[tokio::test(start_paused = true)]
    async fn paste_sets_clipboard_then_pastes() {
        let (host, runner, sequencer) = setup();
        with_window(&host, 40);

        let text = "line1\nline2\"@trick";
        sequencer.paste_text(text, Some(40)).await.unwrap();

        let scripts = runner.scripts();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].clipboard_writes(), vec![text]);
        assert_eq!(scripts[0].injected_keys(), vec!["^v"]);
        assert_eq!(host.activations(), vec![WindowHandle(80)]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_text_rejected_before_focus() {
        let (host, runner, sequencer) = setup();
        with_window(&host, 40);

        let err = sequencer.paste_text("", Some(40)).await.unwrap_err();
        assert!(matches!(err, AutomationError::InvalidArgument(_)));
        assert!(runner.scripts().is_empty());
        assert!(host.activations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn focus_failure_skips_script() {
        let (_host, runner, sequencer) = setup();
        let err = sequencer.send_keys("{ENTER}", Some(1)).await.unwrap_err();
        assert!(matches!(err, AutomationError::WindowNotReady { .. }));
        assert!(runner.scripts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn every_window_action_reports_focus_failure() {
        let (_host, runner, sequencer) = setup();

        let errors = vec![
            sequencer.paste_text("hello", Some(9)).await.unwrap_err(),
            sequencer.save(None, Some(9)).await.unwrap_err(),
            sequencer.save(Some("C:\\out.txt"), Some(9)).await.unwrap_err(),
            sequencer.close(Some(9), true).await.unwrap_err(),
        ];

        for err in errors {
            assert!(
                matches!(err, AutomationError::WindowNotReady { pid: Some(9), attempts: 50 }),
                "unexpected error: {err:?}"
            );
        }
        assert!(runner.scripts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn interpreter_failure_propagates_from_send_keys() {
        let (host, runner, sequencer) = setup();
        with_window(&host, 41);
        runner.fail_next(AutomationError::InterpreterFailure("boom".to_string()));

        let err = sequencer.send_keys("abc", Some(41)).await.unwrap_err();
        assert_eq!(err.to_string(), "Script failed: boom");
    }

    #[tokio::test(start_paused = true)]
    async fn plain_save_sends_single_chord() {
        let (host, runner, sequencer) = setup();
        with_window(&host, 42);

        let outcome = sequencer.save(None, Some(42)).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(runner.scripts()[0].steps, vec![ScriptStep::SendKeys("^s".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn save_as_drives_dialog_in_order() {
        let (host, runner, sequencer) = setup();
        with_window(&host, 43);
        let path = "C:\\Users\\a b\\out.txt";

        let outcome = sequencer.save(Some(path), Some(43)).await.unwrap();
        assert_eq!(outcome, SaveOutcome::SavedAs(path.to_string()));

        let settle = Duration::from_millis(500);
        assert_eq!(
            runner.scripts()[0].steps,
            vec![
                ScriptStep::SendKeys("^s".into()),
                ScriptStep::Sleep(settle),
                ScriptStep::SetClipboard(path.into()),
                ScriptStep::SendKeys("^a".into()),
                ScriptStep::SendKeys("^v".into()),
                ScriptStep::Sleep(settle),
                ScriptStep::SendKeys("{ENTER}".into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn blank_save_path_is_plain_save() {
        let (host, _runner, sequencer) = setup();
        with_window(&host, 44);
        assert_eq!(
            sequencer.save(Some("   "), Some(44)).await.unwrap(),
            SaveOutcome::Saved
        );
    }

    #[tokio::test(start_paused = true)]
    async fn close_answers_prompt_per_flag() {
        let (host, runner, sequencer) = setup();
        with_window(&host, 45);

        sequencer.close(Some(45), true).await.unwrap();
        sequencer.close(Some(45), false).await.unwrap();

        let scripts = runner.scripts();
        assert_eq!(scripts[0].injected_keys(), vec!["%{F4}", "n"]);
        assert_eq!(scripts[1].injected_keys(), vec!["%{F4}", "s"]);
    }

    #[tokio::test(start_paused = true)]
    async fn close_uses_configured_dialog_keys() {
        let host = Arc::new(FakeHost::new());
        let runner = Arc::new(RecordingRunner::new());
        let config = AutomationConfig {
            dialog_save_key: "y".to_string(),
            ..Default::default()
        };
        let sequencer = Sequencer::new(runner.clone(), host.clone(), config);
        with_window(&host, 47);

        sequencer.close(Some(47), false).await.unwrap();
        assert_eq!(runner.scripts()[0].injected_keys(), vec!["%{F4}", "y"]);
    }

    #[tokio::test(start_paused = true)]
    async fn close_swallows_script_failure() {
        let (host, runner, sequencer) = setup();
        with_window(&host, 46);
        runner.fail_next(AutomationError::Timeout { timeout_ms: 15_000 });

        assert!(sequencer.close(Some(46), true).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn open_returns_pid_even_without_window() {
        let (host, runner, sequencer) = setup();

        let pid = sequencer.open(Some("C:\\notes.txt")).await.unwrap();

        assert!(host.find_process(pid).is_some());
        assert_eq!(
            host.spawned(),
            vec![("notepad.exe".to_string(), vec!["C:\\notes.txt".to_string()])]
        );
        assert_eq!(host.window_polls(pid), 20);
        assert!(runner.scripts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn open_stops_warmup_when_window_ready() {
        let (host, _runner, sequencer) = setup();
        host.spawn_with_window(true);

        let pid = sequencer.open(None).await.unwrap();
        assert_eq!(host.window_polls(pid), 1);
        assert_eq!(host.spawned()[0].1, Vec::<String>::new());
    }

    #[tokio::test(start_paused = true)]
    async fn open_spawn_failure_is_an_error() {
        let (host, _runner, sequencer) = setup();
        host.fail_spawn(true);
        assert!(matches!(
            sequencer.open(None).await,
            Err(AutomationError::Spawn(_))
        ));
    }

    #[test]
    fn list_windows_empty_without_instances() {
        let (_host, _runner, sequencer) = setup();
        assert!(sequencer.list_windows().is_empty());
    }
}
