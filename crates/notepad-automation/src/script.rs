//! Automation scripts as data.
//!
//! A script is an ordered list of UI steps rendered to a PowerShell body just
//! before execution. Keeping the steps around lets callers (and tests) reason
//! about what will be injected without parsing PowerShell.

use std::fmt::Write as _;
use std::time::Duration;

use crate::escape::{double_single_quotes, escape_for_literal};

/// Key chords understood by `System.Windows.Forms.SendKeys`.
pub mod keys {
    pub const PASTE: &str = "^v";
    pub const SAVE: &str = "^s";
    pub const SELECT_ALL: &str = "^a";
    pub const CONFIRM: &str = "{ENTER}";
    pub const CLOSE_WINDOW: &str = "%{F4}";
}

const PRELUDE: &str = "$ErrorActionPreference = 'Stop'\n\
                       $ProgressPreference = 'SilentlyContinue'\n\
                       Add-Type -AssemblyName System.Windows.Forms\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Overwrite the system clipboard with `text`.
    SetClipboard(String),
    /// Inject a SendKeys key specification into the foreground window.
    SendKeys(String),
    Sleep(Duration),
}

impl ScriptStep {
    fn render_into(&self, out: &mut String) {
        match self {
            ScriptStep::SetClipboard(text) => {
                let _ = writeln!(out, "$text = {}", escape_for_literal(text));
                out.push_str("Set-Clipboard -Value $text\n");
            }
            ScriptStep::SendKeys(spec) => {
                let _ = writeln!(
                    out,
                    "[System.Windows.Forms.SendKeys]::SendWait('{}')",
                    double_single_quotes(spec)
                );
            }
            ScriptStep::Sleep(duration) => {
                let _ = writeln!(out, "Start-Sleep -Milliseconds {}", duration.as_millis());
            }
        }
    }
}

/// One self-contained unit of automation code with its execution budget.
/// Success is the interpreter exiting with code 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationScript {
    pub name: &'static str,
    pub steps: Vec<ScriptStep>,
    pub timeout: Duration,
}

impl AutomationScript {
    pub fn new(name: &'static str, timeout: Duration) -> Self {
        Self {
            name,
            steps: Vec::new(),
            timeout,
        }
    }

    pub fn set_clipboard(mut self, text: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::SetClipboard(text.into()));
        self
    }

    pub fn send_keys(mut self, spec: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::SendKeys(spec.into()));
        self
    }

    pub fn sleep(mut self, duration: Duration) -> Self {
        if !duration.is_zero() {
            self.steps.push(ScriptStep::Sleep(duration));
        }
        self
    }

    /// Key specifications in injection order.
    pub fn injected_keys(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                ScriptStep::SendKeys(spec) => Some(spec.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Clipboard contents in write order.
    pub fn clipboard_writes(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                ScriptStep::SetClipboard(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let mut body = String::from(PRELUDE);
        for step in &self.steps {
            step.render_into(&mut body);
        }
        body
    }
}
