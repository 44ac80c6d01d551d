//! Timing budgets and target identity shared by every component.
//!
//! One `AutomationConfig` is built at startup and handed to the bridge, the
//! window acquisition helpers, the focus controller and the sequencer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::AutomationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Executable spawned by `open`.
    pub application: String,
    /// Process name (without extension) used to find running instances.
    pub process_name: String,
    /// Interpreter program the bridge spawns for every script.
    pub interpreter: String,

    /// Warm-up polls right after launch.
    pub window_warmup_retries: u32,
    pub window_warmup_interval_ms: u64,
    /// Hard polling budget before focus gives up.
    pub focus_retries: u32,
    pub focus_interval_ms: u64,
    /// Wait after foreground activation.
    pub focus_settle_ms: u64,
    /// Wait between dialog-driving key chords.
    pub settle_delay_ms: u64,
    pub default_script_timeout_ms: u64,

    /// Keys answering the unsaved-changes prompt on close. The defaults are
    /// the mnemonics of the English dialog ("Save" / "Don't save"); other
    /// locales and older Notepad builds ("Yes" / "No") need their own.
    pub dialog_save_key: String,
    pub dialog_dont_save_key: String,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            application: "notepad.exe".to_string(),
            process_name: "notepad".to_string(),
            interpreter: "powershell.exe".to_string(),
            window_warmup_retries: 20,
            window_warmup_interval_ms: 250,
            focus_retries: 50,
            focus_interval_ms: 100,
            focus_settle_ms: 150,
            settle_delay_ms: 500,
            default_script_timeout_ms: 15_000,
            dialog_save_key: "s".to_string(),
            dialog_dont_save_key: "n".to_string(),
        }
    }
}

impl AutomationConfig {
    pub fn validate(&self) -> Result<(), AutomationError> {
        if self.application.trim().is_empty() {
            return Err(AutomationError::InvalidArgument(
                "application must not be empty".to_string(),
            ));
        }
        if self.process_name.trim().is_empty() {
            return Err(AutomationError::InvalidArgument(
                "process_name must not be empty".to_string(),
            ));
        }
        if self.interpreter.trim().is_empty() {
            return Err(AutomationError::InvalidArgument(
                "interpreter must not be empty".to_string(),
            ));
        }
        if self.window_warmup_retries == 0 || self.focus_retries == 0 {
            return Err(AutomationError::InvalidArgument(
                "retry budgets must be at least 1".to_string(),
            ));
        }
        if self.default_script_timeout_ms == 0 {
            return Err(AutomationError::InvalidArgument(
                "default_script_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.dialog_save_key.is_empty() || self.dialog_dont_save_key.is_empty() {
            return Err(AutomationError::InvalidArgument(
                "dialog keys must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn warmup_interval(&self) -> Duration {
        Duration::from_millis(self.window_warmup_interval_ms)
    }

    pub fn focus_interval(&self) -> Duration {
        Duration::from_millis(self.focus_interval_ms)
    }

    pub fn focus_settle(&self) -> Duration {
        Duration::from_millis(self.focus_settle_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.default_script_timeout_ms)
    }

    /// Upper bound on how long `focus` may poll before failing.
    pub fn focus_budget(&self) -> Duration {
        self.focus_interval() * self.focus_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AutomationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.focus_budget(), Duration::from_secs(5));
    }

    #[test]
    fn zero_focus_retries_rejected() {
        let config = AutomationConfig {
            focus_retries: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AutomationError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_script_timeout_rejected() {
        let config = AutomationConfig {
            default_script_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_dialog_key_rejected() {
        let config = AutomationConfig {
            dialog_save_key: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AutomationConfig =
            serde_json::from_str(r#"{"focus_retries": 10, "settle_delay_ms": 900}"#).unwrap();
        assert_eq!(config.focus_retries, 10);
        assert_eq!(config.settle_delay_ms, 900);
        assert_eq!(config.focus_interval_ms, 100);
        assert_eq!(config.application, "notepad.exe");
        assert_eq!(config.dialog_dont_save_key, "n");
    }
}
