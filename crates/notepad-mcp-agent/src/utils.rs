use anyhow::Result;
use clap::Args;
use notepad_automation::AutomationConfig;
use rmcp::{schemars, schemars::JsonSchema};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// ===== Tool arguments =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct OpenArgs {
    #[schemars(description = "Optional path of a file to open in Notepad.")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct PasteTextArgs {
    #[schemars(
        description = "Text to paste at the caret. Goes through the clipboard, so multi-line and Unicode text is safe."
    )]
    pub text: String,
    #[schemars(
        description = "Process id of the target Notepad. Defaults to the most recently started instance."
    )]
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SendKeysArgs {
    #[schemars(
        description = "SendKeys specification, e.g. '^a' for Ctrl+A, '{ENTER}', '%{F4}', '+{TAB}'."
    )]
    pub keys: String,
    #[schemars(
        description = "Process id of the target Notepad. Defaults to the most recently started instance."
    )]
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileArgs {
    #[schemars(
        description = "When set, saves under this path through the Save As dialog. Otherwise a plain save (Ctrl+S)."
    )]
    pub file_path: Option<String>,
    #[schemars(
        description = "Process id of the target Notepad. Defaults to the most recently started instance."
    )]
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloseArgs {
    #[schemars(
        description = "Process id of the target Notepad. Defaults to the most recently started instance."
    )]
    pub pid: Option<u32>,
    #[schemars(
        description = "Answer 'Don't save' if Notepad asks about unsaved changes; false answers 'Save'. Defaults to true."
    )]
    pub dont_save: Option<bool>,
}

// ===== Configuration =====

/// Timing knobs, each with a `NOTEPAD_MCP_*` environment fallback. Unset
/// values keep the library defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct AutomationArgs {
    /// Executable launched by the `open` tool
    #[arg(long, env = "NOTEPAD_MCP_APPLICATION")]
    pub application: Option<String>,

    /// Process name used to find running instances
    #[arg(long, env = "NOTEPAD_MCP_PROCESS_NAME")]
    pub process_name: Option<String>,

    /// Interpreter that runs automation scripts
    #[arg(long, env = "NOTEPAD_MCP_INTERPRETER")]
    pub interpreter: Option<String>,

    #[arg(long, env = "NOTEPAD_MCP_WINDOW_WARMUP_RETRIES")]
    pub window_warmup_retries: Option<u32>,

    #[arg(long, env = "NOTEPAD_MCP_WINDOW_WARMUP_INTERVAL_MS")]
    pub window_warmup_interval_ms: Option<u64>,

    #[arg(long, env = "NOTEPAD_MCP_FOCUS_RETRIES")]
    pub focus_retries: Option<u32>,

    #[arg(long, env = "NOTEPAD_MCP_FOCUS_INTERVAL_MS")]
    pub focus_interval_ms: Option<u64>,

    #[arg(long, env = "NOTEPAD_MCP_FOCUS_SETTLE_MS")]
    pub focus_settle_ms: Option<u64>,

    /// Wait between dialog-driving keystrokes
    #[arg(long, env = "NOTEPAD_MCP_SETTLE_DELAY_MS")]
    pub settle_delay_ms: Option<u64>,

    /// Hard limit for each interpreter process
    #[arg(long, env = "NOTEPAD_MCP_SCRIPT_TIMEOUT_MS")]
    pub script_timeout_ms: Option<u64>,

    /// Key answering "Save" in the unsaved-changes prompt
    #[arg(long, env = "NOTEPAD_MCP_DIALOG_SAVE_KEY")]
    pub dialog_save_key: Option<String>,

    /// Key answering "Don't save" in the unsaved-changes prompt
    #[arg(long, env = "NOTEPAD_MCP_DIALOG_DONT_SAVE_KEY")]
    pub dialog_dont_save_key: Option<String>,
}

impl AutomationArgs {
    pub fn into_config(self) -> Result<AutomationConfig> {
        let defaults = AutomationConfig::default();
        let config = AutomationConfig {
            application: self.application.unwrap_or(defaults.application),
            process_name: self.process_name.unwrap_or(defaults.process_name),
            interpreter: self.interpreter.unwrap_or(defaults.interpreter),
            window_warmup_retries: self
                .window_warmup_retries
                .unwrap_or(defaults.window_warmup_retries),
            window_warmup_interval_ms: self
                .window_warmup_interval_ms
                .unwrap_or(defaults.window_warmup_interval_ms),
            focus_retries: self.focus_retries.unwrap_or(defaults.focus_retries),
            focus_interval_ms: self.focus_interval_ms.unwrap_or(defaults.focus_interval_ms),
            focus_settle_ms: self.focus_settle_ms.unwrap_or(defaults.focus_settle_ms),
            settle_delay_ms: self.settle_delay_ms.unwrap_or(defaults.settle_delay_ms),
            default_script_timeout_ms: self
                .script_timeout_ms
                .unwrap_or(defaults.default_script_timeout_ms),
            dialog_save_key: self.dialog_save_key.unwrap_or(defaults.dialog_save_key),
            dialog_dont_save_key: self
                .dialog_dont_save_key
                .unwrap_or(defaults.dialog_dont_save_key),
        };
        config.validate()?;
        Ok(config)
    }
}

// ===== Logging =====

fn log_level() -> Level {
    env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO)
}

pub fn log_dir() -> PathBuf {
    if let Ok(custom_dir) = env::var("NOTEPAD_MCP_LOG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        dirs::data_local_dir()
            .unwrap_or_else(env::temp_dir)
            .join("notepad-mcp")
            .join("logs")
    }
}

fn filter(level: Level) -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("rmcp::service=warn".parse()?))
}

/// Logs go to stderr and a daily rolling file; stdout belongs to the
/// protocol.
pub fn init_logging() -> Result<PathBuf> {
    use tracing_appender::rolling;

    let level = log_level();
    let log_dir = log_dir();
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        warn!("Failed to create log directory: {}", e);
    }
    let file_appender = rolling::daily(&log_dir, "notepad-mcp-agent.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_filter(filter(level)?),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter(level)?),
        )
        .try_init()?;

    Ok(log_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paste_args_use_camel_case() {
        let args: PasteTextArgs = serde_json::from_str(r#"{"text": "hi", "pid": 12}"#).unwrap();
        assert_eq!(args.text, "hi");
        assert_eq!(args.pid, Some(12));
    }

    #[test]
    fn paste_args_require_text() {
        assert!(serde_json::from_str::<PasteTextArgs>(r#"{"pid": 12}"#).is_err());
    }

    #[test]
    fn save_and_close_args_parse_external_names() {
        let save: SaveFileArgs =
            serde_json::from_str(r#"{"filePath": "C:\\out.txt"}"#).unwrap();
        assert_eq!(save.file_path.as_deref(), Some("C:\\out.txt"));
        assert_eq!(save.pid, None);

        let close: CloseArgs = serde_json::from_str(r#"{"dontSave": false}"#).unwrap();
        assert_eq!(close.dont_save, Some(false));

        let close: CloseArgs = serde_json::from_str("{}").unwrap();
        assert_eq!(close.dont_save, None);
    }

    #[test]
    fn empty_automation_args_give_defaults() {
        let config = AutomationArgs::default().into_config().unwrap();
        assert_eq!(config, AutomationConfig::default());
    }

    #[test]
    fn automation_args_override_and_validate() {
        let config = AutomationArgs {
            focus_retries: Some(10),
            script_timeout_ms: Some(2_000),
            dialog_save_key: Some("y".to_string()),
            ..Default::default()
        }
        .into_config()
        .unwrap();
        assert_eq!(config.focus_retries, 10);
        assert_eq!(config.default_script_timeout_ms, 2_000);
        assert_eq!(config.dialog_save_key, "y");
        assert_eq!(config.dialog_dont_save_key, "n");

        let invalid = AutomationArgs {
            focus_retries: Some(0),
            ..Default::default()
        }
        .into_config();
        assert!(invalid.is_err());
    }

    #[test]
    fn schema_lists_required_text() {
        let schema = schemars::schema_for!(PasteTextArgs);
        let json = serde_json::to_value(&schema).unwrap();
        let required = json["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "text"));
        assert!(json["properties"]["pid"].is_object());
    }
}
