use crate::utils::{CloseArgs, OpenArgs, PasteTextArgs, SaveFileArgs, SendKeysArgs};
use notepad_automation::{AutomationError, SaveOutcome, Sequencer};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use std::time::Instant;
use tracing::{info, warn};

/// MCP front of the [`Sequencer`]. Tool failures become `isError` results;
/// nothing the sequencer does escapes as a protocol error.
#[derive(Clone)]
pub struct NotepadServer {
    sequencer: Sequencer,
    tool_router: ToolRouter<Self>,
}

impl NotepadServer {
    pub fn new(sequencer: Sequencer) -> Self {
        Self {
            sequencer,
            tool_router: Self::tool_router(),
        }
    }
}

/// Turn an automation outcome into a tool result and log how it went.
fn into_tool_result(
    tool: &str,
    started: Instant,
    outcome: Result<String, AutomationError>,
) -> CallToolResult {
    let duration_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(text) => {
            info!(tool, duration_ms, "tool succeeded");
            CallToolResult::success(vec![Content::text(text)])
        }
        Err(e) => {
            warn!(tool, duration_ms, error = %e, "tool failed");
            CallToolResult::error(vec![Content::text(e.to_string())])
        }
    }
}

#[tool_router]
impl NotepadServer {
    #[tool(
        description = "Launch Notepad, optionally opening filePath, and wait briefly for its window. Returns 'Opened (pid=N)'; pass that pid to later tools."
    )]
    pub async fn open(
        &self,
        Parameters(args): Parameters<OpenArgs>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        info!(file_path = ?args.file_path, "[open] called");

        let outcome = self
            .sequencer
            .open(args.file_path.as_deref())
            .await
            .map(|pid| format!("Opened (pid={pid})"));
        Ok(into_tool_result("open", started, outcome))
    }

    #[tool(
        description = "List running Notepad instances that have a window, as a JSON array of {Id, MainWindowTitle}. Read-only."
    )]
    pub async fn list_windows(&self) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let windows = self.sequencer.list_windows();
        let json = serde_json::to_string(&windows).unwrap_or_else(|e| {
            warn!("[list_windows] failed to serialize window list: {}", e);
            "[]".to_string()
        });
        info!("[list_windows] {} window(s)", windows.len());
        Ok(into_tool_result("list_windows", started, Ok(json)))
    }

    #[tool(
        description = "Paste text at the caret of a Notepad window via the clipboard. Safe for multi-line, quoted and Unicode text. Overwrites the clipboard."
    )]
    pub async fn paste_text(
        &self,
        Parameters(args): Parameters<PasteTextArgs>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        info!(
            pid = ?args.pid,
            text_len = args.text.chars().count(),
            "[paste_text] called"
        );

        let outcome = self
            .sequencer
            .paste_text(&args.text, args.pid)
            .await
            .map(|_| "Pasted text".to_string());
        Ok(into_tool_result("paste_text", started, outcome))
    }

    #[tool(
        description = "Send raw SendKeys keystrokes to a Notepad window, e.g. '^a', '{ENTER}', '^{END}'. Use paste_text for text content."
    )]
    pub async fn send_keys(
        &self,
        Parameters(args): Parameters<SendKeysArgs>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        info!(pid = ?args.pid, keys = %args.keys, "[send_keys] called");

        let outcome = self
            .sequencer
            .send_keys(&args.keys, args.pid)
            .await
            .map(|_| format!("Sent keys: {}", args.keys));
        Ok(into_tool_result("send_keys", started, outcome))
    }

    #[tool(
        description = "Save the document (Ctrl+S). With filePath, fills the Save As dialog with that path and confirms."
    )]
    pub async fn save_file(
        &self,
        Parameters(args): Parameters<SaveFileArgs>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        info!(pid = ?args.pid, file_path = ?args.file_path, "[save_file] called");

        let outcome = self
            .sequencer
            .save(args.file_path.as_deref(), args.pid)
            .await
            .map(|saved| match saved {
                SaveOutcome::Saved => "Saved".to_string(),
                SaveOutcome::SavedAs(path) => format!("Saved As: {path}"),
            });
        Ok(into_tool_result("save_file", started, outcome))
    }

    #[tool(
        description = "Close a Notepad window (Alt+F4). If asked about unsaved changes, answers 'Don't save' unless dontSave is false."
    )]
    pub async fn close(
        &self,
        Parameters(args): Parameters<CloseArgs>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let dont_save = args.dont_save.unwrap_or(true);
        info!(pid = ?args.pid, dont_save, "[close] called");

        let outcome = self
            .sequencer
            .close(args.pid, dont_save)
            .await
            .map(|_| "Closed".to_string());
        Ok(into_tool_result("close", started, outcome))
    }
}

#[tool_handler]
impl ServerHandler for NotepadServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(crate::prompt::get_server_instructions()),
        }
    }
}
