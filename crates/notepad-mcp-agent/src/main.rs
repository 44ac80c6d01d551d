use anyhow::Result;
use clap::Parser;
use notepad_automation::{PowerShell, Sequencer, SystemProcessHost};
use notepad_mcp_agent::server::NotepadServer;
use notepad_mcp_agent::utils::{init_logging, AutomationArgs};
use rmcp::{transport::stdio, ServiceExt};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "MCP server that drives Windows Notepad over stdio", long_about = None)]
struct Cli {
    #[command(flatten)]
    automation: AutomationArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !cfg!(target_os = "windows") {
        eprintln!("notepad-mcp-agent only runs on Windows");
        std::process::exit(1);
    }

    let log_dir = init_logging()?;
    let config = cli.automation.into_config()?;
    info!("Starting notepad-mcp-agent (logs in {})", log_dir.display());
    info!(?config, "automation config");

    let sequencer = Sequencer::new(
        Arc::new(PowerShell::new(config.interpreter.clone())),
        Arc::new(SystemProcessHost::new()),
        config,
    );

    let service = NotepadServer::new(sequencer)
        .serve(stdio())
        .await
        .inspect_err(|e| {
            error!("serving error: {:?}", e);
        })?;
    service.waiting().await?;

    info!("notepad-mcp-agent stopped");
    Ok(())
}
