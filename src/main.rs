//! Gmail Assistant MCP Server
//!
//! Serves the `get_unread_emails` and `create_draft_reply` tools over stdio.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gmail_assistant_mcp::config::Config;
use gmail_assistant_mcp::gmail::auth::Authenticator;
use gmail_assistant_mcp::gmail::client::GmailClient;
use gmail_assistant_mcp::gmail::gateway::MailGateway;
use gmail_assistant_mcp::mcp::server::McpServer;
use gmail_assistant_mcp::mcp::tools::ToolHandler;

/// Gmail Assistant MCP Server
#[derive(Parser)]
#[command(name = "gmail-assistant-mcp")]
#[command(author, version, about = "Gmail Assistant - an MCP server for reading unread mail and drafting replies")]
struct Cli {
    /// OAuth client credentials file (overrides CREDENTIALS_PATH)
    #[arg(long, global = true)]
    credentials_path: Option<PathBuf>,

    /// Stored token file (overrides TOKEN_PATH)
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (overrides LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with Gmail (run this first)
    Auth,

    /// Print a short listing of unread mail and exit
    Unread {
        /// Number of messages to list
        #[arg(long, default_value_t = 5)]
        max_results: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::new()
        .context("failed to load configuration")?
        .with_overrides(cli.credentials_path, cli.token_path, cli.log_level);

    // stdout carries JSON-RPC, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Auth) => {
            let authenticator = Authenticator::new(config).await?;
            authenticator.authenticate_interactive().await?;
            eprintln!("Authentication completed successfully!");
        }
        Some(Commands::Unread { max_results }) => {
            let gateway = connect(config)
                .await?
                .context("not authenticated; run 'gmail-assistant-mcp auth' first")?;
            print_unread(&gateway, max_results).await?;
        }
        None => run_server(config).await?,
    }

    Ok(())
}

/// Build a gateway if a token is available
async fn connect(config: Config) -> anyhow::Result<Option<MailGateway>> {
    info!(
        "Initializing Gmail client with credentials: {}",
        config.credentials_path.display()
    );
    let authenticator = Authenticator::new(config).await?;

    if !authenticator.is_authenticated().await {
        return Ok(None);
    }

    let client = GmailClient::new(Arc::new(authenticator));
    Ok(Some(MailGateway::new(Arc::new(client))))
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let tool_handler = match connect(config).await {
        Ok(Some(gateway)) => ToolHandler::new(gateway),
        Ok(None) => {
            warn!("No stored token; run 'gmail-assistant-mcp auth'. Tools will report an uninitialized client.");
            ToolHandler::uninitialized()
        }
        Err(e) => {
            warn!("Gmail client unavailable: {:#}", e);
            ToolHandler::uninitialized()
        }
    };

    let server = McpServer::new(tool_handler);
    server.run_stdio().await?;

    Ok(())
}

async fn print_unread(gateway: &MailGateway, max_results: u32) -> anyhow::Result<()> {
    let emails = gateway
        .list_unread(max_results.max(1))
        .await
        .context("failed to fetch unread emails")?;

    if emails.is_empty() {
        println!("No unread messages.");
    }

    for (i, email) in emails.iter().enumerate() {
        let snippet: String = email.snippet.chars().take(100).collect();
        println!("\n--- Email {} ---", i + 1);
        println!("From: {}", email.sender);
        println!("Subject: {}", email.subject);
        println!("Snippet: {}...", snippet);
        println!("Thread ID: {}", email.thread_id);
    }

    Ok(())
}
