//! Gmail Assistant MCP Server Library
//!
//! A Model Context Protocol (MCP) server that reads unread Gmail messages
//! and stores threaded draft replies.

pub mod config;
pub mod error;
pub mod gmail;
pub mod mcp;

pub use config::Config;
pub use error::{GmailMcpError, Result, ToolError};
pub use gmail::gateway::MailGateway;
