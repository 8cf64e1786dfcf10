//! Error types for the Gmail Assistant MCP Server
//!
//! `GmailMcpError` covers everything below the tool boundary. `ToolError` is
//! what a single tool call can fail with; it only becomes a string when the
//! response envelope is built.

use thiserror::Error;

/// Main error type for the Gmail Assistant MCP Server
#[derive(Error, Debug)]
pub enum GmailMcpError {
    /// OAuth authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Gmail API errors
    #[error("Gmail API error: {0}")]
    Gmail(#[from] GmailApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// OAuth authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth credentials file not found: {path}. Download OAuth client credentials from Google Cloud Console.")]
    CredentialsFileNotFound { path: String },

    #[error("Invalid OAuth credentials file: {message}")]
    InvalidCredentials { message: String },

    #[error("Token file not found: {path}")]
    TokenNotFound { path: String },

    #[error("Failed to refresh access token: {message}")]
    TokenRefreshFailed { message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },

    #[error("No authorization code provided")]
    NoAuthCode,

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },
}

/// Gmail API errors (the provider side of a tool call)
#[derive(Error, Debug)]
pub enum GmailApiError {
    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("{operation} failed ({status}): {body}")]
    RequestFailed {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Undecodable {what} in message {message_id}: {message}")]
    InvalidPayload {
        message_id: String,
        what: String,
        message: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found: {path}")]
    DirNotFound { path: String },

    #[error("Failed to create config directory: {path}")]
    DirCreationFailed { path: String },

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Tool argument validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required parameter: {field}")]
    MissingField { field: String },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Invalid tool parameters: {message}")]
    InvalidParams { message: String },
}

/// Failure of a single tool call
#[derive(Error, Debug)]
pub enum ToolError {
    /// No Gmail session was available when the tool ran
    #[error("Gmail client not initialized")]
    NotInitialized,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] GmailMcpError),

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },
}

/// Result type alias for Gmail MCP operations
pub type Result<T> = std::result::Result<T, GmailMcpError>;
