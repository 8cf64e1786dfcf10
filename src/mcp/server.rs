//! MCP Server implementation
//!
//! Implements the Model Context Protocol server for stdio transport.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::error::{McpError, Result};
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;

/// MCP Server info
const SERVER_NAME: &str = "gmail-assistant";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for Gmail
pub struct McpServer {
    tool_handler: ToolHandler,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(tool_handler: ToolHandler) -> Self {
        Self { tool_handler }
    }

    /// Run the server on stdio
    pub async fn run_stdio(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        self.run(reader, tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC from `reader` until EOF
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Starting Gmail MCP server on stdio");
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                debug!("Received EOF, shutting down");
                break;
            }

            let message = line.trim();
            if message.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(message).await {
                let response_str = serde_json::to_string(&response)?;
                writer.write_all(response_str.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle an incoming JSON-RPC message; `None` for notifications
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                warn!("Unparseable request: {}", e);
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        if request.is_notification() {
            if request.method == methods::INITIALIZED {
                debug!("Client finished initialization");
            } else {
                debug!("Ignoring notification {}", request.method);
            }
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            methods::INITIALIZE => self
                .handle_initialize()
                .map(|result| JsonRpcResponse::success(id.clone(), result)),
            methods::PING => Ok(JsonRpcResponse::success(id.clone(), serde_json::json!({}))),
            methods::LIST_TOOLS => self
                .handle_list_tools()
                .map(|result| JsonRpcResponse::success(id.clone(), result)),
            methods::CALL_TOOL => self
                .handle_call_tool(&request)
                .await
                .map(|result| JsonRpcResponse::success(id.clone(), result)),
            _ => Ok(JsonRpcResponse::error(
                id.clone(),
                JsonRpcError::method_not_found(&request.method),
            )),
        };

        Some(response.unwrap_or_else(|e| {
            JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string()))
        }))
    }

    /// Handle initialize request
    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request
    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.tool_handler.list_tools(),
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request.
    ///
    /// Malformed params and unknown tools come back as a failed envelope,
    /// not as a JSON-RPC error.
    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> Result<Value> {
        let params = request
            .params
            .clone()
            .ok_or_else(|| McpError::InvalidParams {
                message: "missing params".to_string(),
            })
            .and_then(|p| {
                serde_json::from_value::<CallToolParams>(p).map_err(|e| McpError::InvalidParams {
                    message: e.to_string(),
                })
            });

        let result = match params {
            Ok(params) => {
                self.tool_handler
                    .call_tool(&params.name, params.arguments)
                    .await
                    .into_call_result()
            }
            Err(e) => {
                warn!("{}", e);
                let envelope = serde_json::json!({"success": false, "error": e.to_string()});
                CallToolResult::text(serde_json::to_string_pretty(&envelope)?, true)
            }
        };

        Ok(serde_json::to_value(result)?)
    }
}
