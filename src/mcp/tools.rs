//! MCP Tool definitions and handlers
//!
//! Defines the two tools, validates their arguments, runs them against the
//! mail gateway, and wraps every outcome in the `{success, ...}` envelope.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info};
use validator::Validate;

use crate::error::{ToolError, ValidationError};
use crate::gmail::gateway::{MailGateway, DEFAULT_MAX_RESULTS};
use crate::gmail::types::{DraftReply, DraftResult, EmailSummary};
use crate::mcp::types::{CallToolResult, Tool};

/// The tools this server declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetUnreadEmails,
    CreateDraftReply,
}

impl ToolName {
    pub const ALL: [ToolName; 2] = [ToolName::GetUnreadEmails, ToolName::CreateDraftReply];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetUnreadEmails => "get_unread_emails",
            ToolName::CreateDraftReply => "create_draft_reply",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            ToolName::GetUnreadEmails => "Fetch unread emails from Gmail. Returns sender, subject, body snippet, and thread/message IDs.",
            ToolName::CreateDraftReply => "Create a draft reply to an email. The draft will be properly threaded with the original conversation.",
        }
    }

    fn input_schema(&self) -> Value {
        let schema = match self {
            ToolName::GetUnreadEmails => schemars::schema_for!(GetUnreadEmailsArgs),
            ToolName::CreateDraftReply => schemars::schema_for!(CreateDraftReplyArgs),
        };
        serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}))
    }

    /// Tool declaration for `tools/list`
    pub fn definition(&self) -> Tool {
        Tool {
            name: self.as_str().to_string(),
            description: Some(self.description().to_string()),
            input_schema: self.input_schema(),
        }
    }
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

/// Arguments of `get_unread_emails`
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct GetUnreadEmailsArgs {
    /// Maximum number of unread emails to retrieve (default: 10)
    #[serde(default = "default_max_results")]
    // Upper bound is gmail::MAX_LIST_RESULTS
    #[validate(range(min = 1, max = 500))]
    pub max_results: u32,
}

/// Arguments of `create_draft_reply`
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateDraftReplyArgs {
    /// Thread ID from the original email
    pub thread_id: String,
    /// Recipient email address
    pub to: String,
    /// Email subject, typically 'Re: <original subject>'
    pub subject: String,
    /// The reply message body
    pub body: String,
    /// Original Message-ID header for proper threading
    #[serde(default)]
    pub in_reply_to: Option<String>,
}

impl CreateDraftReplyArgs {
    /// Checked in this order, before any type checking
    const REQUIRED: [&'static str; 4] = ["thread_id", "to", "subject", "body"];
}

impl From<CreateDraftReplyArgs> for DraftReply {
    fn from(args: CreateDraftReplyArgs) -> Self {
        DraftReply {
            thread_id: args.thread_id,
            to: args.to,
            subject: args.subject,
            body: args.body,
            in_reply_to: args.in_reply_to,
        }
    }
}

/// A validated tool invocation
#[derive(Debug, Clone)]
pub enum ToolCall {
    GetUnreadEmails(GetUnreadEmailsArgs),
    CreateDraftReply(CreateDraftReplyArgs),
}

impl ToolCall {
    /// Validate `arguments` for `tool`
    pub fn parse(tool: ToolName, arguments: Value) -> Result<Self, ValidationError> {
        let args = object_arguments(arguments)?;

        match tool {
            ToolName::GetUnreadEmails => {
                let args: GetUnreadEmailsArgs = deserialize_args(args)?;
                args.validate().map_err(|e| ValidationError::InvalidParameter {
                    name: "max_results".to_string(),
                    message: e.to_string(),
                })?;
                Ok(ToolCall::GetUnreadEmails(args))
            }
            ToolName::CreateDraftReply => {
                if let Some(missing) = CreateDraftReplyArgs::REQUIRED
                    .iter()
                    .find(|field| !args.contains_key(**field))
                {
                    return Err(ValidationError::MissingField {
                        field: missing.to_string(),
                    });
                }
                Ok(ToolCall::CreateDraftReply(deserialize_args(args)?))
            }
        }
    }
}

/// Arguments as a JSON object, with `null` values treated as absent
fn object_arguments(arguments: Value) -> Result<Map<String, Value>, ValidationError> {
    match arguments {
        Value::Null => Ok(Map::new()),
        Value::Object(mut map) => {
            map.retain(|_, v| !v.is_null());
            Ok(map)
        }
        other => Err(ValidationError::InvalidParameter {
            name: "arguments".to_string(),
            message: format!("expected an object, got {}", other),
        }),
    }
}

fn deserialize_args<T: serde::de::DeserializeOwned>(
    args: Map<String, Value>,
) -> Result<T, ValidationError> {
    serde_json::from_value(Value::Object(args)).map_err(|e| ValidationError::InvalidParameter {
        name: "arguments".to_string(),
        message: e.to_string(),
    })
}

/// Successful tool payloads
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    UnreadEmails(Vec<EmailSummary>),
    Draft(DraftResult),
}

/// Outcome of one `tools/call`, before it is rendered as an envelope
#[derive(Debug)]
pub struct ToolResponse {
    /// `None` when the requested name is not a declared tool
    pub tool: Option<ToolName>,
    pub result: Result<ToolOutput, ToolError>,
}

impl ToolResponse {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    /// The uniform `{success, ...}` envelope
    pub fn envelope(&self) -> Value {
        match &self.result {
            Ok(ToolOutput::UnreadEmails(emails)) => json!({
                "success": true,
                "count": emails.len(),
                "emails": emails,
            }),
            Ok(ToolOutput::Draft(draft)) => json!({
                "draft_id": draft.draft_id,
                "message_id": draft.message_id,
                "thread_id": draft.thread_id,
                "success": draft.success,
            }),
            Err(e) if self.tool == Some(ToolName::GetUnreadEmails) => json!({
                "success": false,
                "error": e.to_string(),
                "emails": [],
            }),
            Err(e) => json!({
                "success": false,
                "error": e.to_string(),
            }),
        }
    }

    /// Render as MCP text content holding the pretty-printed envelope
    pub fn into_call_result(self) -> CallToolResult {
        let envelope = self.envelope();
        let text = serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| envelope.to_string());
        CallToolResult::text(text, !self.success())
    }
}

/// Tool handler
pub struct ToolHandler {
    gateway: Option<MailGateway>,
}

impl ToolHandler {
    /// Create a tool handler bound to an authenticated session
    pub fn new(gateway: MailGateway) -> Self {
        Self {
            gateway: Some(gateway),
        }
    }

    /// Create a tool handler with no session; every tool reports `NotInitialized`
    pub fn uninitialized() -> Self {
        Self { gateway: None }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        ToolName::ALL.iter().map(ToolName::definition).collect()
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, args: Value) -> ToolResponse {
        info!("Tool called: {}", name);

        let tool = ToolName::from_name(name);
        let result = match tool {
            Some(tool) => self.run(tool, args).await,
            None => Err(ToolError::UnknownTool {
                name: name.to_string(),
            }),
        };

        if let Err(ref e) = result {
            error!("Error in {}: {}", name, e);
        }

        ToolResponse { tool, result }
    }

    async fn run(&self, tool: ToolName, args: Value) -> Result<ToolOutput, ToolError> {
        let call = ToolCall::parse(tool, args)?;
        let gateway = self.gateway.as_ref().ok_or(ToolError::NotInitialized)?;

        match call {
            ToolCall::GetUnreadEmails(args) => {
                let emails = gateway.list_unread(args.max_results).await?;
                Ok(ToolOutput::UnreadEmails(emails))
            }
            ToolCall::CreateDraftReply(args) => {
                let draft = gateway.create_draft_reply(&args.into()).await?;
                Ok(ToolOutput::Draft(draft))
            }
        }
    }
}
