//! Gmail API type definitions
//!
//! The first half mirrors the Gmail API wire format. The second half holds
//! the summaries handed back to tool callers.

use serde::{Deserialize, Serialize};

/// A Gmail message part (MIME part)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// Part ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,

    /// MIME type of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Filename for attachments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Headers for this part
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,

    /// Body of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<MessagePartBody>,

    /// Nested parts (for multipart messages)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// Base64url body data, if this part carries any inline content
    pub fn data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// Whether the MIME type matches `mime_type` (parameters and case ignored)
    pub fn is_mime_type(&self, mime_type: &str) -> bool {
        self.mime_type
            .as_deref()
            .and_then(|m| m.split(';').next())
            .map(|m| m.trim().eq_ignore_ascii_case(mime_type))
            .unwrap_or(false)
    }
}

/// Header in a message part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Header name
    pub name: String,

    /// Header value
    pub value: String,
}

/// Body of a message part
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    /// Attachment ID (if this is an attachment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,

    /// Size in bytes
    #[serde(default)]
    pub size: i64,

    /// Base64url-encoded data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A Gmail message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Label IDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,

    /// Snippet (preview text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    /// Message payload (MIME structure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,

    /// Internal date (epoch millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_date: Option<String>,
}

/// List of messages response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    /// Messages in this page (absent when nothing matches)
    #[serde(default)]
    pub messages: Vec<MessageRef>,

    /// Next page token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    /// Result size estimate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_size_estimate: Option<u32>,
}

/// Reference to a message (id and thread_id only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(default)]
    pub thread_id: String,
}

/// Gmail draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    /// Draft ID
    pub id: String,

    /// The message
    pub message: Message,
}

/// Raw message submitted to the drafts endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    /// Raw RFC822 message (base64url encoded)
    pub raw: String,

    /// Thread the message belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Request to create a draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDraftRequest {
    /// The message
    pub message: RawMessage,
}

/// Snapshot of one unread message as returned to tool callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EmailSummary {
    pub email_id: String,
    pub thread_id: String,
    /// Value of the `Message-ID` header, used for `in_reply_to` on replies
    pub message_id: String,
    pub sender: String,
    pub subject: String,
    pub snippet: String,
    /// Plain text body, or raw HTML when the message has no plain text part
    pub body: String,
    pub date: String,
    pub labels: Vec<String>,
}

/// Outcome of creating a draft reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftResult {
    pub draft_id: String,
    pub message_id: String,
    pub thread_id: String,
    pub success: bool,
}

/// A reply to be stored as a draft in an existing thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReply {
    pub thread_id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    /// `Message-ID` of the message being answered
    pub in_reply_to: Option<String>,
}
