//! Mail gateway
//!
//! Maps the Gmail resource model onto the two things tool callers care
//! about: summaries of unread mail and threaded draft replies.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::gmail::{labels::UNREAD, MAX_LIST_RESULTS};
use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::client::GmailApi;
use crate::gmail::types::{
    CreateDraftRequest, DraftReply, DraftResult, EmailSummary, MessagePart, RawMessage,
};
use crate::gmail::utils::{create_reply_message, encode_raw_message, extract_body, find_header};

/// Default number of unread messages fetched per call
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Detail fetches kept in flight at once by `list_unread`
pub const MAX_CONCURRENT_FETCHES: usize = 10;

/// An authenticated Gmail session
#[derive(Clone)]
pub struct MailGateway {
    api: Arc<dyn GmailApi>,
}

impl MailGateway {
    /// Wrap a Gmail API transport
    pub fn new(api: Arc<dyn GmailApi>) -> Self {
        Self { api }
    }

    /// Fetch up to `max_results` unread messages.
    ///
    /// A failing list call fails the whole operation. Detail fetches run at
    /// most `MAX_CONCURRENT_FETCHES` at a time; any that fail are logged and
    /// left out.
    pub async fn list_unread(&self, max_results: u32) -> Result<Vec<EmailSummary>> {
        let max_results = max_results.min(MAX_LIST_RESULTS);
        let list = self.api.list_messages(UNREAD, max_results).await?;

        let ids: Vec<String> = list
            .messages
            .into_iter()
            .map(|m| m.id)
            .filter(|id| !id.is_empty())
            .take(max_results as usize)
            .collect();

        if ids.is_empty() {
            info!("No unread messages found");
            return Ok(Vec::new());
        }

        let results: Vec<_> = stream::iter(&ids)
            .map(|id| self.get_message_details(id))
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;

        let emails: Vec<EmailSummary> = results
            .into_iter()
            .zip(&ids)
            .filter_map(|(result, id)| match result {
                Ok(Some(summary)) => Some(summary),
                Ok(None) => {
                    warn!("Unread message {} disappeared before it could be fetched", id);
                    None
                }
                Err(e) => {
                    warn!("Skipping message {}: {}", id, e);
                    None
                }
            })
            .collect();

        info!("Retrieved {} of {} unread emails", emails.len(), ids.len());
        Ok(emails)
    }

    /// Fetch one message and summarize it. `None` when Gmail reports 404.
    pub async fn get_message_details(&self, message_id: &str) -> Result<Option<EmailSummary>> {
        let message = match self.api.get_message(message_id).await {
            Ok(message) => message,
            Err(GmailMcpError::Gmail(GmailApiError::MessageNotFound { .. })) => return Ok(None),
            Err(e) => return Err(e),
        };

        let empty = MessagePart::default();
        let payload = message.payload.as_ref().unwrap_or(&empty);
        let header = |name: &str| find_header(payload, name).unwrap_or("").to_string();

        let body = extract_body(&message.id, payload)?;
        debug!("Message {} body is {} bytes", message.id, body.len());

        Ok(Some(EmailSummary {
            email_id: message_id.to_string(),
            thread_id: message.thread_id.unwrap_or_default(),
            message_id: header("Message-ID"),
            sender: header("From"),
            subject: header("Subject"),
            snippet: message.snippet.unwrap_or_default(),
            body,
            date: header("Date"),
            labels: message.label_ids,
        }))
    }

    /// Store a reply as a draft in `reply.thread_id`
    pub async fn create_draft_reply(&self, reply: &DraftReply) -> Result<DraftResult> {
        let raw = encode_raw_message(&create_reply_message(reply));

        let request = CreateDraftRequest {
            message: RawMessage {
                raw,
                thread_id: Some(reply.thread_id.clone()),
            },
        };

        let draft = self.api.create_draft(&request).await?;
        info!("Created draft {} in thread {}", draft.id, reply.thread_id);

        Ok(DraftResult {
            draft_id: draft.id,
            message_id: draft.message.id,
            thread_id: draft
                .message
                .thread_id
                .unwrap_or_else(|| reply.thread_id.clone()),
            success: true,
        })
    }
}
