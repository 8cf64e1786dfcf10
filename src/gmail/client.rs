//! Gmail API client
//!
//! Thin REST transport for the three Gmail endpoints the gateway uses.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::gmail::{API_BASE_URL, USER_ID};
use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::auth::Authenticator;
use crate::gmail::types::{CreateDraftRequest, Draft, Message, MessageList};

/// Raw Gmail API calls.
///
/// `GmailClient` talks to Google; tests plug in canned responses.
#[async_trait]
pub trait GmailApi: Send + Sync {
    /// `users.messages.list` restricted to one label
    async fn list_messages(&self, label_id: &str, max_results: u32) -> Result<MessageList>;

    /// `users.messages.get` with `format=full`
    async fn get_message(&self, message_id: &str) -> Result<Message>;

    /// `users.drafts.create`
    async fn create_draft(&self, request: &CreateDraftRequest) -> Result<Draft>;
}

/// Gmail API client
pub struct GmailClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth authenticator
    authenticator: Arc<Authenticator>,
}

impl GmailClient {
    /// Create a new Gmail client
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            authenticator,
        }
    }

    /// Get a valid access token
    async fn access_token(&self) -> Result<String> {
        self.authenticator.get_access_token().await
    }

    /// Base URL for messages
    fn messages_url() -> String {
        format!("{}/users/{}/messages", API_BASE_URL, USER_ID)
    }

    /// Base URL for drafts
    fn drafts_url() -> String {
        format!("{}/users/{}/drafts", API_BASE_URL, USER_ID)
    }

    /// Turn a non-success response into `RequestFailed`
    async fn request_failed(operation: &str, response: reqwest::Response) -> GmailMcpError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        GmailMcpError::Gmail(GmailApiError::RequestFailed {
            operation: operation.to_string(),
            status,
            body,
        })
    }
}

#[async_trait]
impl GmailApi for GmailClient {
    async fn list_messages(&self, label_id: &str, max_results: u32) -> Result<MessageList> {
        let token = self.access_token().await?;
        let url = format!(
            "{}?labelIds={}&maxResults={}",
            Self::messages_url(),
            urlencoding::encode(label_id),
            max_results
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::request_failed("List messages", response).await)
        }
    }

    async fn get_message(&self, message_id: &str) -> Result<Message> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/{}?format=full",
            Self::messages_url(),
            urlencoding::encode(message_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else if response.status().as_u16() == 404 {
            Err(GmailMcpError::Gmail(GmailApiError::MessageNotFound {
                message_id: message_id.to_string(),
            }))
        } else {
            Err(Self::request_failed("Get message", response).await)
        }
    }

    async fn create_draft(&self, request: &CreateDraftRequest) -> Result<Draft> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .post(Self::drafts_url())
            .bearer_auth(&token)
            .json(request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::request_failed("Create draft", response).await)
        }
    }
}
