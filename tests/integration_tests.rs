//! Integration tests for Gmail Assistant MCP Server
//!
//! These drive the JSON-RPC front-end end to end. The Gmail API is replaced
//! by an in-memory transport - no real API calls are made.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{json, Value};

use gmail_assistant_mcp::error::{GmailApiError, GmailMcpError, Result};
use gmail_assistant_mcp::gmail::client::GmailApi;
use gmail_assistant_mcp::gmail::gateway::MailGateway;
use gmail_assistant_mcp::gmail::types::{CreateDraftRequest, Draft, Message, MessageList};
use gmail_assistant_mcp::gmail::utils::decode_base64url;
use gmail_assistant_mcp::mcp::server::McpServer;
use gmail_assistant_mcp::mcp::tools::ToolHandler;

/// In-memory Gmail mailbox
#[derive(Default)]
struct Mailbox {
    unread: Vec<String>,
    messages: HashMap<String, Value>,
    draft_response: Option<Value>,
    drafts: Mutex<Vec<CreateDraftRequest>>,
    requests: Mutex<Vec<String>>,
}

fn provider_error(operation: &str, status: u16) -> GmailMcpError {
    GmailMcpError::Gmail(GmailApiError::RequestFailed {
        operation: operation.to_string(),
        status,
        body: "{\"error\":\"simulated\"}".to_string(),
    })
}

#[async_trait]
impl GmailApi for Mailbox {
    async fn list_messages(&self, label_id: &str, max_results: u32) -> Result<MessageList> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("list {} {}", label_id, max_results));
        let messages: Vec<Value> = self
            .unread
            .iter()
            .take(max_results as usize)
            .map(|id| json!({"id": id, "threadId": format!("thread-{}", id)}))
            .collect();
        Ok(serde_json::from_value(json!({ "messages": messages }))?)
    }

    async fn get_message(&self, message_id: &str) -> Result<Message> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("get {}", message_id));
        match self.messages.get(message_id) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(provider_error("Get message", 500)),
        }
    }

    async fn create_draft(&self, request: &CreateDraftRequest) -> Result<Draft> {
        self.requests.lock().unwrap().push("create draft".to_string());
        self.drafts.lock().unwrap().push(request.clone());
        match &self.draft_response {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(provider_error("Create draft", 403)),
        }
    }
}

fn b64(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

fn multipart_message(id: &str) -> Value {
    json!({
        "id": id,
        "threadId": "thread1",
        "snippet": "Quarterly numbers attached",
        "labelIds": ["UNREAD", "INBOX", "CATEGORY_UPDATES"],
        "payload": {
            "mimeType": "multipart/alternative",
            "headers": [
                {"name": "from", "value": "Alice <alice@example.com>"},
                {"name": "SUBJECT", "value": "Q3 report"},
                {"name": "Date", "value": "Tue, 2 Jan 2024 09:30:00 +0000"},
                {"name": "Message-Id", "value": "<q3@example.com>"}
            ],
            "parts": [
                {"mimeType": "text/html", "body": {"data": b64("<p>See report</p>")}},
                {"mimeType": "text/plain", "body": {"data": b64("See report")}}
            ]
        }
    })
}

fn server_for(mailbox: Arc<Mailbox>) -> McpServer {
    McpServer::new(ToolHandler::new(MailGateway::new(mailbox)))
}

async fn call_tool(server: &McpServer, id: i64, name: &str, arguments: Value) -> (Value, Value) {
    let request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    });
    let response = server
        .handle_message(&request.to_string())
        .await
        .expect("tools/call must produce a response");
    let response = serde_json::to_value(response).unwrap();
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content")
        .to_string();
    (response, serde_json::from_str(&text).unwrap())
}

mod get_unread_emails {
    use super::*;

    #[tokio::test]
    async fn partial_results_when_one_detail_fetch_fails() {
        let mailbox = Arc::new(Mailbox {
            unread: vec!["msg1".to_string(), "msg2".to_string()],
            messages: HashMap::from([("msg1".to_string(), multipart_message("msg1"))]),
            ..Default::default()
        });
        let server = server_for(mailbox.clone());

        let (response, envelope) = call_tool(&server, 1, "get_unread_emails", json!({})).await;

        assert!(response["error"].is_null());
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["count"], 1);
        assert_eq!(envelope["emails"].as_array().unwrap().len(), 1);

        let email = &envelope["emails"][0];
        assert_eq!(email["email_id"], "msg1");
        assert_eq!(email["thread_id"], "thread1");
        assert_eq!(email["message_id"], "<q3@example.com>");
        assert_eq!(email["sender"], "Alice <alice@example.com>");
        assert_eq!(email["subject"], "Q3 report");
        assert_eq!(email["date"], "Tue, 2 Jan 2024 09:30:00 +0000");
        assert_eq!(email["snippet"], "Quarterly numbers attached");
        assert_eq!(email["body"], "See report");
        assert_eq!(email["labels"], json!(["UNREAD", "INBOX", "CATEGORY_UPDATES"]));

        let requests = mailbox.requests.lock().unwrap();
        assert_eq!(requests[0], "list UNREAD 10");
    }

    #[tokio::test]
    async fn max_results_is_forwarded_and_honored() {
        let ids: Vec<String> = (1..=8).map(|i| format!("m{}", i)).collect();
        let messages = ids
            .iter()
            .map(|id| (id.clone(), multipart_message(id)))
            .collect();
        let mailbox = Arc::new(Mailbox {
            unread: ids,
            messages,
            ..Default::default()
        });
        let server = server_for(mailbox.clone());

        let (_, envelope) =
            call_tool(&server, 2, "get_unread_emails", json!({"max_results": 3})).await;
        assert_eq!(envelope["count"], 3);
        let ids: Vec<&str> = envelope["emails"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["email_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert_eq!(mailbox.requests.lock().unwrap()[0], "list UNREAD 3");
    }

    #[tokio::test]
    async fn invalid_max_results_is_rejected_with_empty_emails() {
        let mailbox = Arc::new(Mailbox::default());
        let server = server_for(mailbox.clone());

        let (response, envelope) =
            call_tool(&server, 3, "get_unread_emails", json!({"max_results": "ten"})).await;
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["emails"], json!([]));
        assert!(mailbox.requests.lock().unwrap().is_empty());
    }
}

mod create_draft_reply {
    use super::*;

    #[tokio::test]
    async fn threaded_draft_is_created() {
        let mailbox = Arc::new(Mailbox {
            draft_response: Some(json!({"id": "d1", "message": {"id": "m1", "threadId": "t1"}})),
            ..Default::default()
        });
        let server = server_for(mailbox.clone());

        let (response, envelope) = call_tool(
            &server,
            10,
            "create_draft_reply",
            json!({
                "thread_id": "t1",
                "to": "a@b.com",
                "subject": "Re: X",
                "body": "hi",
                "in_reply_to": "<orig@mail>"
            }),
        )
        .await;

        assert!(response["result"].get("isError").is_none());
        assert_eq!(
            envelope,
            json!({"draft_id": "d1", "message_id": "m1", "thread_id": "t1", "success": true})
        );

        let drafts = mailbox.drafts.lock().unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].message.thread_id.as_deref(), Some("t1"));
        let raw = String::from_utf8(decode_base64url(&drafts[0].message.raw).unwrap()).unwrap();
        assert!(raw.contains("To: a@b.com"));
        assert!(raw.contains("Subject: Re: X"));
        assert!(raw.contains("In-Reply-To: <orig@mail>"));
        assert!(raw.contains("References: <orig@mail>"));
    }

    #[tokio::test]
    async fn missing_body_is_rejected_before_any_provider_call() {
        let mailbox = Arc::new(Mailbox::default());
        let server = server_for(mailbox.clone());

        let (_, envelope) = call_tool(
            &server,
            11,
            "create_draft_reply",
            json!({"thread_id": "t1", "to": "a@b.com", "subject": "Re: X"}),
        )
        .await;

        assert_eq!(
            envelope,
            json!({"success": false, "error": "Missing required parameter: body"})
        );
        assert!(mailbox.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_rejection_becomes_failed_envelope() {
        let mailbox = Arc::new(Mailbox::default());
        let server = server_for(mailbox);

        let (response, envelope) = call_tool(
            &server,
            12,
            "create_draft_reply",
            json!({"thread_id": "nope", "to": "a@b.com", "subject": "Re: X", "body": "hi"}),
        )
        .await;

        assert!(response["error"].is_null());
        assert_eq!(envelope["success"], false);
        let error = envelope["error"].as_str().unwrap();
        assert!(error.contains("Create draft failed (403)"));
        assert!(envelope.get("draft_id").is_none());
    }
}

mod protocol {
    use super::*;

    #[tokio::test]
    async fn tools_list_declares_both_tools() {
        let server = server_for(Arc::new(Mailbox::default()));
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":"list","method":"tools/list"}"#)
            .await
            .unwrap();
        let response = serde_json::to_value(response).unwrap();

        assert_eq!(response["id"], "list");
        let tools = response["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["get_unread_emails", "create_draft_reply"]);
        for tool in tools {
            assert!(tool["description"].is_string());
            assert!(tool["inputSchema"]["properties"].is_object());
        }
    }

    #[tokio::test]
    async fn unknown_tool_uses_the_envelope() {
        let server = server_for(Arc::new(Mailbox::default()));
        let (response, envelope) = call_tool(&server, 20, "delete_everything", json!({})).await;

        assert!(response["error"].is_null());
        assert_eq!(
            envelope,
            json!({"success": false, "error": "Unknown tool: delete_everything"})
        );
    }

    #[tokio::test]
    async fn uninitialized_server_still_answers() {
        let server = McpServer::new(ToolHandler::uninitialized());
        let (_, envelope) = call_tool(&server, 21, "get_unread_emails", json!({})).await;
        assert_eq!(
            envelope,
            json!({"success": false, "error": "Gmail client not initialized", "emails": []})
        );
    }
}
