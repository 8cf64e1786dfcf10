//! Gmail utility functions
//!
//! Header lookup, body extraction, and reply message construction.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::types::{DraftReply, MessagePart};

const TEXT_PLAIN: &str = "text/plain";
const TEXT_HTML: &str = "text/html";

/// UTF-8 bytes per encoded word; keeps each `=?UTF-8?B?...?=` within 75 chars
const ENCODED_WORD_MAX_BYTES: usize = 45;

/// Encode text for MIME header (RFC 2047).
///
/// Long values become several encoded words on folded lines.
pub fn encode_mime_header(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in text.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_MAX_BYTES {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }

    words.join("\r\n ")
}

fn encoded_word(text: &str) -> String {
    format!(
        "=?UTF-8?B?{}?=",
        base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
    )
}

/// Encode non-ASCII display names in an address list such as
/// `Zoë <zoe@example.com>, bob@example.com`
pub fn encode_address_header(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }

    split_addresses(value)
        .into_iter()
        .map(encode_mailbox)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split on commas outside quoted display names
fn split_addresses(value: &str) -> Vec<&str> {
    let mut addresses = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                addresses.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    addresses.push(value[start..].trim());
    addresses.retain(|a| !a.is_empty());
    addresses
}

fn encode_mailbox(mailbox: &str) -> String {
    if mailbox.is_ascii() {
        return mailbox.to_string();
    }

    match mailbox.rfind('<') {
        Some(at) => {
            let name = mailbox[..at].trim().trim_matches('"').trim();
            let address = &mailbox[at..];
            if name.is_empty() {
                address.to_string()
            } else {
                format!("{} {}", encode_mime_header(name), address)
            }
        }
        // bare internationalized address, nothing to encode
        None => mailbox.to_string(),
    }
}

/// Encode a raw email message for Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Decode base64url data from Gmail API
/// Handles both padded and non-padded base64url encoding
pub fn decode_base64url(data: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(data))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(data))
}

/// Decode a base64url body into UTF-8 text
fn decode_text(message_id: &str, data: &str) -> Result<String> {
    let invalid = |what: &str, message: String| {
        GmailMcpError::Gmail(GmailApiError::InvalidPayload {
            message_id: message_id.to_string(),
            what: what.to_string(),
            message,
        })
    };

    let bytes = decode_base64url(data).map_err(|e| invalid("base64 body", e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| invalid("UTF-8 body", e.to_string()))
}

/// Find header value by name (case-insensitive)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Extract the message body: first plain text part, else first HTML part.
///
/// Multipart containers are searched depth-first in part order. A payload
/// without parts has its own body decoded whatever its type. Returns an
/// empty string when no part carries data; fails only when data is present
/// but not valid base64url/UTF-8.
pub fn extract_body(message_id: &str, payload: &MessagePart) -> Result<String> {
    let data = if payload.parts.is_empty() {
        payload.data()
    } else {
        find_part_data(&payload.parts, TEXT_PLAIN).or_else(|| find_part_data(&payload.parts, TEXT_HTML))
    };

    match data {
        Some(data) => decode_text(message_id, data),
        None => Ok(String::new()),
    }
}

fn find_part_data<'a>(parts: &'a [MessagePart], mime_type: &str) -> Option<&'a str> {
    parts.iter().find_map(|part| {
        if part.is_mime_type(mime_type) {
            part.data()
        } else if !part.parts.is_empty() {
            find_part_data(&part.parts, mime_type)
        } else {
            None
        }
    })
}

/// Strip line breaks so a value cannot start a new header
fn header_value(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Create a plain text RFC 822 reply message.
///
/// `In-Reply-To` and `References` are written together; Gmail needs both to
/// thread the draft under the original conversation.
pub fn create_reply_message(reply: &DraftReply) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "To: {}",
        encode_address_header(&header_value(&reply.to))
    ));
    lines.push(format!(
        "Subject: {}",
        encode_mime_header(&header_value(&reply.subject))
    ));

    if let Some(in_reply_to) = reply.in_reply_to.as_deref().map(header_value) {
        if !in_reply_to.is_empty() {
            lines.push(format!("In-Reply-To: {}", in_reply_to));
            lines.push(format!("References: {}", in_reply_to));
        }
    }

    let transfer_encoding = if reply.body.is_ascii() { "7bit" } else { "8bit" };

    lines.push("MIME-Version: 1.0".to_string());
    lines.push("Content-Type: text/plain; charset=UTF-8".to_string());
    lines.push(format!("Content-Transfer-Encoding: {}", transfer_encoding));
    lines.push(String::new());
    lines.push(reply.body.clone());

    lines.join("\r\n")
}
