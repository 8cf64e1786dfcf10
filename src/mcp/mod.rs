//! MCP (Model Context Protocol) front-end
//!
//! JSON-RPC over stdio, exposing the unread-mail and draft-reply tools.

pub mod server;
pub mod tools;
pub mod types;
