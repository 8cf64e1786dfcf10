//! Gmail API module
//!
//! Contains types, authentication, the REST client, and the mail gateway
//! built on top of it.

pub mod auth;
pub mod client;
pub mod gateway;
pub mod types;
pub mod utils;
