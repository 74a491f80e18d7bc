//! MCP tool implementations.
//!
//! This module contains all tools exposed by the hearth server. Each tool
//! stands in for one browser event delivered to the orchestrator.

pub mod cache_get;
pub mod session;
pub mod shell_fetch;
pub mod shell_message;
pub mod shell_status;

pub use cache_get::{CacheGetParams, get_impl};
pub use session::{SignInParams, sign_in_impl, sign_out_impl};
pub use shell_fetch::{ShellFetchParams, fetch_impl};
pub use shell_message::{ShellMessageParams, message_impl};
pub use shell_status::status_impl;

/// Decode the JSON text payload of a successful tool result.
#[cfg(test)]
pub(crate) fn output<T: serde::de::DeserializeOwned>(result: rmcp::model::CallToolResult) -> T {
    let text = result
        .content
        .first()
        .and_then(|c| c.as_text())
        .map(|content| content.text.clone())
        .expect("Expected text content");
    serde_json::from_str(&text).unwrap()
}
