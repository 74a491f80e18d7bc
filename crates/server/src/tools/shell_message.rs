//! shell_message tool implementation.
//!
//! Posts a control message to the orchestrator.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use hearth_client::{ControlMessage, Orchestrator};
use hearth_core::Error;

/// Parameters for the shell_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellMessageParams {
    /// Message type: "SKIP_WAITING" or "CACHE_URLS".
    #[serde(rename = "type")]
    pub kind: String,

    /// URLs to cache into the pages partition (CACHE_URLS only).
    #[serde(default)]
    pub urls: Option<Vec<String>>,
}

impl TryFrom<ShellMessageParams> for ControlMessage {
    type Error = Error;

    fn try_from(params: ShellMessageParams) -> Result<Self, Error> {
        match params.kind.as_str() {
            "SKIP_WAITING" => Ok(ControlMessage::SkipWaiting),
            "CACHE_URLS" => match params.urls {
                Some(urls) if !urls.is_empty() => Ok(ControlMessage::CacheUrls { urls }),
                _ => Err(Error::InvalidInput("CACHE_URLS requires a non-empty urls list".into())),
            },
            other => Err(Error::InvalidInput(format!("unknown message type: {other}"))),
        }
    }
}

/// Implementation of the shell_message tool.
pub async fn message_impl(
    orchestrator: &Orchestrator, params: ShellMessageParams,
) -> Result<CallToolResult, McpError> {
    let message = ControlMessage::try_from(params)?;
    tracing::debug!(?message, "control message");

    let reply = orchestrator.message(message).await?;
    let json = serde_json::to_string_pretty(&reply)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize reply: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
