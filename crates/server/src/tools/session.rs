//! session_sign_in / session_sign_out tool implementations.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use hearth_client::Orchestrator;
use hearth_core::Error;

/// Parameters for the session_sign_in tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SignInParams {
    /// Bearer token attached to API requests.
    pub token: String,

    /// Optional user identifier, for status reporting only.
    #[serde(default)]
    pub subject: Option<String>,
}

/// Session state after a sign-in or sign-out.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionOutput {
    pub authenticated: bool,
    pub subject: Option<String>,
}

pub async fn sign_in_impl(orchestrator: &Orchestrator, params: SignInParams) -> Result<CallToolResult, McpError> {
    if params.token.trim().is_empty() {
        return Err(Error::InvalidInput("token cannot be empty".into()).into());
    }
    orchestrator.sign_in(params.token, params.subject).await?;
    respond(orchestrator)
}

/// Returns once the cached API responses are gone.
pub async fn sign_out_impl(orchestrator: &Orchestrator) -> Result<CallToolResult, McpError> {
    orchestrator.sign_out().await?;
    respond(orchestrator)
}

fn respond(orchestrator: &Orchestrator) -> Result<CallToolResult, McpError> {
    let state = orchestrator.session().map(|s| s.snapshot()).unwrap_or_default();
    let output = SessionOutput { authenticated: state.is_authenticated(), subject: state.subject };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize session: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
