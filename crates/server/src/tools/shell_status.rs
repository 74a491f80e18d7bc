//! shell_status tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use hearth_client::{AuthContext, Orchestrator, WorkerState};
use hearth_core::{Error, PartitionSummary};

/// Output from the shell_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellStatusOutput {
    pub state: WorkerState,
    pub controlling: bool,
    pub prefix: String,
    pub version: String,
    /// Partition names of the running version.
    pub current: Vec<String>,
    /// Every partition in the store, in creation order.
    pub partitions: Vec<PartitionSummary>,
    pub authenticated: bool,
}

/// Implementation of the shell_status tool.
pub async fn status_impl(orchestrator: &Orchestrator, session: &AuthContext) -> Result<CallToolResult, McpError> {
    let names = orchestrator.names();

    let output = ShellStatusOutput {
        state: orchestrator.state().await,
        controlling: orchestrator.is_controlling().await,
        prefix: names.prefix().to_string(),
        version: names.version().to_string(),
        current: names.current(),
        partitions: orchestrator.db().partition_summaries().await?,
        authenticated: session.is_authenticated(),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize status: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
