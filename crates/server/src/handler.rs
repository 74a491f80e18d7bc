//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the orchestrator.
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::{
    CacheGetParams, ShellFetchParams, ShellMessageParams, SignInParams, fetch_impl, get_impl, message_impl,
    sign_in_impl, sign_out_impl, status_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for hearth.
#[derive(Clone)]
pub struct HearthServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl HearthServer {
    /// Create a new server handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    /// Deliver a fetch event.
    ///
    /// Once the worker is active, the request is classified and served from
    /// the network or the versioned partitions; before that it is passed
    /// straight through.
    #[tool(
        description = "Fetch a URL through the offline cache. Returns status, body and whether it came from network, cache, the offline document or a synthesized page."
    )]
    async fn shell_fetch(&self, params: Parameters<ShellFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state.orchestrator, params.0).await
    }

    /// Deliver a control message.
    #[tool(
        description = "Send a control message: SKIP_WAITING activates a waiting worker; CACHE_URLS stores the given pages for offline use."
    )]
    async fn shell_message(&self, params: Parameters<ShellMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.state.orchestrator, params.0).await
    }

    #[tool(description = "Report worker state, cache version and partitions with entry counts.")]
    async fn shell_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state.orchestrator, &self.state.session).await
    }

    #[tool(description = "Read a stored response by URL, optionally from a single partition.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state.orchestrator, params.0).await
    }

    #[tool(description = "Sign in with a bearer token used for API requests.")]
    async fn session_sign_in(&self, params: Parameters<SignInParams>) -> Result<CallToolResult, McpError> {
        sign_in_impl(&self.state.orchestrator, params.0).await
    }

    #[tool(description = "Sign out and clear cached API responses.")]
    async fn session_sign_out(&self) -> Result<CallToolResult, McpError> {
        sign_out_impl(&self.state.orchestrator).await
    }
}

impl ServerHandler for HearthServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "hearth".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{shell_server, test_state};

    #[tokio::test]
    async fn test_lists_every_tool() {
        let server = shell_server().await;
        let handler = HearthServer::new(Arc::new(test_state(&server).await));

        let mut names: Vec<String> = handler.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["cache_get", "session_sign_in", "session_sign_out", "shell_fetch", "shell_message", "shell_status"]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = shell_server().await;
        let handler = HearthServer::new(Arc::new(test_state(&server).await));
        assert_eq!(handler.get_info().server_info.name, "hearth");
    }
}
