//! shell_fetch tool implementation.
//!
//! Delivers one fetch event to the orchestrator and reports how it was
//! served.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use hearth_client::{Method, Orchestrator, Request, Source};
use hearth_core::Error;

/// Input parameters for shell_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellFetchParams {
    /// URL to fetch, absolute or relative to the shell origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are ever cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a full-page navigation.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for shell_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellFetchOutput {
    pub url: String,
    pub status: u16,
    pub source: Source,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub bytes: usize,
    pub fetch_ms: u64,
}

/// Implementation of the shell_fetch tool.
pub async fn fetch_impl(orchestrator: &Orchestrator, params: ShellFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method = Method::from_bytes(params.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", params.method)))?;
    let url = orchestrator.resolve(&params.url)?;

    let request = if params.navigate {
        Request { method, ..Request::navigate(url) }
    } else {
        Request::new(method, url)
    };

    let served = orchestrator.route(request).await?;
    let response = &served.response;

    let output = ShellFetchOutput {
        url: response.url.to_string(),
        status: response.status.as_u16(),
        source: served.source,
        content_type: response.content_type().map(str::to_string),
        body: String::from_utf8_lossy(&response.bytes).into_owned(),
        bytes: response.bytes.len(),
        fetch_ms: response.fetch_ms,
    };

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{shell_server, test_state};
    use crate::tools::output;

    #[tokio::test]
    async fn test_fetch_impl_empty_url() {
        let server = shell_server().await;
        let state = test_state(&server).await;
        let params = ShellFetchParams { url: " ".into(), method: "GET".into(), navigate: false };

        assert!(fetch_impl(&state.orchestrator, params).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_impl_invalid_method() {
        let server = shell_server().await;
        let state = test_state(&server).await;
        let params = ShellFetchParams { url: "/".into(), method: "GE T".into(), navigate: false };

        let err = fetch_impl(&state.orchestrator, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_fetch_impl_navigation_offline() {
        let server = shell_server().await;
        let state = test_state(&server).await;
        state.orchestrator.start().await.unwrap();

        let params = ShellFetchParams { url: "/app/tasks".into(), method: "get".into(), navigate: true };
        let online: ShellFetchOutput = output(fetch_impl(&state.orchestrator, params.clone()).await.unwrap());
        assert_eq!(online.source, Source::Network);

        drop(server);
        let offline: ShellFetchOutput = output(fetch_impl(&state.orchestrator, params).await.unwrap());
        assert_eq!(offline.source, Source::Cache);
        assert_eq!(offline.body, "<h1>Tasks</h1>");
    }

    #[tokio::test]
    async fn test_fetch_impl_passthrough_before_install() {
        let server = shell_server().await;
        let state = test_state(&server).await;

        let params = ShellFetchParams { url: "/".into(), method: "GET".into(), navigate: false };
        let out: ShellFetchOutput = output(fetch_impl(&state.orchestrator, params).await.unwrap());
        assert_eq!(out.source, Source::Passthrough);
        assert_eq!(out.status, 200);
    }
}
