//! cache_get tool implementation.
//!
//! Retrieves a stored response by request URL, from one partition or the
//! first partition holding it.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use hearth_client::{Method, Orchestrator, Request};
use hearth_core::Error;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Request URL, absolute or relative to the shell origin.
    pub url: String,

    /// Restrict the lookup to this partition.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub partition: String,
    pub url: String,
    pub key_hash: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub stored_at: String,
    pub age_secs: Option<i64>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(orchestrator: &Orchestrator, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = orchestrator.resolve(&params.url)?;
    let key = Request::new(Method::GET, url.clone()).cache_key();
    let db = orchestrator.db();

    let found = match params.partition {
        Some(partition) => db.match_entry(&partition, &key).await?.map(|entry| (partition, entry)),
        None => db.match_any(&key).await?,
    };
    let (partition, entry) = found.ok_or_else(|| Error::CacheMiss(format!("GET {url}")))?;

    let output = CacheGetOutput {
        age_secs: entry.age().map(|age| age.num_seconds()),
        partition,
        url: entry.url,
        key_hash: entry.key_hash,
        status_code: entry.status_code,
        headers: entry.headers,
        body: String::from_utf8_lossy(&entry.body).into_owned(),
        stored_at: entry.stored_at,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
