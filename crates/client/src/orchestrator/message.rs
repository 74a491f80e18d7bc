//! Control messages sent from the page to the orchestrator.

use serde::{Deserialize, Serialize};

/// A control message, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting worker now.
    SkipWaiting,
    /// Fetch these URLs into the PAGES partition.
    CacheUrls { urls: Vec<String> },
}

/// Outcome of a handled control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MessageReply {
    /// `activated` is false when activation is deferred until install
    /// completes or the worker was already active.
    SkipWaiting { activated: bool },
    Cached { count: usize },
}
