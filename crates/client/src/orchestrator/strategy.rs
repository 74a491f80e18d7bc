//! Serving strategies.
//!
//! Each strategy makes at most one network attempt. Write-through is
//! opportunistic: a failed store is logged and the live response is still
//! returned. Store read failures count as misses.

use std::time::Duration;

use hearth_core::{CacheDb, CachedResponse, Error};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::offline::synthesized_offline;
use crate::fetch::{FetchResponse, Fetcher, Request};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Network,
    Cache,
    OfflineDocument,
    Synthesized,
    Passthrough,
}

/// A response together with its source.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: FetchResponse,
    pub source: Source,
}

impl Served {
    fn network(response: FetchResponse) -> Self {
        Self { response, source: Source::Network }
    }
}

/// Plain fetch with no cache involvement.
pub async fn passthrough(fetcher: &dyn Fetcher, request: &Request) -> Result<Served, Error> {
    let response = fetcher.fetch(request).await?;
    Ok(Served { response, source: Source::Passthrough })
}

/// Network first, this partition's copy if the network is unreachable.
///
/// With `max_stale` set, a fallback copy older than the bound is treated as
/// absent.
pub async fn network_first(
    db: &CacheDb, fetcher: &dyn Fetcher, request: &Request, partition: &str, max_stale: Option<Duration>,
) -> Result<Served, Error> {
    match fetcher.fetch(request).await {
        Ok(response) => {
            if response.status == StatusCode::OK {
                store(db, partition, request, &response).await;
            }
            Ok(Served::network(response))
        }
        Err(err) if err.is_network_failure() => {
            let cached = lookup(db, partition, &request.cache_key())
                .await
                .filter(|entry| within_bound(entry, max_stale));

            match cached.and_then(rebuild) {
                Some(response) => {
                    tracing::warn!(url = %request.url, partition, error = %err, "network failed, serving cached copy");
                    Ok(Served { response, source: Source::Cache })
                }
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}

/// Cached copy if present, otherwise network with write-through.
pub async fn cache_first(
    db: &CacheDb, fetcher: &dyn Fetcher, request: &Request, partition: &str,
) -> Result<Served, Error> {
    if let Some(response) = lookup(db, partition, &request.cache_key()).await.and_then(rebuild) {
        tracing::debug!(url = %request.url, partition, "cache hit");
        return Ok(Served { response, source: Source::Cache });
    }

    tracing::debug!(url = %request.url, partition, "cache miss");
    let response = fetcher.fetch(request).await?;
    if response.status == StatusCode::OK {
        store(db, partition, request, &response).await;
    }
    Ok(Served::network(response))
}

/// Full-page loads: network with write-through into `pages`, then any cached
/// copy, then the offline document, then a synthesized page. Never fails.
pub async fn navigation(
    db: &CacheDb, fetcher: &dyn Fetcher, request: &Request, pages: &str, offline_key: &str,
) -> Result<Served, Error> {
    let err = match fetcher.fetch(request).await {
        Ok(response) => {
            if response.status == StatusCode::OK {
                store(db, pages, request, &response).await;
            }
            return Ok(Served::network(response));
        }
        Err(err) => err,
    };

    tracing::warn!(url = %request.url, error = %err, "navigation failed, falling back");

    if let Some(response) = lookup_any(db, &request.cache_key()).await.and_then(rebuild) {
        return Ok(Served { response, source: Source::Cache });
    }

    if let Some(response) = lookup_any(db, offline_key).await.and_then(rebuild) {
        return Ok(Served { response, source: Source::OfflineDocument });
    }

    Ok(Served { response: synthesized_offline(&request.url), source: Source::Synthesized })
}

async fn store(db: &CacheDb, partition: &str, request: &Request, response: &FetchResponse) {
    let entry = response.to_cached(&request.method, request.cache_key());
    if let Err(e) = db.put_entry(partition, &entry).await {
        tracing::warn!(url = %request.url, partition, error = %e, "write-through failed");
    }
}

async fn lookup(db: &CacheDb, partition: &str, key: &str) -> Option<CachedResponse> {
    db.match_entry(partition, key)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(partition, error = %e, "cache read failed");
            None
        })
}

async fn lookup_any(db: &CacheDb, key: &str) -> Option<CachedResponse> {
    match db.match_any(key).await {
        Ok(found) => found.map(|(_, entry)| entry),
        Err(e) => {
            tracing::warn!(error = %e, "cache read failed");
            None
        }
    }
}

fn rebuild(entry: CachedResponse) -> Option<FetchResponse> {
    let url = entry.url.clone();
    FetchResponse::from_cached(entry)
        .map_err(|e| tracing::warn!(url = %url, error = %e, "unreadable cache entry"))
        .ok()
}

fn within_bound(entry: &CachedResponse, max_stale: Option<Duration>) -> bool {
    let Some(max_stale) = max_stale else {
        return true;
    };
    match entry.age() {
        // Negative ages (clock skew) count as fresh.
        Some(age) => age.to_std().map_or(true, |age| age <= max_stale),
        None => false,
    }
}
