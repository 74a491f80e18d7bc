//! In-memory network and orchestrator fixtures for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use hearth_core::{CacheDb, Error, PartitionNames};
use reqwest::{StatusCode, Url, header};

use super::{Orchestrator, OrchestratorSettings, Patterns};
use crate::fetch::{FetchResponse, Fetcher, Request};

pub(crate) const ORIGIN: &str = "http://localhost:8080";

#[derive(Default)]
struct State {
    routes: Mutex<HashMap<String, (u16, Bytes)>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
}

/// A scripted network. Clones share routes and counters.
#[derive(Clone, Default)]
pub(crate) struct FakeFetcher {
    state: Arc<State>,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Routes for the shell files `test_orchestrator` pre-caches.
    pub(crate) fn shell() -> Self {
        Self::new()
            .route("http://localhost:8080/", 200, "<html>shell</html>")
            .route("http://localhost:8080/offline.html", 200, "<html>offline</html>")
            .route("http://localhost:8080/icons/icon-192.png", 200, "png")
    }

    /// Add or replace the response for a URL.
    pub(crate) fn route(self, url: &str, status: u16, body: &str) -> Self {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, Bytes::copy_from_slice(body.as_bytes())));
        self
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.state.offline.store(offline, Ordering::SeqCst);
    }

    /// Fetch attempts so far, including rejected ones.
    pub(crate) fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        *self.state.last_authorization.lock().unwrap() = request
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if self.state.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }

        let (status, bytes) = self
            .state
            .routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or((404, Bytes::from_static(b"not found")));

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));

        Ok(FetchResponse {
            url: request.url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            bytes,
            fetch_ms: 0,
        })
    }
}

/// An orchestrator over a two-file core list and a one-icon asset list.
pub(crate) fn test_orchestrator(db: CacheDb, fetcher: FakeFetcher, version: &str) -> Orchestrator {
    let origin = Url::parse(ORIGIN).unwrap();
    let at = |path: &str| origin.join(path).unwrap();

    let settings = OrchestratorSettings {
        names: PartitionNames::new("hearth", version),
        patterns: Patterns::new(
            "/api/",
            &["auth.hearth.local".to_string()],
            &["css".to_string(), "js".to_string(), "png".to_string()],
        )
        .unwrap(),
        core_urls: vec![at("/"), at("/offline.html")],
        asset_urls: vec![at("/icons/icon-192.png")],
        offline_url: at("/offline.html"),
        max_stale: None,
        skip_waiting_on_install: true,
        origin,
    };

    Orchestrator::new(db, Arc::new(fetcher), settings)
}
