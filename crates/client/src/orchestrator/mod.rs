//! The cache orchestrator.
//!
//! Sits between the page and the network: every intercepted request is
//! classified by [`classify`] and served by [`Orchestrator::handle`] through
//! one of the strategies, each backed by one versioned partition. The host
//! adapter delivers fetch, message, install and activate events by calling
//! the methods here; nothing in this module listens for events itself.

pub mod classify;
pub mod lifecycle;
pub mod message;
pub mod offline;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use hearth_core::{AppConfig, CacheDb, Error, PartitionNames, Role, cache::hash::compute_cache_key};
use reqwest::{Url, header};
use tokio::sync::{RwLock, RwLockReadGuard};

pub use classify::{Dispatch, Patterns, Rule, classify};
pub use lifecycle::{ActivateReport, InstallReport, StartReport, WorkerState};
pub use message::{ControlMessage, MessageReply};
pub use strategy::{Served, Source};

use crate::fetch::{Fetcher, Request, resolve};
use crate::session::AuthContext;
use lifecycle::Lifecycle;

/// Everything the orchestrator needs from configuration, resolved up front.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub names: PartitionNames,
    pub patterns: Patterns,
    pub origin: Url,
    pub core_urls: Vec<Url>,
    pub asset_urls: Vec<Url>,
    pub offline_url: Url,
    pub max_stale: Option<Duration>,
    pub skip_waiting_on_install: bool,
}

impl OrchestratorSettings {
    /// Resolve URL lists against the origin and compile classification patterns.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let resolve_all = |urls: &[String]| -> Result<Vec<Url>, Error> {
            urls.iter().map(|u| resolve_against(u, &origin)).collect()
        };

        Ok(Self {
            names: PartitionNames::new(&config.cache_prefix, &config.cache_version),
            patterns: Patterns::new(&config.api_path_marker, &config.api_hosts, &config.asset_extensions)?,
            core_urls: resolve_all(&config.core_urls)?,
            asset_urls: resolve_all(&config.asset_urls)?,
            offline_url: resolve_against(&config.offline_url, &origin)?,
            max_stale: config.max_stale(),
            skip_waiting_on_install: config.skip_waiting_on_install,
            origin,
        })
    }
}

fn resolve_against(input: &str, origin: &Url) -> Result<Url, Error> {
    resolve(input, origin).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
}

pub struct Orchestrator {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    settings: OrchestratorSettings,
    session: Option<Arc<AuthContext>>,
    /// Session generation the API partition's contents belong to.
    api_owner: RwLock<u64>,
    lifecycle: RwLock<Lifecycle>,
}

impl Orchestrator {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, settings: OrchestratorSettings) -> Self {
        Self {
            db,
            fetcher,
            settings,
            session: None,
            api_owner: RwLock::new(0),
            lifecycle: RwLock::new(Lifecycle::default()),
        }
    }

    /// Attach an auth session. API requests then carry its bearer token,
    /// and the API partition only ever serves the user who filled it.
    ///
    /// Entries already stored are taken to belong to the session as attached.
    pub fn with_session(mut self, session: Arc<AuthContext>) -> Self {
        *self.api_owner.get_mut() = session.generation();
        self.session = Some(session);
        self
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn names(&self) -> &PartitionNames {
        &self.settings.names
    }

    pub fn session(&self) -> Option<&Arc<AuthContext>> {
        self.session.as_ref()
    }

    /// Resolve a page-supplied URL against the shell origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve_against(input, &self.settings.origin)
    }

    /// Sign in and drop any API entries stored for a different user.
    ///
    /// Waits for in-flight API requests, so nothing they write survives.
    pub async fn sign_in(&self, token: impl Into<String>, subject: Option<String>) -> Result<(), Error> {
        let token = token.into();
        self.switch_session(move |session| session.sign_in(token, subject))
            .await
    }

    /// Sign out and clear the API partition before returning.
    pub async fn sign_out(&self) -> Result<(), Error> {
        self.switch_session(AuthContext::sign_out).await
    }

    async fn switch_session(&self, change: impl FnOnce(&AuthContext)) -> Result<(), Error> {
        let Some(session) = &self.session else {
            return Err(Error::InvalidState("no auth session attached".into()));
        };
        let mut owner = self.api_owner.write().await;
        change(session);
        self.settle_api_owner(&mut owner, session).await
    }

    /// Clear the API partition if the session changed hands since it was filled.
    async fn settle_api_owner(&self, owner: &mut u64, session: &AuthContext) -> Result<(), Error> {
        let generation = session.generation();
        if *owner == generation {
            return Ok(());
        }

        let api = self.settings.names.name(Role::Api);
        let count = self.db.clear_partition(&api).await?;
        tracing::info!(partition = %api, count, generation, "cleared API partition for session change");
        *owner = generation;
        Ok(())
    }

    /// Shared access to the API partition on behalf of the current session.
    async fn api_access(&self, session: &AuthContext) -> Result<RwLockReadGuard<'_, u64>, Error> {
        loop {
            let owner = self.api_owner.read().await;
            if *owner == session.generation() {
                return Ok(owner);
            }
            drop(owner);

            let mut owner = self.api_owner.write().await;
            self.settle_api_owner(&mut owner, session).await?;
        }
    }

    /// The fetch-event entry point. Before activation every request is
    /// passed through untouched.
    pub async fn route(&self, request: Request) -> Result<Served, Error> {
        let dispatch = if self.is_controlling().await {
            classify(&request, &self.settings.patterns)
        } else {
            Dispatch::Passthrough
        };
        tracing::debug!(method = %request.method, url = %request.url, ?dispatch, "routing");
        self.handle(dispatch, request).await
    }

    /// Serve a request with an already chosen dispatch.
    pub async fn handle(&self, dispatch: Dispatch, request: Request) -> Result<Served, Error> {
        match (&self.session, dispatch) {
            (Some(session), Dispatch::NetworkFirst(Role::Api) | Dispatch::CacheFirst(Role::Api)) => {
                self.handle_api(session, dispatch, request).await
            }
            _ => self.serve(dispatch, &request).await,
        }
    }

    /// API traffic under a session: signed out, it bypasses the partition
    /// entirely; signed in, it carries the bearer token.
    async fn handle_api(&self, session: &AuthContext, dispatch: Dispatch, mut request: Request) -> Result<Served, Error> {
        let _owner = self.api_access(session).await?;

        let Some(bearer) = session.bearer() else {
            tracing::debug!(url = %request.url, "signed out, API request bypasses the cache");
            return strategy::passthrough(self.fetcher.as_ref(), &request).await;
        };

        if !request.headers.contains_key(header::AUTHORIZATION)
            && let Ok(value) = header::HeaderValue::from_str(&bearer)
        {
            request.headers.insert(header::AUTHORIZATION, value);
        }

        self.serve(dispatch, &request).await
    }

    async fn serve(&self, dispatch: Dispatch, request: &Request) -> Result<Served, Error> {
        let fetcher = self.fetcher.as_ref();
        let names = &self.settings.names;

        match dispatch {
            Dispatch::Passthrough => strategy::passthrough(fetcher, request).await,
            Dispatch::NetworkFirst(role) => {
                strategy::network_first(&self.db, fetcher, request, &names.name(role), self.settings.max_stale).await
            }
            Dispatch::CacheFirst(role) => strategy::cache_first(&self.db, fetcher, request, &names.name(role)).await,
            Dispatch::Navigation => {
                let offline_key = compute_cache_key("GET", self.settings.offline_url.as_str());
                strategy::navigation(&self.db, fetcher, request, &names.name(Role::Pages), &offline_key).await
            }
        }
    }

    /// The message-event entry point.
    pub async fn message(&self, message: ControlMessage) -> Result<MessageReply, Error> {
        match message {
            ControlMessage::SkipWaiting => {
                let activated = self.skip_waiting().await?;
                Ok(MessageReply::SkipWaiting { activated })
            }
            ControlMessage::CacheUrls { urls } => {
                let count = self.cache_urls(&urls).await?;
                Ok(MessageReply::Cached { count })
            }
        }
    }

    /// Fetch the URLs and store them all into PAGES, or none of them.
    pub async fn cache_urls(&self, urls: &[String]) -> Result<usize, Error> {
        let urls = urls
            .iter()
            .map(|u| self.resolve(u))
            .collect::<Result<Vec<_>, _>>()?;
        let entries = self.precache(&urls).await?;
        let count = entries.len();

        self.db
            .put_entries(&self.settings.names.name(Role::Pages), entries)
            .await?;
        tracing::info!(count, "cached URLs on request");
        Ok(count)
    }
}
