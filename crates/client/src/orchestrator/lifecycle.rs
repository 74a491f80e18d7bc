//! Worker lifecycle: install, activate, skip-waiting.
//!
//! ```text
//! Parsed ──install──▶ Installing ──ok──▶ Installed ──activate──▶ Activating ──▶ Activated
//!                          │
//!                          └──err──▶ Redundant ──install──▶ Installing …
//! ```
//!
//! Only an `Activated` worker routes requests through strategies.

use futures_util::future::try_join_all;
use hearth_core::{CachedResponse, Error, Role};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::Orchestrator;
use crate::fetch::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    Activated,
    /// Install failed; this worker never activates unless reinstalled.
    Redundant,
}

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    pub(crate) state: WorkerState,
    pub(crate) skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub core: usize,
    pub assets: usize,
    /// Activation was requested while installing or by configuration.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// Stale partitions removed by this activation.
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReport {
    pub install: InstallReport,
    pub activation: Option<ActivateReport>,
}

impl Orchestrator {
    pub async fn state(&self) -> WorkerState {
        self.lifecycle.read().await.state
    }

    /// Whether requests are currently routed through strategies.
    pub async fn is_controlling(&self) -> bool {
        self.state().await == WorkerState::Activated
    }

    /// Install, then activate straight away if skip-waiting was signalled.
    pub async fn start(&self) -> Result<StartReport, Error> {
        let install = self.install().await?;
        let activation = if install.skip_waiting { self.try_activate().await? } else { None };
        Ok(StartReport { install, activation })
    }

    /// Pre-cache the CORE and ASSETS lists. All or nothing: one rejected or
    /// non-200 fetch fails the install and nothing is stored.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        {
            let mut lifecycle = self.lifecycle.write().await;
            match lifecycle.state {
                WorkerState::Parsed | WorkerState::Redundant => lifecycle.state = WorkerState::Installing,
                other => return Err(Error::InvalidState(format!("cannot install from {other:?}"))),
            }
        }

        tracing::info!(
            version = self.settings.names.version(),
            core = self.settings.core_urls.len(),
            assets = self.settings.asset_urls.len(),
            "installing"
        );

        let result = self.precache_shell().await;

        let mut lifecycle = self.lifecycle.write().await;
        match result {
            Ok((core, assets)) => {
                lifecycle.state = WorkerState::Installed;
                lifecycle.skip_waiting |= self.settings.skip_waiting_on_install;
                tracing::info!(core, assets, skip_waiting = lifecycle.skip_waiting, "installed");
                Ok(InstallReport { core, assets, skip_waiting: lifecycle.skip_waiting })
            }
            Err(e) => {
                lifecycle.state = WorkerState::Redundant;
                tracing::error!(error = %e, "install failed; worker will not activate");
                Err(e)
            }
        }
    }

    /// Delete every stale partition of this prefix, open the current four
    /// and take control.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless the worker is `Installed`.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let state = self.state().await;
        self.try_activate()
            .await?
            .ok_or_else(|| Error::InvalidState(format!("cannot activate from {state:?}")))
    }

    /// Request activation. Returns true if this call activated the worker;
    /// an installing worker activates once `start` sees install succeed.
    pub async fn skip_waiting(&self) -> Result<bool, Error> {
        self.lifecycle.write().await.skip_waiting = true;
        Ok(self.try_activate().await?.is_some())
    }

    /// Activate if installed; `None` when in any other state.
    async fn try_activate(&self) -> Result<Option<ActivateReport>, Error> {
        {
            let mut lifecycle = self.lifecycle.write().await;
            if lifecycle.state != WorkerState::Installed {
                return Ok(None);
            }
            lifecycle.state = WorkerState::Activating;
        }

        match self.evict_stale().await {
            Ok(deleted) => {
                let mut lifecycle = self.lifecycle.write().await;
                lifecycle.state = WorkerState::Activated;
                tracing::info!(version = self.settings.names.version(), deleted = ?deleted, "activated");
                Ok(Some(ActivateReport { deleted }))
            }
            Err(e) => {
                self.lifecycle.write().await.state = WorkerState::Installed;
                tracing::error!(error = %e, "activation failed");
                Err(e)
            }
        }
    }

    async fn evict_stale(&self) -> Result<Vec<String>, Error> {
        let names = &self.settings.names;
        let mut deleted = Vec::new();

        for name in self.db.partition_names().await? {
            if names.is_stale(&name) && self.db.delete_partition(&name).await? {
                tracing::debug!(partition = %name, "deleted stale partition");
                deleted.push(name);
            }
        }

        for name in names.current() {
            self.db.open_partition(&name).await?;
        }

        Ok(deleted)
    }

    async fn precache_shell(&self) -> Result<(usize, usize), Error> {
        let (core, assets) =
            tokio::try_join!(self.precache(&self.settings.core_urls), self.precache(&self.settings.asset_urls))?;
        let counts = (core.len(), assets.len());

        let names = &self.settings.names;
        self.db
            .put_batches(vec![(names.name(Role::Core), core), (names.name(Role::Assets), assets)])
            .await?;

        Ok(counts)
    }

    /// Fetch every URL in parallel; fail on the first rejection or non-200.
    pub(crate) async fn precache(&self, urls: &[Url]) -> Result<Vec<CachedResponse>, Error> {
        let fetches = urls.iter().map(|url| async move {
            let request = Request::get(url.clone());
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| Error::PrecacheFailed { url: url.to_string(), reason: e.to_string() })?;

            if response.status != StatusCode::OK {
                return Err(Error::PrecacheFailed {
                    url: url.to_string(),
                    reason: format!("status {}", response.status.as_u16()),
                });
            }

            Ok::<_, Error>(response.to_cached(&request.method, request.cache_key()))
        });

        try_join_all(fetches).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::testing::{FakeFetcher, test_orchestrator};
    use hearth_core::CacheDb;

    #[tokio::test]
    async fn test_install_precaches_core_and_assets() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let net = FakeFetcher::shell();
        let orch = test_orchestrator(db.clone(), net.clone(), "v1");

        let report = orch.install().await.unwrap();
        assert_eq!(report, InstallReport { core: 2, assets: 1, skip_waiting: true });
        assert_eq!(orch.state().await, WorkerState::Installed);
        assert_eq!(db.entry_urls("hearth-core-v1").await.unwrap().len(), 2);
        assert_eq!(db.entry_urls("hearth-assets-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_install_failure_stores_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let net = FakeFetcher::shell().route("http://localhost:8080/icons/icon-192.png", 404, "missing");
        let orch = test_orchestrator(db.clone(), net, "v1");

        let result = orch.install().await;
        assert!(matches!(result, Err(Error::PrecacheFailed { .. })));
        assert_eq!(orch.state().await, WorkerState::Redundant);
        assert!(db.partition_names().await.unwrap().is_empty());
        assert!(orch.activate().await.is_err());
    }

    #[tokio::test]
    async fn test_reinstall_after_failure() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let net = FakeFetcher::shell();
        let orch = test_orchestrator(db, net.clone(), "v1");

        net.set_offline(true);
        assert!(orch.install().await.is_err());
        net.set_offline(false);
        assert!(orch.install().await.is_ok());
    }

    #[tokio::test]
    async fn test_install_twice_is_invalid() {
        let orch = test_orchestrator(CacheDb::open_in_memory().await.unwrap(), FakeFetcher::shell(), "v1");
        orch.install().await.unwrap();
        assert!(matches!(orch.install().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_evicts_old_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = test_orchestrator(db.clone(), FakeFetcher::shell(), "v1");
        v1.start().await.unwrap();
        db.open_partition("otherapp-core-v1").await.unwrap();

        let v2 = test_orchestrator(db.clone(), FakeFetcher::shell(), "v2");
        let report = v2.start().await.unwrap();

        let mut deleted = report.activation.unwrap().deleted;
        deleted.sort();
        assert_eq!(deleted, vec!["hearth-api-v1", "hearth-assets-v1", "hearth-core-v1", "hearth-pages-v1"]);

        let mut live = db.partition_names().await.unwrap();
        live.sort();
        assert_eq!(
            live,
            vec!["hearth-api-v2", "hearth-assets-v2", "hearth-core-v2", "hearth-pages-v2", "otherapp-core-v1"]
        );
        assert!(v2.is_controlling().await);
    }

    #[tokio::test]
    async fn test_waiting_worker_activates_on_skip_waiting() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut orch = test_orchestrator(db, FakeFetcher::shell(), "v1");
        orch.settings.skip_waiting_on_install = false;

        let report = orch.start().await.unwrap();
        assert!(report.activation.is_none());
        assert_eq!(orch.state().await, WorkerState::Installed);
        assert!(!orch.is_controlling().await);

        assert!(orch.skip_waiting().await.unwrap());
        assert_eq!(orch.state().await, WorkerState::Activated);
        assert!(!orch.skip_waiting().await.unwrap());
    }

    #[tokio::test]
    async fn test_skip_waiting_before_install_is_remembered() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut orch = test_orchestrator(db, FakeFetcher::shell(), "v1");
        orch.settings.skip_waiting_on_install = false;

        assert!(!orch.skip_waiting().await.unwrap());
        let report = orch.start().await.unwrap();
        assert!(report.install.skip_waiting);
        assert!(report.activation.is_some());
    }
}
