//! The intercepted request as the orchestrator sees it.

use hearth_core::cache::hash::compute_cache_key;
use reqwest::{Method, header::HeaderMap};
use reqwest::Url;

/// How the request was issued by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Full-page load.
    Navigate,
    #[default]
    SameOrigin,
    Cors,
    NoCors,
}

/// An outgoing request intercepted from the page.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, mode: RequestMode::default(), headers: HeaderMap::new() }
    }

    /// A plain subresource GET.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A full-page navigation.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Identity of this request in every partition.
    pub fn cache_key(&self) -> String {
        compute_cache_key(self.method.as_str(), self.url.as_str())
    }
}
