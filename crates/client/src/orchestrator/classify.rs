//! Request classification as an ordered rule table.
//!
//! Rules are evaluated top to bottom and the first match wins. The last rule
//! matches everything, so every request gets exactly one dispatch.

use hearth_core::{Error, Role};
use regex::Regex;
use reqwest::Method;

use crate::fetch::{Request, is_http};

/// The strategy chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Plain network fetch; no partition is read or written.
    Passthrough,
    NetworkFirst(Role),
    CacheFirst(Role),
    Navigation,
}

/// URL shapes that drive classification.
#[derive(Debug, Clone)]
pub struct Patterns {
    api_path_marker: String,
    api_hosts: Vec<String>,
    asset_path: Regex,
}

impl Patterns {
    /// Build patterns from an API path marker, API hosts and asset extensions.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if no asset extension is given.
    pub fn new(api_path_marker: &str, api_hosts: &[String], asset_extensions: &[String]) -> Result<Self, Error> {
        if asset_extensions.is_empty() {
            return Err(Error::InvalidInput("at least one asset extension is required".into()));
        }

        let alternatives = asset_extensions
            .iter()
            .map(|ext| regex::escape(ext.trim_start_matches('.')))
            .collect::<Vec<_>>()
            .join("|");
        let asset_path = Regex::new(&format!(r"(?i)\.(?:{alternatives})$"))
            .map_err(|e| Error::InvalidInput(format!("asset extension pattern: {e}")))?;

        Ok(Self {
            api_path_marker: api_path_marker.to_string(),
            api_hosts: api_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            asset_path,
        })
    }

    fn is_api(&self, request: &Request) -> bool {
        request.url.path().contains(&self.api_path_marker)
            || request
                .url
                .host_str()
                .is_some_and(|host| self.api_hosts.iter().any(|h| h == host))
    }

    fn is_asset(&self, request: &Request) -> bool {
        self.asset_path.is_match(request.url.path())
    }
}

/// One row of the dispatch table.
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&Request, &Patterns) -> bool,
    pub dispatch: Dispatch,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "ignored",
        matches: |req, _| req.method != Method::GET || !is_http(&req.url),
        dispatch: Dispatch::Passthrough,
    },
    Rule { name: "api", matches: |req, p| p.is_api(req), dispatch: Dispatch::NetworkFirst(Role::Api) },
    Rule { name: "navigation", matches: |req, _| req.is_navigation(), dispatch: Dispatch::Navigation },
    Rule { name: "asset", matches: |req, p| p.is_asset(req), dispatch: Dispatch::CacheFirst(Role::Assets) },
    Rule { name: "fallback", matches: |_, _| true, dispatch: Dispatch::NetworkFirst(Role::Pages) },
];

/// The first rule matching the request.
pub fn matching_rule<'r>(rules: &'r [Rule], request: &Request, patterns: &Patterns) -> Option<&'r Rule> {
    rules.iter().find(|rule| (rule.matches)(request, patterns))
}

/// Classify a request against the built-in rule table.
pub fn classify(request: &Request, patterns: &Patterns) -> Dispatch {
    matching_rule(RULES, request, patterns)
        .map(|rule| rule.dispatch)
        .unwrap_or(Dispatch::Passthrough)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    fn patterns() -> Patterns {
        let hosts = vec!["auth.hearth.local".to_string(), "App.Hearth.Local".to_string()];
        let exts: Vec<String> = ["png", "css", "js", "woff2"].into_iter().map(String::from).collect();
        Patterns::new("/api/", &hosts, &exts).unwrap()
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    fn nav(url: &str) -> Request {
        Request::navigate(Url::parse(url).unwrap())
    }

    #[test]
    fn test_non_get_is_passthrough() {
        let req = Request::new(Method::POST, Url::parse("http://localhost:8080/api/tasks").unwrap());
        assert_eq!(classify(&req, &patterns()), Dispatch::Passthrough);
    }

    #[test]
    fn test_non_http_is_passthrough() {
        assert_eq!(classify(&get("chrome-extension://abc/app.js"), &patterns()), Dispatch::Passthrough);
    }

    #[test]
    fn test_api_by_path_and_host() {
        let p = patterns();
        assert_eq!(classify(&get("http://localhost:8080/api/tasks"), &p), Dispatch::NetworkFirst(Role::Api));
        assert_eq!(classify(&get("https://auth.hearth.local/login"), &p), Dispatch::NetworkFirst(Role::Api));
        assert_eq!(classify(&get("https://app.hearth.local/me"), &p), Dispatch::NetworkFirst(Role::Api));
    }

    #[test]
    fn test_api_outranks_navigation_and_asset() {
        let p = patterns();
        assert_eq!(classify(&nav("http://localhost:8080/api/report"), &p), Dispatch::NetworkFirst(Role::Api));
        assert_eq!(classify(&get("https://auth.hearth.local/avatar.png"), &p), Dispatch::NetworkFirst(Role::Api));
    }

    #[test]
    fn test_navigation_outranks_asset() {
        assert_eq!(classify(&nav("http://localhost:8080/index.js"), &patterns()), Dispatch::Navigation);
        assert_eq!(classify(&nav("http://localhost:8080/app/tasks"), &patterns()), Dispatch::Navigation);
    }

    #[test]
    fn test_asset_extensions_case_insensitive() {
        let p = patterns();
        assert_eq!(classify(&get("http://localhost:8080/icons/icon-192.PNG"), &p), Dispatch::CacheFirst(Role::Assets));
        assert_eq!(classify(&get("https://cdn.example.com/all.min.css"), &p), Dispatch::CacheFirst(Role::Assets));
    }

    #[test]
    fn test_extension_must_end_path() {
        let p = patterns();
        assert_eq!(classify(&get("http://localhost:8080/js/app.js?v=3"), &p), Dispatch::CacheFirst(Role::Assets));
        assert_eq!(classify(&get("http://localhost:8080/pngs/list"), &p), Dispatch::NetworkFirst(Role::Pages));
        assert_eq!(classify(&get("http://localhost:8080/manifest.json"), &p), Dispatch::NetworkFirst(Role::Pages));
    }

    #[test]
    fn test_rule_names_in_precedence_order() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["ignored", "api", "navigation", "asset", "fallback"]);
    }

    #[test]
    fn test_matching_rule_over_custom_table() {
        let table = [
            Rule { name: "never", matches: |_, _| false, dispatch: Dispatch::Passthrough },
            Rule { name: "first", matches: |_, _| true, dispatch: Dispatch::CacheFirst(Role::Core) },
            Rule { name: "second", matches: |_, _| true, dispatch: Dispatch::Navigation },
        ];
        let rule = matching_rule(&table, &get("http://localhost:8080/"), &patterns()).unwrap();
        assert_eq!(rule.name, "first");
    }

    #[test]
    fn test_patterns_require_extensions() {
        assert!(Patterns::new("/api/", &[], &[]).is_err());
    }
}
