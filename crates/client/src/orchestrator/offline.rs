//! Last-resort response for navigations that cannot be served at all.

use bytes::Bytes;
use reqwest::{StatusCode, Url, header};

use crate::fetch::FetchResponse;

const OFFLINE_HTML: &str = "<!DOCTYPE html>\
<html lang=\"en\"><head><meta charset=\"utf-8\"><title>Offline</title></head>\
<body><h1>You are offline</h1><p>This page is not available without a network connection.</p></body></html>";

/// A minimal HTML page with status 503, answering `url`.
pub fn synthesized_offline(url: &Url) -> FetchResponse {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html; charset=utf-8"));
    headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-store"));

    FetchResponse {
        url: url.clone(),
        status: StatusCode::SERVICE_UNAVAILABLE,
        headers,
        bytes: Bytes::from_static(OFFLINE_HTML.as_bytes()),
        fetch_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_offline_page() {
        let url = Url::parse("http://localhost:8080/app/tasks").unwrap();
        let response = synthesized_offline(&url);
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
        assert!(String::from_utf8_lossy(&response.bytes).contains("offline"));
        assert_eq!(response.url, url);
    }
}
