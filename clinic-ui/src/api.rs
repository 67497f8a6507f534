//! HTTP API Client
//!
//! Timeline fetch from the clinic server.

use gloo_net::http::Request;

use clinic_dashboard::{parse_timeline_response, FetchError, TimelineEntry};

/// Fetch the dashboard data and pick out its timeline
pub async fn fetch_timeline(endpoint: &str) -> Result<Option<Vec<TimelineEntry>>, FetchError> {
    let response = Request::get(endpoint)
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    if !response.ok() {
        return Err(FetchError::Status(response.status()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    parse_timeline_response(&body)
}
