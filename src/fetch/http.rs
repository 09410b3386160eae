// src/fetch/http.rs

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("dwarfscraper/", env!("CARGO_PKG_VERSION"));

/// GET `url` and return the body text. Non-success statuses are errors, and
/// the whole request, body included, must finish within `timeout`.
pub async fn get_page(url: &str, timeout: Duration) -> Result<String, FetchError> {
    let http_err = |source| FetchError::Http {
        url: url.to_string(),
        source,
    };

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(http_err)?;

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(http_err)?
        .error_for_status()
        .map_err(http_err)?;
    debug!(status = %resp.status(), url, "page response");

    resp.text().await.map_err(http_err)
}
