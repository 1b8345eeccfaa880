use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::error;

/// The only verbs the providers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Fetch a URL with an `Authorization` header and decode the JSON body.
/// No retry, no timeout handling; any failure propagates to the caller.
pub async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    auth_header: &str,
    method: Method,
) -> Result<T> {
    let request = match method {
        Method::Get => client.get(url),
        Method::Post => client.post(url),
    };

    let response = request
        .header(reqwest::header::AUTHORIZATION, auth_header)
        .send()
        .await
        .with_context(|| format!("Request to {url} failed"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("{} returned {}: {}", url, status, body);
        return Err(anyhow!("Request to {url} returned {status}"));
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to decode response from {url}"))
}
