use std::time::Duration;

use log::debug;
use reqwest::{Client, Proxy, StatusCode};
use thiserror::Error;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 15;

pub const DEFAULT_USER_AGENT: &str = "nodeforge";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(StatusCode),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// Upstream proxy used for outgoing requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyConfig {
    /// Honor `HTTP_PROXY` / `HTTPS_PROXY` from the environment.
    #[default]
    System,
    /// Connect directly, ignoring the environment.
    Direct,
    Url(String),
}

/// `SYSTEM` and empty mean the environment, `NONE` means direct, anything
/// else is a proxy URL.
pub fn parse_proxy(proxy_str: &str) -> ProxyConfig {
    match proxy_str.trim() {
        "" | "SYSTEM" => ProxyConfig::System,
        "NONE" => ProxyConfig::Direct,
        url => ProxyConfig::Url(url.to_string()),
    }
}

/// Builds a reusable client with timeout, user agent and proxy applied.
pub fn build_client(
    timeout: Duration,
    user_agent: &str,
    proxy_config: &ProxyConfig,
) -> Result<Client, FetchError> {
    let mut client_builder = Client::builder().timeout(timeout).user_agent(user_agent);

    match proxy_config {
        ProxyConfig::System => {}
        ProxyConfig::Direct => client_builder = client_builder.no_proxy(),
        ProxyConfig::Url(proxy) => {
            let proxy = Proxy::all(proxy)
                .map_err(|e| FetchError::Client(format!("failed to set proxy: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
        }
    }

    client_builder
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}

/// Fetches `url` and returns the body as text.
///
/// Anything other than `200 OK` is an error.
pub async fn web_get_async(client: &Client, url: &str) -> Result<String, FetchError> {
    debug!("GET {}", url);
    let response = client.get(url).send().await?;

    if response.status() != StatusCode::OK {
        return Err(FetchError::Status(response.status()));
    }

    Ok(response.text().await?)
}
