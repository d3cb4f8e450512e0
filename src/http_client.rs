use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};

const REQUEST_TIMEOUT_SECS: u64 = 15;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client. The stats provider rejects requests without a
/// browser-like User-Agent and an nba.com Referer/Origin.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
            ),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
        headers.insert("Origin", HeaderValue::from_static("https://www.nba.com"));

        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .context("failed to build http client")
    })
}
