use super::types::HttpResponse;
use crate::error::ProbeError;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("netcheck/", env!("CARGO_PKG_VERSION"));

/// Plain GET client. Environment proxies are ignored so probes see the
/// direct network path.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let inner = reqwest::Client::builder()
            .no_proxy()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self { inner })
    }

    pub async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ProbeError> {
        debug!("GET {} timeout={:?}", url, timeout);
        let resp = self
            .inner
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_reqwest)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(map_reqwest)?;
        Ok(HttpResponse { status, body })
    }
}

fn map_reqwest(err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::transport(format!("request timed out: {err}"))
    } else if err.is_connect() || err.is_request() {
        ProbeError::transport(err.to_string())
    } else if err.is_builder() {
        ProbeError::unavailable(err.to_string())
    } else {
        ProbeError::protocol(err.to_string())
    }
}
