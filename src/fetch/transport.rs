//! HTTP transport behind the retrying fetcher.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Proxy};
use tracing::debug;

use super::AttemptError;

/// Everything needed to issue one GET attempt.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub verify_tls: bool,
    /// Scheme (`http`, `https` or `all`) to proxy URL.
    pub proxies: BTreeMap<String, String>,
}

/// A response with the body fully read.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Bytes,
}

impl FetchResponse {
    /// 2xx and 3xx count as success for the retry loop.
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Issues a single GET attempt. Implemented by [`ReqwestTransport`] in
/// production and by scripted fakes in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, spec: &RequestSpec) -> Result<FetchResponse, AttemptError>;
}

/// reqwest-backed transport.
///
/// A client is built per request: TLS verification and proxies are per-call
/// knobs of the fetcher, and reqwest fixes both at client construction time.
#[derive(Debug, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    fn build_client(spec: &RequestSpec) -> Result<Client, AttemptError> {
        let mut builder = Client::builder();
        if !spec.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        for (scheme, url) in &spec.proxies {
            let proxy = match scheme.as_str() {
                "http" => Proxy::http(url),
                "https" => Proxy::https(url),
                _ => Proxy::all(url),
            }
            .map_err(|e| AttemptError::Config(format!("invalid proxy '{url}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| AttemptError::Config(e.to_string()))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, spec: &RequestSpec) -> Result<FetchResponse, AttemptError> {
        let client = Self::build_client(spec)?;

        let mut request = client.get(&spec.url);
        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AttemptError::Timeout
            } else {
                AttemptError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Transport(format!("failed to read body: {e}")))?;
        debug!(url = %spec.url, status, size = body.len(), "GET attempt finished");

        Ok(FetchResponse { status, body })
    }
}
