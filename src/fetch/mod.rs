//! Retrying GET helper
//!
//! A [`Fetcher`] re-attempts a GET request up to a configured limit and
//! reports exhaustion either as the most recent failure or as the ordered
//! list of every failure, per `return_all_error`. Instance defaults come
//! from [`FetchConfig`]; every knob can be overridden per call through
//! [`GetOptions`].
//!
//! Attempts are issued back to back with no delay in between. Backoff is a
//! deliberate omission, not an oversight; callers that need pacing should
//! wrap `get` themselves.

pub mod transport;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use transport::{FetchResponse, ReqwestTransport, RequestSpec, Transport};

/// One failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("connection timeout")]
    Timeout,

    #[error("client configuration rejected: {0}")]
    Config(String),

    #[error("unexpected status {status}")]
    Status { status: u16 },
}

/// Final failure after all attempts are exhausted.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Only the most recent failure was retained.
    #[error("request failed: {0}")]
    LastError(AttemptError),

    /// Every failure was retained, oldest first.
    #[error("request failed after {} attempts", .0.len())]
    AllErrors(Vec<AttemptError>),
}

impl FetchError {
    /// The most recent attempt's failure, in either reporting mode.
    pub fn last(&self) -> Option<&AttemptError> {
        match self {
            FetchError::LastError(err) => Some(err),
            FetchError::AllErrors(errs) => errs.last(),
        }
    }
}

/// Instance defaults for [`Fetcher::get`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Maximum number of attempts per `get`, at least 1.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    /// Scheme (`http`, `https` or `all`) to proxy URL.
    #[serde(default)]
    pub proxies: BTreeMap<String, String>,
    /// On exhaustion, report every failure instead of only the last one.
    #[serde(default)]
    pub return_all_error: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            retry_limit: default_retry_limit(),
            verify_tls: default_verify_tls(),
            proxies: BTreeMap::new(),
            return_all_error: false,
        }
    }
}

fn default_retry_limit() -> u32 {
    1
}

fn default_verify_tls() -> bool {
    true
}

/// Per-call overrides. Unset fields fall back to the instance defaults;
/// `additional_headers` are merged over them, per-call entries winning.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub additional_headers: Option<BTreeMap<String, String>>,
    pub retry_limit: Option<u32>,
    pub verify_tls: Option<bool>,
    pub proxies: Option<BTreeMap<String, String>>,
    pub return_all_error: Option<bool>,
}

/// Retrying GET client.
pub struct Fetcher {
    defaults: FetchConfig,
    transport: Arc<dyn Transport>,
}

impl Fetcher {
    pub fn new(defaults: FetchConfig) -> Self {
        Self::with_transport(defaults, Arc::new(ReqwestTransport))
    }

    pub fn with_transport(defaults: FetchConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            defaults,
            transport,
        }
    }

    /// GET `url`, retrying up to the effective retry limit.
    ///
    /// A non-2xx/3xx status or a transport-level failure counts as a failed
    /// attempt. The first success returns immediately. On exhaustion the
    /// error carries either the last failure or all of them in attempt
    /// order, per the effective `return_all_error`.
    pub async fn get(&self, url: &str, opts: GetOptions) -> Result<FetchResponse, FetchError> {
        // A limit of zero would mean "never try"; clamp to one attempt.
        let retry_limit = opts.retry_limit.unwrap_or(self.defaults.retry_limit).max(1);
        let verify_tls = opts.verify_tls.unwrap_or(self.defaults.verify_tls);
        let proxies = opts
            .proxies
            .unwrap_or_else(|| self.defaults.proxies.clone());
        let return_all = opts
            .return_all_error
            .unwrap_or(self.defaults.return_all_error);

        let mut headers = self.defaults.headers.clone();
        if let Some(additional) = opts.additional_headers {
            headers.extend(additional);
        }

        let spec = RequestSpec {
            url: url.to_string(),
            headers,
            verify_tls,
            proxies,
        };

        let mut failures: Vec<AttemptError> = Vec::new();
        for attempt in 1..=retry_limit {
            let failure = match self.transport.get(&spec).await {
                Ok(response) if response.is_success() => {
                    if attempt > 1 {
                        debug!(url, attempt, "GET succeeded after retry");
                    }
                    return Ok(response);
                }
                Ok(response) => AttemptError::Status {
                    status: response.status,
                },
                Err(err) => err,
            };
            warn!(url, attempt, retry_limit, error = %failure, "GET attempt failed");

            if !return_all {
                failures.clear();
            }
            failures.push(failure);
        }

        if return_all {
            Err(FetchError::AllErrors(failures))
        } else {
            let last = failures
                .pop()
                .unwrap_or(AttemptError::Transport("no attempt was made".to_string()));
            Err(FetchError::LastError(last))
        }
    }
}
