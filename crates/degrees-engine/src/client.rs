//! Cached, rate-limit aware access to the match-history API.
//!
//! [`OracleClient::fetch`] is the only place a network failure is observed.
//! Rate limits are retried after a fixed cooldown, an invalid key is fatal,
//! and every other failure degrades into an explicit [`Reply::Degraded`].

use crate::error::{OracleError, SearchError};
use crate::persistence::{Operation, ResponseCache};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const API_KEY_HEADER: &str = "X-Riot-Token";
pub const DEFAULT_BASE_URL: &str = "https://na1.api.riotgames.com";
const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(3);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host of the regional platform, without a trailing slash.
    pub base_url: String,
    pub api_key: Option<String>,
    /// Pause before every live call, even without a 429.
    pub request_delay: Duration,
    /// Pause after a 429 before retrying the same key.
    pub rate_limit_cooldown: Duration,
    /// `None` retries rate-limited lookups forever.
    pub max_retries: Option<u32>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            request_delay: DEFAULT_REQUEST_DELAY,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            max_retries: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The live network step behind the cache.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, op: Operation, key: &str) -> Result<Value, OracleError>;
}

/// Riot match-v4 / summoner-v4 over HTTPS.
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn url_for(&self, op: Operation, key: &str) -> Result<Url, OracleError> {
        let prefix: &[&str] = match op {
            Operation::Summoner => &["lol", "summoner", "v4", "summoners", "by-name"],
            Operation::Account => &["lol", "summoner", "v4", "summoners", "by-account"],
            Operation::MatchList => &["lol", "match", "v4", "matchlists", "by-account"],
            Operation::Match => &["lol", "match", "v4", "matches"],
        };

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                OracleError::Malformed(format!("base URL {} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(prefix)
            .push(key);
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, op: Operation, key: &str) -> Result<Value, OracleError> {
        let url = self.url_for(op, key)?;
        let mut request = self.http.get(url);
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }
        // Error text ends up in logs; keep request URLs out of it.
        let response = request
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.without_url().to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<Value>()
                .await
                .map_err(|e| OracleError::Malformed(e.without_url().to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(OracleError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(OracleError::Unauthorized),
            status => Err(OracleError::Unavailable(status.to_string())),
        }
    }
}

/// Result of a lookup that did not fail fatally.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Data(Value),
    /// The lookup failed in a way the search tolerates; callers treat this
    /// as "no data".
    Degraded(OracleError),
}

impl Reply {
    pub fn data(&self) -> Option<&Value> {
        match self {
            Reply::Data(value) => Some(value),
            Reply::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Reply::Degraded(_))
    }
}

#[derive(Debug, Default)]
pub struct ClientStats {
    live_calls: AtomicU64,
    cache_hits: AtomicU64,
    rate_limited: AtomicU64,
    degraded: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub live_calls: u64,
    pub cache_hits: u64,
    pub rate_limited: u64,
    pub degraded: u64,
}

impl ClientStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            live_calls: self.live_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

pub struct OracleClient {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
    config: ClientConfig,
    stats: ClientStats,
}

impl OracleClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn ResponseCache>,
        config: ClientConfig,
    ) -> Self {
        Self {
            transport,
            cache,
            config,
            stats: ClientStats::default(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    /// Look up `key`, consulting the cache first.
    ///
    /// Only successful results are cached. Errors returned here are fatal to
    /// the whole query.
    pub async fn fetch(&self, op: Operation, key: &str) -> Result<Reply, SearchError> {
        if let Some(value) = self.cache.get(op, key) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(%op, key, "cache hit");
            return Ok(Reply::Data(value));
        }

        let mut attempts = 0u32;
        loop {
            if !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }

            self.stats.live_calls.fetch_add(1, Ordering::Relaxed);
            debug!(%op, key, attempt = attempts + 1, "live lookup");

            match self.transport.get(op, key).await {
                Ok(value) => {
                    self.cache.put(op, key, value.clone())?;
                    return Ok(Reply::Data(value));
                }
                Err(OracleError::RateLimited) => {
                    attempts += 1;
                    self.stats.rate_limited.fetch_add(1, Ordering::Relaxed);
                    if let Some(max) = self.config.max_retries {
                        if attempts > max {
                            error!(%op, key, attempts, "rate limit retries exhausted");
                            return Err(SearchError::RetriesExhausted {
                                key: format!("{op}/{key}"),
                                attempts,
                            });
                        }
                    }
                    warn!(
                        %op,
                        key,
                        cooldown_ms = self.config.rate_limit_cooldown.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(self.config.rate_limit_cooldown).await;
                }
                Err(OracleError::Unauthorized) => {
                    error!(%op, key, "API key rejected");
                    return Err(SearchError::Unauthorized);
                }
                Err(err) => {
                    self.stats.degraded.fetch_add(1, Ordering::Relaxed);
                    warn!(%op, key, error = %err, "degraded lookup, continuing without data");
                    return Ok(Reply::Degraded(err));
                }
            }
        }
    }
}
