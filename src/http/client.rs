use chrono::{DateTime, Utc};
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::RemoteConfig;
use crate::observability::board_metrics;
use crate::remote::RemoteError;

/// Rate-limited HTTP client for the data service, with a read cache that
/// writes and reconciliation can invalidate.
#[derive(Debug)]
pub struct RateLimitedHttpClient {
    http: reqwest::Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    cache: Cache<String, CacheEntry>,
    base_url: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: serde_json::Value,
    fetched_at: DateTime<Utc>,
}

impl RateLimitedHttpClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RemoteError::Config("remote.api_key is not set".to_string()))?;
        if config.base_url.is_empty() {
            return Err(RemoteError::Config("remote.base_url is not set".to_string()));
        }

        let mut headers = HeaderMap::new();
        let key_header = HeaderValue::from_str(api_key)
            .map_err(|e| RemoteError::Config(format!("invalid api key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| RemoteError::Config(format!("invalid api key: {e}")))?;
        headers.insert("apikey", key_header);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| RemoteError::Config(e.to_string()))?;

        let per_second = NonZeroU32::new(config.rate_limit.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.rate_limit.burst_capacity).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst)));

        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds.max(1)))
            .build();

        Ok(Self {
            http,
            rate_limiter,
            cache,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn wait_for_permit(&self) {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;
    }

    /// GET `path` and decode it, serving from cache when `use_cache` is set
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, use_cache: bool) -> Result<T, RemoteError> {
        let metrics = board_metrics();
        if use_cache {
            if let Some(cached) = self.cache.get(path).await {
                debug!(
                    path,
                    age_ms = (Utc::now() - cached.fetched_at).num_milliseconds(),
                    "Cache hit"
                );
                metrics.record_cache_hit();
                return Ok(serde_json::from_value(cached.data)?);
            }
            metrics.record_cache_miss();
        }

        self.wait_for_permit().await;
        metrics.record_request();
        debug!(path, "GET data service");

        let response = self.http.get(self.url(path)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            metrics.record_error();
            return Err(RemoteError::from_status(status.as_u16(), &body));
        }

        let data: serde_json::Value = serde_json::from_str(&body)?;
        if use_cache {
            self.cache
                .insert(
                    path.to_string(),
                    CacheEntry {
                        data: data.clone(),
                        fetched_at: Utc::now(),
                    },
                )
                .await;
        }
        Ok(serde_json::from_value(data)?)
    }

    /// PATCH `path` with a JSON body, asking for the affected rows back
    pub async fn patch_json(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value, RemoteError> {
        let metrics = board_metrics();
        self.wait_for_permit().await;
        metrics.record_request();
        debug!(path, "PATCH data service");

        let response = self
            .http
            .patch(self.url(path))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            metrics.record_error();
            return Err(RemoteError::from_status(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Drop every cached read
    pub async fn clear_cache(&self) {
        self.cache.invalidate_all();
        info!("HTTP client cache cleared");
    }

    /// Invalidate cached reads whose key contains `pattern`
    pub async fn invalidate_cache_pattern(&self, pattern: &str) {
        let keys_to_remove: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| key.contains(pattern))
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        for key in keys_to_remove {
            self.cache.invalidate(&key).await;
        }

        debug!("Invalidated cache entries matching pattern: {}", pattern);
    }
}
