use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, ResponseCache};
use crate::config::FetcherConfig;
use crate::error::Result;
use crate::pacer::Pacer;
use crate::proxy::{ProxyConfig, ProxySelector};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/138.0.0.0 Safari/537.36 Edg/138.0.0.0";

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Something that can turn a URL plus query parameters into a page body.
#[async_trait]
pub trait PageFetcher: Send {
    async fn fetch(&mut self, url: &str, params: &[(String, String)]) -> Result<String>;
}

/// Headers of a Chromium browser navigating from github.com.
///
/// Accept-Encoding is left to reqwest, which advertises the codecs it can decode.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,\
             */*;q=0.8,application/signed-exchange;v=b3;q=0.7",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9,uk;q=0.8,ru;q=0.7"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(HeaderName::from_static("priority"), HeaderValue::from_static("u=0, i"));
    headers.insert(header::REFERER, HeaderValue::from_static("https://github.com/"));
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        HeaderValue::from_static(
            r#""Not)A;Brand";v="8", "Chromium";v="138", "Microsoft Edge";v="138""#,
        ),
    );
    headers.insert(HeaderName::from_static("sec-ch-ua-mobile"), HeaderValue::from_static("?0"));
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        HeaderValue::from_static(r#""Linux""#),
    );
    headers.insert(HeaderName::from_static("sec-fetch-dest"), HeaderValue::from_static("document"));
    headers.insert(HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static("navigate"));
    headers.insert(HeaderName::from_static("sec-fetch-site"), HeaderValue::from_static("same-origin"));
    headers.insert(HeaderName::from_static("sec-fetch-user"), HeaderValue::from_static("?1"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers
}

/// Exponential backoff before retry number `attempt` (1-based), capped.
fn retry_backoff(attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    RETRY_BASE_DELAY.saturating_mul(factor).min(RETRY_MAX_DELAY)
}

/// Connectivity failures worth another attempt. HTTP statuses never are.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

/// A scrape session: one HTTP client, one proxy choice, one pacer, one cache.
///
/// The session is mutated in place on every fetch and must not be shared
/// between concurrent runs.
pub struct CachedFetcher {
    client: Client,
    proxies: Vec<String>,
    proxy: ProxyConfig,
    selector: ProxySelector,
    cache: ResponseCache,
    pacer: Pacer,
    retries: u32,
    network_calls: u64,
    cache_hits: u64,
}

impl CachedFetcher {
    pub async fn open(config: &FetcherConfig, proxies: Vec<String>) -> Result<Self> {
        Self::open_with(
            config,
            proxies,
            ProxySelector::new(),
            Pacer::new(config.pacer_delays.clone()),
        )
        .await
    }

    /// Open a session with explicit randomness sources.
    pub async fn open_with(
        config: &FetcherConfig,
        proxies: Vec<String>,
        mut selector: ProxySelector,
        pacer: Pacer,
    ) -> Result<Self> {
        let cache = ResponseCache::open(&config.cache_dir, config.cache_ttl).await?;
        let proxy = selector.select(&proxies);
        let client = build_client(&proxy)?;
        Ok(CachedFetcher {
            client,
            proxies,
            proxy,
            selector,
            cache,
            pacer,
            retries: config.retries,
            network_calls: 0,
            cache_hits: 0,
        })
    }

    /// The proxy slots installed in the current client.
    pub fn proxy(&self) -> &ProxyConfig {
        &self.proxy
    }

    /// Pick a new session proxy from `proxies` and rebuild the client around it.
    pub fn update_session_proxy(&mut self, proxies: &[String]) -> Result<()> {
        let proxy = self.selector.select(proxies);
        self.client = build_client(&proxy)?;
        self.proxy = proxy;
        Ok(())
    }

    pub fn network_calls(&self) -> u64 {
        self.network_calls
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// End the session.
    pub fn close(self) {
        info!(
            "Fetcher closed: {} network calls, {} cache hits",
            self.network_calls, self.cache_hits
        );
    }

    async fn fetch_through_cache(
        &mut self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<CacheEntry> {
        if let Some(entry) = self.cache.get(url, params).await? {
            debug!("Cache hit for {} {:?}", url, params);
            self.cache_hits += 1;
            return Ok(entry);
        }

        let entry = self.send_with_retries(url, params).await?;
        if (200..300).contains(&entry.status) {
            if let Err(e) = self.cache.insert(&entry).await {
                warn!("Could not store response for {} in the cache: {}", url, e);
            }
        }
        Ok(entry)
    }

    async fn send_with_retries(
        &mut self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<CacheEntry> {
        let mut attempt = 0;
        loop {
            match self.send(url, params).await {
                Ok(entry) => return Ok(entry),
                Err(e) if attempt < self.retries && is_transient(&e) => {
                    attempt += 1;
                    let jitter = {
                        let mut rng = rand::thread_rng();
                        Duration::from_millis(rng.gen_range(0..250))
                    };
                    let backoff = retry_backoff(attempt) + jitter;
                    warn!(
                        "Request to {} failed ({}), retry {}/{} in {:?}",
                        url, e, attempt, self.retries, backoff
                    );
                    if !self.proxies.is_empty() {
                        let proxies = self.proxies.clone();
                        self.update_session_proxy(&proxies)?;
                    }
                    sleep(backoff).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn send(
        &mut self,
        url: &str,
        params: &[(String, String)],
    ) -> std::result::Result<CacheEntry, reqwest::Error> {
        self.network_calls += 1;
        let mut request = self.client.get(url).headers(browser_headers());
        if !params.is_empty() {
            request = request.query(params);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let response_url = response.url().to_string();
        let body = response.text().await?;

        Ok(CacheEntry {
            url: url.to_string(),
            params: params.to_vec(),
            response_url,
            status,
            body,
            stored_at: Utc::now(),
        })
    }
}

#[async_trait]
impl PageFetcher for CachedFetcher {
    /// Fetch a page body, never failing on HTTP error statuses.
    ///
    /// The pacer is consulted before and advanced after every fetch, cache
    /// hits and failures included.
    async fn fetch(&mut self, url: &str, params: &[(String, String)]) -> Result<String> {
        self.pacer.wait_if_needed().await;
        let result = self.fetch_through_cache(url, params).await;
        self.pacer.record_request(Instant::now());

        let entry = result?;
        if entry.status >= 400 {
            warn!(
                url = %entry.response_url,
                status = entry.status,
                params = ?params,
                "Upstream returned an error status"
            );
        }
        Ok(entry.body)
    }
}

fn build_client(proxy: &ProxyConfig) -> Result<Client> {
    // System proxy settings are ignored; only the session proxy applies.
    let builder = proxy.apply(Client::builder().no_proxy())?;
    Ok(builder.build()?)
}
