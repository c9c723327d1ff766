use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::RngCore;
use reqwest::{ClientBuilder, Proxy};
use tracing::debug;

use crate::error::{Error, Result};

/// Prefix `http://` to an address that carries no scheme.
pub fn normalize(address: &str) -> String {
    let address = address.trim();
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// Which transport slot a proxy is installed in.
///
/// At most one slot is set: an `https://` proxy carries only HTTPS traffic,
/// anything else carries only plain HTTP traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    pub http: Option<String>,
    pub https: Option<String>,
}

impl ProxyConfig {
    pub fn from_address(address: &str) -> Self {
        let proxy = normalize(address);
        if proxy.starts_with("https://") {
            ProxyConfig {
                http: None,
                https: Some(proxy),
            }
        } else {
            ProxyConfig {
                http: Some(proxy),
                https: None,
            }
        }
    }

    pub fn is_direct(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }

    /// Install the configured slot into a client builder.
    pub fn apply(&self, mut builder: ClientBuilder) -> Result<ClientBuilder> {
        if let Some(address) = &self.http {
            builder = builder.proxy(Proxy::http(address).map_err(|source| Error::InvalidProxy {
                address: address.clone(),
                source,
            })?);
        }
        if let Some(address) = &self.https {
            builder = builder.proxy(Proxy::https(address).map_err(|source| Error::InvalidProxy {
                address: address.clone(),
                source,
            })?);
        }
        Ok(builder)
    }
}

/// Picks one proxy per session from the candidates.
pub struct ProxySelector {
    rng: Box<dyn RngCore + Send>,
}

impl Default for ProxySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxySelector {
    /// A selector backed by the operating system's secure random source.
    pub fn new() -> Self {
        Self::with_rng(OsRng)
    }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        ProxySelector { rng: Box::new(rng) }
    }

    /// Choose a proxy uniformly at random; no candidates means a direct connection.
    pub fn select(&mut self, proxies: &[String]) -> ProxyConfig {
        match proxies.choose(&mut *self.rng) {
            Some(address) => {
                let config = ProxyConfig::from_address(address);
                debug!("Proxy applied: {:?}", config);
                config
            }
            None => ProxyConfig::default(),
        }
    }
}
