//! Central bank registry client.
//!
//! The registry maps a 3-character bank prefix to the bank's claim endpoint
//! and JWKS URL. We consume it; its internals are not ours.

use async_trait::async_trait;
use cached::proc_macro::cached;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::keys::Jwks;

/// Partner key sets are static in practice; refetch at most every 5 minutes.
pub const KEY_SET_TTL_SECONDS: u64 = 300;

/// Upper bound on an uncached key-set fetch in test mode
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDirectoryEntry {
    #[serde(rename = "bankPrefix")]
    pub bank_prefix: String,
    pub name: String,
    #[serde(rename = "transactionUrl")]
    pub transfer_endpoint: String,
    #[serde(rename = "jwksUrl")]
    pub key_set_endpoint: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Bank not registered: {0}")]
    NotFound(String),

    #[error("Central bank unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CentralBankDirectory: Send + Sync {
    async fn lookup(&self, bank_prefix: &str) -> Result<BankDirectoryEntry, DirectoryError>;

    async fn fetch_key_set(&self, key_set_endpoint: &str) -> Result<Jwks, DirectoryError>;
}

/// Registry over HTTP: `GET {url}/banks/{prefix}` with `X-API-KEY`.
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDirectory {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DirectoryError::Unavailable(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl CentralBankDirectory for HttpDirectory {
    async fn lookup(&self, bank_prefix: &str) -> Result<BankDirectoryEntry, DirectoryError> {
        let url = format!("{}/banks/{}", self.base_url, bank_prefix);
        let mut request = self.client.get(&url);
        if let Some(ref key) = self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request.send().await.map_err(|e| {
            warn!(bank_prefix, error = %e, "Central bank lookup failed");
            DirectoryError::Unavailable(e.to_string())
        })?;

        match response.status() {
            s if s.is_success() => {}
            reqwest::StatusCode::NOT_FOUND => {
                return Err(DirectoryError::NotFound(bank_prefix.to_string()));
            }
            s => {
                return Err(DirectoryError::Unavailable(format!(
                    "Central Bank responded with status: {}",
                    s
                )));
            }
        }

        // Some registries answer unknown prefixes with 200 and a `null` body
        let body: Option<BankDirectoryEntry> = response
            .json()
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("Invalid registry response: {}", e)))?;
        body.ok_or_else(|| DirectoryError::NotFound(bank_prefix.to_string()))
    }

    async fn fetch_key_set(&self, key_set_endpoint: &str) -> Result<Jwks, DirectoryError> {
        fetch_key_set_cached(self.client.clone(), key_set_endpoint.to_string()).await
    }
}

/// Fetch a partner JWKS, caching successes per URL for [`KEY_SET_TTL_SECONDS`].
#[cached(
    time = 300,
    key = "String",
    convert = r#"{ url.clone() }"#,
    result = true
)]
pub async fn fetch_key_set_cached(
    client: reqwest::Client,
    url: String,
) -> Result<Jwks, DirectoryError> {
    debug!(url = %url, "Fetching partner key set");
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| DirectoryError::Unavailable(format!("Failed to fetch JWKS: {}", e)))?;

    if !response.status().is_success() {
        return Err(DirectoryError::Unavailable(format!(
            "Failed to fetch JWKS: {}",
            response.status()
        )));
    }

    let jwks: Jwks = response
        .json()
        .await
        .map_err(|e| DirectoryError::Unavailable(format!("Invalid JWKS: {}", e)))?;
    if jwks.keys.is_empty() {
        return Err(DirectoryError::Unavailable("No keys found in JWKS".to_string()));
    }
    Ok(jwks)
}

/// In-process registry for test mode and tests.
///
/// Key sets registered with [`StaticDirectory::with_key_set`] are served from
/// memory; any other key-set URL is fetched over HTTP.
pub struct StaticDirectory {
    banks: DashMap<String, BankDirectoryEntry>,
    key_sets: DashMap<String, Jwks>,
    client: reqwest::Client,
    fetch_timeout: Duration,
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self {
            banks: DashMap::new(),
            key_sets: DashMap::new(),
            client: reqwest::Client::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn from_entries(
        entries: impl IntoIterator<Item = BankDirectoryEntry>,
        fetch_timeout: Duration,
    ) -> Self {
        let directory = Self::new().with_fetch_timeout(fetch_timeout);
        for entry in entries {
            directory.register(entry);
        }
        directory
    }

    /// Bound remote key-set fetches; a partner that accepts the connection
    /// and never answers fails with `Unavailable` after `timeout`.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn register(&self, entry: BankDirectoryEntry) {
        self.banks.insert(entry.bank_prefix.clone(), entry);
    }

    pub fn with_bank(self, entry: BankDirectoryEntry) -> Self {
        self.register(entry);
        self
    }

    pub fn with_key_set(self, url: impl Into<String>, jwks: Jwks) -> Self {
        self.key_sets.insert(url.into(), jwks);
        self
    }
}

#[async_trait]
impl CentralBankDirectory for StaticDirectory {
    async fn lookup(&self, bank_prefix: &str) -> Result<BankDirectoryEntry, DirectoryError> {
        self.banks
            .get(bank_prefix)
            .map(|e| e.value().clone())
            .ok_or_else(|| DirectoryError::NotFound(bank_prefix.to_string()))
    }

    async fn fetch_key_set(&self, key_set_endpoint: &str) -> Result<Jwks, DirectoryError> {
        if let Some(jwks) = self.key_sets.get(key_set_endpoint) {
            return Ok(jwks.value().clone());
        }
        let fetch = fetch_key_set_cached(self.client.clone(), key_set_endpoint.to_string());
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    url = %key_set_endpoint,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "Key set fetch timed out"
                );
                Err(DirectoryError::Unavailable(format!(
                    "Failed to fetch JWKS: no response within {} ms",
                    self.fetch_timeout.as_millis()
                )))
            }
        }
    }
}
