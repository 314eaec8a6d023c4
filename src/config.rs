use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use crate::money::Currency;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    pub bank: BankConfig,
    #[serde(default)]
    pub central_bank: CentralBankConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Exchange rates relative to EUR
    #[serde(default = "default_rates")]
    pub rates: BTreeMap<Currency, Decimal>,
    /// PostgreSQL connection URL; in-memory storage when absent
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// HS256 secret for end-user bearer tokens
    pub jwt_secret: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BankConfig {
    /// 3-character code leading every account number we issue
    pub prefix: String,
    pub name: String,
    /// Where the RSA signing keypair is persisted
    pub key_dir: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CentralBankConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Answer lookups from `test_banks` instead of the registry
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default)]
    pub test_banks: Vec<crate::central_bank::BankDirectoryEntry>,
    pub request_timeout_ms: u64,
}

impl Default for CentralBankConfig {
    fn default() -> Self {
        Self {
            url: "https://henno.cfd/central-bank".to_string(),
            api_key: None,
            test_mode: false,
            test_banks: Vec::new(),
            request_timeout_ms: 5_000,
        }
    }
}

/// Outbound claim delivery budget
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeliveryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub attempt_timeout_ms: u64,
    pub total_timeout_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            attempt_timeout_ms: 5_000,
            total_timeout_ms: 20_000,
        }
    }
}

impl DeliveryConfig {
    pub fn retry_policy(&self) -> crate::transfer::RetryPolicy {
        crate::transfer::RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            total_timeout: Duration::from_millis(self.total_timeout_ms),
        }
    }
}

fn default_rates() -> BTreeMap<Currency, Decimal> {
    crate::currency::CurrencyConverter::default_rates()
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config: AppConfig =
            serde_yaml::from_str(&content).context("Failed to parse config yaml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("BANK_PREFIX") {
            self.bank.prefix = v;
        }
        if let Ok(v) = std::env::var("BANK_NAME") {
            self.bank.name = v;
        }
        if let Ok(v) = std::env::var("CENTRAL_BANK_URL") {
            self.central_bank.url = v;
        }
        if let Ok(v) = std::env::var("API_KEY") {
            self.central_bank.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("DATABASE_URL") {
            self.postgres_url = Some(v);
        }
        if let Ok(v) = std::env::var("JWT_SECRET") {
            self.jwt_secret = v;
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.bank.prefix.chars().count() != 3 {
            anyhow::bail!("bank.prefix must be exactly 3 characters: {:?}", self.bank.prefix);
        }
        if self.jwt_secret.is_empty() {
            anyhow::bail!("jwt_secret must not be empty");
        }
        Ok(())
    }
}
