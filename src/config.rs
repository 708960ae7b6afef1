//! Configuration for the bundle coordinator
//!
//! All endpoints, keys, timeouts, and tip parameters live in one explicit
//! struct loaded from a TOML file with environment variable overrides.
//! There is no global mutable configuration state.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Quote service (Jupiter Ultra) configuration
    #[serde(default)]
    pub quote: QuoteConfig,

    /// Relay (Jito block engine) configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// Solana RPC configuration (lookup tables, simulation)
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Tip transaction configuration
    #[serde(default)]
    pub tip: TipConfig,

    /// Compute budget instructions prepended to every swap transaction
    #[serde(default)]
    pub compute: ComputeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port for the HTTP API
    #[serde(default = "default_port")]
    pub port: u16,

    /// Prometheus exporter port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Base URL of the quote API
    #[serde(default = "default_quote_base_url")]
    pub base_url: String,

    /// API key sent in the x-api-key header
    #[serde(default)]
    pub api_key: String,

    /// Per-request deadline in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Routers excluded from quote routing (comma-separated)
    #[serde(default = "default_exclude_routers")]
    pub exclude_routers: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Block engine base URL
    #[serde(default = "default_relay_url")]
    pub url: String,

    /// Optional relay auth token, appended as ?uuid=
    #[serde(default)]
    pub uuid: String,

    /// Per-bundle confirmation deadline in milliseconds
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,

    /// Interval between confirmation polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Submission discipline: "parallel" or "sequential"
    #[serde(default)]
    pub submission_mode: crate::types::SubmissionMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Solana RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipConfig {
    /// Default tip per bundle in lamports (request may override)
    #[serde(default = "default_tip_lamports")]
    pub lamports: u64,

    /// Recipient selection policy over the account pool
    #[serde(default)]
    pub policy: crate::types::TipPolicy,

    /// Tip recipient pool (base58 addresses)
    #[serde(default = "default_tip_accounts")]
    pub accounts: Vec<String>,

    /// Relay hard limit on transactions per bundle (swaps + tip)
    #[serde(default = "default_max_txs_per_bundle")]
    pub max_txs_per_bundle: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Compute unit limit instruction value
    #[serde(default = "default_cu_limit")]
    pub unit_limit: u32,

    /// Compute unit price in micro-lamports
    #[serde(default = "default_cu_price")]
    pub unit_price_micro_lamports: u64,
}

// Default value functions
fn default_port() -> u16 { 8080 }
fn default_metrics_port() -> u16 { 9090 }
fn default_quote_base_url() -> String { "https://api.jup.ag/ultra/v1".to_string() }
fn default_request_timeout_ms() -> u64 { 10_000 }
fn default_exclude_routers() -> String { "iris,dflow,jupiterz".to_string() }
fn default_relay_url() -> String { "https://ny.mainnet.block-engine.jito.wtf".to_string() }
fn default_confirmation_timeout_ms() -> u64 { 30_000 }
fn default_poll_interval_ms() -> u64 { 1_000 }
fn default_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_tip_lamports() -> u64 { 100_000 }
fn default_max_txs_per_bundle() -> usize { 5 }
fn default_cu_limit() -> u32 { 1_400_000 }
fn default_cu_price() -> u64 { 1_000_000 }

fn default_tip_accounts() -> Vec<String> {
    // Well-known block engine tip accounts
    [
        "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
        "HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe",
        "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY",
        "ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49",
        "DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh",
        "ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt",
        "DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL",
        "3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_quote_base_url(),
            api_key: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            exclude_routers: default_exclude_routers(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
            uuid: String::new(),
            confirmation_timeout_ms: default_confirmation_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            submission_mode: crate::types::SubmissionMode::default(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
        }
    }
}

impl Default for TipConfig {
    fn default() -> Self {
        Self {
            lamports: default_tip_lamports(),
            policy: crate::types::TipPolicy::default(),
            accounts: default_tip_accounts(),
            max_txs_per_bundle: default_max_txs_per_bundle(),
        }
    }
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            unit_limit: default_cu_limit(),
            unit_price_micro_lamports: default_cu_price(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            quote: QuoteConfig::default(),
            relay: RelayConfig::default(),
            rpc: RpcConfig::default(),
            tip: TipConfig::default(),
            compute: ComputeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with .env and environment variable overrides for
    /// secrets and endpoints (JUPITER_API_KEY, JITO_UUID, JITO_RELAY_URL,
    /// SOLANA_RPC_URL). A missing file falls back to defaults.
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = if std::path::Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("JUPITER_API_KEY") {
            self.quote.api_key = key;
        }
        if let Ok(uuid) = std::env::var("JITO_UUID") {
            self.relay.uuid = uuid;
        }
        if let Ok(url) = std::env::var("JITO_RELAY_URL") {
            self.relay.url = url;
        }
        if let Ok(url) = std::env::var("SOLANA_RPC_URL") {
            self.rpc.url = url;
        }
    }
}
