//! Typed configuration surface (spec §6 "Configuration").
//!
//! Loading itself (file formats, secret managers, live reload) is an
//! external collaborator per spec §1; what lives here is the typed shape
//! the rest of the system depends on, plus a minimal `from_env`
//! convenience constructor for local/dev runs — the same scope the
//! teacher's `AppConfig::from_env` covers for its own (much smaller)
//! configuration surface.

use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub ws_url: String,
    pub auth_token: String,
    pub chain_id: u64,
    pub timeout_ms: u64,
    pub max_retries: u32,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rfq.upstream.invalid".to_string(),
            ws_url: "wss://rfq.upstream.invalid/ws".to_string(),
            auth_token: String::new(),
            chain_id: 1,
            timeout_ms: 30_000,
            max_retries: 3,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CounterpartyConfig {
    pub sender_comp_id: String,
    pub target_comp_id: String,
    pub version: String,
    pub heartbeat_s: u32,
    pub reset_on_logon: bool,
    pub password: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FixConfig {
    pub host: String,
    pub port: u16,
    pub tls_key_path: Option<String>,
    pub tls_cert_path: Option<String>,
    pub max_sessions: usize,
    pub allowed_ips: Vec<String>,
    pub counterparties: HashMap<String, CounterpartyConfig>,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9878,
            tls_key_path: None,
            tls_cert_path: None,
            max_sessions: 64,
            allowed_ips: Vec::new(),
            counterparties: HashMap::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RateConfig {
    pub refresh_interval_ms: u64,
    pub markup_bps: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 5_000,
            markup_bps: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    pub default_quote_validity_s: u64,
    pub default_fee_rate_bps: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            default_quote_validity_s: 30,
            default_fee_rate_bps: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeStrategy {
    Mirror,
    Spread,
    Dynamic,
}

#[derive(Clone, Debug)]
pub struct OrderBookBridgeConfig {
    pub refresh_interval_ms: u64,
    pub strategy: BridgeStrategy,
    pub max_orders: usize,
    pub price_deviation_threshold_bps: f64,
    /// Half-spread applied around mid by the `spread` strategy, and the
    /// floor `dynamic` widens from based on downstream book imbalance.
    pub spread_bps: f64,
}

impl Default for OrderBookBridgeConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 2_000,
            strategy: BridgeStrategy::Mirror,
            max_orders: 50,
            price_deviation_threshold_bps: 20.0,
            spread_bps: 10.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SplitConfig {
    pub min_split_bps: u32,
    pub max_slippage_bps: u32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            min_split_bps: 500,
            max_slippage_bps: 50,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BridgeConfig {
    pub upstream: UpstreamConfig,
    pub fix: FixConfig,
    pub rate: RateConfig,
    pub lifecycle: LifecycleConfig,
    pub order_book_bridge: OrderBookBridgeConfig,
    pub split: SplitConfig,
}

impl BridgeConfig {
    /// Minimal env-based loader for local/dev runs, mirroring the
    /// teacher's `AppConfig::from_env`. Production deployments are
    /// expected to supply a fully-populated `BridgeConfig` themselves.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("UPSTREAM_BASE_URL") {
            cfg.upstream.base_url = v;
        }
        if let Ok(v) = std::env::var("UPSTREAM_WS_URL") {
            cfg.upstream.ws_url = v;
        }
        if let Ok(v) = std::env::var("UPSTREAM_AUTH_TOKEN") {
            cfg.upstream.auth_token = v;
        }
        if let Ok(v) = std::env::var("FIX_HOST") {
            cfg.fix.host = v;
        }
        if let Ok(v) = std::env::var("FIX_PORT") {
            if let Ok(p) = v.parse() {
                cfg.fix.port = p;
            }
        }

        cfg
    }
}
