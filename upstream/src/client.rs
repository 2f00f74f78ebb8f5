use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use common::config::UpstreamConfig;

use crate::auth::AuthProvider;
use crate::error::UpstreamError;
use crate::types::{FirmQuote, IndicativeQuote, Side, TradingPair};

const ENVELOPE_SUCCESS_CODE: i64 = 10000;

#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[allow(dead_code)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct PairsData {
    pairs: Vec<TradingPair>,
}

/// Stateless client against the upstream RFQ source (spec §4.1).
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn list_pairs(&self, chain_id: u64) -> Result<Vec<TradingPair>, UpstreamError>;

    async fn indicative(
        &self,
        src_chain: u64,
        dst_chain: u64,
        token_in: &str,
        token_out: &str,
        amount_in: u128,
        side: Option<Side>,
    ) -> Result<IndicativeQuote, UpstreamError>;

    #[allow(clippy::too_many_arguments)]
    async fn firm(
        &self,
        from: &str,
        to: &str,
        src_chain: u64,
        dst_chain: u64,
        token_in: &str,
        token_out: &str,
        amount_in: u128,
        slippage_pct: f64,
        expiry_s: u64,
    ) -> Result<FirmQuote, UpstreamError>;
}

pub struct HttpUpstreamClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<dyn AuthProvider>,
    timeout: Duration,
    max_retries: u32,
}

impl HttpUpstreamClient {
    pub fn new(cfg: &UpstreamConfig, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: cfg.base_url.clone(),
            auth,
            timeout: cfg.timeout(),
            max_retries: cfg.max_retries,
        }
    }

    async fn post_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, UpstreamError> {
        let endpoint = format!("{}{}", self.base_url, path);
        let mut backoff = Duration::from_secs(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.try_once::<T>(&endpoint, &body).await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "upstream call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_once<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T, UpstreamError> {
        let token = self.auth.token().await;

        let send = self
            .http
            .post(endpoint)
            .bearer_auth(token)
            .json(body)
            .timeout(self.timeout)
            .send();

        let resp = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => {
                return Err(UpstreamError::Transient {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(UpstreamError::Timeout {
                    endpoint: endpoint.to_string(),
                    limit_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        let status = resp.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Transient {
                endpoint: endpoint.to_string(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                endpoint: endpoint.to_string(),
                code: None,
                body: format!("HTTP {status}: {body}"),
            });
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| UpstreamError::Transient {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let envelope: Envelope<T> = serde_json::from_str(&raw).map_err(|e| UpstreamError::Api {
            endpoint: endpoint.to_string(),
            code: None,
            body: format!("malformed envelope: {e}; body={raw}"),
        })?;

        if envelope.code != ENVELOPE_SUCCESS_CODE {
            return Err(UpstreamError::Api {
                endpoint: endpoint.to_string(),
                code: Some(envelope.code),
                body: raw,
            });
        }

        envelope.data.ok_or_else(|| UpstreamError::Api {
            endpoint: endpoint.to_string(),
            code: Some(envelope.code),
            body: "envelope succeeded but carried no data".to_string(),
        })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn list_pairs(&self, chain_id: u64) -> Result<Vec<TradingPair>, UpstreamError> {
        let endpoint = format!("{}/v1/listing/pairs?chain_id={chain_id}", self.base_url);
        // GET has no body-triggered retries beyond the shared envelope path;
        // reuse post_envelope's retry/backoff by routing through the same
        // helper with an empty body is not correct for GET, so issue
        // directly here while preserving identical classification rules.
        let mut backoff = Duration::from_secs(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_get::<PairsData>(&endpoint).await {
                Ok(v) => return Ok(v.pairs),
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn indicative(
        &self,
        src_chain: u64,
        dst_chain: u64,
        token_in: &str,
        token_out: &str,
        amount_in: u128,
        side: Option<Side>,
    ) -> Result<IndicativeQuote, UpstreamError> {
        let body = serde_json::json!({
            "src_chain_id": src_chain,
            "dst_chain_id": dst_chain,
            "token_in": token_in,
            "token_out": token_out,
            "amount_in": amount_in.to_string(),
            "side": side,
        });
        self.post_envelope("/v1/quote/indicative", body).await
    }

    async fn firm(
        &self,
        from: &str,
        to: &str,
        src_chain: u64,
        dst_chain: u64,
        token_in: &str,
        token_out: &str,
        amount_in: u128,
        slippage_pct: f64,
        expiry_s: u64,
    ) -> Result<FirmQuote, UpstreamError> {
        let body = serde_json::json!({
            "from": from,
            "to": to,
            "src_chain_id": src_chain,
            "dst_chain_id": dst_chain,
            "token_in": token_in,
            "token_out": token_out,
            "amount_in": amount_in.to_string(),
            "slippage": slippage_pct,
            "expiry_time_sec": expiry_s,
        });
        self.post_envelope("/v1/quote/firm", body).await
    }
}

impl HttpUpstreamClient {
    async fn try_get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, UpstreamError> {
        let token = self.auth.token().await;

        let resp = match tokio::time::timeout(
            self.timeout,
            self.http.get(endpoint).bearer_auth(token).send(),
        )
        .await
        {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => {
                return Err(UpstreamError::Transient {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(UpstreamError::Timeout {
                    endpoint: endpoint.to_string(),
                    limit_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        let status = resp.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(UpstreamError::Transient {
                endpoint: endpoint.to_string(),
                message: format!("HTTP {status}"),
            });
        }
        if status.is_client_error() {
            return Err(UpstreamError::Api {
                endpoint: endpoint.to_string(),
                code: None,
                body: format!("HTTP {status}"),
            });
        }

        let raw = resp.text().await.map_err(|e| UpstreamError::Transient {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&raw).map_err(|e| UpstreamError::Api {
            endpoint: endpoint.to_string(),
            code: None,
            body: format!("malformed pairs response: {e}"),
        })
    }
}
