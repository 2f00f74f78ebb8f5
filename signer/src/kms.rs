use async_trait::async_trait;
use serde::Deserialize;

use crate::{Signature, Signer, SignerError, TypedData};

/// Delegates signing to a remote KMS-style HTTP endpoint. The wire
/// contract is intentionally minimal (`POST {base_url}/sign`) since the
/// concrete KMS integration is an external collaborator; this variant
/// exists to give the rest of the bridge a production-shaped signer that
/// never holds key material in process memory.
pub struct RemoteKmsSigner {
    address: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SignResponse {
    signature: String,
}

impl RemoteKmsSigner {
    pub fn new(address: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn request_signature(&self, payload: serde_json::Value) -> Result<Signature, SignerError> {
        let resp = self
            .client
            .post(format!("{}/sign", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| SignerError::Remote(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SignerError::Remote(format!(
                "KMS returned status {}",
                resp.status()
            )));
        }

        let body: SignResponse = resp
            .json()
            .await
            .map_err(|e| SignerError::Remote(e.to_string()))?;

        Ok(Signature(body.signature))
    }
}

#[async_trait]
impl Signer for RemoteKmsSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Signature, SignerError> {
        self.request_signature(serde_json::json!({
            "address": self.address,
            "kind": "typed_data",
            "domain": payload.domain,
            "primary_type": payload.primary_type,
            "canonical_json": payload.canonical_json,
        }))
        .await
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        self.request_signature(serde_json::json!({
            "address": self.address,
            "kind": "message",
            "message_hex": hex::encode(message),
        }))
        .await
    }
}
