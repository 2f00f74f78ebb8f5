use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::{Signature, Signer, SignerError, TypedData};

/// Deterministic in-memory signer. Holds key material in process memory —
/// suitable for local development and tests, not for production custody.
pub struct InMemorySigner {
    address: String,
    key_material: String,
}

impl InMemorySigner {
    pub fn new(address: impl Into<String>, key_material: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            key_material: key_material.into(),
        }
    }

    fn sign_bytes(&self, bytes: &[u8]) -> Signature {
        let mut hasher = Sha256::new();
        hasher.update(self.key_material.as_bytes());
        hasher.update(bytes);
        let digest = hasher.finalize();
        Signature(format!("0x{}", hex::encode(digest)))
    }
}

#[async_trait]
impl Signer for InMemorySigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Signature, SignerError> {
        let mut buf = Vec::new();
        buf.extend_from_slice(payload.domain.as_bytes());
        buf.extend_from_slice(payload.primary_type.as_bytes());
        buf.extend_from_slice(payload.canonical_json.as_bytes());
        Ok(self.sign_bytes(&buf))
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        Ok(self.sign_bytes(message))
    }
}
