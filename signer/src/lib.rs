//! Signer capability (spec §4.1 collaborator, §9 "Signer subclasses map to
//! a single capability contract").
//!
//! All cryptographic primitives are assumed available per spec §1 (they
//! are explicitly out of scope); this crate defines the capability
//! surface the rest of the bridge depends on and two variant
//! implementations: an in-memory key (deterministic, test/dev use) and a
//! remote KMS client (delegates the actual signing to an external
//! service over HTTP). Neither variant implements real transaction
//! signing — that remains an external collaborator, consistent with the
//! "on-chain signing and transaction submission (signer abstraction
//! only)" non-goal.

mod kms;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use kms::RemoteKmsSigner;
pub use memory::InMemorySigner;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signer unavailable: {0}")]
    Unavailable(String),
    #[error("remote KMS error: {0}")]
    Remote(String),
}

/// Opaque typed-data payload; the signer does not interpret the structure,
/// only hashes and signs the canonical bytes the caller supplies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypedData {
    pub domain: String,
    pub primary_type: String,
    pub canonical_json: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(pub String);

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single capability contract every signer variant implements.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The on-chain address this signer signs on behalf of.
    fn address(&self) -> &str;

    /// Sign an EIP-712-style typed-data payload (used for firm-quote
    /// settlement authorizations).
    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Signature, SignerError>;

    /// Sign an arbitrary message (used for upstream auth challenges).
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_signer_is_deterministic() {
        let s = InMemorySigner::new("0xabc", "test-key-material");
        let msg = b"hello";
        let sig1 = s.sign_message(msg).await.unwrap();
        let sig2 = s.sign_message(msg).await.unwrap();
        assert_eq!(sig1, sig2);
        assert_eq!(s.address(), "0xabc");
    }

    #[tokio::test]
    async fn in_memory_signer_differs_per_message() {
        let s = InMemorySigner::new("0xabc", "test-key-material");
        let sig1 = s.sign_message(b"hello").await.unwrap();
        let sig2 = s.sign_message(b"world").await.unwrap();
        assert_ne!(sig1, sig2);
    }
}
