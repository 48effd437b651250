//! Cryptographic operations for the ledger
//!
//! This module provides:
//! - Ed25519 key pairs from which caller principals are derived
//! - Request authentication (signature → principal)
//! - SHA-256 hashing for the event audit chain

use crate::types::{LedgerEvent, Principal};
use crate::{Error, Result};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// Ed25519 key pair for signing
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Principal owned by this key
    pub fn principal(&self) -> Principal {
        Principal::from_public_key(&self.public_key())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Authenticate a signed request and return the caller's principal
///
/// Transports call this to turn a signed payload into the caller identity
/// passed to the ledger operations.
pub fn authenticate(
    public_key: &[u8; 32],
    message: &[u8],
    signature: &[u8; 64],
) -> Result<Principal> {
    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| Error::SignatureError(format!("Invalid public key: {}", e)))?;

    verifying_key
        .verify(message, &DalekSignature::from_bytes(signature))
        .map_err(|e| Error::SignatureError(format!("Verification failed: {}", e)))?;

    Ok(Principal::from_public_key(public_key))
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash an event from its canonical bytes
pub fn hash_event(event: &LedgerEvent) -> Result<[u8; 32]> {
    Ok(hash_bytes(&event.canonical_bytes()?))
}

/// Compute and store the event's hash
pub fn seal_event(mut event: LedgerEvent) -> Result<LedgerEvent> {
    event.hash = hash_event(&event)?;
    Ok(event)
}

/// Check that `events` form an unbroken chain starting at sequence 0
pub fn verify_chain(events: &[LedgerEvent]) -> Result<()> {
    let mut previous_hash = [0u8; 32];

    for (expected_sequence, event) in events.iter().enumerate() {
        if event.sequence != expected_sequence as u64 {
            return Err(Error::InvariantViolation(format!(
                "Sequence gap: expected {}, found {}",
                expected_sequence, event.sequence
            )));
        }

        if event.previous_hash != previous_hash {
            return Err(Error::InvariantViolation(format!(
                "Broken hash link at sequence {}",
                event.sequence
            )));
        }

        if hash_event(event)? != event.hash {
            return Err(Error::InvariantViolation(format!(
                "Hash mismatch at sequence {}",
                event.sequence
            )));
        }

        previous_hash = event.hash;
    }

    Ok(())
}
