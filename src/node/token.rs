//! Node API credentials
//!
//! Node agents authenticate with an opaque bearer token. Only the SHA-256
//! digest of the token is stored; the plaintext is returned once at issue
//! time.
//!
//! Plaintext format:
//!
//! ```text
//! node_<base64url(32 random bytes), no padding>
//! ```
//!
//! Stored format: 64 lowercase hex characters.

use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ValidationError;

/// Literal prefix of every node token
pub const TOKEN_PREFIX: &str = "node_";

/// Random bytes per token
pub const TOKEN_RANDOM_BYTES: usize = 32;

/// Length of the stored hex digest
pub const TOKEN_HASH_HEX_LEN: usize = 64;

/// Hash a plaintext token to its stored form
#[must_use]
pub fn hash_token(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Stored node credential
///
/// Pure value object: expiry changes return a new instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeToken {
    hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl NodeToken {
    /// Generate a fresh token
    ///
    /// Returns the plaintext together with the stored credential.
    #[must_use]
    pub fn generate() -> (String, Self) {
        let mut bytes = [0u8; TOKEN_RANDOM_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let plaintext = format!(
            "{TOKEN_PREFIX}{}",
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
        );
        let token = Self {
            hash: hash_token(&plaintext),
            expires_at: None,
        };
        (plaintext, token)
    }

    /// Rebuild a credential from its stored hash
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidRecord` unless `hash` is 64 lowercase
    /// hex characters.
    pub fn from_hash(
        hash: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        let hash = hash.into();
        let well_formed = hash.len() == TOKEN_HASH_HEX_LEN
            && hash
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(ValidationError::InvalidRecord(
                "token hash must be 64 lowercase hex characters".into(),
            ));
        }
        Ok(Self { hash, expires_at })
    }

    /// Stored hash
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Expiry, if any
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Copy with the given expiry
    #[must_use]
    pub fn with_expiry(&self, expires_at: DateTime<Utc>) -> Self {
        Self {
            hash: self.hash.clone(),
            expires_at: Some(expires_at),
        }
    }

    /// Copy without expiry
    #[must_use]
    pub fn without_expiry(&self) -> Self {
        Self {
            hash: self.hash.clone(),
            expires_at: None,
        }
    }

    /// Check if the token has expired at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Check whether the plaintext hashes to the stored digest
    ///
    /// Uses a constant-time comparison so response timing does not reveal
    /// how many leading characters matched.
    #[must_use]
    pub fn matches(&self, plaintext: &str) -> bool {
        let candidate = hash_token(plaintext);
        bool::from(candidate.as_bytes().ct_eq(self.hash.as_bytes()))
    }

    /// Verify a plaintext token at `now`
    ///
    /// Valid if the hash matches and the token has not expired. Both checks
    /// always run so the result does not reveal which one failed.
    #[must_use]
    pub fn verify_at(&self, plaintext: &str, now: DateTime<Utc>) -> bool {
        let hash_ok = self.matches(plaintext);
        let not_expired = !self.is_expired_at(now);
        hash_ok & not_expired
    }

    /// Verify a plaintext token against the current time
    #[must_use]
    pub fn verify(&self, plaintext: &str) -> bool {
        self.verify_at(plaintext, Utc::now())
    }
}

/// Source of fresh credentials for new nodes
pub trait TokenIssuer: Send + Sync {
    /// Issue a new plaintext/credential pair
    fn issue(&self) -> (String, NodeToken);
}

/// Default issuer backed by the OS random number generator
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenIssuer;

impl TokenIssuer for RandomTokenIssuer {
    fn issue(&self) -> (String, NodeToken) {
        NodeToken::generate()
    }
}
