//! Recipient identity: key format validation, public key derivation and
//! generation.
//!
//! Nothing here touches storage; callers decide when a key is persisted
//! (see [`crate::Settings`]).

use nostr::nips::nip19::FromBech32;
use nostr::{Keys, PublicKey, SecretKey, ToBech32};

use crate::ConfigError;

/// True iff `key_hex` is exactly 64 hex characters, either case.
pub fn validate(key_hex: &str) -> bool {
    key_hex.len() == 64 && key_hex.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn derive_public_key(secret_key: &SecretKey) -> PublicKey {
    Keys::new(secret_key.clone()).public_key()
}

pub fn generate() -> SecretKey {
    Keys::generate().secret_key().clone()
}

/// Normalize user key input to lowercase hex. Accepts `nsec1...` or 64 hex
/// characters.
pub fn parse_secret_key_input(input: &str) -> Result<String, ConfigError> {
    let input = input.trim();
    if input.starts_with("nsec1") {
        let sk = SecretKey::from_bech32(input).map_err(|_| ConfigError::InvalidKeyFormat)?;
        return Ok(sk.to_secret_hex());
    }
    Identity::from_hex(input).map(|identity| identity.secret_hex())
}

/// The recipient keypair. The public key is always derived from the secret
/// key; there is no constructor taking both.
#[derive(Debug, Clone)]
pub struct Identity {
    keys: Keys,
}

impl Identity {
    pub fn new(secret_key: SecretKey) -> Self {
        Self {
            keys: Keys::new(secret_key),
        }
    }

    pub fn generate() -> Self {
        Self::new(generate())
    }

    pub fn from_hex(key_hex: &str) -> Result<Self, ConfigError> {
        let key_hex = key_hex.trim();
        if !validate(key_hex) {
            return Err(ConfigError::InvalidKeyFormat);
        }
        // 64 hex chars can still be out of range for secp256k1 (zero, >= n).
        let secret_key = SecretKey::from_hex(key_hex).map_err(|_| ConfigError::InvalidKeyFormat)?;
        Ok(Self::new(secret_key))
    }

    pub fn secret_key(&self) -> &SecretKey {
        self.keys.secret_key()
    }

    pub fn secret_hex(&self) -> String {
        self.keys.secret_key().to_secret_hex()
    }

    pub fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }

    pub fn npub(&self) -> String {
        self.public_key().to_bech32().unwrap_or_default()
    }
}
