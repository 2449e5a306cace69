//! Ordered-fallback decryption of notification payloads.
//!
//! Scheme A is NIP-44 v2 (conversation key + versioned payload). Scheme B is
//! legacy NIP-04 (AES-CBC with `?iv=`). Each scheme is tried once, in order,
//! and the result says which one succeeded.

use base64::Engine;
use nostr::nips::{nip04, nip44};
use nostr::{PublicKey, SecretKey};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::{DecryptFailure, Identity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Nip44,
    Nip04,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Nip44 => f.write_str("nip44"),
            Scheme::Nip04 => f.write_str("nip04"),
        }
    }
}

/// Plaintext together with the scheme that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    pub scheme: Scheme,
    pub plaintext: String,
}

/// A single decryption scheme. Failures come back as a message; nothing here
/// may panic.
pub trait DecryptScheme: Send + Sync {
    fn scheme(&self) -> Scheme;

    fn decrypt(
        &self,
        secret_key: &SecretKey,
        sender: &PublicKey,
        ciphertext: &str,
    ) -> std::result::Result<String, String>;
}

pub struct Nip44Scheme;

impl DecryptScheme for Nip44Scheme {
    fn scheme(&self) -> Scheme {
        Scheme::Nip44
    }

    fn decrypt(
        &self,
        secret_key: &SecretKey,
        sender: &PublicKey,
        ciphertext: &str,
    ) -> std::result::Result<String, String> {
        let conversation_key = nip44::v2::ConversationKey::derive(secret_key, sender)
            .map_err(|e| e.to_string())?;
        let payload = base64::engine::general_purpose::STANDARD
            .decode(ciphertext.as_bytes())
            .map_err(|e| format!("Base64 decode error: {}", e))?;
        let plaintext = nip44::v2::decrypt_to_bytes(&conversation_key, &payload)
            .map_err(|e| e.to_string())?;
        String::from_utf8(plaintext).map_err(|e| format!("UTF-8 decode error: {}", e))
    }
}

pub struct Nip04Scheme;

impl DecryptScheme for Nip04Scheme {
    fn scheme(&self) -> Scheme {
        Scheme::Nip04
    }

    fn decrypt(
        &self,
        secret_key: &SecretKey,
        sender: &PublicKey,
        ciphertext: &str,
    ) -> std::result::Result<String, String> {
        nip04::decrypt(secret_key, sender, ciphertext).map_err(|e| e.to_string())
    }
}

#[derive(Clone)]
pub struct DecryptionEngine {
    schemes: Vec<Arc<dyn DecryptScheme>>,
}

impl Default for DecryptionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecryptionEngine {
    /// NIP-44 first, NIP-04 second.
    pub fn new() -> Self {
        Self::with_schemes(vec![Arc::new(Nip44Scheme), Arc::new(Nip04Scheme)])
    }

    pub fn with_schemes(schemes: Vec<Arc<dyn DecryptScheme>>) -> Self {
        Self { schemes }
    }

    pub fn decrypt(
        &self,
        ciphertext: &str,
        sender: &PublicKey,
        identity: &Identity,
    ) -> std::result::Result<Decrypted, DecryptFailure> {
        let mut first_error: Option<String> = None;
        let mut last_error = String::from("no decryption scheme configured");

        for scheme in &self.schemes {
            match scheme.decrypt(identity.secret_key(), sender, ciphertext) {
                Ok(plaintext) => {
                    tracing::debug!(scheme = %scheme.scheme(), "decrypted notification");
                    return Ok(Decrypted {
                        scheme: scheme.scheme(),
                        plaintext,
                    });
                }
                Err(err) => {
                    tracing::debug!(scheme = %scheme.scheme(), error = %err, "decrypt attempt failed");
                    if first_error.is_none() {
                        first_error = Some(err.clone());
                    }
                    last_error = err;
                }
            }
        }

        Err(DecryptFailure::BothSchemesFailed {
            scheme_a: first_error.unwrap_or_else(|| last_error.clone()),
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr::Keys;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: Arc<dyn DecryptScheme>,
        calls: Arc<AtomicUsize>,
    }

    impl DecryptScheme for Counting {
        fn scheme(&self) -> Scheme {
            self.inner.scheme()
        }

        fn decrypt(
            &self,
            secret_key: &SecretKey,
            sender: &PublicKey,
            ciphertext: &str,
        ) -> std::result::Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.decrypt(secret_key, sender, ciphertext)
        }
    }

    fn counting_engine() -> (DecryptionEngine, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));
        let engine = DecryptionEngine::with_schemes(vec![
            Arc::new(Counting {
                inner: Arc::new(Nip44Scheme),
                calls: a_calls.clone(),
            }),
            Arc::new(Counting {
                inner: Arc::new(Nip04Scheme),
                calls: b_calls.clone(),
            }),
        ]);
        (engine, a_calls, b_calls)
    }

    #[test]
    fn nip44_payload_uses_scheme_a_only() {
        let sender = Keys::generate();
        let me = Identity::generate();
        let ciphertext = nip44::encrypt(
            sender.secret_key(),
            &me.public_key(),
            "hello",
            nip44::Version::V2,
        )
        .unwrap();

        let (engine, a_calls, b_calls) = counting_engine();
        let out = engine
            .decrypt(&ciphertext, &sender.public_key(), &me)
            .unwrap();

        assert_eq!(out.scheme, Scheme::Nip44);
        assert_eq!(out.plaintext, "hello");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn nip04_payload_falls_back_to_scheme_b() {
        let sender = Keys::generate();
        let me = Identity::generate();
        let ciphertext = nip04::encrypt(sender.secret_key(), &me.public_key(), "legacy").unwrap();

        let (engine, a_calls, b_calls) = counting_engine();
        let out = engine
            .decrypt(&ciphertext, &sender.public_key(), &me)
            .unwrap();

        assert_eq!(out.scheme, Scheme::Nip04);
        assert_eq!(out.plaintext, "legacy");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn corrupt_payload_fails_both_schemes() {
        let sender = Keys::generate();
        let me = Identity::generate();
        let engine = DecryptionEngine::new();

        for garbage in ["", "not encrypted at all", "AAAA", "abc?iv=def"] {
            let err = engine
                .decrypt(garbage, &sender.public_key(), &me)
                .unwrap_err();
            assert!(matches!(err, DecryptFailure::BothSchemesFailed { .. }));
        }
    }

    #[test]
    fn payload_for_someone_else_fails() {
        let sender = Keys::generate();
        let me = Identity::generate();
        let someone_else = Keys::generate();
        let ciphertext = nip44::encrypt(
            sender.secret_key(),
            &someone_else.public_key(),
            "not for you",
            nip44::Version::V2,
        )
        .unwrap();

        let engine = DecryptionEngine::new();
        assert!(engine
            .decrypt(&ciphertext, &sender.public_key(), &me)
            .is_err());
    }

    #[test]
    fn empty_engine_reports_failure() {
        let me = Identity::generate();
        let engine = DecryptionEngine::with_schemes(Vec::new());
        let err = engine.decrypt("x", &me.public_key(), &me).unwrap_err();
        let DecryptFailure::BothSchemesFailed { last_error, .. } = err;
        assert_eq!(last_error, "no decryption scheme configured");
    }
}
