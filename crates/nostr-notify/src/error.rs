use thiserror::Error;

/// Problems with user-supplied configuration. These block `start` and are
/// fixed by correcting the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No relays configured")]
    NoRelays,

    #[error("No identity configured")]
    NoIdentity,

    #[error("Invalid private key. Must be 64 hex characters")]
    InvalidKeyFormat,
}

/// Neither decryption scheme could open an event's content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptFailure {
    #[error("Both decryption schemes failed (nip44: {scheme_a}; nip04: {last_error})")]
    BothSchemesFailed { scheme_a: String, last_error: String },
}

/// Decrypted content was not a usable notification payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeFailure {
    #[error("Malformed notification payload: {0}")]
    MalformedPayload(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Persistence error: {0}")]
pub struct PersistenceFailure(pub String);

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Decrypt(#[from] DecryptFailure),

    #[error(transparent)]
    Normalize(#[from] NormalizeFailure),

    #[error(transparent)]
    Persistence(#[from] PersistenceFailure),

    #[error("Relay pool error: {0}")]
    Pool(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
