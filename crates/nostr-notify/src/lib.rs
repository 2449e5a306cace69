//! Receive encrypted notifications over Nostr.
//!
//! Events of kind 30078 tagged to the recipient are decrypted (NIP-44 with a
//! NIP-04 fallback), parsed into [`Notification`]s, kept in a bounded
//! [`HistoryStore`] and forwarded to an [`AlertSink`]. The
//! [`SubscriptionController`] ties these together over an injected
//! [`RelayPool`] and [`StorageAdapter`].

pub mod alert;
pub mod controller;
pub mod decrypt;
pub mod error;
pub mod file_storage;
pub mod history;
pub mod keys;
pub mod notification;
pub mod pool;
pub mod relays;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod types;

pub use alert::{Alert, AlertDispatcher, AlertSink, NullAlertSink};
pub use controller::{ControllerConfig, ControllerEvent, SubscriptionController};
pub use decrypt::{DecryptScheme, Decrypted, DecryptionEngine, Nip04Scheme, Nip44Scheme, Scheme};
pub use error::{
    ConfigError, DecryptFailure, Error, NormalizeFailure, PersistenceFailure, Result,
};
pub use file_storage::FileStorageAdapter;
pub use history::HistoryStore;
pub use keys::Identity;
pub use notification::{normalize, normalize_at, Notification, NotificationPayload, WirePriority};
pub use pool::{
    build_filter, notification_filter, FilterBuilder, NotificationReceiver, NotificationSender,
    PoolHandle, PoolNotification, RelayPool, SubscriptionHandle,
};
pub use relays::RelayEndpoint;
pub use settings::Settings;
pub use stats::{format_uptime, SessionView, Stats, StatsAggregator};
pub use storage::{InMemoryStorage, StorageAdapter};
pub use types::*;
