use futures_util::future::BoxFuture;
use nostr::{Filter, Kind, PublicKey, Timestamp};
use tokio::sync::mpsc;

use crate::{InboundEvent, RelayEndpoint, Result};

/// Messages a relay pool pushes to the controller. Ordering holds per relay
/// only.
#[derive(Debug, Clone)]
pub enum PoolNotification {
    Event {
        relay: Option<String>,
        event: InboundEvent,
    },
    EndOfStoredEvents {
        relay: String,
    },
    Closed {
        relay: Option<String>,
        reason: String,
    },
}

pub type NotificationSender = mpsc::UnboundedSender<PoolNotification>;
pub type NotificationReceiver = mpsc::UnboundedReceiver<PoolNotification>;

/// An open pool connection scoped to a relay set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolHandle {
    id: u64,
    relays: Vec<RelayEndpoint>,
}

impl PoolHandle {
    pub fn new(id: u64, relays: Vec<RelayEndpoint>) -> Self {
        Self { id, relays }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn relays(&self) -> &[RelayEndpoint] {
        &self.relays
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub String);

/// Relay pool capability. Implementations own the websocket connections and
/// forward matching events into the `NotificationSender` given to
/// `subscribe` until the subscription or pool is closed.
pub trait RelayPool: Send + Sync {
    fn open_pool<'a>(&'a self, relays: &'a [RelayEndpoint]) -> BoxFuture<'a, Result<PoolHandle>>;

    fn subscribe<'a>(
        &'a self,
        pool: &'a PoolHandle,
        filter: Filter,
        sink: NotificationSender,
    ) -> BoxFuture<'a, Result<SubscriptionHandle>>;

    fn close_subscription<'a>(
        &'a self,
        pool: &'a PoolHandle,
        subscription: SubscriptionHandle,
    ) -> BoxFuture<'a, ()>;

    fn close_pool(&self, pool: PoolHandle) -> BoxFuture<'_, ()>;

    /// Relays currently connected, or `None` if the pool cannot tell.
    fn connected_relays<'a>(&'a self, pool: &'a PoolHandle) -> BoxFuture<'a, Option<usize>>;
}

/// Live notifications addressed to `recipient`, starting at `since`.
pub fn notification_filter(kind: u16, recipient: PublicKey, since: Timestamp) -> Filter {
    build_filter()
        .kinds(vec![kind])
        .pubkeys(vec![recipient])
        .since(since)
        .build()
}

pub fn build_filter() -> FilterBuilder {
    FilterBuilder::new()
}

pub struct FilterBuilder {
    kinds: Vec<Kind>,
    pubkeys: Vec<PublicKey>,
    since: Option<Timestamp>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self {
            kinds: Vec::new(),
            pubkeys: Vec::new(),
            since: None,
        }
    }

    pub fn kinds(mut self, kinds: Vec<u16>) -> Self {
        self.kinds = kinds.into_iter().map(Kind::from).collect();
        self
    }

    pub fn pubkeys(mut self, pubkeys: Vec<PublicKey>) -> Self {
        self.pubkeys = pubkeys;
        self
    }

    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    pub fn build(self) -> Filter {
        let mut filter = Filter::new();
        if !self.kinds.is_empty() {
            filter = filter.kinds(self.kinds);
        }
        if !self.pubkeys.is_empty() {
            filter = filter.pubkeys(self.pubkeys);
        }
        if let Some(since) = self.since {
            filter = filter.since(since);
        }
        filter
    }
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process stand-ins for the relay pool and alert surface.
pub mod test_utils {
    use super::*;
    use crate::{Alert, AlertSink, Error};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Channel-driven relay pool. Tests push events with [`MockPool::inject`].
    #[derive(Default)]
    pub struct MockPool {
        next_id: AtomicU64,
        open_pools: Mutex<Vec<PoolHandle>>,
        subscriptions: Mutex<HashMap<String, (Filter, NotificationSender)>>,
        polls: AtomicUsize,
        connected: Mutex<Option<usize>>,
        fail_open: AtomicBool,
    }

    impl MockPool {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `connected_relays` report a real count instead of `None`.
        pub fn set_connected(&self, connected: Option<usize>) {
            *self.connected.lock().unwrap() = connected;
        }

        pub fn set_fail_open(&self, fail: bool) {
            self.fail_open.store(fail, Ordering::SeqCst);
        }

        /// Deliver an event to every open subscription. Returns how many
        /// subscriptions received it.
        pub fn inject(&self, event: InboundEvent) -> usize {
            self.notify(PoolNotification::Event {
                relay: Some("wss://mock".to_string()),
                event,
            })
        }

        pub fn notify(&self, notification: PoolNotification) -> usize {
            self.subscriptions
                .lock()
                .unwrap()
                .values()
                .filter(|(_, sink)| sink.send(notification.clone()).is_ok())
                .count()
        }

        pub fn active_subscriptions(&self) -> usize {
            self.subscriptions.lock().unwrap().len()
        }

        pub fn open_pools(&self) -> Vec<PoolHandle> {
            self.open_pools.lock().unwrap().clone()
        }

        pub fn filters(&self) -> Vec<Filter> {
            self.subscriptions
                .lock()
                .unwrap()
                .values()
                .map(|(filter, _)| filter.clone())
                .collect()
        }

        /// Number of health polls served so far.
        pub fn poll_count(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    impl RelayPool for MockPool {
        fn open_pool<'a>(
            &'a self,
            relays: &'a [RelayEndpoint],
        ) -> BoxFuture<'a, Result<PoolHandle>> {
            let result = if self.fail_open.load(Ordering::SeqCst) {
                Err(Error::Pool("connection refused".to_string()))
            } else {
                let handle = PoolHandle::new(
                    self.next_id.fetch_add(1, Ordering::SeqCst),
                    relays.to_vec(),
                );
                self.open_pools.lock().unwrap().push(handle.clone());
                Ok(handle)
            };
            Box::pin(std::future::ready(result))
        }

        fn subscribe<'a>(
            &'a self,
            pool: &'a PoolHandle,
            filter: Filter,
            sink: NotificationSender,
        ) -> BoxFuture<'a, Result<SubscriptionHandle>> {
            let id = format!("sub-{}-{}", pool.id(), self.next_id.fetch_add(1, Ordering::SeqCst));
            self.subscriptions
                .lock()
                .unwrap()
                .insert(id.clone(), (filter, sink));
            Box::pin(std::future::ready(Ok(SubscriptionHandle(id))))
        }

        fn close_subscription<'a>(
            &'a self,
            _pool: &'a PoolHandle,
            subscription: SubscriptionHandle,
        ) -> BoxFuture<'a, ()> {
            self.subscriptions.lock().unwrap().remove(&subscription.0);
            Box::pin(std::future::ready(()))
        }

        fn close_pool(&self, pool: PoolHandle) -> BoxFuture<'_, ()> {
            self.open_pools.lock().unwrap().retain(|p| p.id() != pool.id());
            Box::pin(std::future::ready(()))
        }

        fn connected_relays<'a>(&'a self, _pool: &'a PoolHandle) -> BoxFuture<'a, Option<usize>> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Box::pin(std::future::ready(*self.connected.lock().unwrap()))
        }
    }

    /// Alert sink that records what it was asked to show.
    pub struct RecordingAlertSink {
        granted: AtomicBool,
        shown: Mutex<Vec<Alert>>,
    }

    impl RecordingAlertSink {
        pub fn new(granted: bool) -> Self {
            Self {
                granted: AtomicBool::new(granted),
                shown: Mutex::new(Vec::new()),
            }
        }

        pub fn shown(&self) -> Vec<Alert> {
            self.shown.lock().unwrap().clone()
        }
    }

    impl AlertSink for RecordingAlertSink {
        fn permission_granted(&self) -> bool {
            self.granted.load(Ordering::SeqCst)
        }

        fn present(&self, alert: &Alert) -> std::result::Result<(), String> {
            self.shown.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr::Keys;

    #[test]
    fn notification_filter_shape() {
        let recipient = Keys::generate().public_key();
        let filter = notification_filter(30078, recipient, Timestamp::from(1_700_000_000));
        let value = serde_json::to_value(&filter).unwrap();

        assert_eq!(value["kinds"], serde_json::json!([30078]));
        assert_eq!(value["#p"], serde_json::json!([recipient.to_hex()]));
        assert_eq!(value["since"], 1_700_000_000);
        assert!(value.get("authors").is_none());
    }

    #[test]
    fn empty_builder_builds_empty_filter() {
        let value = serde_json::to_value(build_filter().build()).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }
}
