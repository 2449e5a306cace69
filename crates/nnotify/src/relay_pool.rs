use futures_util::future::BoxFuture;
use nostr::Filter;
use nostr_notify::{
    Error, InboundEvent, NotificationSender, PoolHandle, PoolNotification, RelayEndpoint,
    RelayPool, Result, SubscriptionHandle,
};
use nostr_sdk::prelude::{
    Client, RelayMessage, RelayPoolNotification, RelayStatus, SubscriptionId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// [`RelayPool`] backed by one `nostr_sdk::Client` per open pool.
#[derive(Default)]
pub struct SdkRelayPool {
    next_id: AtomicU64,
    clients: Mutex<HashMap<u64, Client>>,
    forwarders: Mutex<HashMap<SubscriptionHandle, (u64, JoinHandle<()>)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SdkRelayPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self, pool: &PoolHandle) -> Result<Client> {
        lock(&self.clients)
            .get(&pool.id())
            .cloned()
            .ok_or_else(|| Error::Pool(format!("pool {} is not open", pool.id())))
    }

    async fn open(&self, relays: &[RelayEndpoint]) -> Result<PoolHandle> {
        let client = Client::default();
        let mut added = Vec::new();
        for relay in relays {
            match client.add_relay(relay.as_str()).await {
                Ok(_) => added.push(relay.clone()),
                Err(e) => tracing::warn!(relay = %relay, error = %e, "skipping relay"),
            }
        }
        if added.is_empty() {
            return Err(Error::Pool("no usable relays".to_string()));
        }
        client.connect().await;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.clients).insert(id, client);
        tracing::debug!(pool = id, relays = added.len(), "relay pool opened");
        Ok(PoolHandle::new(id, added))
    }

    async fn subscribe_inner(
        &self,
        pool: &PoolHandle,
        filter: Filter,
        sink: NotificationSender,
    ) -> Result<SubscriptionHandle> {
        let client = self.client(pool)?;
        // Taken before subscribing so nothing sent in between is missed.
        let mut notifications = client.notifications();
        let output = client
            .subscribe(filter, None)
            .await
            .map_err(|e| Error::Pool(e.to_string()))?;
        let subscription_id = output.val;
        let handle = SubscriptionHandle(subscription_id.to_string());

        let forwarder = tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(notification) => match map_notification(notification, &subscription_id) {
                        Mapped::Forward(n) => {
                            if sink.send(n).is_err() {
                                break;
                            }
                        }
                        Mapped::Skip => {}
                        Mapped::Shutdown => break,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "relay notifications lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        lock(&self.forwarders).insert(handle.clone(), (pool.id(), forwarder));
        Ok(handle)
    }

    async fn unsubscribe(&self, pool: &PoolHandle, subscription: SubscriptionHandle) {
        if let Some((_, forwarder)) = lock(&self.forwarders).remove(&subscription) {
            forwarder.abort();
        }
        if let Ok(client) = self.client(pool) {
            client.unsubscribe(&SubscriptionId::new(subscription.0)).await;
        }
    }

    async fn close(&self, pool: PoolHandle) {
        lock(&self.forwarders).retain(|_, (pool_id, forwarder)| {
            if *pool_id == pool.id() {
                forwarder.abort();
                false
            } else {
                true
            }
        });
        let client = lock(&self.clients).remove(&pool.id());
        if let Some(client) = client {
            client.disconnect().await;
            tracing::debug!(pool = pool.id(), "relay pool closed");
        }
    }

    async fn connected(&self, pool: &PoolHandle) -> Option<usize> {
        let client = self.client(pool).ok()?;
        let relays = client.relays().await;
        Some(
            relays
                .values()
                .filter(|r| r.status() == RelayStatus::Connected)
                .count(),
        )
    }
}

impl RelayPool for SdkRelayPool {
    fn open_pool<'a>(&'a self, relays: &'a [RelayEndpoint]) -> BoxFuture<'a, Result<PoolHandle>> {
        Box::pin(self.open(relays))
    }

    fn subscribe<'a>(
        &'a self,
        pool: &'a PoolHandle,
        filter: Filter,
        sink: NotificationSender,
    ) -> BoxFuture<'a, Result<SubscriptionHandle>> {
        Box::pin(self.subscribe_inner(pool, filter, sink))
    }

    fn close_subscription<'a>(
        &'a self,
        pool: &'a PoolHandle,
        subscription: SubscriptionHandle,
    ) -> BoxFuture<'a, ()> {
        Box::pin(self.unsubscribe(pool, subscription))
    }

    fn close_pool(&self, pool: PoolHandle) -> BoxFuture<'_, ()> {
        Box::pin(self.close(pool))
    }

    fn connected_relays<'a>(&'a self, pool: &'a PoolHandle) -> BoxFuture<'a, Option<usize>> {
        Box::pin(self.connected(pool))
    }
}

#[derive(Debug)]
enum Mapped {
    Forward(PoolNotification),
    Skip,
    Shutdown,
}

fn map_notification(notification: RelayPoolNotification, subscription_id: &SubscriptionId) -> Mapped {
    let ours = |id: &dyn std::fmt::Display| id.to_string() == subscription_id.to_string();
    match notification {
        RelayPoolNotification::Event {
            relay_url,
            subscription_id: id,
            event,
        } if ours(&id) => Mapped::Forward(PoolNotification::Event {
            relay: Some(relay_url.to_string()),
            event: InboundEvent::from(&*event),
        }),
        RelayPoolNotification::Message { relay_url, message } => match message {
            RelayMessage::EndOfStoredEvents(id) if ours(&id) => {
                Mapped::Forward(PoolNotification::EndOfStoredEvents {
                    relay: relay_url.to_string(),
                })
            }
            RelayMessage::Closed {
                subscription_id: id,
                message,
            } if ours(&id) => Mapped::Forward(PoolNotification::Closed {
                relay: Some(relay_url.to_string()),
                reason: message.to_string(),
            }),
            _ => Mapped::Skip,
        },
        RelayPoolNotification::Shutdown => Mapped::Shutdown,
        _ => Mapped::Skip,
    }
}
