//! Subscription lifecycle and the per-event ingestion pipeline.
//!
//! A [`SubscriptionController`] owns at most one live session. Starting a
//! session opens the relay pool, subscribes to notification events addressed
//! to the identity, and spawns three tasks:
//!
//! - dispatch: reads [`PoolNotification`]s and runs the decrypt → normalize →
//!   store → alert pipeline for each event on the blocking pool, so storage
//!   I/O never runs on an async worker
//! - health poll: refreshes the connected relay count on a fixed interval
//! - uptime: broadcasts elapsed session time for display
//!
//! `stop` aborts and joins all three before returning, then closes the
//! subscription and pool.

use nostr::Timestamp;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::pool::{notification_filter, NotificationReceiver, PoolHandle, SubscriptionHandle};
use crate::stats::SessionView;
use crate::types::{
    HEALTH_POLL_INTERVAL, HISTORY_CAPACITY, NOTIFICATION_EVENT_KIND, UPTIME_TICK_INTERVAL,
};
use crate::{
    normalize, relays, AlertDispatcher, ConfigError, DecryptionEngine, HistoryStore, Identity,
    InboundEvent, Notification, PersistenceFailure, PoolNotification, RelayEndpoint, RelayPool,
    Result, Stats, StatsAggregator, Status, StorageAdapter,
};

const MIN_INTERVAL: Duration = Duration::from_millis(10);
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub health_poll_interval: Duration,
    pub uptime_tick_interval: Duration,
    pub history_capacity: usize,
    pub event_kind: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            health_poll_interval: HEALTH_POLL_INTERVAL,
            uptime_tick_interval: UPTIME_TICK_INTERVAL,
            history_capacity: HISTORY_CAPACITY,
            event_kind: NOTIFICATION_EVENT_KIND,
        }
    }
}

/// Updates for UI collaborators.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    NotificationReceived(Notification),
    StatusChanged(Status),
    Uptime(Duration),
    EventFailed { event_id: String, error: String },
}

struct SessionState {
    status: Status,
    connected_relays: usize,
    started_at: Option<Instant>,
}

struct ActiveSession {
    pool: PoolHandle,
    subscription: SubscriptionHandle,
    tasks: Vec<JoinHandle<()>>,
}

/// State reachable from spawned tasks.
struct Shared {
    state: Mutex<SessionState>,
    history: Mutex<HistoryStore>,
    events: broadcast::Sender<ControllerEvent>,
    decryptor: DecryptionEngine,
    alerts: AlertDispatcher,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn emit(&self, event: ControllerEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn set_status(&self, status: Status) {
        let changed = {
            let mut state = lock(&self.state);
            let changed = state.status != status;
            state.status = status;
            changed
        };
        if changed {
            tracing::info!(%status, "subscription status changed");
            self.emit(ControllerEvent::StatusChanged(status));
        }
    }

    fn update_connected(&self, connected: usize) {
        let status = {
            let mut state = lock(&self.state);
            if state.status == Status::Disconnected {
                return;
            }
            state.connected_relays = connected;
            if connected > 0 {
                Status::Connected
            } else {
                Status::Connecting
            }
        };
        self.set_status(status);
    }

    fn process_event(&self, identity: &Identity, event: &InboundEvent) -> Result<Option<Notification>> {
        let decrypted = self
            .decryptor
            .decrypt(&event.content, &event.pubkey, identity)?;
        let notification = normalize(&decrypted.plaintext, event)?;

        let inserted = match lock(&self.history).insert(notification.clone()) {
            Ok(inserted) => inserted,
            Err(e) => {
                tracing::warn!(error = %e, "notification kept in memory only");
                true
            }
        };
        if !inserted {
            tracing::debug!(id = %notification.id, "duplicate notification ignored");
            return Ok(None);
        }

        tracing::info!(
            id = %notification.id,
            scheme = %decrypted.scheme,
            priority = %notification.level(),
            "notification received"
        );
        self.alerts.dispatch(&notification);
        self.emit(ControllerEvent::NotificationReceived(notification.clone()));
        Ok(Some(notification))
    }

    fn handle_event(&self, identity: &Identity, event: InboundEvent) {
        if let Err(e) = self.process_event(identity, &event) {
            let event_id = event.id.to_hex();
            tracing::warn!(%event_id, from = %event.pubkey, error = %e, "failed to process notification");
            self.emit(ControllerEvent::EventFailed {
                event_id,
                error: e.to_string(),
            });
        }
    }
}

pub struct SubscriptionController {
    pool: Arc<dyn RelayPool>,
    shared: Arc<Shared>,
    config: ControllerConfig,
    session: tokio::sync::Mutex<Option<ActiveSession>>,
}

impl SubscriptionController {
    pub fn new(
        pool: Arc<dyn RelayPool>,
        storage: Arc<dyn StorageAdapter>,
        decryptor: DecryptionEngine,
        alerts: AlertDispatcher,
        config: ControllerConfig,
    ) -> Self {
        let history = HistoryStore::load(storage, config.history_capacity);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            state: Mutex::new(SessionState {
                status: Status::Disconnected,
                connected_relays: 0,
                started_at: None,
            }),
            history: Mutex::new(history),
            events,
            decryptor,
            alerts,
        });

        Self {
            pool,
            shared,
            config,
            session: tokio::sync::Mutex::new(None),
        }
    }

    /// Start a live session for `identity` on `relays`, replacing any active
    /// one. Only events created from now on are delivered.
    pub async fn start(&self, identity: Option<&Identity>, relays: &[RelayEndpoint]) -> Result<()> {
        if relays.is_empty() {
            return Err(ConfigError::NoRelays.into());
        }
        let identity = identity.ok_or(ConfigError::NoIdentity)?.clone();

        let mut session = self.session.lock().await;
        if let Some(active) = session.take() {
            tracing::info!("replacing active subscription");
            self.teardown(active).await;
        }

        let relays = relays::dedup(relays);
        {
            let mut state = lock(&self.shared.state);
            state.started_at = Some(Instant::now());
            state.connected_relays = 0;
        }
        self.shared.set_status(Status::Connecting);

        let pool = match self.pool.open_pool(&relays).await {
            Ok(pool) => pool,
            Err(e) => {
                self.reset_state();
                return Err(e);
            }
        };

        let filter = notification_filter(
            self.config.event_kind,
            identity.public_key(),
            Timestamp::now(),
        );
        tracing::info!(
            relays = relays.len(),
            recipient = %identity.public_key(),
            "subscribing to notifications"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = match self.pool.subscribe(&pool, filter, tx).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.pool.close_pool(pool).await;
                self.reset_state();
                return Err(e);
            }
        };

        let tasks = vec![
            self.spawn_dispatch(identity, rx),
            self.spawn_health_poll(pool.clone(), relays.len()),
            self.spawn_uptime(),
        ];

        *session = Some(ActiveSession {
            pool,
            subscription,
            tasks,
        });
        Ok(())
    }

    /// End the active session. Safe to call when nothing is running.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        match session.take() {
            Some(active) => {
                self.teardown(active).await;
                tracing::info!("stopped listening");
            }
            None => self.reset_state(),
        }
    }

    pub fn status(&self) -> Status {
        lock(&self.shared.state).status
    }

    pub fn stats(&self) -> Stats {
        let view = {
            let state = lock(&self.shared.state);
            SessionView {
                status: state.status,
                connected_relays: state.connected_relays,
                started_at: state.started_at.map(Instant::into_std),
            }
        };
        let history_len = lock(&self.shared.history).len();
        StatsAggregator::project(&view, history_len, Instant::now().into_std())
    }

    /// Stored notifications, newest first.
    pub fn history(&self) -> Vec<Notification> {
        lock(&self.shared.history).all().to_vec()
    }

    pub fn clear_history(&self) -> std::result::Result<(), PersistenceFailure> {
        lock(&self.shared.history).clear()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.shared.events.subscribe()
    }

    /// Run one event through the pipeline outside of a session. Returns the
    /// stored notification, or `None` for a duplicate.
    pub fn process_event(
        &self,
        identity: &Identity,
        event: &InboundEvent,
    ) -> Result<Option<Notification>> {
        self.shared.process_event(identity, event)
    }

    pub fn alerts(&self) -> &AlertDispatcher {
        &self.shared.alerts
    }

    async fn teardown(&self, active: ActiveSession) {
        for task in &active.tasks {
            task.abort();
        }
        for task in active.tasks {
            // Cancelled is the expected outcome.
            let _ = task.await;
        }
        self.pool
            .close_subscription(&active.pool, active.subscription)
            .await;
        self.pool.close_pool(active.pool).await;
        self.reset_state();
    }

    fn reset_state(&self) {
        {
            let mut state = lock(&self.shared.state);
            state.connected_relays = 0;
            state.started_at = None;
        }
        self.shared.set_status(Status::Disconnected);
    }

    fn spawn_dispatch(&self, identity: Identity, mut rx: NotificationReceiver) -> JoinHandle<()> {
        let shared = self.shared.clone();
        let identity = Arc::new(identity);
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                match notification {
                    PoolNotification::Event { event, relay } => {
                        tracing::debug!(id = %event.id, relay = ?relay, "event received");
                        let shared = shared.clone();
                        let identity = identity.clone();
                        // Decrypt and the history snapshot write block.
                        tokio::task::spawn_blocking(move || {
                            shared.handle_event(&identity, event);
                        });
                    }
                    PoolNotification::EndOfStoredEvents { relay } => {
                        tracing::debug!(%relay, "end of stored events");
                    }
                    PoolNotification::Closed { relay, reason } => {
                        tracing::info!(relay = ?relay, %reason, "subscription closed by relay");
                    }
                }
            }
            tracing::debug!("pool notification channel closed");
        })
    }

    fn spawn_health_poll(&self, pool_handle: PoolHandle, configured: usize) -> JoinHandle<()> {
        let shared = self.shared.clone();
        let pool = self.pool.clone();
        let period = self.config.health_poll_interval.max(MIN_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Without a liveness signal, assume every configured relay is up.
                let connected = pool
                    .connected_relays(&pool_handle)
                    .await
                    .unwrap_or(configured);
                shared.update_connected(connected);
            }
        })
    }

    fn spawn_uptime(&self) -> JoinHandle<()> {
        let shared = self.shared.clone();
        let period = self.config.uptime_tick_interval.max(MIN_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let started_at = lock(&shared.state).started_at;
                if let Some(started_at) = started_at {
                    shared.emit(ControllerEvent::Uptime(started_at.elapsed()));
                }
            }
        })
    }
}
