use anyhow::Result;
use nostr_notify::{
    now_millis, ControllerEvent, Identity, RelayEndpoint, Status, SubscriptionController,
};
use serde::Serialize;
use std::future::Future;
use tokio::sync::broadcast::error::RecvError;

use super::Context;
use crate::output::Output;

#[derive(Serialize)]
struct ListeningInfo {
    pubkey: String,
    npub: String,
    relays: Vec<RelayEndpoint>,
}

#[derive(Serialize)]
struct FailedEvent<'a> {
    event_id: &'a str,
    error: &'a str,
}

/// Listen for notifications until Ctrl+C
pub async fn listen(ctx: &Context, output: &Output) -> Result<()> {
    let controller = ctx.controller();
    let identity = ctx.settings.identity();
    let relays = ctx.relays()?;

    run_session(
        &controller,
        identity.as_ref(),
        &relays,
        async {
            // An error here means no handler could be installed; stop either way.
            let _ = tokio::signal::ctrl_c().await;
        },
        output,
    )
    .await?;
    Ok(())
}

/// Run one session until `shutdown` resolves. Returns the number of
/// notifications received.
pub(crate) async fn run_session(
    controller: &SubscriptionController,
    identity: Option<&Identity>,
    relays: &[RelayEndpoint],
    shutdown: impl Future<Output = ()>,
    output: &Output,
) -> Result<usize> {
    let mut events = controller.subscribe_events();
    controller.start(identity, relays).await?;

    if let Some(identity) = identity {
        let info = ListeningInfo {
            pubkey: identity.public_key().to_hex(),
            npub: identity.npub(),
            relays: relays.to_vec(),
        };
        if output.is_json() {
            output.event("listening", info);
        } else {
            eprintln!(
                "Listening for notifications to {} on {} relay(s). Press Ctrl+C to stop.",
                info.npub,
                info.relays.len()
            );
        }
    }

    tokio::pin!(shutdown);
    let mut received = 0;
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Ok(ControllerEvent::NotificationReceived(notification)) => {
                    received += 1;
                    output.notification(&notification, now_millis());
                }
                Ok(ControllerEvent::StatusChanged(status)) => {
                    if output.is_json() {
                        output.event("status", status);
                    } else if status != Status::Disconnected {
                        eprintln!("Status: {}", status);
                    }
                }
                Ok(ControllerEvent::EventFailed { event_id, error }) => {
                    if output.is_json() {
                        output.event("error", FailedEvent { event_id: &event_id, error: &error });
                    }
                }
                Ok(ControllerEvent::Uptime(_)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "listener fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown => break,
        }
    }

    controller.stop().await;
    Ok(received)
}
