use anyhow::Result;
use nostr_notify::{format_uptime, now_millis, Notification};
use serde::Serialize;

use super::Context;
use crate::output::{render_notification, Output};

#[derive(Serialize)]
struct HistoryResult {
    notifications: Vec<Notification>,
    total: usize,
}

/// Stored notifications, newest first
pub async fn history(limit: usize, ctx: &Context, output: &Output) -> Result<()> {
    let all = ctx.controller().history();
    let total = all.len();
    let notifications: Vec<Notification> = all.into_iter().take(limit).collect();

    if output.is_json() {
        output.success("history", HistoryResult { notifications, total });
        return Ok(());
    }

    if notifications.is_empty() {
        println!("No notifications yet");
        return Ok(());
    }
    let now = now_millis();
    for notification in &notifications {
        println!("{}", render_notification(notification, now));
    }
    if total > notifications.len() {
        println!("({} of {} shown)", notifications.len(), total);
    }
    Ok(())
}

pub async fn clear(ctx: &Context, output: &Output) -> Result<()> {
    ctx.controller().clear_history()?;
    output.success_message("clear", "History cleared");
    Ok(())
}

/// Stats outside of a session: only the stored notification count is live.
pub async fn stats(ctx: &Context, output: &Output) -> Result<()> {
    let stats = ctx.controller().stats();
    if output.is_json() {
        output.success("stats", stats);
    } else {
        println!("Status:              {}", stats.status);
        println!("Connected relays:    {}", stats.connected_relays);
        println!("Total notifications: {}", stats.total_notifications);
        println!("Uptime:              {}", format_uptime(stats.uptime));
    }
    Ok(())
}

pub async fn test_alert(ctx: &Context, output: &Output) -> Result<()> {
    if ctx.controller().alerts().test_alert() {
        output.success_message("test-alert", "Test alert shown");
    } else {
        output.success_message(
            "test-alert",
            "Alerts are disabled. Enable them with `nnotify alerts on`",
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use nostr::nips::nip44;
    use nostr::{EventBuilder, Keys, Kind, Tag};
    use nostr_notify::{Identity, InboundEvent, NOTIFICATION_EVENT_KIND};

    fn encrypted_event(recipient: &Identity, payload: &str) -> InboundEvent {
        let sender = Keys::generate();
        let content = nip44::encrypt(
            sender.secret_key(),
            &recipient.public_key(),
            payload,
            nip44::Version::V2,
        )
        .unwrap();
        let event = EventBuilder::new(Kind::Custom(NOTIFICATION_EVENT_KIND), content)
            .tag(Tag::public_key(recipient.public_key()))
            .sign_with_keys(&sender)
            .unwrap();
        InboundEvent::from(&event)
    }

    #[tokio::test]
    async fn history_and_clear() {
        let (_temp, mut ctx) = context();
        ctx.config.alerts = false;
        let output = Output::new(true);
        let identity = Identity::generate();

        let controller = ctx.controller();
        for i in 0..3 {
            let event = encrypted_event(&identity, &format!(r#"{{"message":"m{}"}}"#, i));
            controller.process_event(&identity, &event).unwrap();
        }

        history(2, &ctx, &output).await.unwrap();
        assert_eq!(ctx.controller().history().len(), 3);

        clear(&ctx, &output).await.unwrap();
        assert!(ctx.controller().history().is_empty());
    }

    #[tokio::test]
    async fn stats_counts_stored_notifications() {
        let (_temp, mut ctx) = context();
        ctx.config.alerts = false;
        let identity = Identity::generate();

        let event = encrypted_event(&identity, r#"{"message":"hello"}"#);
        ctx.controller().process_event(&identity, &event).unwrap();

        let stats = ctx.controller().stats();
        assert_eq!(stats.total_notifications, 1);
        assert_eq!(stats.connected_relays, 0);
        super::stats(&ctx, &Output::new(false)).await.unwrap();
    }

    #[tokio::test]
    async fn test_alert_respects_config() {
        let (_temp, mut ctx) = context();
        ctx.config.alerts = false;
        assert!(!ctx.controller().alerts().test_alert());
        test_alert(&ctx, &Output::new(true)).await.unwrap();
    }
}
