use anyhow::Result;
use nostr_notify::{relays, ConfigError, RelayEndpoint};
use serde::Serialize;

use super::Context;
use crate::output::Output;

#[derive(Serialize)]
struct RelayList {
    relays: Vec<RelayEndpoint>,
    ignored: Vec<String>,
}

impl RelayList {
    fn from_text(text: &str) -> Self {
        let ignored = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && RelayEndpoint::parse(line).is_none())
            .map(str::to_string)
            .collect();
        Self {
            relays: relays::dedup(&relays::parse(text)),
            ignored,
        }
    }
}

pub async fn show(ctx: &Context, output: &Output) -> Result<()> {
    let list = RelayList::from_text(&ctx.relays_text()?);
    if output.is_json() {
        output.success("relays", list);
    } else if list.relays.is_empty() {
        println!("No relays configured");
    } else {
        for relay in &list.relays {
            println!("{}", relay);
        }
    }
    Ok(())
}

/// Replace the relay list. Entries may be newline separated or given as
/// separate arguments.
pub async fn set(entries: &[String], ctx: &Context, output: &Output) -> Result<()> {
    let text = entries.join("\n");
    let list = RelayList::from_text(&text);
    if list.relays.is_empty() {
        return Err(ConfigError::NoRelays.into());
    }
    ctx.settings.set_relays_text(&text)?;
    output.success("relays", list);
    Ok(())
}

pub async fn add(url: &str, ctx: &Context, output: &Output) -> Result<()> {
    let relay = RelayEndpoint::parse(url)
        .ok_or_else(|| anyhow::anyhow!("Invalid relay URL: {} (expected ws:// or wss://)", url))?;

    let mut text = ctx.relays_text()?;
    if relays::parse(&text).contains(&relay) {
        output.success_message("relays", &format!("{} already configured", relay));
        return Ok(());
    }
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(relay.as_str());
    ctx.settings.set_relays_text(&text)?;

    output.success_message("relays", &format!("Added {}", relay));
    Ok(())
}
