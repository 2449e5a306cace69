use anyhow::Result;
use nostr_notify::keys::parse_secret_key_input;
use nostr_notify::Identity;
use serde::Serialize;

use super::Context;
use crate::output::Output;

#[derive(Serialize)]
struct LoginResult {
    pubkey: String,
    npub: String,
}

#[derive(Serialize)]
struct WhoamiResult {
    pubkey: String,
    npub: String,
    logged_in: bool,
}

#[derive(Serialize)]
struct KeygenResult {
    private_key: String,
    pubkey: String,
    npub: String,
    saved: bool,
}

/// Login with a private key (nsec or hex)
pub async fn login(key: &str, ctx: &Context, output: &Output) -> Result<()> {
    let key_hex = parse_secret_key_input(key)?;
    let identity = Identity::from_hex(&key_hex)?;
    ctx.settings.save_identity(&identity)?;

    output.success(
        "login",
        LoginResult {
            pubkey: identity.public_key().to_hex(),
            npub: identity.npub(),
        },
    );
    Ok(())
}

/// Forget the stored key. History and relays are kept.
pub async fn logout(ctx: &Context, output: &Output) -> Result<()> {
    ctx.settings.clear_identity()?;
    output.success_message("logout", "Logged out");
    Ok(())
}

/// Show current identity
pub async fn whoami(ctx: &Context, output: &Output) -> Result<()> {
    let result = match ctx.settings.identity() {
        Some(identity) => WhoamiResult {
            pubkey: identity.public_key().to_hex(),
            npub: identity.npub(),
            logged_in: true,
        },
        None => WhoamiResult {
            pubkey: String::new(),
            npub: String::new(),
            logged_in: false,
        },
    };
    output.success("whoami", result);
    Ok(())
}

/// Generate a fresh key, optionally storing it as the identity
pub async fn keygen(save: bool, ctx: &Context, output: &Output) -> Result<()> {
    let identity = Identity::generate();
    if save {
        ctx.settings.save_identity(&identity)?;
    }

    output.success(
        "keygen",
        KeygenResult {
            private_key: identity.secret_hex(),
            pubkey: identity.public_key().to_hex(),
            npub: identity.npub(),
            saved: save,
        },
    );
    Ok(())
}
