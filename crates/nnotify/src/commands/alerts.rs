use anyhow::Result;
use serde::Serialize;

use super::Context;
use crate::output::Output;

#[derive(Serialize)]
struct AlertsResult {
    enabled: bool,
}

/// Turn terminal alerts on or off, or report the current setting.
pub async fn set(enabled: Option<bool>, ctx: &mut Context, output: &Output) -> Result<()> {
    if let Some(enabled) = enabled {
        ctx.config.alerts = enabled;
        ctx.config.save()?;
    }
    output.success(
        "alerts",
        AlertsResult {
            enabled: ctx.config.alerts,
        },
    );
    Ok(())
}
