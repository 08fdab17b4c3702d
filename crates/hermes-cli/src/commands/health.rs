//! Health command - probe the event stream service

use anyhow::Result;

use hermes_client::HermesClient;

use crate::output::{OutputContext, OutputFormat};

/// Show event-stream health and active connection counts
pub async fn health(client: &HermesClient, ctx: &OutputContext) -> Result<()> {
    let health = client.stream_health().await?;

    match ctx.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        OutputFormat::Text => {
            ctx.print_kv(&[
                ("Status", health.status.clone()),
                (
                    "Active connections",
                    health.active_connections.to_string(),
                ),
            ]);
            let mut channels: Vec<_> = health.channels.iter().collect();
            channels.sort();
            for (channel, count) in channels {
                ctx.info(&format!("  {}: {}", channel, count));
            }
        }
    }

    Ok(())
}
