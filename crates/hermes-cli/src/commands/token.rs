//! Token command - mint a stream token for a channel scope

use anyhow::Result;

use hermes_client::{HermesClient, TokenProvider};
use hermes_core::StreamScope;

use crate::output::{OutputContext, OutputFormat};

/// Mint a stream token and print it
pub async fn token(client: &HermesClient, scope: &str, ttl: u64, ctx: &OutputContext) -> Result<()> {
    let scope: StreamScope = scope.parse()?;
    let token = client.request_token(scope, ttl).await?;

    match ctx.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "token": token.value,
                    "scope": token.scope,
                    "expires_at": token.expires_at,
                    "ttl": token.ttl_seconds,
                })
            );
        }
        OutputFormat::Text => {
            ctx.print_kv(&[
                ("Token", token.value.clone()),
                ("Scope", token.scope.to_string()),
                ("Expires", token.expires_at.to_rfc3339()),
                ("TTL", format!("{}s", token.ttl_seconds)),
            ]);
        }
    }

    Ok(())
}
