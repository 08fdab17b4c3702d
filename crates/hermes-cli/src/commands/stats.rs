//! Stats command - follow aggregate statistics updates

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;

use hermes_client::HermesClient;
use hermes_core::{CacheConsumer, MemoryCache, StatsUpdateEvent};

use crate::output::{OutputContext, OutputFormat};

/// Follow the statistics stream until interrupted
pub async fn stats(client: &HermesClient, ctx: &OutputContext) -> Result<()> {
    ctx.info("Watching statistics updates...");
    ctx.info("Press Ctrl+C to stop");

    let cache: Arc<dyn CacheConsumer> = Arc::new(MemoryCache::new());
    let subscription = client.subscribe_stats(cache).await?;
    let mut events = subscription.events();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => print_update(&event, ctx),
                    Err(RecvError::Lagged(skipped)) => {
                        ctx.warn(&format!("Dropped {} events", skipped));
                    }
                    Err(RecvError::Closed) => {
                        ctx.info("Stream closed");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(tokio::time::Duration::from_millis(100)) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }

    subscription.close();
    Ok(())
}

fn print_update(event: &StatsUpdateEvent, ctx: &OutputContext) {
    match ctx.format {
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string(event) {
                println!("{}", json);
            }
        }
        OutputFormat::Text => {
            let mut line = format!("[{}]", event.trigger);
            if let Some(id) = &event.download_id {
                line.push_str(&format!(" {}", id));
            }
            if let Some(ts) = event.timestamp {
                line.push_str(&format!(" at {}", ts.to_rfc3339()));
            }
            ctx.info(&line);
        }
    }
}
