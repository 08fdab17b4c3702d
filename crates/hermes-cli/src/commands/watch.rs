//! Watch command - follow one download's progress in real time

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;

use hermes_client::HermesClient;
use hermes_core::{
    CacheConsumer, DownloadProgressEvent, DownloadStatus, MemoryCache, MonotonicProgress,
};

use crate::output::{format_bytes, format_eta, format_speed, OutputContext, OutputFormat};

/// Follow a download's progress stream until it reaches a terminal state
pub async fn watch(client: &HermesClient, download_id: &str, ctx: &OutputContext) -> Result<()> {
    ctx.info(&format!("Watching download {}...", download_id));
    ctx.info("Press Ctrl+C to stop");

    let cache: Arc<dyn CacheConsumer> = Arc::new(MemoryCache::new());
    let subscription = client.subscribe_download(download_id, cache).await?;
    let mut events = subscription.events();

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut smoother = MonotonicProgress::new();

    while running.load(Ordering::SeqCst) {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        smoother.observe(event.status, event.percentage());
                        print_progress(&event, &smoother, ctx);

                        if event.status.is_terminal() {
                            match event.status {
                                DownloadStatus::Completed => ctx.success("Download complete"),
                                DownloadStatus::Failed => ctx.error(&format!(
                                    "Download failed: {}",
                                    event.error.as_deref().unwrap_or("unknown error")
                                )),
                                _ => ctx.info("Download cancelled"),
                            }
                            break;
                        }
                    }
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
                // Check running flag periodically
                if !running.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }

    subscription.close();
    Ok(())
}

/// Print a progress event in the appropriate format
fn print_progress(event: &DownloadProgressEvent, smoother: &MonotonicProgress, ctx: &OutputContext) {
    match ctx.format {
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string(event) {
                println!("{}", json);
            }
        }
        OutputFormat::Text => {
            let mut line = format!("[{}]", event.status);

            if let Some(percentage) = smoother.display(event.status) {
                line.push_str(&format!(" {:5.1}%", percentage));
            }
            if let Some(progress) = &event.progress {
                if let (Some(done), Some(total)) =
                    (progress.downloaded_bytes, progress.total_bytes)
                {
                    line.push_str(&format!(" {}/{}", format_bytes(done), format_bytes(total)));
                }
                if let Some(speed) = progress.speed {
                    line.push_str(&format!(" @ {}", format_speed(speed)));
                }
                if let Some(eta) = progress.eta {
                    line.push_str(&format!(" ETA {}", format_eta(eta)));
                }
            }
            if let Some(name) = &event.current_filename {
                line.push_str(&format!("  {}", name));
            }
            if let Some(message) = &event.message {
                line.push_str(&format!("  ({})", message));
            }

            ctx.info(&line);
        }
    }
}
