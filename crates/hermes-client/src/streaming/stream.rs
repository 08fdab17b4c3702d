//! Reconnecting event stream
//!
//! One task owns every piece of mutable connection state. The handle talks
//! to it over an unbounded command channel and observes it through a watch
//! channel; dropping the handle closes the command channel, which the task
//! treats as a close.

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use super::parser::{SseFrame, SseParser};
use super::types::{
    backoff_delay, ConnectionPhase, EventHandler, StreamError, StreamMessage, StreamOptions,
    StreamResult, StreamState,
};

enum Command {
    Connect(Url),
    Reconnect,
    Close,
}

/// Handle to a reconnecting SSE connection.
///
/// The connection survives transient failures with capped exponential
/// backoff and stops permanently on authentication failures or an exhausted
/// reconnect budget; [`reconnect`](Self::reconnect) always resumes it.
/// Dropping the handle closes the connection.
pub struct EventStream {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<StreamState>,
}

impl EventStream {
    /// Open an event stream.
    ///
    /// With `url == None` the stream stays idle until [`set_url`](Self::set_url)
    /// provides one; no transport is opened. The handler runs on the stream
    /// task for every accepted message, after heartbeat and event-name
    /// filtering.
    pub fn open(http: Client, url: Option<Url>, options: StreamOptions, handler: EventHandler) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(StreamState::default());

        let actor = StreamActor {
            http,
            url,
            options,
            handler,
            state_tx,
            commands: command_rx,
            attempts: 0,
            close_notified: false,
        };
        tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            state: state_rx,
        }
    }

    /// Snapshot of the current stream state
    pub fn state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    /// Watch channel receiver for state changes
    pub fn watch(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Whether the transport is currently live
    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    /// Whether a reconnect is pending
    pub fn is_reconnecting(&self) -> bool {
        self.state.borrow().is_reconnecting()
    }

    /// Set or replace the stream URL and connect to it.
    ///
    /// Tears down any live transport first and resets the attempt counter.
    pub fn set_url(&self, url: Url) {
        let _ = self.commands.send(Command::Connect(url));
    }

    /// Reconnect immediately, bypassing any pending backoff delay.
    ///
    /// Resets the attempt counter and works even after a terminal error.
    pub fn reconnect(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Close the stream. Idempotent; cancels a pending backoff delay and
    /// tears down the live transport.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }
}

enum Flow {
    Continue,
    Exit,
}

enum Pump {
    Exit,
    Restart,
    Failed(StreamError),
}

struct StreamActor {
    http: Client,
    url: Option<Url>,
    options: StreamOptions,
    handler: EventHandler,
    state_tx: watch::Sender<StreamState>,
    commands: mpsc::UnboundedReceiver<Command>,
    /// Reconnect attempts made since the last successful open
    attempts: u32,
    /// Whether on_close already fired for the current outage
    close_notified: bool,
}

impl StreamActor {
    async fn run(mut self) {
        loop {
            let Some(url) = self.url.clone() else {
                // No URL means no transport; park until a command arrives
                match self.idle().await {
                    Flow::Exit => break,
                    Flow::Continue => continue,
                }
            };

            self.state_tx
                .send_modify(|s| s.phase = ConnectionPhase::Connecting);
            debug!("Connecting to event stream: {}", url);

            match self.connect(&url).await {
                Ok(response) => {
                    self.attempts = 0;
                    self.close_notified = false;
                    self.state_tx.send_modify(|s| {
                        s.phase = ConnectionPhase::Open;
                        s.error = None;
                        s.reconnect_attempts = 0;
                    });
                    if let Some(hook) = &self.options.on_open {
                        hook();
                    }

                    match self.pump(response).await {
                        Pump::Exit => break,
                        Pump::Restart => continue,
                        Pump::Failed(err) => match self.handle_failure(err).await {
                            Flow::Exit => break,
                            Flow::Continue => continue,
                        },
                    }
                }
                Err(err) => match self.handle_failure(err).await {
                    Flow::Exit => break,
                    Flow::Continue => continue,
                },
            }
        }

        self.state_tx
            .send_modify(|s| s.phase = ConnectionPhase::Closed);
        if !self.close_notified {
            if let Some(hook) = &self.options.on_close {
                hook();
            }
        }
        debug!("Event stream closed");
    }

    /// Open the HTTP transport and classify failures
    async fn connect(&mut self, url: &Url) -> StreamResult<reqwest::Response> {
        let response = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| StreamError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StreamError::AuthenticationFailed {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StreamError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Read the live transport until it fails or a command interrupts.
    ///
    /// Returning drops the byte stream, so a new connect never overlaps the
    /// previous transport.
    async fn pump(&mut self, response: reqwest::Response) -> Pump {
        let mut bytes = response.bytes_stream();
        let mut parser = SseParser::new();

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    return match self.apply_command(cmd) {
                        Flow::Exit => Pump::Exit,
                        Flow::Continue => Pump::Restart,
                    };
                }
                chunk = bytes.next() => match chunk {
                    Some(Ok(data)) => {
                        for frame in parser.feed(data) {
                            self.handle_frame(frame);
                        }
                    }
                    Some(Err(e)) => return Pump::Failed(StreamError::Connection(e.to_string())),
                    None => return Pump::Failed(StreamError::Connection("stream ended".into())),
                },
            }
        }
    }

    /// Filter and decode one frame, update state, and invoke the handler
    fn handle_frame(&mut self, frame: SseFrame) {
        // Empty or whitespace-only payloads are heartbeats
        if frame.data.trim().is_empty() {
            return;
        }

        if self.options.events.is_empty() {
            // Generic consumption mirrors EventSource onmessage: only
            // unnamed messages (and the default "message" name) qualify
            if matches!(frame.event.as_deref(), Some(name) if name != "message") {
                return;
            }
        } else {
            let name = frame.event.as_deref().unwrap_or("");
            if !self.options.events.iter().any(|e| e == name) {
                return;
            }
        }

        match serde_json::from_str::<serde_json::Value>(&frame.data) {
            Ok(value) => {
                self.state_tx
                    .send_modify(|s| s.data = Some(value.clone()));
                (self.handler)(StreamMessage {
                    event: frame.event,
                    data: value,
                });
            }
            Err(e) => {
                // Parse failures never touch state or the connection
                warn!("Failed to parse event payload: {}", e);
            }
        }
    }

    /// Decide what a connection failure means: stop for good, or schedule
    /// one reconnect attempt with backoff
    async fn handle_failure(&mut self, err: StreamError) -> Flow {
        if let Some(hook) = &self.options.on_error {
            hook(&err);
        }

        if err.is_terminal() {
            warn!("Event stream stopped: {}", err);
            self.give_up(err);
            return self.idle().await;
        }

        if !self.options.reconnect {
            warn!("Event stream error with reconnection disabled: {}", err);
            self.give_up(err);
            return self.idle().await;
        }

        let max = self.options.max_reconnect_attempts;
        if max != 0 && self.attempts >= max {
            let exhausted = StreamError::MaxAttemptsExceeded {
                attempts: self.attempts,
            };
            warn!("Event stream gave up: {}", exhausted);
            if let Some(hook) = &self.options.on_error {
                hook(&exhausted);
            }
            self.give_up(exhausted);
            return self.idle().await;
        }

        self.attempts += 1;
        let delay = backoff_delay(
            self.attempts,
            self.options.reconnect_delay,
            self.options.max_reconnect_delay,
        );
        debug!(
            "Reconnect attempt {} in {:?} after: {}",
            self.attempts, delay, err
        );
        let attempts = self.attempts;
        self.state_tx.send_modify(|s| {
            s.phase = ConnectionPhase::Reconnecting;
            s.error = Some(err);
            s.reconnect_attempts = attempts;
        });

        // Dropping the sleep future is the backoff cancellation
        tokio::select! {
            _ = sleep(delay) => Flow::Continue,
            cmd = self.commands.recv() => self.apply_command(cmd),
        }
    }

    /// Record a permanent stop and fire on_close once per outage
    fn give_up(&mut self, err: StreamError) {
        let attempts = self.attempts;
        self.state_tx.send_modify(|s| {
            s.phase = ConnectionPhase::Failed;
            s.error = Some(err);
            s.reconnect_attempts = attempts;
        });
        if !self.close_notified {
            self.close_notified = true;
            if let Some(hook) = &self.options.on_close {
                hook();
            }
        }
    }

    /// Park until the next command
    async fn idle(&mut self) -> Flow {
        let cmd = self.commands.recv().await;
        self.apply_command(cmd)
    }

    fn apply_command(&mut self, cmd: Option<Command>) -> Flow {
        match cmd {
            // A dropped handle reads as close
            None | Some(Command::Close) => Flow::Exit,
            Some(Command::Reconnect) => {
                self.attempts = 0;
                Flow::Continue
            }
            Some(Command::Connect(url)) => {
                self.url = Some(url);
                self.attempts = 0;
                Flow::Continue
            }
        }
    }
}
