//! WebSocket transport adapter.
//!
//! Default [`TransportFactory`] backed by tokio-tungstenite. Each transport
//! spawns a tokio task that owns the socket and handles:
//!
//! - Connecting to the server URL
//! - Outgoing text frames and close requests from the connection
//! - Incoming text and close frames, forwarded to the [`TransportSink`]

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{ABNORMAL_CLOSURE, Transport, TransportFactory, TransportSink};

// ============================================================================
// Constants
// ============================================================================

/// Close code reported when a close frame carries no status.
const NO_STATUS_RECEIVED: u16 = 1005;

// ============================================================================
// WebSocketCommand
// ============================================================================

/// Internal commands for the socket task.
enum WebSocketCommand {
    /// Send a text frame.
    Send(String),
    /// Send a close frame and stop.
    Close { code: u16, reason: String },
}

// ============================================================================
// WebSocketFactory
// ============================================================================

/// Opens tokio-tungstenite WebSocket transports.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketFactory;

impl TransportFactory for WebSocketFactory {
    fn open(&self, url: &Url, sink: TransportSink) -> Result<Box<dyn Transport>> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::connection(format!("WebSocket transport needs a tokio runtime: {e}")))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        runtime.spawn(run_socket(url.to_string(), command_rx, sink));

        debug!(%url, "Created a new WebSocket");

        Ok(Box::new(WebSocketTransport { command_tx }))
    }
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Handle to a socket task created by [`WebSocketFactory`].
pub struct WebSocketTransport {
    command_tx: mpsc::UnboundedSender<WebSocketCommand>,
}

impl Transport for WebSocketTransport {
    fn send(&mut self, data: String) -> Result<()> {
        self.command_tx
            .send(WebSocketCommand::Send(data))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&mut self, code: u16, reason: &str) {
        let _ = self.command_tx.send(WebSocketCommand::Close {
            code,
            reason: reason.to_string(),
        });
    }
}

// ============================================================================
// Socket Task
// ============================================================================

/// Owns one WebSocket from connect to close.
async fn run_socket(
    url: String,
    mut command_rx: mpsc::UnboundedReceiver<WebSocketCommand>,
    sink: TransportSink,
) {
    let connect = connect_async(url.as_str());
    tokio::pin!(connect);

    let ws_stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((ws_stream, _)) => break ws_stream,
                Err(e) => {
                    warn!(%url, error = %e, "WebSocket failed to connect");
                    sink.closed(ABNORMAL_CLOSURE, e.to_string());
                    return;
                }
            },

            command = command_rx.recv() => match command {
                Some(WebSocketCommand::Send(_)) => {
                    warn!("Dropping frame sent before the WebSocket opened");
                }
                Some(WebSocketCommand::Close { .. }) | None => {
                    debug!(%url, "WebSocket closed before it opened");
                    return;
                }
            },
        }
    };

    debug!(%url, "WebSocket opened");
    if !sink.open() {
        return;
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // Incoming frames from the server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(%text, "Incoming frame");
                        if !sink.message(text.as_str()) {
                            let _ = ws_write.close().await;
                            break;
                        }
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                            .unwrap_or((NO_STATUS_RECEIVED, String::new()));
                        debug!(code, %reason, "WebSocket closed by remote");
                        sink.closed(code, reason);
                        break;
                    }

                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        sink.closed(ABNORMAL_CLOSURE, e.to_string());
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        sink.closed(ABNORMAL_CLOSURE, "WebSocket stream ended");
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Commands from the connection
            command = command_rx.recv() => {
                match command {
                    Some(WebSocketCommand::Send(data)) => {
                        trace!(%data, "Outgoing frame");
                        if let Err(e) = ws_write.send(Message::Text(data.into())).await {
                            warn!(error = %e, "Failed to send frame");
                            sink.closed(ABNORMAL_CLOSURE, e.to_string());
                            break;
                        }
                    }

                    Some(WebSocketCommand::Close { code, reason }) => {
                        debug!(code, %reason, "Closing WebSocket");
                        let frame = CloseFrame {
                            code: code.into(),
                            reason: reason.into(),
                        };
                        let _ = ws_write.send(Message::Close(Some(frame))).await;
                        break;
                    }

                    None => {
                        debug!("Transport handle dropped");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    debug!(%url, "WebSocket task terminated");
}

// ============================================================================
// Tests
// ============================================================================
