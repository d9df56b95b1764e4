//! Socket.IO push channel carrying processor status updates
//!
//! Only the client side of the framing is handled: Engine.IO v4 over its
//! WebSocket transport, joining one namespace and decoding `EVENT` packets.
//! Binary attachments and acknowledgements are not supported.

use crate::panels::processors::ProcessorUpdate;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};
use woresk_core::config::PushConfig;
use woresk_core::{Error, Result};

/// Event name the backend emits for processor changes
pub const PROCESSOR_UPDATE_EVENT: &str = "processorUpdate";

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Engine.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    /// Handshake; carries the JSON session parameters
    Open(String),
    /// Server is closing the session
    Close,
    /// Heartbeat request, answered with a pong
    Ping,
    /// Heartbeat reply
    Pong,
    /// Socket.IO payload
    Message(SocketPacket),
    /// Filler
    Noop,
}

/// Socket.IO packet carried inside an Engine.IO message
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Namespace joined
    Connect {
        /// Namespace
        namespace: String,
    },
    /// Namespace left
    Disconnect {
        /// Namespace
        namespace: String,
    },
    /// Named event with its arguments
    Event {
        /// Namespace
        namespace: String,
        /// Event name
        name: String,
        /// Event arguments
        args: Vec<Value>,
    },
    /// Namespace join refused
    ConnectError {
        /// Namespace
        namespace: String,
        /// Server-provided reason
        message: String,
    },
    /// Packet type the console does not consume
    Unsupported(char),
}

/// Decode one WebSocket text frame
///
/// # Errors
///
/// Returns [`Error::PushChannel`] for empty frames, unknown packet types and
/// malformed event payloads.
pub fn decode_frame(frame: &str) -> Result<EnginePacket> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::PushChannel("empty frame".to_string()))?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(EnginePacket::Open(rest.to_string())),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping),
        '3' => Ok(EnginePacket::Pong),
        '4' => decode_socket_packet(rest).map(EnginePacket::Message),
        '6' => Ok(EnginePacket::Noop),
        other => Err(Error::PushChannel(format!(
            "unknown engine packet type '{other}'"
        ))),
    }
}

fn decode_socket_packet(packet: &str) -> Result<SocketPacket> {
    let mut chars = packet.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::PushChannel("empty socket packet".to_string()))?;
    let (namespace, body) = split_namespace(chars.as_str());

    match kind {
        '0' => Ok(SocketPacket::Connect { namespace }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let payload = body.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut args: Vec<Value> = serde_json::from_str(payload)
                .map_err(|e| Error::PushChannel(format!("malformed event payload: {e}")))?;
            if args.is_empty() {
                return Err(Error::PushChannel("event without a name".to_string()));
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                other => {
                    return Err(Error::PushChannel(format!("event name is not a string: {other}")));
                }
            };
            Ok(SocketPacket::Event {
                namespace,
                name,
                args,
            })
        }
        '4' => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| body.to_string());
            Ok(SocketPacket::ConnectError { namespace, message })
        }
        other => Ok(SocketPacket::Unsupported(other)),
    }
}

fn split_namespace(rest: &str) -> (String, &str) {
    if rest.starts_with('/') {
        match rest.split_once(',') {
            Some((namespace, body)) => (namespace.to_string(), body),
            None => (rest.to_string(), ""),
        }
    } else {
        ("/".to_string(), rest)
    }
}

/// Frame that joins `namespace`
#[must_use]
pub fn connect_frame(namespace: &str) -> String {
    if namespace == "/" {
        "40".to_string()
    } else {
        format!("40{namespace},")
    }
}

/// WebSocket endpoint for a Socket.IO server URL
///
/// # Errors
///
/// Returns a configuration error for URLs that are not http(s) or ws(s).
pub fn socket_endpoint(server_url: &str) -> Result<String> {
    let base = server_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(Error::configuration(format!(
            "push.socket_url must be an http(s) or ws(s) URL, got '{server_url}'"
        )));
    };
    Ok(format!("{ws_base}/socket.io/?EIO=4&transport=websocket"))
}

/// Client for the processor push channel
#[derive(Debug, Clone)]
pub struct PushChannel {
    endpoint: String,
    namespace: String,
}

impl PushChannel {
    /// Channel for the configured server and namespace
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable socket URL.
    pub fn from_config(config: &PushConfig) -> Result<Self> {
        Ok(Self {
            endpoint: socket_endpoint(&config.socket_url)?,
            namespace: config.namespace.clone(),
        })
    }

    /// WebSocket URL the channel connects to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Keep a connection open until shutdown, reconnecting after failures
    pub async fn listen(
        &self,
        updates: mpsc::Sender<ProcessorUpdate>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        loop {
            let session_shutdown = shutdown_rx.resubscribe();
            match self.run(updates.clone(), session_shutdown).await {
                Ok(()) => break,
                Err(e) => warn!(error = %e, "Push channel dropped, reconnecting"),
            }

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                () = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
        debug!("Push listener stopped");
    }

    /// Run one connection until shutdown or failure
    ///
    /// Returns `Ok` on shutdown or when nobody is receiving updates any more.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PushChannel`] when the connection fails or closes.
    pub async fn run(
        &self,
        updates: mpsc::Sender<ProcessorUpdate>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        let (ws_stream, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| Error::PushChannel(format!("connect to {}: {e}", self.endpoint)))?;
        info!(endpoint = %self.endpoint, namespace = %self.namespace, "Push channel connected");

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            let message = tokio::select! {
                _ = shutdown_rx.recv() => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    return Ok(());
                }
                message = ws_receiver.next() => message,
            };

            let text = match message {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(frame))) => {
                    return Err(Error::PushChannel(format!("server closed connection: {frame:?}")));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(Error::PushChannel(e.to_string())),
                None => return Err(Error::PushChannel("connection closed".to_string())),
            };

            trace!(frame = %text, "Push frame");
            let packet = match decode_frame(&text) {
                Ok(packet) => packet,
                Err(e) => {
                    debug!(error = %e, "Ignoring undecodable frame");
                    continue;
                }
            };

            match packet {
                EnginePacket::Open(_) => {
                    ws_sender
                        .send(Message::Text(connect_frame(&self.namespace)))
                        .await
                        .map_err(|e| Error::PushChannel(e.to_string()))?;
                }
                EnginePacket::Ping => {
                    ws_sender
                        .send(Message::Text("3".to_string()))
                        .await
                        .map_err(|e| Error::PushChannel(e.to_string()))?;
                }
                EnginePacket::Close => {
                    return Err(Error::PushChannel("server closed session".to_string()));
                }
                EnginePacket::Message(packet) => {
                    if !self.handle_packet(packet, &updates).await? {
                        return Ok(());
                    }
                }
                EnginePacket::Pong | EnginePacket::Noop => {}
            }
        }
    }

    /// Returns `false` once the update receiver is gone
    async fn handle_packet(
        &self,
        packet: SocketPacket,
        updates: &mpsc::Sender<ProcessorUpdate>,
    ) -> Result<bool> {
        match packet {
            SocketPacket::Connect { namespace } => {
                info!(%namespace, "Joined push namespace");
            }
            SocketPacket::ConnectError { namespace, message } => {
                return Err(Error::PushChannel(format!(
                    "namespace {namespace} refused: {message}"
                )));
            }
            SocketPacket::Disconnect { namespace } if namespace == self.namespace => {
                return Err(Error::PushChannel(format!("disconnected from {namespace}")));
            }
            SocketPacket::Event {
                namespace,
                name,
                args,
            } if namespace == self.namespace && name == PROCESSOR_UPDATE_EVENT => {
                for arg in args {
                    match ProcessorUpdate::from_value(arg) {
                        Ok(update) => {
                            debug!(id = %update.id, "Processor update received");
                            if updates.send(update).await.is_err() {
                                return Ok(false);
                            }
                        }
                        Err(e) => warn!(error = %e, "Ignoring malformed processor update"),
                    }
                }
            }
            other => trace!(packet = ?other, "Ignoring push packet"),
        }
        Ok(true)
    }
}
