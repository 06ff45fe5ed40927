//! Connection manager with persistent connection and automatic reconnection

use super::RelaySink;
use crate::config::RelaySettings;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use autonomia_shared::codec::{self, FrameDecoder};
use autonomia_shared::Attach;
use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Outbound queue depth; sends fail instead of waiting when it is full
const OUTBOUND_QUEUE: usize = 100;

/// Events emitted by the connection manager
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Connected and attached
    Connected { address: String },
    /// Connection lost
    Disconnected { reason: String },
    /// One inbound frame
    Received(Bytes),
    /// A connection attempt failed; another will follow
    ConnectionFailed { reason: String },
}

/// Configuration for connection manager
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub device_id: String,
    /// Relay address as `host:port`
    pub address: String,
    /// Reconnection delay (initial)
    pub reconnect_delay: Duration,
    /// Maximum reconnection delay
    pub max_reconnect_delay: Duration,
    pub connect_timeout: Duration,
}

impl From<&RelaySettings> for ConnectionConfig {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            device_id: settings.device_id.clone(),
            address: format!("{}:{}", settings.server, settings.port),
            reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
            max_reconnect_delay: Duration::from_millis(settings.max_reconnect_delay_ms),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
        }
    }
}

/// Cloneable outbound handle
#[derive(Debug, Clone)]
pub struct RelayHandle {
    outbound_tx: mpsc::Sender<Bytes>,
}

#[async_trait]
impl RelaySink for RelayHandle {
    async fn send(&self, payload: Bytes) -> Result<()> {
        self.outbound_tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => anyhow!("Relay outbound queue full"),
            mpsc::error::TrySendError::Closed(_) => anyhow!("Connection closed"),
        })
    }
}

/// Manages the persistent relay connection
pub struct ConnectionManager {
    config: ConnectionConfig,
    outbound_tx: mpsc::Sender<Bytes>,
    event_rx: mpsc::Receiver<ConnectionEvent>,
}

impl ConnectionManager {
    /// Create a new connection manager and start the connection loop
    pub fn new(config: ConnectionConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel::<Bytes>(OUTBOUND_QUEUE);
        let (event_tx, event_rx) = mpsc::channel::<ConnectionEvent>(100);

        let config_clone = config.clone();
        tokio::spawn(async move {
            connection_loop(config_clone, outbound_rx, event_tx).await;
        });

        Self {
            config,
            outbound_tx,
            event_rx,
        }
    }

    /// Receive the next connection event
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.event_rx.recv().await
    }

    pub fn device_id(&self) -> &str {
        &self.config.device_id
    }

    /// Handle for sending from other tasks
    pub fn handle(&self) -> RelayHandle {
        RelayHandle {
            outbound_tx: self.outbound_tx.clone(),
        }
    }
}

/// Main connection loop with reconnection logic. Returns once every
/// outbound sender is gone.
async fn connection_loop(
    config: ConnectionConfig,
    mut outbound_rx: mpsc::Receiver<Bytes>,
    event_tx: mpsc::Sender<ConnectionEvent>,
) {
    let mut reconnect_delay = config.reconnect_delay;

    loop {
        match timeout(config.connect_timeout, TcpStream::connect(&config.address)).await {
            Ok(Ok(stream)) => {
                reconnect_delay = config.reconnect_delay;

                match handle_connection(stream, &config, &mut outbound_rx, &event_tx).await {
                    Ok(()) => {
                        debug!("[RELAY] Outbound channel closed, stopping");
                        return;
                    }
                    Err(reason) => {
                        let _ = event_tx
                            .send(ConnectionEvent::Disconnected {
                                reason: reason.to_string(),
                            })
                            .await;
                    }
                }
            }
            Ok(Err(e)) => {
                let _ = event_tx
                    .send(ConnectionEvent::ConnectionFailed {
                        reason: format!("{}: {}", config.address, e),
                    })
                    .await;
            }
            Err(_) => {
                let _ = event_tx
                    .send(ConnectionEvent::ConnectionFailed {
                        reason: format!("{}: connect timed out", config.address),
                    })
                    .await;
            }
        }

        if outbound_rx.is_closed() {
            return;
        }

        // Wait before reconnecting
        tokio::time::sleep(reconnect_delay).await;

        // Exponential backoff
        reconnect_delay = std::cmp::min(reconnect_delay * 2, config.max_reconnect_delay);
    }
}

/// Handle an active connection. `Ok` means shutdown, `Err` means reconnect.
async fn handle_connection(
    stream: TcpStream,
    config: &ConnectionConfig,
    outbound_rx: &mut mpsc::Receiver<Bytes>,
    event_tx: &mpsc::Sender<ConnectionEvent>,
) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();

    let attach = codec::encode_json(&Attach::new(&config.device_id))?;
    writer.write_all(&attach).await?;

    let _ = event_tx
        .send(ConnectionEvent::Connected {
            address: config.address.clone(),
        })
        .await;

    let mut decoder = FrameDecoder::new();
    let mut read_buf = vec![0u8; 4096];

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                let Some(payload) = outbound else {
                    return Ok(());
                };
                let encoded = codec::encode(&payload)?;
                writer.write_all(&encoded).await?;
            }

            result = reader.read(&mut read_buf) => {
                match result {
                    Ok(0) => {
                        return Err(anyhow!("Relay closed connection"));
                    }
                    Ok(n) => {
                        decoder.extend(&read_buf[..n]);

                        // Process all complete frames
                        loop {
                            match decoder.decode_next() {
                                Ok(Some(frame)) => {
                                    let _ = event_tx.send(ConnectionEvent::Received(frame)).await;
                                }
                                Ok(None) => break,
                                Err(e) => {
                                    warn!("[RELAY] Bad frame: {}", e);
                                    return Err(e.into());
                                }
                            }
                        }
                    }
                    Err(e) => {
                        return Err(anyhow!("Read error: {}", e));
                    }
                }
            }
        }
    }
}
