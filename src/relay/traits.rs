//! Outbound side of the relay session

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Anything that can carry a payload to the cloud side
#[async_trait]
pub trait RelaySink: Send + Sync {
    /// Queue one message. Never waits for network I/O.
    async fn send(&self, payload: Bytes) -> Result<()>;
}
