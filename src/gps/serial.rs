//! Serial GPS receiver

use super::{nmea, Sensor};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use autonomia_shared::{now_ms, Readings};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// NMEA receiver on a serial port. A background task keeps the latest
/// snapshot current; `readings` never blocks on the port.
pub struct SerialGps {
    device: String,
    readings: Arc<RwLock<Readings>>,
    alive: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SerialGps {
    /// Open `device` at `baud` and start reading sentences
    pub fn connect(device: &str, baud: u32) -> Result<Self> {
        let port = tokio_serial::new(device, baud)
            .open_native_async()
            .with_context(|| format!("opening GPS serial port {}", device))?;
        info!("[GPS] Connected to {} at {} baud", device, baud);
        Ok(Self::from_reader(device, port))
    }

    /// Start reading sentences from any byte stream
    pub fn from_reader<R>(device: &str, reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let readings = Arc::new(RwLock::new(Readings::default()));
        let alive = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(read_loop(reader, readings.clone(), alive.clone()));

        Self {
            device: device.to_string(),
            readings,
            alive,
            task,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

impl Drop for SerialGps {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl Sensor for SerialGps {
    async fn readings(&self) -> Result<Readings> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(anyhow!("GPS on {} is no longer readable", self.device));
        }
        Ok(self.readings.read().await.clone())
    }
}

async fn read_loop<R: AsyncRead + Unpin>(
    reader: R,
    readings: Arc<RwLock<Readings>>,
    alive: Arc<AtomicBool>,
) {
    let _alive = AliveGuard(alive);
    let mut reader = BufReader::new(reader);
    let mut line = Vec::with_capacity(128);

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => {
                warn!("[GPS] Serial stream closed");
                break;
            }
            Ok(_) => {
                // Line noise is common on a freshly opened port
                let text = String::from_utf8_lossy(&line);
                let mut current = readings.write().await;
                if nmea::apply_sentence(&text, &mut current) {
                    current.timestamp_ms = now_ms();
                } else {
                    debug!("[GPS] Ignored: {}", text.trim_end());
                }
            }
            Err(e) => {
                warn!("[GPS] Read error: {}", e);
                break;
            }
        }
    }
}

/// Marks the receiver dead however the read loop exits
struct AliveGuard(Arc<AtomicBool>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
