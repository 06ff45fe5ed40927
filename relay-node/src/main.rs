//! Development relay
//!
//! Accepts one gateway connection at a time. Every line typed on stdin is
//! forwarded as a frame (one JSON-RPC request per line); every frame the
//! gateway sends (replies and telemetry) is printed.

use anyhow::{anyhow, Result};
use autonomia_shared::codec::{self, FrameDecoder};
use autonomia_shared::Attach;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let bind = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:7007".into());
    let listener = TcpListener::bind(&bind).await?;
    println!("Relay listening on {}", bind);

    // Stdin is read once for the whole process and handed to whichever gateway is attached
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            if line_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    loop {
        let (socket, addr) = listener.accept().await?;
        println!("Gateway connected from {}", addr);

        let (reader, mut writer) = socket.into_split();
        let mut inbound = tokio::spawn(print_frames(reader));

        loop {
            tokio::select! {
                line = line_rx.recv() => {
                    let Some(line) = line else {
                        return Ok(());
                    };
                    let frame = codec::encode(line.trim().as_bytes())?;
                    if let Err(e) = writer.write_all(&frame).await {
                        eprintln!("Write failed: {}", e);
                        break;
                    }
                }
                result = &mut inbound => {
                    match result {
                        Ok(Ok(())) => println!("Gateway {} disconnected", addr),
                        Ok(Err(e)) => eprintln!("Gateway {} dropped: {}", addr, e),
                        Err(e) => eprintln!("Reader task failed: {}", e),
                    }
                    break;
                }
            }
        }
        inbound.abort();
    }
}

/// Print every frame from the gateway. The first one must be the attach message.
async fn print_frames(mut reader: OwnedReadHalf) -> Result<()> {
    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; 4096];
    let mut attached = false;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        decoder.extend(&buf[..n]);

        while let Some(frame) = decoder.decode_next()? {
            if !attached {
                let attach: Attach = serde_json::from_slice(&frame)
                    .map_err(|e| anyhow!("expected attach message: {}", e))?;
                println!("Device \"{}\" attached ({})", attach.attach, attach.platform);
                attached = true;
                continue;
            }
            println!("<<< {}", String::from_utf8_lossy(&frame));
        }
    }
}
