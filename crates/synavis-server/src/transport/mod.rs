//! Framed transports and the connection loop
//!
//! Every message is one frame: a 4-byte little-endian length followed by the
//! payload. TCP and Unix sockets share the same framing.

pub mod tcp;
#[cfg(unix)]
pub mod unix;

use crate::config::{MIN_TICK_INTERVAL, ServerConfig};
use crate::dispatch;
use crate::environment::Environment;
use crate::protocol::preview;
use crate::session::Session;
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::sync::Arc;
use synavis_core::{Result, SpawnCatalog, SynavisError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Trait for async reading from a transport
#[async_trait]
pub trait AsyncReader: Send {
    /// Read one complete frame
    async fn read_message(&mut self) -> Result<Vec<u8>>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait AsyncWriter: Send {
    /// Write one complete frame
    async fn write_message(&mut self, data: &[u8]) -> Result<()>;
}

/// Length-prefixed reader over any byte stream
pub struct FramedReader<R> {
    inner: R,
    max_frame_len: usize,
}

impl<R> FramedReader<R> {
    pub fn new(inner: R, max_frame_len: usize) -> Self {
        Self {
            inner,
            max_frame_len,
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> AsyncReader for FramedReader<R> {
    async fn read_message(&mut self) -> Result<Vec<u8>> {
        let mut len_bytes = [0u8; 4];
        self.inner
            .read_exact(&mut len_bytes)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => SynavisError::IpcError("connection closed".into()),
                _ => SynavisError::IpcError(format!("read length failed: {}", e)),
            })?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        if len > self.max_frame_len {
            return Err(SynavisError::IpcError(format!(
                "Frame too large: {} bytes (limit {})",
                len, self.max_frame_len
            )));
        }

        let mut data = vec![0u8; len];
        self.inner
            .read_exact(&mut data)
            .await
            .map_err(|e| SynavisError::IpcError(format!("read data failed: {}", e)))?;
        Ok(data)
    }
}

/// Length-prefixed writer over any byte stream
pub struct FramedWriter<W> {
    inner: W,
}

impl<W> FramedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> AsyncWriter for FramedWriter<W> {
    async fn write_message(&mut self, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len())
            .map_err(|_| SynavisError::IpcError(format!("Frame too large: {} bytes", data.len())))?;
        self.inner
            .write_all(&len.to_le_bytes())
            .await
            .map_err(|e| SynavisError::IpcError(format!("write length failed: {}", e)))?;
        self.inner
            .write_all(data)
            .await
            .map_err(|e| SynavisError::IpcError(format!("write data failed: {}", e)))?;
        self.inner
            .flush()
            .await
            .map_err(|e| SynavisError::IpcError(format!("flush failed: {}", e)))?;
        Ok(())
    }
}

/// Background task forwarding inbound frames to the connection loop
///
/// Exits on a transport error or when the loop drops its receiver; dropping
/// the sender is how the loop learns the client is gone.
pub async fn reader_task<R: AsyncReader>(mut reader: R, frame_tx: mpsc::Sender<Vec<u8>>) {
    loop {
        match reader.read_message().await {
            Ok(data) => {
                if frame_tx.send(data).await.is_err() {
                    debug!("Frame channel closed, reader task exiting");
                    break;
                }
            }
            Err(e) => {
                debug!("Reader task exiting: {}", e);
                break;
            }
        }
    }
}

/// Serve one client until it disconnects
///
/// Frames are handled in arrival order; the tick advances the environment,
/// polls pending spawns and emits telemetry. Only transport errors end the
/// connection.
pub async fn serve_connection<E, R, W>(
    env: &mut E,
    catalog: Arc<SpawnCatalog>,
    config: &ServerConfig,
    reader: R,
    mut writer: W,
) -> Result<()>
where
    E: Environment + ?Sized,
    R: AsyncReader + 'static,
    W: AsyncWriter,
{
    let (frame_tx, frame_rx) = mpsc::channel(64);
    let reader_handle = tokio::spawn(reader_task(reader, frame_tx));
    let mut session = Session::new(catalog).with_geometry_limit(config.max_geometry_bytes);

    let result = pump(env, &mut session, config, frame_rx, &mut writer).await;
    reader_handle.abort();

    if session.assembler.is_active() || session.buffers.is_open() {
        warn!("Client left with geometry in flight; discarded");
    }
    info!(
        "Session closed ({} tracked, {} spawns pending)",
        session.tracking.len(),
        session.spawner.pending()
    );
    result
}

async fn pump<E, W>(
    env: &mut E,
    session: &mut Session,
    config: &ServerConfig,
    mut frame_rx: mpsc::Receiver<Vec<u8>>,
    writer: &mut W,
) -> Result<()>
where
    E: Environment + ?Sized,
    W: AsyncWriter,
{
    let mut ticker = tokio::time::interval(config.tick_interval.max(MIN_TICK_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    loop {
        let outbound = tokio::select! {
            frame = frame_rx.recv() => match frame {
                Some(frame) => {
                    debug!(
                        "[Client→Server] len={} json={}",
                        frame.len(),
                        preview(&String::from_utf8_lossy(&frame), config.preview_len)
                    );
                    vec![dispatch::handle_frame(env, session, &frame)]
                }
                None => {
                    info!("Client disconnected");
                    break;
                }
            },
            _ = ticker.tick() => {
                let now = Instant::now();
                env.advance(now - last_tick);
                last_tick = now;
                session.tick(env)
            }
        };

        for message in outbound {
            send(writer, &message, config.preview_len).await?;
        }
    }
    Ok(())
}

async fn send<W: AsyncWriter + ?Sized>(writer: &mut W, message: &Value, preview_len: usize) -> Result<()> {
    let json = serde_json::to_string(message)?;
    debug!("[Server→Client] len={} json={}", json.len(), preview(&json, preview_len));
    writer.write_message(json.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::AssetSource;
    use crate::testing::TestScene;
    use serde_json::json;
    use std::time::Duration;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut bytes = (payload.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[tokio::test]
    async fn test_read_length_prefixed_frames() {
        let mock = tokio_test::io::Builder::new()
            .read(&frame(b"{\"type\":\"query\"}"))
            .read(&frame(&[1, 2, 3]))
            .build();
        let mut reader = FramedReader::new(mock, 1024);
        assert_eq!(reader.read_message().await.unwrap(), b"{\"type\":\"query\"}");
        assert_eq!(reader.read_message().await.unwrap(), vec![1, 2, 3]);
        let err = reader.read_message().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let mock = tokio_test::io::Builder::new()
            .read(&2048u32.to_le_bytes())
            .build();
        let mut reader = FramedReader::new(mock, 1024);
        let err = reader.read_message().await.unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_write_prefixes_length() {
        let mock = tokio_test::io::Builder::new()
            .write(&5u32.to_le_bytes())
            .write(b"hello")
            .build();
        let mut writer = FramedWriter::new(mock);
        writer.write_message(b"hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_replies_in_order() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);
        let mut client_reader = FramedReader::new(client_read, 1024 * 1024);
        let mut client_writer = FramedWriter::new(client_write);

        let client = async move {
            client_writer
                .write_message(br#"{"type":"query"}"#)
                .await
                .unwrap();
            client_writer
                .write_message(br#"{"type":"command","name":"explode"}"#)
                .await
                .unwrap();
            let first: Value =
                serde_json::from_slice(&client_reader.read_message().await.unwrap()).unwrap();
            let second: Value =
                serde_json::from_slice(&client_reader.read_message().await.unwrap()).unwrap();
            drop(client_writer);
            (first, second)
        };

        let mut scene = TestScene::new();
        let catalog = Arc::new(SpawnCatalog {
            assets: scene.scan_assets(),
            classes: scene.builtin_classes(),
        });
        let config = ServerConfig {
            tick_interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let server = serve_connection(
            &mut scene,
            catalog,
            &config,
            FramedReader::new(server_read, config.max_frame_len),
            FramedWriter::new(server_write),
        );

        let (served, (first, second)) = tokio::join!(server, client);
        served.unwrap();
        assert_eq!(first["name"], "all");
        assert_eq!(second["type"], "error");
    }

    #[tokio::test]
    async fn test_tick_streams_telemetry() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);
        let mut client_reader = FramedReader::new(client_read, 1024 * 1024);
        let mut client_writer = FramedWriter::new(client_write);

        let client = async move {
            let track = json!({"type": "track", "object": "Sun", "property": "Intensity"});
            client_writer
                .write_message(track.to_string().as_bytes())
                .await
                .unwrap();
            let added: Value =
                serde_json::from_slice(&client_reader.read_message().await.unwrap()).unwrap();
            let frame: Value =
                serde_json::from_slice(&client_reader.read_message().await.unwrap()).unwrap();
            drop(client_writer);
            (added, frame)
        };

        let mut scene = TestScene::new();
        let catalog = Arc::new(SpawnCatalog::default());
        let config = ServerConfig {
            tick_interval: Duration::from_millis(5),
            ..Default::default()
        };
        let server = serve_connection(
            &mut scene,
            catalog,
            &config,
            FramedReader::new(server_read, config.max_frame_len),
            FramedWriter::new(server_write),
        );

        // The server may notice the disconnect on a write; either ending is fine
        let (_, (added, frame)) = tokio::join!(server, client);
        assert_eq!(added["state"], "added");
        assert_eq!(frame, json!({"type": "track", "data": {"Sun.Intensity": 10.0}}));
    }
}
