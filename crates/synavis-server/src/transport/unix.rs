//! Unix socket transport
//!
//! For clients on the same host; same framing as TCP.

use super::{FramedReader, FramedWriter};
use std::path::Path;
use synavis_core::{Result, SynavisError};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

/// Unix socket read wrapper
pub type UnixReadWrapper = FramedReader<OwnedReadHalf>;

/// Unix socket write wrapper
pub type UnixWriteWrapper = FramedWriter<OwnedWriteHalf>;

fn framed(stream: UnixStream, max_frame_len: usize) -> (UnixReadWrapper, UnixWriteWrapper) {
    let (read_half, write_half) = stream.into_split();
    (
        FramedReader::new(read_half, max_frame_len),
        FramedWriter::new(write_half),
    )
}

/// Bind the socket, replacing a stale socket file
pub fn bind(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        warn!("Removing stale socket {}", path.display());
        std::fs::remove_file(path).map_err(|e| {
            SynavisError::IpcError(format!("Removing {} failed: {}", path.display(), e))
        })?;
    }
    let listener = UnixListener::bind(path).map_err(|e| {
        SynavisError::IpcError(format!("Unix bind to {} failed: {}", path.display(), e))
    })?;
    info!("Listening on unix://{}", path.display());
    Ok(listener)
}

/// Wait for the next client
pub async fn accept(
    listener: &UnixListener,
    max_frame_len: usize,
) -> Result<(UnixReadWrapper, UnixWriteWrapper)> {
    let (stream, _) = listener
        .accept()
        .await
        .map_err(|e| SynavisError::IpcError(format!("Unix accept failed: {}", e)))?;
    info!("Client connected on unix socket");
    Ok(framed(stream, max_frame_len))
}

/// Connect to a server socket
pub async fn connect(
    path: &Path,
    max_frame_len: usize,
) -> Result<(UnixReadWrapper, UnixWriteWrapper)> {
    debug!("Connecting to Synavis server at {}", path.display());
    let stream = UnixStream::connect(path).await.map_err(|e| {
        SynavisError::IpcError(format!("Unix connect to {} failed: {}", path.display(), e))
    })?;
    Ok(framed(stream, max_frame_len))
}
