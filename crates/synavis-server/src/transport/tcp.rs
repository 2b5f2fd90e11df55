//! TCP transport
//!
//! The default transport; remote clients connect to `127.0.0.1:50121`.

use super::{FramedReader, FramedWriter};
use synavis_core::{Result, SynavisError};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// TCP read wrapper
pub type TcpReadWrapper = FramedReader<OwnedReadHalf>;

/// TCP write wrapper
pub type TcpWriteWrapper = FramedWriter<OwnedWriteHalf>;

/// Split a connected stream into framed halves
pub fn framed(stream: TcpStream, max_frame_len: usize) -> Result<(TcpReadWrapper, TcpWriteWrapper)> {
    stream
        .set_nodelay(true)
        .map_err(|e| SynavisError::IpcError(format!("TCP set_nodelay failed: {}", e)))?;
    let (read_half, write_half) = stream.into_split();
    Ok((
        FramedReader::new(read_half, max_frame_len),
        FramedWriter::new(write_half),
    ))
}

/// Bind the listening socket
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| SynavisError::IpcError(format!("TCP bind to {} failed: {}", addr, e)))?;
    info!("Listening on tcp://{}", addr);
    Ok(listener)
}

/// Wait for the next client
pub async fn accept(
    listener: &TcpListener,
    max_frame_len: usize,
) -> Result<(TcpReadWrapper, TcpWriteWrapper)> {
    let (stream, peer) = listener
        .accept()
        .await
        .map_err(|e| SynavisError::IpcError(format!("TCP accept failed: {}", e)))?;
    info!("Client connected from {}", peer);
    framed(stream, max_frame_len)
}

/// Connect to a server
pub async fn connect(addr: &str, max_frame_len: usize) -> Result<(TcpReadWrapper, TcpWriteWrapper)> {
    debug!("Connecting to Synavis server at {}", addr);
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| SynavisError::IpcError(format!("TCP connect to {} failed: {}", addr, e)))?;
    framed(stream, max_frame_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{AsyncReader, AsyncWriter};

    #[tokio::test]
    async fn test_frames_cross_a_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut reader, mut writer) = accept(&listener, 1024).await.unwrap();
            let frame = reader.read_message().await.unwrap();
            writer.write_message(&frame).await.unwrap();
        });

        let (mut reader, mut writer) = connect(&addr, 1024).await.unwrap();
        writer.write_message(b"{\"type\":\"query\"}").await.unwrap();
        assert_eq!(reader.read_message().await.unwrap(), b"{\"type\":\"query\"}");
        server.await.unwrap();
    }
}
