//! # synavis-server
//!
//! Remote scene control over a framed socket.
//!
//! This crate provides:
//! - Collaborator traits an engine implements (`Environment`)
//! - Wire protocol, dispatcher and property marshaller
//! - Chunked and direct geometry reception
//! - Property tracking with per-tick telemetry
//! - TCP and Unix socket transports

pub mod assembler;
pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod environment;
pub mod marshal;
pub mod protocol;
pub mod resolver;
pub mod session;
pub mod spawn;
pub mod telemetry;
pub mod tracking;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::{DEFAULT_BIND, ServerConfig};
pub use environment::{
    AssetSource, Console, EngineStats, Environment, LoadStatus, LoadedAsset, MeshBuilder,
    Placeable, SceneGraph, SceneObject, SettingsLoader,
};
pub use protocol::{Command, Frame};
pub use session::Session;
pub use transport::{AsyncReader, AsyncWriter, FramedReader, FramedWriter, serve_connection};

use std::sync::Arc;
use synavis_core::{Result, SpawnCatalog};
use tracing::{info, warn};

/// Synavis scene-control server
///
/// Owns the environment and serves one client at a time; session state does
/// not outlive its connection.
pub struct SynavisServer<E: Environment> {
    environment: E,
    /// Asset catalog and class table, built once at startup
    catalog: Arc<SpawnCatalog>,
    config: ServerConfig,
}

impl<E: Environment> SynavisServer<E> {
    /// Create a new server, scanning the environment's spawnables
    pub fn new(environment: E, config: ServerConfig) -> Self {
        let catalog = SpawnCatalog {
            assets: environment.scan_assets(),
            classes: environment.builtin_classes(),
        };
        info!(
            "Spawn catalog: {} assets, {} classes",
            catalog.assets.len(),
            catalog.classes.len()
        );
        Self {
            environment,
            catalog: Arc::new(catalog),
            config,
        }
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.environment
    }

    pub fn catalog(&self) -> &SpawnCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve one already-connected client
    pub async fn serve<R, W>(&mut self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncReader + 'static,
        W: AsyncWriter,
    {
        serve_connection(
            &mut self.environment,
            self.catalog.clone(),
            &self.config,
            reader,
            writer,
        )
        .await
    }

    /// Run the server on a TCP address
    pub async fn run_tcp(mut self, addr: &str) -> Result<()> {
        let listener = transport::tcp::bind(addr).await?;
        loop {
            let (reader, writer) = transport::tcp::accept(&listener, self.config.max_frame_len).await?;
            if let Err(e) = self.serve(reader, writer).await {
                warn!("Connection ended: {}", e);
            }
        }
    }

    /// Run the server on a Unix socket
    #[cfg(unix)]
    pub async fn run_unix(mut self, path: &std::path::Path) -> Result<()> {
        let listener = transport::unix::bind(path)?;
        loop {
            let (reader, writer) =
                transport::unix::accept(&listener, self.config.max_frame_len).await?;
            if let Err(e) = self.serve(reader, writer).await {
                warn!("Connection ended: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestScene;
    use serde_json::{Value, json};
    use std::time::Duration;

    #[test]
    fn test_catalog_built_at_startup() {
        let server = SynavisServer::new(TestScene::new(), ServerConfig::default());
        assert_eq!(
            server.catalog().spawnable_names(),
            vec!["Maize", "PointLight", "BoxComponent"]
        );
    }

    #[tokio::test]
    async fn test_session_state_does_not_outlive_connection() {
        let config = ServerConfig {
            tick_interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let mut server = SynavisServer::new(TestScene::new(), config);

        for expected in ["added", "added"] {
            let (client, served) = tokio::io::duplex(4096);
            let (read_half, write_half) = tokio::io::split(served);
            let (client_read, client_write) = tokio::io::split(client);
            let client = async move {
                let mut reader = FramedReader::new(client_read, 4096);
                let mut writer = FramedWriter::new(client_write);
                let track = json!({"type": "track", "object": "Sun", "property": "Enabled"});
                writer.write_message(track.to_string().as_bytes()).await.unwrap();
                let reply: Value = serde_json::from_slice(&reader.read_message().await.unwrap()).unwrap();
                reply
            };
            let serve = server.serve(
                FramedReader::new(read_half, 4096),
                FramedWriter::new(write_half),
            );
            let (served, reply) = tokio::join!(serve, client);
            served.unwrap();
            assert_eq!(reply["state"], expected);
        }
    }
}
