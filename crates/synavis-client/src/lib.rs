//! Synavis client for remote scene control
//!
//! This crate provides a client that connects to a Synavis server over the
//! length-prefixed TCP transport, sends commands and collects replies and
//! pushed telemetry.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use synavis_core::{GeometryBuffer, PropertyValue, Result, SynavisError};
use synavis_server::protocol::{DirectGeometry, Frame, ParameterUpdate, preview};
use synavis_server::transport::tcp::{self, TcpReadWrapper, TcpWriteWrapper};
use synavis_server::{AsyncReader, AsyncWriter, Command, ServerConfig};
use tracing::debug;

/// Client for a Synavis server
pub struct SynavisClient {
    reader: TcpReadWrapper,
    writer: TcpWriteWrapper,
    /// Pushed messages that arrived while waiting for a reply
    pushed: VecDeque<Value>,
}

impl SynavisClient {
    /// Connect to a server, e.g. `127.0.0.1:50121`
    pub async fn connect(addr: &str) -> Result<Self> {
        let (reader, writer) = tcp::connect(addr, ServerConfig::default().max_frame_len).await?;
        Ok(Self {
            reader,
            writer,
            pushed: VecDeque::new(),
        })
    }

    /// Send one command envelope
    pub async fn send_command(&mut self, command: &Command) -> Result<()> {
        let json = serde_json::to_string(command)?;
        debug!("[Client→Server] {}", preview(&json, 200));
        self.writer.write_message(json.as_bytes()).await
    }

    /// Send one raw payload frame
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_message(bytes).await
    }

    /// Next inbound message, pushed ones first
    pub async fn recv(&mut self) -> Result<Value> {
        if let Some(message) = self.pushed.pop_front() {
            return Ok(message);
        }
        self.read().await
    }

    async fn read(&mut self) -> Result<Value> {
        let data = self.reader.read_message().await?;
        let message: Value = serde_json::from_slice(&data)?;
        debug!("[Server→Client] {}", preview(&message.to_string(), 200));
        Ok(message)
    }

    /// Next reply, queueing telemetry and spawn notifications on the way
    async fn reply(&mut self) -> Result<Value> {
        loop {
            let message = self.read().await?;
            if is_pushed(&message) {
                self.pushed.push_back(message);
                continue;
            }
            if message.get("type").and_then(Value::as_str) == Some("error") {
                let text = message
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unspecified error");
                return Err(SynavisError::ServerError(text.to_string()));
            }
            return Ok(message);
        }
    }

    /// Send a command and wait for its reply; error envelopes become errors
    pub async fn request(&mut self, command: &Command) -> Result<Value> {
        self.send_command(command).await?;
        self.reply().await
    }

    /// Names of the top-level objects
    pub async fn query_all(&mut self) -> Result<Vec<String>> {
        let reply = self
            .request(&Command::Query {
                object: None,
                property: None,
                spawn: None,
            })
            .await?;
        serde_json::from_value(reply["data"].clone()).map_err(Into::into)
    }

    /// Field types of an object, or one property's value
    pub async fn query(&mut self, object: &str, property: Option<&str>) -> Result<Value> {
        let reply = self
            .request(&Command::Query {
                object: Some(object.to_string()),
                property: property.map(str::to_string),
                spawn: None,
            })
            .await?;
        Ok(reply["data"].clone())
    }

    /// Write a property, returning the value read back
    pub async fn set_parameter(
        &mut self,
        object: &str,
        property: &str,
        value: &PropertyValue,
    ) -> Result<Value> {
        let reply = self
            .request(&Command::Parameter(ParameterUpdate {
                object: object.to_string(),
                property: property.to_string(),
                fragment: value.to_fragment(),
            }))
            .await?;
        Ok(reply["data"].clone())
    }

    /// Start per-tick telemetry for a property
    pub async fn track(&mut self, object: &str, property: &str) -> Result<()> {
        self.request(&Command::Track {
            object: object.to_string(),
            property: property.to_string(),
        })
        .await?;
        Ok(())
    }

    pub async fn untrack(&mut self, object: &str, property: &str) -> Result<()> {
        self.request(&Command::Untrack {
            object: object.to_string(),
            property: property.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Next telemetry frame's data
    pub async fn next_telemetry(&mut self) -> Result<Map<String, Value>> {
        loop {
            let message = self.recv().await?;
            if message.get("type").and_then(Value::as_str) == Some("track") {
                if let Some(Value::Object(data)) = message.get("data") {
                    return Ok(data.clone());
                }
            }
        }
    }

    /// Spawn an asset or built-in class by name
    pub async fn spawn(&mut self, name: &str, parameters: Map<String, Value>) -> Result<Value> {
        self.request(&Command::Spawn {
            name: name.to_string(),
            parameters,
        })
        .await
    }

    /// Send a whole mesh in one `directbase64` envelope
    pub async fn send_direct_geometry(
        &mut self,
        name: Option<&str>,
        geometry: &GeometryBuffer,
    ) -> Result<Value> {
        let optional = |bytes: &[u8]| (!bytes.is_empty()).then(|| STANDARD.encode(bytes));
        let direct = DirectGeometry {
            id: name.map(str::to_string),
            points: STANDARD.encode(bytemuck::cast_slice::<_, u8>(&geometry.points)),
            normals: STANDARD.encode(bytemuck::cast_slice::<_, u8>(&geometry.normals)),
            triangles: STANDARD.encode(bytemuck::cast_slice::<_, u8>(&geometry.triangles)),
            texcoords: STANDARD.encode(bytemuck::cast_slice::<_, u8>(&geometry.uvs)),
            tangents: optional(bytemuck::cast_slice(&geometry.tangents)),
            scalars: optional(bytemuck::cast_slice(&geometry.scalars)),
        };
        self.request(&Command::DirectBase64(direct)).await
    }

    /// Stream a mesh as a header plus raw frames of at most `chunk_size` bytes
    ///
    /// Normals and texture coordinates must have one element per point.
    pub async fn send_chunked_geometry(
        &mut self,
        name: Option<&str>,
        geometry: &GeometryBuffer,
        chunk_size: usize,
    ) -> Result<Value> {
        let points = geometry.points.len();
        if chunk_size == 0 || points == 0 {
            return Err(SynavisError::MalformedValue(
                "chunked geometry needs points and a chunk size".into(),
            ));
        }
        if geometry.normals.len() != points || geometry.uvs.len() != points {
            return Err(SynavisError::MalformedValue(format!(
                "{} points need as many normals ({}) and uvs ({})",
                points,
                geometry.normals.len(),
                geometry.uvs.len()
            )));
        }

        self.request(&Command::Geometry {
            id: name.map(str::to_string),
            points: Some(points),
            triangles: Some(geometry.triangles.len()),
        })
        .await?;

        let mut stream = Vec::new();
        stream.extend_from_slice(bytemuck::cast_slice(&geometry.points));
        stream.extend_from_slice(bytemuck::cast_slice(&geometry.normals));
        stream.extend_from_slice(bytemuck::cast_slice(&geometry.triangles));
        stream.extend_from_slice(bytemuck::cast_slice(&geometry.uvs));

        let mut last = json!(null);
        let mut offset = 0;
        while offset < stream.len() {
            let end = payload_end(&stream, offset, chunk_size);
            self.send_raw(&stream[offset..end]).await?;
            last = self.reply().await?;
            offset = end;
        }
        Ok(last)
    }
}

/// End of the next raw chunk; shortened so it never reads as an envelope
fn payload_end(stream: &[u8], offset: usize, chunk_size: usize) -> usize {
    let mut end = (offset + chunk_size).min(stream.len());
    while end - offset > 1 && matches!(Frame::classify(&stream[offset..end]), Frame::Envelope(_)) {
        end -= 1;
    }
    end
}

/// Telemetry frames and spawn notifications, failed ones included, arrive unprompted
fn is_pushed(message: &Value) -> bool {
    match message.get("type").and_then(Value::as_str) {
        Some("spawned") => true,
        Some("track") => message.get("state").is_none(),
        _ => false,
    }
}
