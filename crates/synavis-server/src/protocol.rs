//! Wire protocol
//!
//! Every frame is either a JSON envelope or a raw binary payload. Envelopes
//! are internally tagged by a lowercase `type` field:
//! `{"type": "parameter", "object": "Sun", "property": "position", "x": 1, ...}`

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use synavis_core::{Result, SynavisError};

/// Every envelope type the dispatcher understands
pub const COMMAND_TYPES: &[&str] = &[
    "geometry",
    "direct",
    "directbase64",
    "parameter",
    "query",
    "track",
    "untrack",
    "command",
    "info",
    "console",
    "settings",
    "spawn",
    "buffer",
];

/// A classified inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    Envelope(&'a str),
    Payload(&'a [u8]),
}

impl<'a> Frame<'a> {
    /// Frames whose trimmed bytes are wrapped in braces are envelopes
    pub fn classify(bytes: &'a [u8]) -> Self {
        let trimmed = bytes.trim_ascii();
        if trimmed.first() == Some(&b'{') && trimmed.last() == Some(&b'}') {
            if let Ok(text) = std::str::from_utf8(trimmed) {
                return Frame::Envelope(text);
            }
        }
        Frame::Payload(bytes)
    }
}

/// Base64 arrays of a direct-mode mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectGeometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub points: String,
    pub normals: String,
    pub triangles: String,
    pub texcoords: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tangents: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalars: Option<String>,
}

/// Property write, value keys inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    pub object: String,
    #[serde(alias = "name")]
    pub property: String,
    /// `value` for scalars, `x/y/z` or `p/y/r` for structures
    #[serde(flatten)]
    pub fragment: Map<String, Value>,
}

/// Fields requested by `info`; any non-null value requests the field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frametime: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<Value>,
}

impl InfoRequest {
    pub fn is_empty(&self) -> bool {
        self.frametime.is_none() && self.memory.is_none() && self.fps.is_none()
    }
}

/// Legacy buffer streaming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BufferCommand {
    Start { start: String, size: usize },
    Stop { stop: String },
}

/// Inbound commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Command {
    /// Open chunked reception, optionally carrying the array counts
    Geometry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        points: Option<usize>,
        /// Number of triangle indices
        #[serde(default, skip_serializing_if = "Option::is_none")]
        triangles: Option<usize>,
    },

    /// Whole mesh in one envelope
    Direct(DirectGeometry),

    #[serde(rename = "directbase64")]
    DirectBase64(DirectGeometry),

    Parameter(ParameterUpdate),

    /// Object listing, introspection, property read or spawn catalog
    Query {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        object: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        property: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spawn: Option<String>,
    },

    Track { object: String, property: String },

    Untrack { object: String, property: String },

    /// Named sub-action: `reset`, `finalize`, `frametime`
    Command { name: String },

    Info(InfoRequest),

    Console { command: String },

    Settings { settings: Value },

    Spawn {
        #[serde(alias = "object")]
        name: String,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        parameters: Map<String, Value>,
    },

    Buffer(BufferCommand),
}

impl Command {
    /// Decode an envelope
    ///
    /// Distinguishes a missing `type`, an unknown `type` and a known type
    /// with bad fields.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SynavisError::MalformedValue(format!("invalid envelope: {e}")))?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SynavisError::MalformedValue("envelope has no \"type\"".into()))?
            .to_string();
        if !COMMAND_TYPES.contains(&kind.as_str()) {
            return Err(SynavisError::UnknownCommand(kind));
        }
        serde_json::from_value(value).map_err(|e| SynavisError::MalformedValue(format!("{kind}: {e}")))
    }

    /// Wire name of the command
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Geometry { .. } => "geometry",
            Command::Direct(_) => "direct",
            Command::DirectBase64(_) => "directbase64",
            Command::Parameter(_) => "parameter",
            Command::Query { .. } => "query",
            Command::Track { .. } => "track",
            Command::Untrack { .. } => "untrack",
            Command::Command { .. } => "command",
            Command::Info(_) => "info",
            Command::Console { .. } => "console",
            Command::Settings { .. } => "settings",
            Command::Spawn { .. } => "spawn",
            Command::Buffer(_) => "buffer",
        }
    }
}

/// Reply envelopes
pub mod reply {
    use super::*;

    pub fn error(err: &SynavisError) -> Value {
        json!({ "type": "error", "message": err.to_string() })
    }

    pub fn query(name: &str, data: Value) -> Value {
        json!({ "type": "query", "name": name, "data": data })
    }

    pub fn query_property(object: &str, property: &str, data: Value) -> Value {
        json!({ "type": "query", "name": object, "property": property, "data": data })
    }

    pub fn spawned(name: &str) -> Value {
        json!({ "type": "spawned", "name": name })
    }

    /// Unprompted, so it is a `spawned` notification rather than an error reply
    pub fn spawn_failed(name: &str, message: &str) -> Value {
        json!({ "type": "spawned", "name": name, "state": "failed", "message": message })
    }

    pub fn buffer(name: &str, state: &str) -> Value {
        json!({ "type": "buffer", "name": name, "state": state })
    }

    pub fn is_error(reply: &Value) -> bool {
        reply.get("type").and_then(Value::as_str) == Some("error")
    }
}

/// Truncated preview for frame logs
pub fn preview(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
