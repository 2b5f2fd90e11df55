//! Property values and their JSON wire form
//!
//! A value travels in two shapes:
//! - encoded: a standalone JSON value (`3.5`, `{"x":1,"y":2,"z":3}`)
//! - fragment: keys merged into an envelope (`"value": 3.5` for scalars,
//!   `"x"/"y"/"z"` for vectors, `"p"/"y"/"r"` for rotators)

use crate::error::{Result, SynavisError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Spatial vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ONE: Vector3 = Vector3::new(1.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Orientation as pitch/yaw/roll in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotator3 {
    #[serde(rename = "p")]
    pub pitch: f64,
    #[serde(rename = "y")]
    pub yaw: f64,
    #[serde(rename = "r")]
    pub roll: f64,
}

impl Rotator3 {
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Position, orientation and scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vector3,
    pub orientation: Rotator3,
    pub scale: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::default(),
            orientation: Rotator3::default(),
            scale: Vector3::ONE,
        }
    }
}

/// Tag of a [`PropertyValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Float,
    Int,
    Bool,
    String,
    Vector3,
    Rotator3,
    Transform,
    None,
}

impl ValueKind {
    /// Wire name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Float => "float",
            ValueKind::Int => "int",
            ValueKind::Bool => "bool",
            ValueKind::String => "string",
            ValueKind::Vector3 => "vector3",
            ValueKind::Rotator3 => "rotator3",
            ValueKind::Transform => "transform",
            ValueKind::None => "none",
        }
    }
}

/// A typed property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
    Vector3(Vector3),
    Rotator3(Rotator3),
    Transform(Transform),
    None,
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Float(_) => ValueKind::Float,
            PropertyValue::Int(_) => ValueKind::Int,
            PropertyValue::Bool(_) => ValueKind::Bool,
            PropertyValue::String(_) => ValueKind::String,
            PropertyValue::Vector3(_) => ValueKind::Vector3,
            PropertyValue::Rotator3(_) => ValueKind::Rotator3,
            PropertyValue::Transform(_) => ValueKind::Transform,
            PropertyValue::None => ValueKind::None,
        }
    }

    /// Whether every float component is finite
    ///
    /// JSON has no NaN or infinity; `encode` turns them into `null`.
    pub fn is_finite(&self) -> bool {
        let vector = |v: &Vector3| v.x.is_finite() && v.y.is_finite() && v.z.is_finite();
        let rotator = |r: &Rotator3| r.pitch.is_finite() && r.yaw.is_finite() && r.roll.is_finite();
        match self {
            PropertyValue::Float(v) => v.is_finite(),
            PropertyValue::Vector3(v) => vector(v),
            PropertyValue::Rotator3(r) => rotator(r),
            PropertyValue::Transform(t) => {
                vector(&t.position) && rotator(&t.orientation) && vector(&t.scale)
            }
            _ => true,
        }
    }

    /// Encode as a standalone JSON value
    pub fn encode(&self) -> Value {
        match self {
            PropertyValue::Float(v) => Value::from(*v),
            PropertyValue::Int(v) => Value::from(*v),
            PropertyValue::Bool(v) => Value::Bool(*v),
            PropertyValue::String(v) => Value::String(v.clone()),
            PropertyValue::Vector3(v) => serde_json::json!({ "x": v.x, "y": v.y, "z": v.z }),
            PropertyValue::Rotator3(r) => {
                serde_json::json!({ "p": r.pitch, "y": r.yaw, "r": r.roll })
            }
            PropertyValue::Transform(t) => serde_json::json!({
                "position": { "x": t.position.x, "y": t.position.y, "z": t.position.z },
                "orientation": { "p": t.orientation.pitch, "y": t.orientation.yaw, "r": t.orientation.roll },
                "scale": { "x": t.scale.x, "y": t.scale.y, "z": t.scale.z },
            }),
            PropertyValue::None => Value::Null,
        }
    }

    /// Decode a standalone JSON value of the given kind
    pub fn decode(kind: ValueKind, json: &Value) -> Result<Self> {
        let value = match kind {
            ValueKind::Float => PropertyValue::Float(
                json.as_f64()
                    .ok_or_else(|| malformed(kind, json))?,
            ),
            ValueKind::Int => PropertyValue::Int(as_integral(json).ok_or_else(|| malformed(kind, json))?),
            ValueKind::Bool => PropertyValue::Bool(json.as_bool().ok_or_else(|| malformed(kind, json))?),
            ValueKind::String => PropertyValue::String(
                json.as_str()
                    .ok_or_else(|| malformed(kind, json))?
                    .to_string(),
            ),
            ValueKind::Vector3 => PropertyValue::Vector3(structured(kind, json)?),
            ValueKind::Rotator3 => PropertyValue::Rotator3(structured(kind, json)?),
            ValueKind::Transform => PropertyValue::Transform(structured(kind, json)?),
            ValueKind::None => {
                if !json.is_null() {
                    return Err(malformed(kind, json));
                }
                PropertyValue::None
            }
        };
        Ok(value)
    }

    /// Keys to merge into an envelope
    pub fn to_fragment(&self) -> Map<String, Value> {
        match self.encode() {
            Value::Object(map) => map,
            scalar => {
                let mut map = Map::new();
                map.insert("value".into(), scalar);
                map
            }
        }
    }

    /// Decode a value of the given kind from envelope keys
    pub fn from_fragment(kind: ValueKind, fragment: &Map<String, Value>) -> Result<Self> {
        match kind {
            ValueKind::Vector3 | ValueKind::Rotator3 | ValueKind::Transform => {
                Self::decode(kind, &Value::Object(fragment.clone()))
            }
            ValueKind::None => Ok(PropertyValue::None),
            _ => {
                let value = fragment.get("value").ok_or_else(|| {
                    SynavisError::MalformedValue(format!("missing \"value\" for {}", kind.name()))
                })?;
                Self::decode(kind, value)
            }
        }
    }
}

fn as_integral(json: &Value) -> Option<i64> {
    if let Some(v) = json.as_i64() {
        return Some(v);
    }
    let v = json.as_f64()?;
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn structured<'de, T: Deserialize<'de>>(kind: ValueKind, json: &'de Value) -> Result<T> {
    T::deserialize(json)
        .map_err(|e| SynavisError::MalformedValue(format!("expected {}: {}", kind.name(), e)))
}

fn malformed(kind: ValueKind, json: &Value) -> SynavisError {
    SynavisError::MalformedValue(format!("expected {}, got {}", kind.name(), json))
}
