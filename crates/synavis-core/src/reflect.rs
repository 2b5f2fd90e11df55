//! Reflection vocabulary shared by scene objects and the marshaller
//!
//! Scene objects describe their fields with [`FieldDescriptor`]s and exchange
//! raw storage as [`FieldValue`]s. Classification into the value model
//! happens in one place: [`FieldType::value_kind`].

use crate::error::{Result, SynavisError};
use crate::value::{Rotator3, ValueKind, Vector3};
use std::borrow::Cow;

/// Declared storage type of a reflective field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    F32,
    F64,
    I32,
    I64,
    U8,
    Bool,
    Text,
    Vector,
    Rotator,
    LinearColor,
    /// Any other structure, named by its declared type
    Struct(Cow<'static, str>),
}

impl FieldType {
    /// Declared type name reported by introspection
    pub fn type_name(&self) -> &str {
        match self {
            FieldType::F32 => "f32",
            FieldType::F64 => "f64",
            FieldType::I32 => "i32",
            FieldType::I64 => "i64",
            FieldType::U8 => "u8",
            FieldType::Bool => "bool",
            FieldType::Text => "String",
            FieldType::Vector => "Vector3",
            FieldType::Rotator => "Rotator3",
            FieldType::LinearColor => "LinearColor",
            FieldType::Struct(name) => name,
        }
    }

    /// Value-model kind for this storage
    ///
    /// Only floating, integral, boolean, text and vector storage have one.
    pub fn value_kind(&self) -> Result<ValueKind> {
        match self {
            FieldType::F32 | FieldType::F64 => Ok(ValueKind::Float),
            FieldType::I32 | FieldType::I64 | FieldType::U8 => Ok(ValueKind::Int),
            FieldType::Bool => Ok(ValueKind::Bool),
            FieldType::Text => Ok(ValueKind::String),
            FieldType::Vector => Ok(ValueKind::Vector3),
            other => Err(SynavisError::UnsupportedType(other.type_name().to_string())),
        }
    }
}

/// Name and declared type of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: Cow<'static, str>,
    pub ty: FieldType,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            ty,
        }
    }
}

/// Raw typed storage read from or written to a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    F32(f32),
    F64(f64),
    I32(i32),
    I64(i64),
    U8(u8),
    Bool(bool),
    Text(String),
    Vector(Vector3),
    Rotator(Rotator3),
    LinearColor([f32; 4]),
    /// Storage the protocol cannot represent
    Opaque(String),
}

impl FieldValue {
    /// Zero value for a declared type
    pub fn default_for(ty: &FieldType) -> Self {
        match ty {
            FieldType::F32 => FieldValue::F32(0.0),
            FieldType::F64 => FieldValue::F64(0.0),
            FieldType::I32 => FieldValue::I32(0),
            FieldType::I64 => FieldValue::I64(0),
            FieldType::U8 => FieldValue::U8(0),
            FieldType::Bool => FieldValue::Bool(false),
            FieldType::Text => FieldValue::Text(String::new()),
            FieldType::Vector => FieldValue::Vector(Vector3::default()),
            FieldType::Rotator => FieldValue::Rotator(Rotator3::default()),
            FieldType::LinearColor => FieldValue::LinearColor([1.0, 1.0, 1.0, 1.0]),
            FieldType::Struct(name) => FieldValue::Opaque(name.to_string()),
        }
    }

    /// Whether this storage matches a declared type
    pub fn matches(&self, ty: &FieldType) -> bool {
        matches!(
            (self, ty),
            (FieldValue::F32(_), FieldType::F32)
                | (FieldValue::F64(_), FieldType::F64)
                | (FieldValue::I32(_), FieldType::I32)
                | (FieldValue::I64(_), FieldType::I64)
                | (FieldValue::U8(_), FieldType::U8)
                | (FieldValue::Bool(_), FieldType::Bool)
                | (FieldValue::Text(_), FieldType::Text)
                | (FieldValue::Vector(_), FieldType::Vector)
                | (FieldValue::Rotator(_), FieldType::Rotator)
                | (FieldValue::LinearColor(_), FieldType::LinearColor)
                | (FieldValue::Opaque(_), FieldType::Struct(_))
        )
    }
}
