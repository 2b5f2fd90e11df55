//! Property marshalling between field storage and the value model

use crate::environment::SceneObject;
use crate::resolver::{PropertyRef, ShortcutKind};
use serde_json::{Map, Value};
use synavis_core::{
    FieldDescriptor, FieldType, FieldValue, PropertyValue, Result, SynavisError,
};

/// Read a resolved property
pub fn get(object: &dyn SceneObject, property: &PropertyRef) -> Result<PropertyValue> {
    match property {
        PropertyRef::Shortcut(shortcut) => {
            let placeable = object.placeable().ok_or_else(|| not_placeable(object))?;
            Ok(match shortcut {
                ShortcutKind::Position => PropertyValue::Vector3(placeable.position()),
                ShortcutKind::Orientation => PropertyValue::Rotator3(placeable.orientation()),
                ShortcutKind::Scale => PropertyValue::Vector3(placeable.scale()),
                ShortcutKind::Visibility => PropertyValue::Bool(placeable.is_visible()),
            })
        }
        PropertyRef::Field(field) => {
            field.ty.value_kind()?;
            let raw = object.read_field(&field.name).ok_or_else(|| {
                SynavisError::NotFound(format!("property '{}.{}'", object.name(), field.name))
            })?;
            field_to_value(field, raw)
        }
    }
}

/// Write a resolved property; nothing changes when the value is rejected
///
/// Non-finite floats are rejected so every stored value encodes to JSON.
pub fn set(object: &mut dyn SceneObject, property: &PropertyRef, value: PropertyValue) -> Result<()> {
    if !value.is_finite() {
        return Err(SynavisError::MalformedValue(format!(
            "non-finite {} for '{}'",
            value.kind().name(),
            property.name()
        )));
    }
    match property {
        PropertyRef::Shortcut(shortcut) => {
            let name = object.name().to_string();
            let placeable = object
                .placeable_mut()
                .ok_or_else(|| SynavisError::CapabilityMissing(format!("'{name}' is not placeable")))?;
            match (shortcut, value) {
                (ShortcutKind::Position, PropertyValue::Vector3(v)) => placeable.set_position(v),
                (ShortcutKind::Orientation, PropertyValue::Rotator3(r)) => {
                    placeable.set_orientation(r)
                }
                (ShortcutKind::Scale, PropertyValue::Vector3(v)) => placeable.set_scale(v),
                (ShortcutKind::Visibility, PropertyValue::Bool(b)) => placeable.set_visible(b),
                (shortcut, value) => {
                    return Err(SynavisError::TypeMismatch(format!(
                        "cannot assign {} to {}",
                        value.kind().name(),
                        shortcut.name()
                    )));
                }
            }
            Ok(())
        }
        PropertyRef::Field(field) => {
            let raw = value_to_field(field, value)?;
            object.write_field(&field.name, raw)
        }
    }
}

/// Classify raw storage into the value model
pub fn field_to_value(field: &FieldDescriptor, raw: FieldValue) -> Result<PropertyValue> {
    if !raw.matches(&field.ty) {
        return Err(SynavisError::TypeMismatch(format!(
            "'{}' holds storage that does not match {}",
            field.name,
            field.ty.type_name()
        )));
    }
    match raw {
        FieldValue::F32(v) => Ok(PropertyValue::Float(v as f64)),
        FieldValue::F64(v) => Ok(PropertyValue::Float(v)),
        FieldValue::I32(v) => Ok(PropertyValue::Int(v as i64)),
        FieldValue::I64(v) => Ok(PropertyValue::Int(v)),
        FieldValue::U8(v) => Ok(PropertyValue::Int(v as i64)),
        FieldValue::Bool(v) => Ok(PropertyValue::Bool(v)),
        FieldValue::Text(v) => Ok(PropertyValue::String(v)),
        FieldValue::Vector(v) => Ok(PropertyValue::Vector3(v)),
        FieldValue::Rotator(_) | FieldValue::LinearColor(_) | FieldValue::Opaque(_) => Err(
            SynavisError::UnsupportedType(field.ty.type_name().to_string()),
        ),
    }
}

/// Convert a value into storage for the declared field type
///
/// Integers widen into floating storage. Floats never narrow into integral
/// storage, and integers that do not fit the field are rejected.
pub fn value_to_field(field: &FieldDescriptor, value: PropertyValue) -> Result<FieldValue> {
    field.ty.value_kind()?;
    let mismatch = |value: &PropertyValue| {
        SynavisError::TypeMismatch(format!(
            "cannot assign {} to {} field '{}'",
            value.kind().name(),
            field.ty.type_name(),
            field.name
        ))
    };

    let raw = match (&field.ty, &value) {
        (FieldType::F32, PropertyValue::Float(v)) => FieldValue::F32(*v as f32),
        (FieldType::F32, PropertyValue::Int(v)) => FieldValue::F32(*v as f32),
        (FieldType::F64, PropertyValue::Float(v)) => FieldValue::F64(*v),
        (FieldType::F64, PropertyValue::Int(v)) => FieldValue::F64(*v as f64),
        (FieldType::I32, PropertyValue::Int(v)) => {
            FieldValue::I32(i32::try_from(*v).map_err(|_| overflow(field, *v))?)
        }
        (FieldType::I64, PropertyValue::Int(v)) => FieldValue::I64(*v),
        (FieldType::U8, PropertyValue::Int(v)) => {
            FieldValue::U8(u8::try_from(*v).map_err(|_| overflow(field, *v))?)
        }
        (FieldType::Bool, PropertyValue::Bool(v)) => FieldValue::Bool(*v),
        (FieldType::Text, PropertyValue::String(v)) => FieldValue::Text(v.clone()),
        (FieldType::Vector, PropertyValue::Vector3(v)) => FieldValue::Vector(*v),
        _ => return Err(mismatch(&value)),
    };
    Ok(raw)
}

/// Every field of an object with its declared type name, in declaration order
pub fn describe_all(object: &dyn SceneObject) -> Value {
    let fields: Map<String, Value> = object
        .describe()
        .into_iter()
        .map(|f| (f.name.to_string(), Value::String(f.ty.type_name().to_string())))
        .collect();
    Value::Object(fields)
}

fn overflow(field: &FieldDescriptor, value: i64) -> SynavisError {
    SynavisError::TypeMismatch(format!(
        "{} does not fit {} field '{}'",
        value,
        field.ty.type_name(),
        field.name
    ))
}

fn not_placeable(object: &dyn SceneObject) -> SynavisError {
    SynavisError::CapabilityMissing(format!("'{}' is not placeable", object.name()))
}
