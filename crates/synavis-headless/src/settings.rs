//! Settings blobs
//!
//! Keys carry a one-letter type prefix and name a property of the settings
//! target: `fGamma`, `iMaxLights`, `bEnableWorldBoundsChecks`, `sWorldName`,
//! `vWindDirection`. The `type` key of a forwarded envelope is ignored.

use serde_json::Value;
use synavis_core::{PropertyValue, Result, SynavisError, ValueKind};
use synavis_server::SceneObject;
use synavis_server::marshal;
use synavis_server::resolver::{PropertyRef, resolve_property};
use tracing::{debug, warn};

/// Type prefix of a settings key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingPrefix {
    Float,
    Int,
    Bool,
    String,
    Vector,
}

impl SettingPrefix {
    fn from_char(prefix: char) -> Option<Self> {
        match prefix {
            'f' => Some(SettingPrefix::Float),
            'i' => Some(SettingPrefix::Int),
            'b' => Some(SettingPrefix::Bool),
            's' => Some(SettingPrefix::String),
            'v' => Some(SettingPrefix::Vector),
            _ => None,
        }
    }
}

/// Split a key into its prefix and property name
pub fn parse_key(key: &str) -> Result<(SettingPrefix, &str)> {
    let mut chars = key.chars();
    let prefix = chars
        .next()
        .and_then(SettingPrefix::from_char)
        .ok_or_else(|| SynavisError::MalformedValue(format!("setting '{key}' has no type prefix")))?;
    let name = chars.as_str();
    if name.is_empty() {
        return Err(SynavisError::MalformedValue(format!("setting '{key}' names no property")));
    }
    Ok((prefix, name))
}

/// A decoded key, with the value it replaces
struct PlannedWrite<'a> {
    key: &'a str,
    property: PropertyRef,
    value: PropertyValue,
    previous: PropertyValue,
}

/// Apply every key of a settings blob to `target`
///
/// All or nothing: when any key is rejected the target keeps its values and
/// every rejected key is reported. Returns the number of applied keys.
pub fn apply(target: &mut dyn SceneObject, settings: &Value) -> Result<usize> {
    let entries = settings
        .as_object()
        .ok_or_else(|| SynavisError::MalformedValue("settings must be a JSON object".into()))?;

    let mut planned = Vec::new();
    let mut rejected = Vec::new();
    for (key, value) in entries {
        if key == "type" {
            continue;
        }
        match plan(&*target, key, value) {
            Ok(write) => planned.push(write),
            Err(e) => {
                warn!("Setting {} rejected: {}", key, e);
                rejected.push(key.as_str());
            }
        }
    }
    if !rejected.is_empty() {
        return Err(rejected_error(&rejected));
    }

    for (index, write) in planned.iter().enumerate() {
        if let Err(e) = marshal::set(target, &write.property, write.value.clone()) {
            warn!("Setting {} rejected: {}", write.key, e);
            for done in planned[..index].iter().rev() {
                if let Err(e) = marshal::set(target, &done.property, done.previous.clone()) {
                    warn!("Could not restore {}: {}", done.key, e);
                }
            }
            return Err(rejected_error(&[write.key]));
        }
        debug!("Setting {} applied to {}", write.key, target.name());
    }
    Ok(planned.len())
}

fn plan<'a>(target: &dyn SceneObject, key: &'a str, value: &Value) -> Result<PlannedWrite<'a>> {
    let (prefix, name) = parse_key(key)?;
    let property = find_property(target, name)?;
    let value = decode(prefix, &property, value)?;
    let previous = marshal::get(target, &property)?;
    Ok(PlannedWrite {
        key,
        property,
        value,
        previous,
    })
}

fn rejected_error(keys: &[&str]) -> SynavisError {
    SynavisError::MalformedValue(format!("rejected settings: {}", keys.join(", ")))
}

/// A field of that name, else the placement shortcut (`vPosition`)
fn find_property(target: &dyn SceneObject, name: &str) -> Result<PropertyRef> {
    match resolve_property(target, name) {
        Err(SynavisError::NotFound(_)) => {
            let lowered = name.to_ascii_lowercase();
            resolve_property(target, &lowered)
        }
        other => other,
    }
}

fn decode(prefix: SettingPrefix, property: &PropertyRef, value: &Value) -> Result<PropertyValue> {
    let malformed = || SynavisError::MalformedValue(format!("{value} for {prefix:?} setting"));
    match prefix {
        SettingPrefix::Float => value.as_f64().map(PropertyValue::Float).ok_or_else(malformed),
        SettingPrefix::Int => value
            .as_i64()
            .or_else(|| value.as_f64().map(|v| v as i64))
            .map(PropertyValue::Int)
            .ok_or_else(malformed),
        SettingPrefix::Bool => value.as_bool().map(PropertyValue::Bool).ok_or_else(malformed),
        SettingPrefix::String => value
            .as_str()
            .map(|s| PropertyValue::String(s.to_string()))
            .ok_or_else(malformed),
        SettingPrefix::Vector => match property.value_kind()? {
            kind @ (ValueKind::Vector3 | ValueKind::Rotator3) => PropertyValue::decode(kind, value),
            other => Err(SynavisError::TypeMismatch(format!(
                "vector setting for {} property '{}'",
                other.name(),
                property.name()
            ))),
        },
    }
}
