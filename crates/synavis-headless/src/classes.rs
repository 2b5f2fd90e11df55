//! Class chains of the headless scene
//!
//! Each class declares its own fields and inherits its parent's; describe
//! order is root class first.

use std::borrow::Cow;
use synavis_core::{
    ClassEntry, ClassTable, FieldDescriptor, FieldType, FieldValue, SpawnParameter, Vector3,
};

/// One declared field with its initial value
#[derive(Debug)]
pub struct FieldSpec {
    pub descriptor: FieldDescriptor,
    pub default: FieldValue,
}

const fn field(name: &'static str, ty: FieldType, default: FieldValue) -> FieldSpec {
    FieldSpec {
        descriptor: FieldDescriptor::new(name, ty),
        default,
    }
}

/// Runtime class of a headless object
#[derive(Debug)]
pub struct ClassInfo {
    pub name: &'static str,
    pub parent: Option<&'static ClassInfo>,
    /// Fields declared by this class only
    pub fields: &'static [FieldSpec],
    /// Whether instances have a place in the world
    pub placeable: bool,
    /// Whether `spawn` can instantiate the class by name
    pub spawnable: bool,
}

impl ClassInfo {
    /// Root-first chain ending with this class
    pub fn chain(&'static self) -> Vec<&'static ClassInfo> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Every field including inherited ones, inherited first
    pub fn all_fields(&'static self) -> impl Iterator<Item = &'static FieldSpec> {
        self.chain().into_iter().flat_map(|class| class.fields.iter())
    }

    /// Spawn parameters: placement shortcuts, then every marshallable field
    pub fn spawn_parameters(&'static self) -> Vec<SpawnParameter> {
        let mut parameters = Vec::new();
        if self.placeable {
            parameters.push(SpawnParameter::new("position", "vector3"));
            parameters.push(SpawnParameter::new("orientation", "rotator3"));
            parameters.push(SpawnParameter::new("scale", "vector3"));
        }
        parameters.extend(
            self.all_fields()
                .filter(|spec| spec.descriptor.ty.value_kind().is_ok())
                .map(|spec| {
                    SpawnParameter::new(
                        spec.descriptor.name.to_string(),
                        spec.descriptor.ty.type_name(),
                    )
                }),
        );
        parameters
    }
}

pub static ACTOR: ClassInfo = ClassInfo {
    name: "Actor",
    parent: None,
    fields: &[
        field("Label", FieldType::Text, FieldValue::Text(String::new())),
        field("CanBeDamaged", FieldType::Bool, FieldValue::Bool(true)),
    ],
    placeable: true,
    spawnable: false,
};

pub static LIGHT: ClassInfo = ClassInfo {
    name: "Light",
    parent: Some(&ACTOR),
    fields: &[
        field("Intensity", FieldType::F32, FieldValue::F32(5000.0)),
        field(
            "LightColor",
            FieldType::LinearColor,
            FieldValue::LinearColor([1.0, 1.0, 1.0, 1.0]),
        ),
        field("CastShadows", FieldType::Bool, FieldValue::Bool(true)),
    ],
    placeable: true,
    spawnable: false,
};

pub static DIRECTIONAL_LIGHT: ClassInfo = ClassInfo {
    name: "DirectionalLight",
    parent: Some(&LIGHT),
    fields: &[
        field("LightSourceAngle", FieldType::F32, FieldValue::F32(0.5357)),
        field("AtmosphereSunLight", FieldType::Bool, FieldValue::Bool(true)),
    ],
    placeable: true,
    spawnable: true,
};

pub static POINT_LIGHT: ClassInfo = ClassInfo {
    name: "PointLight",
    parent: Some(&LIGHT),
    fields: &[
        field("AttenuationRadius", FieldType::F32, FieldValue::F32(1000.0)),
        field("SourceRadius", FieldType::F32, FieldValue::F32(0.0)),
    ],
    placeable: true,
    spawnable: true,
};

pub static SPOT_LIGHT: ClassInfo = ClassInfo {
    name: "SpotLight",
    parent: Some(&POINT_LIGHT),
    fields: &[
        field("InnerConeAngle", FieldType::F32, FieldValue::F32(0.0)),
        field("OuterConeAngle", FieldType::F32, FieldValue::F32(44.0)),
    ],
    placeable: true,
    spawnable: true,
};

pub static CAMERA_ACTOR: ClassInfo = ClassInfo {
    name: "CameraActor",
    parent: Some(&ACTOR),
    fields: &[
        field("FieldOfView", FieldType::F32, FieldValue::F32(90.0)),
        field("AspectRatio", FieldType::F32, FieldValue::F32(1.777778)),
        field("ExposureBias", FieldType::F64, FieldValue::F64(0.0)),
    ],
    placeable: true,
    spawnable: true,
};

pub static STATIC_MESH_ACTOR: ClassInfo = ClassInfo {
    name: "StaticMeshActor",
    parent: Some(&ACTOR),
    fields: &[
        field(
            "StaticMesh",
            FieldType::Struct(Cow::Borrowed("StaticMesh")),
            FieldValue::Opaque(String::new()),
        ),
        field("CastShadow", FieldType::Bool, FieldValue::Bool(true)),
    ],
    placeable: true,
    spawnable: true,
};

pub static PROCEDURAL_MESH_ACTOR: ClassInfo = ClassInfo {
    name: "ProceduralMeshActor",
    parent: Some(&ACTOR),
    fields: &[
        field("VertexCount", FieldType::I64, FieldValue::I64(0)),
        field("IndexCount", FieldType::I64, FieldValue::I64(0)),
        field("CastShadow", FieldType::Bool, FieldValue::Bool(true)),
    ],
    placeable: true,
    spawnable: false,
};

pub static COMPONENT: ClassInfo = ClassInfo {
    name: "Component",
    parent: None,
    fields: &[field("Active", FieldType::Bool, FieldValue::Bool(true))],
    placeable: false,
    spawnable: false,
};

pub static CAMERA_COMPONENT: ClassInfo = ClassInfo {
    name: "CameraComponent",
    parent: Some(&COMPONENT),
    fields: &[
        field("Aperture", FieldType::F32, FieldValue::F32(2.8)),
        field("FocalDistance", FieldType::F32, FieldValue::F32(1000.0)),
        field("BladeCount", FieldType::U8, FieldValue::U8(7)),
    ],
    placeable: false,
    spawnable: false,
};

pub static WORLD_SETTINGS: ClassInfo = ClassInfo {
    name: "WorldSettings",
    parent: None,
    fields: &[
        field("Gamma", FieldType::F32, FieldValue::F32(2.2)),
        field("TimeDilation", FieldType::F32, FieldValue::F32(1.0)),
        field("GravityZ", FieldType::F64, FieldValue::F64(-980.0)),
        field("MaxLights", FieldType::I32, FieldValue::I32(64)),
        field("EnableWorldBoundsChecks", FieldType::Bool, FieldValue::Bool(true)),
        field("WorldName", FieldType::Text, FieldValue::Text(String::new())),
        field(
            "WindDirection",
            FieldType::Vector,
            FieldValue::Vector(Vector3::new(1.0, 0.0, 0.0)),
        ),
    ],
    placeable: false,
    spawnable: false,
};

/// Every class known to the headless scene
pub static CLASSES: [&ClassInfo; 11] = [
    &ACTOR,
    &LIGHT,
    &DIRECTIONAL_LIGHT,
    &POINT_LIGHT,
    &SPOT_LIGHT,
    &CAMERA_ACTOR,
    &STATIC_MESH_ACTOR,
    &PROCEDURAL_MESH_ACTOR,
    &COMPONENT,
    &CAMERA_COMPONENT,
    &WORLD_SETTINGS,
];

pub fn find_class(name: &str) -> Option<&'static ClassInfo> {
    CLASSES.iter().copied().find(|class| class.name == name)
}

/// Built-in class table offered to `spawn`
pub fn class_table() -> ClassTable {
    ClassTable::new(
        CLASSES
            .iter()
            .filter(|class| class.spawnable)
            .map(|class| ClassEntry {
                name: class.name.to_string(),
                parameters: class.spawn_parameters(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherited_fields_first() {
        let names: Vec<_> = DIRECTIONAL_LIGHT
            .all_fields()
            .map(|spec| spec.descriptor.name.as_ref())
            .collect();
        assert_eq!(
            names,
            vec![
                "Label",
                "CanBeDamaged",
                "Intensity",
                "LightColor",
                "CastShadows",
                "LightSourceAngle",
                "AtmosphereSunLight"
            ]
        );
    }

    #[test]
    fn test_defaults_match_declared_types() {
        for class in CLASSES {
            for spec in class.fields {
                assert!(
                    spec.default.matches(&spec.descriptor.ty),
                    "{}.{}",
                    class.name,
                    spec.descriptor.name
                );
            }
        }
    }

    #[test]
    fn test_spawn_parameters_skip_unsupported_fields() {
        let table = class_table();
        let light = table.lookup("PointLight").unwrap();
        assert!(light.accepts("position"));
        assert!(light.accepts("Intensity"));
        assert!(!light.accepts("LightColor"));
        assert!(table.lookup("WorldSettings").is_none());
    }
}
