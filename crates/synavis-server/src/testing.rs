//! Small in-memory scene for unit tests

use crate::environment::*;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use synavis_core::{
    AssetCatalog, AssetCatalogEntry, AssetKind, ClassEntry, ClassTable, FieldDescriptor,
    FieldType, FieldValue, GeometryBuffer, LoadHandle, ObjectId, Result, Rotator3,
    SpawnParameter, SynavisError, Vector3,
};

#[derive(Debug, Clone)]
pub struct TestPlacement {
    pub position: Vector3,
    pub orientation: Rotator3,
    pub scale: Vector3,
    pub visible: bool,
}

impl Default for TestPlacement {
    fn default() -> Self {
        Self {
            position: Vector3::default(),
            orientation: Rotator3::default(),
            scale: Vector3::ONE,
            visible: true,
        }
    }
}

impl Placeable for TestPlacement {
    fn position(&self) -> Vector3 {
        self.position
    }
    fn set_position(&mut self, position: Vector3) {
        self.position = position;
    }
    fn orientation(&self) -> Rotator3 {
        self.orientation
    }
    fn set_orientation(&mut self, orientation: Rotator3) {
        self.orientation = orientation;
    }
    fn scale(&self) -> Vector3 {
        self.scale
    }
    fn set_scale(&mut self, scale: Vector3) {
        self.scale = scale;
    }
    fn is_visible(&self) -> bool {
        self.visible
    }
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

#[derive(Debug, Clone)]
pub struct TestObject {
    pub name: String,
    pub class: String,
    pub parent: Option<usize>,
    pub fields: Vec<(FieldDescriptor, FieldValue)>,
    pub placement: Option<TestPlacement>,
    pub alive: bool,
}

impl TestObject {
    fn new(name: &str, class: &str, placeable: bool) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            parent: None,
            fields: vec![],
            placement: placeable.then(TestPlacement::default),
            alive: true,
        }
    }

    fn field(mut self, name: &'static str, ty: FieldType, value: FieldValue) -> Self {
        self.fields.push((FieldDescriptor::new(name, ty), value));
        self
    }
}

impl SceneObject for TestObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_name(&self) -> &str {
        &self.class
    }

    fn describe(&self) -> Vec<FieldDescriptor> {
        self.fields.iter().map(|(d, _)| d.clone()).collect()
    }

    fn read_field(&self, name: &str) -> Option<FieldValue> {
        self.fields
            .iter()
            .find(|(d, _)| d.name == name)
            .map(|(_, v)| v.clone())
    }

    fn write_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let slot = self
            .fields
            .iter_mut()
            .find(|(d, _)| d.name == name)
            .ok_or_else(|| SynavisError::NotFound(name.to_string()))?;
        slot.1 = value;
        Ok(())
    }

    fn placeable(&self) -> Option<&dyn Placeable> {
        self.placement.as_ref().map(|p| p as &dyn Placeable)
    }

    fn placeable_mut(&mut self) -> Option<&mut dyn Placeable> {
        self.placement.as_mut().map(|p| p as &mut dyn Placeable)
    }
}

/// Scene with `Sun`, `Camera1` (child `Lens`) and `Settings`
#[derive(Debug, Default)]
pub struct TestScene {
    pub slots: Vec<TestObject>,
    pub meshes: Vec<GeometryBuffer>,
    pub console: Vec<String>,
    pub settings: Vec<Value>,
    pub loads: HashMap<u64, (String, AssetKind, String, u32)>,
    next_load: u64,
    /// Polls a load stays pending
    pub load_latency: u32,
}

impl TestScene {
    pub fn new() -> Self {
        let mut scene = Self {
            load_latency: 1,
            ..Default::default()
        };
        scene.slots.push(
            TestObject::new("Sun", "DirectionalLight", true)
                .field("Intensity", FieldType::F32, FieldValue::F32(10.0))
                .field("Enabled", FieldType::Bool, FieldValue::Bool(true))
                .field("Bounces", FieldType::I32, FieldValue::I32(2))
                .field("Label", FieldType::Text, FieldValue::Text("sun".into()))
                .field(
                    "LightColor",
                    FieldType::LinearColor,
                    FieldValue::LinearColor([1.0, 1.0, 1.0, 1.0]),
                ),
        );
        scene.slots.push(
            TestObject::new("Camera1", "CameraActor", true).field(
                "FieldOfView",
                FieldType::F32,
                FieldValue::F32(90.0),
            ),
        );
        let mut lens = TestObject::new("Lens", "LensComponent", false)
            .field("Aperture", FieldType::F64, FieldValue::F64(2.8))
            .field("Blades", FieldType::U8, FieldValue::U8(6))
            .field("scale", FieldType::F32, FieldValue::F32(1.0));
        lens.parent = Some(1);
        scene.slots.push(lens);
        scene.slots.push(
            TestObject::new("Settings", "WorldSettings", false)
                .field("Gamma", FieldType::F32, FieldValue::F32(2.2))
                .field(
                    "Material",
                    FieldType::Struct(Cow::Borrowed("MaterialRef")),
                    FieldValue::Opaque("MaterialRef".into()),
                ),
        );
        scene
    }

    pub fn id_of(&self, name: &str) -> ObjectId {
        let index = self
            .slots
            .iter()
            .position(|o| o.name == name && o.alive)
            .expect("object exists");
        ObjectId::from_parts(index as u32, 1)
    }

    pub fn destroy(&mut self, name: &str) {
        let id = self.id_of(name);
        self.slots[id.index() as usize].alive = false;
    }

    fn insert(&mut self, object: TestObject) -> ObjectId {
        self.slots.push(object);
        ObjectId::from_parts(self.slots.len() as u32 - 1, 1)
    }

    fn slot(&self, id: ObjectId) -> Option<&TestObject> {
        self.slots
            .get(id.index() as usize)
            .filter(|o| o.alive && id.generation() == 1)
    }
}

impl SceneGraph for TestScene {
    fn objects(&self) -> Vec<ObjectId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, o)| o.alive && o.parent.is_none())
            .map(|(i, _)| ObjectId::from_parts(i as u32, 1))
            .collect()
    }

    fn find_child(&self, parent: ObjectId, name: &str) -> Option<ObjectId> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, o)| o.alive && o.parent == Some(parent.index() as usize) && o.name == name)
            .map(|(i, _)| ObjectId::from_parts(i as u32, 1))
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.slot(id).is_some()
    }

    fn object(&self, id: ObjectId) -> Option<&dyn SceneObject> {
        self.slot(id).map(|o| o as &dyn SceneObject)
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut dyn SceneObject> {
        if !self.contains(id) {
            return None;
        }
        self.slots
            .get_mut(id.index() as usize)
            .map(|o| o as &mut dyn SceneObject)
    }
}

impl MeshBuilder for TestScene {
    fn build_mesh(&mut self, name: Option<&str>, geometry: GeometryBuffer) -> Result<ObjectId> {
        self.meshes.push(geometry);
        let name = name.unwrap_or("ProceduralMesh").to_string();
        Ok(self.insert(TestObject::new(&name, "ProceduralMeshActor", true)))
    }
}

impl AssetSource for TestScene {
    fn scan_assets(&self) -> AssetCatalog {
        AssetCatalog::from_entries([(
            "Maize".to_string(),
            AssetCatalogEntry {
                source_path: "/Game/Plants/Maize".into(),
                kind: AssetKind::Mesh,
            },
        )])
    }

    fn builtin_classes(&self) -> ClassTable {
        ClassTable::new(vec![
            ClassEntry {
                name: "PointLight".into(),
                parameters: vec![SpawnParameter::new("Intensity", "f32")],
            },
            ClassEntry {
                name: "BoxComponent".into(),
                parameters: vec![],
            },
        ])
    }

    fn request_load(&mut self, name: &str, entry: &AssetCatalogEntry) -> Result<LoadHandle> {
        self.next_load += 1;
        self.loads.insert(
            self.next_load,
            (
                name.to_string(),
                entry.kind,
                entry.source_path.clone(),
                self.load_latency,
            ),
        );
        Ok(LoadHandle(self.next_load))
    }

    fn poll_load(&mut self, handle: LoadHandle) -> LoadStatus {
        let Some(load) = self.loads.get_mut(&handle.0) else {
            return LoadStatus::Failed(format!("unknown {handle}"));
        };
        if load.3 > 0 {
            load.3 -= 1;
            return LoadStatus::Pending;
        }
        let (name, kind, source_path, _) = load.clone();
        self.loads.remove(&handle.0);
        LoadStatus::Ready(LoadedAsset {
            name,
            source_path,
            kind,
        })
    }

    fn instantiate_asset(&mut self, asset: &LoadedAsset) -> Result<ObjectId> {
        let object = TestObject::new(&asset.name, "StaticMeshActor", true)
            .field("CastShadow", FieldType::Bool, FieldValue::Bool(true));
        Ok(self.insert(object))
    }

    fn instantiate_class(&mut self, class: &ClassEntry) -> Result<ObjectId> {
        let name = format!("{}_{}", class.name, self.slots.len());
        let mut object = TestObject::new(&name, &class.name, true);
        if class.name == "PointLight" {
            object = object
                .field("Intensity", FieldType::F32, FieldValue::F32(1.0))
                .field("Radius", FieldType::F32, FieldValue::F32(100.0));
        }
        Ok(self.insert(object))
    }
}

impl Console for TestScene {
    fn console_command(&mut self, command: &str) -> Result<()> {
        self.console.push(command.to_string());
        Ok(())
    }
}

impl SettingsLoader for TestScene {
    fn apply_settings(&mut self, settings: &Value) -> Result<()> {
        if !settings.is_object() {
            return Err(SynavisError::MalformedValue("settings must be an object".into()));
        }
        self.settings.push(settings.clone());
        Ok(())
    }
}

impl EngineStats for TestScene {
    fn frame_time(&self) -> f64 {
        0.016
    }

    fn memory_usage(&self) -> u64 {
        4096
    }

    fn frame_rate(&self) -> f64 {
        60.0
    }
}

impl Environment for TestScene {}
