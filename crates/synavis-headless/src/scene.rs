//! In-memory scene implementing the collaborator traits

use crate::arena::ObjectArena;
use crate::classes::{self, ClassInfo};
use crate::config::HeadlessConfig;
use crate::loader::AssetLoader;
use crate::object::HeadlessObject;
use crate::settings;
use serde_json::Value;
use std::mem::{size_of, size_of_val};
use std::time::Duration;
use synavis_core::{
    AssetCatalog, AssetCatalogEntry, AssetKind, ClassEntry, ClassTable, FieldValue,
    GeometryBuffer, LoadHandle, ObjectId, Result, Rotator3, SynavisError, Vector3,
};
use synavis_server::resolver::resolve;
use synavis_server::{
    AssetSource, Console, EngineStats, Environment, LoadStatus, LoadedAsset, MeshBuilder,
    SceneGraph, SceneObject, SettingsLoader,
};
use tracing::{debug, info};

/// Scene graph, loader and engine stats without an engine
pub struct HeadlessScene {
    objects: ObjectArena<HeadlessObject>,
    /// Top-level objects in creation order
    roots: Vec<ObjectId>,
    world: HeadlessObject,
    assets: AssetCatalog,
    loader: AssetLoader,
    settings_target: Option<String>,
    console_log: Vec<String>,
    frame_time: f64,
}

impl HeadlessScene {
    pub fn new(config: HeadlessConfig) -> Self {
        let mut scene = Self {
            objects: ObjectArena::new(),
            roots: Vec::new(),
            world: HeadlessObject::new("WorldSettings", &classes::WORLD_SETTINGS),
            assets: AssetCatalog::from_entries(config.assets),
            loader: AssetLoader::new(config.load_latency),
            settings_target: config.settings_target,
            console_log: Vec::new(),
            frame_time: 0.0,
        };
        if config.demo_scene {
            scene.populate_demo();
        }
        scene
    }

    fn populate_demo(&mut self) {
        let sun = self.insert(HeadlessObject::new("Sun", &classes::DIRECTIONAL_LIGHT), None);
        if let Some(placement) = self.objects.get_mut(sun).and_then(|o| o.placement_mut()) {
            placement.position = Vector3::new(0.0, 0.0, 1000.0);
            placement.orientation = Rotator3::new(-45.0, 30.0, 0.0);
        }

        let camera = self.insert(HeadlessObject::new("Camera1", &classes::CAMERA_ACTOR), None);
        if let Some(placement) = self.objects.get_mut(camera).and_then(|o| o.placement_mut()) {
            placement.position = Vector3::new(-500.0, 0.0, 200.0);
        }
        self.insert(
            HeadlessObject::new("CameraComponent", &classes::CAMERA_COMPONENT),
            Some(camera),
        );
    }

    fn insert(&mut self, mut object: HeadlessObject, parent: Option<ObjectId>) -> ObjectId {
        object.parent = parent;
        let id = self.objects.insert(object);
        match parent.and_then(|p| self.objects.get_mut(p)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Create an object of a known class, top-level or under `parent`
    pub fn add_object(
        &mut self,
        name: &str,
        class: &str,
        parent: Option<ObjectId>,
    ) -> Result<ObjectId> {
        let class = classes::find_class(class)
            .ok_or_else(|| SynavisError::NotFound(format!("class '{class}'")))?;
        if let Some(parent) = parent {
            if !self.objects.contains(parent) {
                return Err(SynavisError::NotFound(format!("parent {parent}")));
            }
        }
        Ok(self.insert(HeadlessObject::new(name, class), parent))
    }

    /// Destroy an object and its children
    pub fn destroy(&mut self, id: ObjectId) -> bool {
        let Some(object) = self.objects.remove(id) else {
            return false;
        };
        for child in object.children {
            self.destroy(child);
        }
        match object.parent.and_then(|p| self.objects.get_mut(p)) {
            Some(parent) => parent.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }
        debug!("Destroyed {} ({})", object.name, id);
        true
    }

    /// Top-level object by name
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.objects.get(*id).is_some_and(|o| o.name == name))
    }

    pub fn get(&self, id: ObjectId) -> Option<&HeadlessObject> {
        self.objects.get(id)
    }

    /// Geometry of a mesh built from received data
    pub fn mesh(&self, id: ObjectId) -> Option<&GeometryBuffer> {
        self.objects.get(id)?.mesh.as_ref()
    }

    pub fn world_settings(&self) -> &HeadlessObject {
        &self.world
    }

    pub fn console_log(&self) -> &[String] {
        &self.console_log
    }

    /// Live objects, children included
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// `base`, or `base_N` when a top-level object already has that name
    fn unique_name(&self, base: &str) -> String {
        if self.find(base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|name| self.find(name).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    fn spawn_instance(&mut self, name: &str, class: &'static ClassInfo) -> ObjectId {
        let name = self.unique_name(name);
        self.insert(HeadlessObject::new(name, class), None)
    }
}

impl Default for HeadlessScene {
    fn default() -> Self {
        Self::new(HeadlessConfig::default())
    }
}

impl SceneGraph for HeadlessScene {
    fn objects(&self) -> Vec<ObjectId> {
        self.roots.clone()
    }

    fn find_child(&self, parent: ObjectId, name: &str) -> Option<ObjectId> {
        self.objects
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|id| self.objects.get(*id).is_some_and(|o| o.name == name))
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains(id)
    }

    fn object(&self, id: ObjectId) -> Option<&dyn SceneObject> {
        self.objects.get(id).map(|o| o as &dyn SceneObject)
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut dyn SceneObject> {
        self.objects.get_mut(id).map(|o| o as &mut dyn SceneObject)
    }
}

impl MeshBuilder for HeadlessScene {
    fn build_mesh(&mut self, name: Option<&str>, geometry: GeometryBuffer) -> Result<ObjectId> {
        let id = self.spawn_instance(name.unwrap_or("ProceduralMesh"), &classes::PROCEDURAL_MESH_ACTOR);
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| SynavisError::NotFound(format!("mesh actor {id}")))?;
        object.write_field("VertexCount", FieldValue::I64(geometry.points.len() as i64))?;
        object.write_field("IndexCount", FieldValue::I64(geometry.triangles.len() as i64))?;
        info!(
            "Mesh actor {} created with {} points",
            object.name,
            geometry.points.len()
        );
        object.mesh = Some(geometry);
        Ok(id)
    }
}

impl AssetSource for HeadlessScene {
    fn scan_assets(&self) -> AssetCatalog {
        self.assets.clone()
    }

    fn builtin_classes(&self) -> ClassTable {
        classes::class_table()
    }

    fn request_load(&mut self, name: &str, entry: &AssetCatalogEntry) -> Result<LoadHandle> {
        Ok(self.loader.request(name, entry))
    }

    fn poll_load(&mut self, handle: LoadHandle) -> LoadStatus {
        self.loader.poll(handle)
    }

    fn instantiate_asset(&mut self, asset: &LoadedAsset) -> Result<ObjectId> {
        if asset.kind == AssetKind::Material {
            return Err(SynavisError::CapabilityMissing(format!(
                "material '{}' cannot be placed",
                asset.name
            )));
        }
        let id = self.spawn_instance(&asset.name, &classes::STATIC_MESH_ACTOR);
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| SynavisError::NotFound(format!("asset actor {id}")))?;
        object.write_field("StaticMesh", FieldValue::Opaque(asset.source_path.clone()))?;
        Ok(id)
    }

    fn instantiate_class(&mut self, class: &ClassEntry) -> Result<ObjectId> {
        let info = classes::find_class(&class.name)
            .filter(|info| info.spawnable)
            .ok_or_else(|| SynavisError::NotFound(format!("class '{}'", class.name)))?;
        Ok(self.spawn_instance(info.name, info))
    }
}

impl Console for HeadlessScene {
    fn console_command(&mut self, command: &str) -> Result<()> {
        if command.trim().is_empty() {
            return Err(SynavisError::MalformedValue("empty console command".into()));
        }
        info!("Console command: {}", command);
        self.console_log.push(command.to_string());
        Ok(())
    }
}

impl SettingsLoader for HeadlessScene {
    fn apply_settings(&mut self, blob: &Value) -> Result<()> {
        let applied = match self.settings_target.clone() {
            Some(path) => {
                let id = resolve(&*self, &path)?;
                let target = self
                    .objects
                    .get_mut(id)
                    .ok_or_else(|| SynavisError::NotFound(format!("settings target '{path}'")))?;
                settings::apply(target, blob)?
            }
            None => settings::apply(&mut self.world, blob)?,
        };
        info!("Applied {} settings", applied);
        Ok(())
    }
}

impl EngineStats for HeadlessScene {
    fn frame_time(&self) -> f64 {
        self.frame_time
    }

    /// Object storage plus mesh arrays
    fn memory_usage(&self) -> u64 {
        let meshes: usize = self
            .objects
            .iter()
            .filter_map(|(_, o)| o.mesh.as_ref())
            .map(|m| {
                size_of_val(m.points.as_slice())
                    + size_of_val(m.normals.as_slice())
                    + size_of_val(m.triangles.as_slice())
                    + size_of_val(m.uvs.as_slice())
                    + size_of_val(m.tangents.as_slice())
                    + size_of_val(m.scalars.as_slice())
            })
            .sum();
        (self.objects.len() * size_of::<HeadlessObject>() + meshes) as u64
    }

    fn frame_rate(&self) -> f64 {
        if self.frame_time > 0.0 {
            1.0 / self.frame_time
        } else {
            0.0
        }
    }
}

impl Environment for HeadlessScene {
    fn advance(&mut self, dt: Duration) {
        self.frame_time = dt.as_secs_f64();
        self.loader.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synavis_core::Vec3;

    #[test]
    fn test_demo_scene() {
        let scene = HeadlessScene::default();
        let names: Vec<_> = scene
            .objects()
            .into_iter()
            .map(|id| scene.object(id).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["Sun", "Camera1"]);
        let camera = scene.find("Camera1").unwrap();
        assert!(scene.find_child(camera, "CameraComponent").is_some());
        assert!(scene.find_child(camera, "cameracomponent").is_none());
        assert_eq!(scene.len(), 3);
    }

    #[test]
    fn test_empty_scene() {
        let scene = HeadlessScene::new(HeadlessConfig {
            demo_scene: false,
            ..Default::default()
        });
        assert!(scene.is_empty());
        assert!(scene.objects().is_empty());
    }

    #[test]
    fn test_destroy_removes_children() {
        let mut scene = HeadlessScene::default();
        let camera = scene.find("Camera1").unwrap();
        let component = scene.find_child(camera, "CameraComponent").unwrap();
        assert!(scene.destroy(camera));
        assert!(!scene.contains(camera));
        assert!(!scene.contains(component));
        assert_eq!(scene.objects().len(), 1);
        assert!(!scene.destroy(camera));
    }

    #[test]
    fn test_mesh_names_are_unique() {
        let mut scene = HeadlessScene::default();
        let geometry = GeometryBuffer {
            points: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            triangles: vec![0, 1, 2],
            ..Default::default()
        };
        let first = scene.build_mesh(Some("Plant"), geometry.clone()).unwrap();
        let second = scene.build_mesh(Some("Plant"), geometry).unwrap();
        assert_eq!(scene.get(first).unwrap().name, "Plant");
        assert_eq!(scene.get(second).unwrap().name, "Plant_1");
        assert_eq!(
            scene.get(second).unwrap().read_field("IndexCount"),
            Some(FieldValue::I64(3))
        );
        assert_eq!(scene.mesh(first).unwrap().points.len(), 3);
        assert!(scene.memory_usage() > 0);
    }

    #[test]
    fn test_material_assets_cannot_be_placed() {
        let mut scene = HeadlessScene::default();
        let asset = LoadedAsset {
            name: "Soil".into(),
            source_path: "/Game/Materials/M_Soil".into(),
            kind: AssetKind::Material,
        };
        assert!(matches!(
            scene.instantiate_asset(&asset),
            Err(SynavisError::CapabilityMissing(_))
        ));
    }

    #[test]
    fn test_settings_target_path() {
        let mut scene = HeadlessScene::new(HeadlessConfig {
            settings_target: Some("Camera1".into()),
            ..Default::default()
        });
        scene
            .apply_settings(&serde_json::json!({"fFieldOfView": 60.0}))
            .unwrap();
        let camera = scene.get(scene.find("Camera1").unwrap()).unwrap();
        assert_eq!(camera.read_field("FieldOfView"), Some(FieldValue::F32(60.0)));
    }

    #[test]
    fn test_advance_drives_stats() {
        let mut scene = HeadlessScene::default();
        assert_eq!(scene.frame_rate(), 0.0);
        scene.advance(Duration::from_millis(20));
        assert!((scene.frame_time() - 0.02).abs() < 1e-9);
        assert!((scene.frame_rate() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_console_log() {
        let mut scene = HeadlessScene::default();
        scene.console_command("r.ScreenPercentage 50").unwrap();
        assert!(scene.console_command("  ").is_err());
        assert_eq!(scene.console_log(), ["r.ScreenPercentage 50"]);
    }
}
