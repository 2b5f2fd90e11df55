//! Collaborator traits
//!
//! Implement these to expose a scene as a Synavis environment. Every call is
//! synchronous: commands run to completion inside the tick they arrive in.

use serde_json::Value;
use std::time::Duration;
use synavis_core::{
    AssetCatalog, AssetCatalogEntry, AssetKind, ClassEntry, ClassTable, FieldDescriptor,
    FieldValue, GeometryBuffer, LoadHandle, ObjectId, Result, Rotator3, Vector3,
};

/// Capability of objects that have a place in the world
pub trait Placeable {
    fn position(&self) -> Vector3;
    fn set_position(&mut self, position: Vector3);
    fn orientation(&self) -> Rotator3;
    fn set_orientation(&mut self, orientation: Rotator3);
    fn scale(&self) -> Vector3;
    fn set_scale(&mut self, scale: Vector3);
    fn is_visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);
}

/// An object in the scene graph
pub trait SceneObject {
    fn name(&self) -> &str;

    /// Runtime type name
    fn class_name(&self) -> &str;

    /// Every reflective field, inherited members first, in declaration order
    fn describe(&self) -> Vec<FieldDescriptor>;

    /// Raw storage of a field, `None` when no such field exists
    fn read_field(&self, name: &str) -> Option<FieldValue>;

    /// Overwrite a field; the value already matches the declared type
    fn write_field(&mut self, name: &str, value: FieldValue) -> Result<()>;

    fn placeable(&self) -> Option<&dyn Placeable> {
        None
    }

    fn placeable_mut(&mut self) -> Option<&mut dyn Placeable> {
        None
    }
}

/// The live object graph
pub trait SceneGraph {
    /// Top-level objects in enumeration order
    fn objects(&self) -> Vec<ObjectId>;

    /// Direct child of `parent` with exactly this name
    fn find_child(&self, parent: ObjectId, name: &str) -> Option<ObjectId>;

    /// Whether the handle still refers to a live object
    fn contains(&self, id: ObjectId) -> bool;

    fn object(&self, id: ObjectId) -> Option<&dyn SceneObject>;

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut dyn SceneObject>;
}

/// Turns received geometry into a scene object
pub trait MeshBuilder {
    fn build_mesh(&mut self, name: Option<&str>, geometry: GeometryBuffer) -> Result<ObjectId>;
}

/// Asset loaded by the async loader
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAsset {
    pub name: String,
    pub source_path: String,
    pub kind: AssetKind,
}

/// State of an asynchronous load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Pending,
    Ready(LoadedAsset),
    Failed(String),
}

/// Asset registry, async loader and class instantiation
pub trait AssetSource {
    /// Scan the asset registry; called once at startup
    fn scan_assets(&self) -> AssetCatalog;

    /// Engine classes that can be spawned by name; called once at startup
    fn builtin_classes(&self) -> ClassTable;

    fn request_load(&mut self, name: &str, entry: &AssetCatalogEntry) -> Result<LoadHandle>;

    fn poll_load(&mut self, handle: LoadHandle) -> LoadStatus;

    fn instantiate_asset(&mut self, asset: &LoadedAsset) -> Result<ObjectId>;

    fn instantiate_class(&mut self, class: &ClassEntry) -> Result<ObjectId>;
}

/// Raw console command pass-through
pub trait Console {
    fn console_command(&mut self, command: &str) -> Result<()>;
}

/// Applies a settings blob
pub trait SettingsLoader {
    fn apply_settings(&mut self, settings: &Value) -> Result<()>;
}

/// Runtime statistics reported by `info`
pub trait EngineStats {
    /// Seconds spent on the last tick
    fn frame_time(&self) -> f64;

    /// Bytes in use
    fn memory_usage(&self) -> u64;

    fn frame_rate(&self) -> f64;
}

/// Everything the server needs from the engine side
pub trait Environment:
    SceneGraph + MeshBuilder + AssetSource + Console + SettingsLoader + EngineStats + Send + 'static
{
    /// Advance engine-side time by one scheduling tick
    fn advance(&mut self, _dt: Duration) {}
}
