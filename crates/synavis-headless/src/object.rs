//! Headless scene objects

use crate::classes::ClassInfo;
use synavis_core::{
    FieldDescriptor, FieldValue, GeometryBuffer, ObjectId, Result, Rotator3, SynavisError,
    Vector3,
};
use synavis_server::{Placeable, SceneObject};

/// World placement of an actor
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub position: Vector3,
    pub orientation: Rotator3,
    pub scale: Vector3,
    pub visible: bool,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vector3::default(),
            orientation: Rotator3::default(),
            scale: Vector3::ONE,
            visible: true,
        }
    }
}

impl Placeable for Placement {
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

/// An object of the headless scene
#[derive(Debug)]
pub struct HeadlessObject {
    pub name: String,
    pub class: &'static ClassInfo,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
    /// Storage aligned with `class.all_fields()`
    values: Vec<FieldValue>,
    placement: Option<Placement>,
    /// Geometry of procedural meshes
    pub mesh: Option<GeometryBuffer>,
}

impl HeadlessObject {
    /// New object with every field at its class default
    pub fn new(name: impl Into<String>, class: &'static ClassInfo) -> Self {
        Self {
            name: name.into(),
            class,
            parent: None,
            children: Vec::new(),
            values: class.all_fields().map(|spec| spec.default.clone()).collect(),
            placement: class.placeable.then(Placement::default),
            mesh: None,
        }
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    pub fn placement_mut(&mut self) -> Option<&mut Placement> {
        self.placement.as_mut()
    }

    fn slot(&self, name: &str) -> Option<(usize, &'static FieldDescriptor)> {
        self.class
            .all_fields()
            .enumerate()
            .find(|(_, spec)| spec.descriptor.name == name)
            .map(|(index, spec)| (index, &spec.descriptor))
    }
}

impl SceneObject for HeadlessObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_name(&self) -> &str {
        self.class.name
    }

    fn describe(&self) -> Vec<FieldDescriptor> {
        self.class
            .all_fields()
            .map(|spec| spec.descriptor.clone())
            .collect()
    }

    fn read_field(&self, name: &str) -> Option<FieldValue> {
        let (index, _) = self.slot(name)?;
        self.values.get(index).cloned()
    }

    fn write_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let (index, descriptor) = self
            .slot(name)
            .ok_or_else(|| SynavisError::NotFound(format!("field '{}.{}'", self.name, name)))?;
        if !value.matches(&descriptor.ty) {
            return Err(SynavisError::TypeMismatch(format!(
                "{:?} for {} field '{}'",
                value,
                descriptor.ty.type_name(),
                name
            )));
        }
        self.values[index] = value;
        Ok(())
    }

    fn placeable(&self) -> Option<&dyn Placeable> {
        self.placement.as_ref().map(|p| p as &dyn Placeable)
    }

    fn placeable_mut(&mut self) -> Option<&mut dyn Placeable> {
        self.placement.as_mut().map(|p| p as &mut dyn Placeable)
    }
}
