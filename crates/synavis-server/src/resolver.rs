//! Dotted object paths and property names

use crate::environment::{SceneGraph, SceneObject};
use synavis_core::{FieldDescriptor, ObjectId, Result, SynavisError, ValueKind};

/// Properties served by the placeable capability instead of reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutKind {
    Position,
    Orientation,
    Scale,
    Visibility,
}

impl ShortcutKind {
    pub const ALL: [ShortcutKind; 4] = [
        ShortcutKind::Position,
        ShortcutKind::Orientation,
        ShortcutKind::Scale,
        ShortcutKind::Visibility,
    ];

    /// Case-sensitive match against the shortcut table
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShortcutKind::Position => "position",
            ShortcutKind::Orientation => "orientation",
            ShortcutKind::Scale => "scale",
            ShortcutKind::Visibility => "visibility",
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            ShortcutKind::Position | ShortcutKind::Scale => ValueKind::Vector3,
            ShortcutKind::Orientation => ValueKind::Rotator3,
            ShortcutKind::Visibility => ValueKind::Bool,
        }
    }
}

/// A resolved property of one object
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyRef {
    Shortcut(ShortcutKind),
    Field(FieldDescriptor),
}

impl PropertyRef {
    pub fn name(&self) -> &str {
        match self {
            PropertyRef::Shortcut(s) => s.name(),
            PropertyRef::Field(f) => &f.name,
        }
    }

    /// Value kind, `UnsupportedType` for fields outside the value model
    pub fn value_kind(&self) -> Result<ValueKind> {
        match self {
            PropertyRef::Shortcut(s) => Ok(s.value_kind()),
            PropertyRef::Field(f) => f.ty.value_kind(),
        }
    }
}

/// Walk a dotted path from the top-level objects down through children
///
/// Every segment must match exactly; there is no wildcard or index syntax.
pub fn resolve<G: SceneGraph + ?Sized>(graph: &G, path: &str) -> Result<ObjectId> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or_default();
    if first.is_empty() {
        return Err(SynavisError::NotFound(format!("empty object path '{path}'")));
    }

    let mut current = graph
        .objects()
        .into_iter()
        .find(|id| graph.object(*id).is_some_and(|o| o.name() == first))
        .ok_or_else(|| SynavisError::NotFound(format!("object '{first}'")))?;

    for segment in segments {
        current = graph
            .find_child(current, segment)
            .ok_or_else(|| SynavisError::NotFound(format!("'{segment}' in path '{path}'")))?;
    }
    Ok(current)
}

/// Resolve a property name on one object
///
/// Shortcut names win on placeable objects. On other objects they fall back
/// to a field of the same name, and fail with `CapabilityMissing` when there
/// is none.
pub fn resolve_property(object: &dyn SceneObject, name: &str) -> Result<PropertyRef> {
    if let Some(shortcut) = ShortcutKind::from_name(name) {
        if object.placeable().is_some() {
            return Ok(PropertyRef::Shortcut(shortcut));
        }
        return find_field(object, name).map(PropertyRef::Field).ok_or_else(|| {
            SynavisError::CapabilityMissing(format!(
                "'{}' has no {} (not placeable)",
                object.name(),
                name
            ))
        });
    }

    find_field(object, name)
        .map(PropertyRef::Field)
        .ok_or_else(|| SynavisError::NotFound(format!("property '{}.{}'", object.name(), name)))
}

/// An object plus, optionally, one of its properties
///
/// Valid for the message that produced it; only tracking keeps one longer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub id: ObjectId,
    pub property: Option<PropertyRef>,
}

/// Resolve an object path and, when given, a property name on it
pub fn resolve_target<G: SceneGraph + ?Sized>(
    graph: &G,
    path: &str,
    property: Option<&str>,
) -> Result<ResolvedTarget> {
    let id = resolve(graph, path)?;
    let property = match property {
        Some(name) => {
            let object = graph
                .object(id)
                .ok_or_else(|| SynavisError::NotFound(format!("object '{path}'")))?;
            Some(resolve_property(object, name)?)
        }
        None => None,
    };
    Ok(ResolvedTarget { id, property })
}

fn find_field(object: &dyn SceneObject, name: &str) -> Option<FieldDescriptor> {
    object.describe().into_iter().find(|f| f.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestScene;

    #[test]
    fn test_resolve_top_level_and_child() {
        let scene = TestScene::new();
        assert_eq!(resolve(&scene, "Sun").unwrap(), scene.id_of("Sun"));
        assert_eq!(resolve(&scene, "Camera1.Lens").unwrap(), scene.id_of("Lens"));
    }

    #[test]
    fn test_resolve_is_exact() {
        let scene = TestScene::new();
        assert!(matches!(resolve(&scene, "sun"), Err(SynavisError::NotFound(_))));
        assert!(matches!(resolve(&scene, "Lens"), Err(SynavisError::NotFound(_))));
        assert!(matches!(
            resolve(&scene, "Camera1.Missing"),
            Err(SynavisError::NotFound(_))
        ));
        assert!(matches!(resolve(&scene, ""), Err(SynavisError::NotFound(_))));
        assert!(matches!(resolve(&scene, "Camera1."), Err(SynavisError::NotFound(_))));
    }

    #[test]
    fn test_destroyed_object_does_not_resolve() {
        let mut scene = TestScene::new();
        scene.destroy("Sun");
        assert!(resolve(&scene, "Sun").is_err());
    }

    #[test]
    fn test_shortcut_on_placeable() {
        let scene = TestScene::new();
        let property = resolve_target(&scene, "Sun", Some("position")).unwrap().property.unwrap();
        assert_eq!(property, PropertyRef::Shortcut(ShortcutKind::Position));
        assert_eq!(property.value_kind().unwrap(), ValueKind::Vector3);
    }

    #[test]
    fn test_shortcut_names_are_case_sensitive() {
        let scene = TestScene::new();
        let err = resolve_target(&scene, "Sun", Some("Position")).unwrap_err();
        assert!(matches!(err, SynavisError::NotFound(_)));
    }

    #[test]
    fn test_shortcut_falls_back_to_field() {
        let scene = TestScene::new();
        let target = resolve_target(&scene, "Camera1.Lens", Some("scale")).unwrap();
        assert_eq!(target.id, scene.id_of("Lens"));
        let property = target.property.unwrap();
        assert!(matches!(property, PropertyRef::Field(ref f) if f.name == "scale"));
    }

    #[test]
    fn test_shortcut_without_capability() {
        let scene = TestScene::new();
        let err = resolve_target(&scene, "Settings", Some("position")).unwrap_err();
        assert!(matches!(err, SynavisError::CapabilityMissing(_)));
    }

    #[test]
    fn test_object_only_target() {
        let scene = TestScene::new();
        let target = resolve_target(&scene, "Camera1", None).unwrap();
        assert_eq!(target.id, scene.id_of("Camera1"));
        assert!(target.property.is_none());
    }

    #[test]
    fn test_unknown_field() {
        let scene = TestScene::new();
        let err = resolve_target(&scene, "Sun", Some("Radius")).unwrap_err();
        assert!(matches!(err, SynavisError::NotFound(_)));
    }
}
