//! Per-connection state

use crate::assembler::GeometryAssembler;
use crate::buffer::LegacyBuffers;
use crate::environment::Environment;
use crate::spawn::SpawnResolver;
use crate::telemetry;
use crate::tracking::TrackingRegistry;
use serde_json::Value;
use std::sync::Arc;
use synavis_core::SpawnCatalog;

/// Everything one connection accumulates between frames
///
/// Owned by the connection loop; dropped when the client disconnects.
#[derive(Debug)]
pub struct Session {
    pub assembler: GeometryAssembler,
    pub buffers: LegacyBuffers,
    pub tracking: TrackingRegistry,
    pub spawner: SpawnResolver,
    pub catalog: Arc<SpawnCatalog>,
}

impl Session {
    pub fn new(catalog: Arc<SpawnCatalog>) -> Self {
        Self {
            assembler: GeometryAssembler::new(),
            buffers: LegacyBuffers::new(),
            tracking: TrackingRegistry::new(),
            spawner: SpawnResolver::new(),
            catalog,
        }
    }

    /// Cap the bytes a geometry header or legacy buffer may declare
    pub fn with_geometry_limit(mut self, limit: usize) -> Self {
        self.assembler = GeometryAssembler::with_limit(limit);
        self.buffers = LegacyBuffers::with_limit(limit);
        self
    }

    /// Drop in-flight geometry of both streaming modes
    pub fn reset_geometry(&mut self) {
        self.assembler.reset();
        self.buffers.reset();
    }

    /// Per-tick work: pending spawns first, then the telemetry frame
    pub fn tick<E: Environment + ?Sized>(&mut self, env: &mut E) -> Vec<Value> {
        let mut outbound = self.spawner.poll(env);
        if let Some(frame) = telemetry::emit(&*env, &mut self.tracking) {
            outbound.push(frame);
        }
        outbound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::AssetSource;
    use crate::resolver::{PropertyRef, ShortcutKind};
    use crate::testing::TestScene;
    use crate::tracking::TrackedProperty;
    use serde_json::{json, Map};
    use synavis_core::ValueKind;

    fn session(scene: &TestScene) -> Session {
        Session::new(Arc::new(SpawnCatalog {
            assets: scene.scan_assets(),
            classes: scene.builtin_classes(),
        }))
    }

    #[test]
    fn test_idle_tick_sends_nothing() {
        let mut scene = TestScene::new();
        let mut session = session(&scene);
        assert!(session.tick(&mut scene).is_empty());
    }

    #[test]
    fn test_tick_announces_spawn_before_telemetry() {
        let mut scene = TestScene::new();
        scene.load_latency = 0;
        let mut session = session(&scene);
        let catalog = session.catalog.clone();
        session
            .spawner
            .spawn(&mut scene, &catalog, "Maize", &Map::new())
            .unwrap();
        let sun = scene.id_of("Sun");
        session
            .tracking
            .track(TrackedProperty::new(
                sun,
                "Sun",
                PropertyRef::Shortcut(ShortcutKind::Visibility),
                ValueKind::Bool,
            ))
            .unwrap();

        let outbound = session.tick(&mut scene);
        assert_eq!(outbound.len(), 2);
        assert_eq!(outbound[0], json!({"type": "spawned", "name": "Maize"}));
        assert_eq!(outbound[1], json!({"type": "track", "data": {"Sun.visibility": true}}));
    }
}
