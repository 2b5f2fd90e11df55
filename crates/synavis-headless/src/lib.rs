//! # synavis-headless
//!
//! A Synavis environment without an engine behind it.
//!
//! This crate provides:
//! - A generational arena of objects with class chains and child components
//! - A mesh builder that records received geometry as new actors
//! - A tick-driven asset loader and the built-in class table
//! - Console log, prefixed-key settings loader and engine stats
//!
//! Used by the server binary when no engine is attached, and as the scene for
//! end-to-end tests.

pub mod arena;
pub mod classes;
pub mod config;
pub mod loader;
pub mod object;
pub mod scene;
pub mod settings;

pub use config::HeadlessConfig;
pub use object::{HeadlessObject, Placement};
pub use scene::HeadlessScene;

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use synavis_core::{FieldValue, SpawnCatalog, Vec2, Vec3};
    use synavis_server::dispatch::handle_envelope;
    use synavis_server::{AssetSource, Environment, SceneGraph, SceneObject, Session};

    fn setup() -> (HeadlessScene, Session) {
        let scene = HeadlessScene::default();
        let catalog = SpawnCatalog {
            assets: scene.scan_assets(),
            classes: scene.builtin_classes(),
        };
        (scene, Session::new(Arc::new(catalog)))
    }

    fn send(scene: &mut HeadlessScene, session: &mut Session, envelope: Value) -> Value {
        handle_envelope(scene, session, &envelope.to_string())
    }

    /// One connection-loop tick
    fn tick(scene: &mut HeadlessScene, session: &mut Session) -> Vec<Value> {
        scene.advance(Duration::from_millis(16));
        session.tick(scene)
    }

    #[test]
    fn test_query_all() {
        let (mut scene, mut session) = setup();
        let reply = send(&mut scene, &mut session, json!({"type": "query"}));
        assert_eq!(
            reply,
            json!({"type": "query", "name": "all", "data": ["Sun", "Camera1"]})
        );
    }

    #[test]
    fn test_object_named_all_can_be_described() {
        let (mut scene, mut session) = setup();
        scene.add_object("all", "PointLight", None).unwrap();
        let reply = send(&mut scene, &mut session, json!({"type": "query", "object": "all"}));
        assert_eq!(reply["name"], "all");
        assert_eq!(reply["data"]["Intensity"], "f32");

        let reply = send(&mut scene, &mut session, json!({"type": "query"}));
        assert_eq!(reply["data"], json!(["Sun", "Camera1", "all"]));
    }

    #[test]
    fn test_set_position_then_get() {
        let (mut scene, mut session) = setup();
        send(
            &mut scene,
            &mut session,
            json!({"type": "parameter", "object": "Camera1", "property": "position", "x": 10.0, "y": -4.5, "z": 120.0}),
        );
        let reply = send(
            &mut scene,
            &mut session,
            json!({"type": "query", "object": "Camera1", "property": "position"}),
        );
        assert_eq!(reply["data"], json!({"x": 10.0, "y": -4.5, "z": 120.0}));
    }

    #[test]
    fn test_component_property() {
        let (mut scene, mut session) = setup();
        let reply = send(
            &mut scene,
            &mut session,
            json!({"type": "parameter", "object": "Camera1.CameraComponent", "property": "BladeCount", "value": 9}),
        );
        assert_eq!(reply["data"], json!(9));

        let reply = send(
            &mut scene,
            &mut session,
            json!({"type": "parameter", "object": "Camera1.CameraComponent", "property": "BladeCount", "value": 300}),
        );
        assert_eq!(reply["type"], "error");

        let reply = send(
            &mut scene,
            &mut session,
            json!({"type": "parameter", "object": "Camera1.CameraComponent", "property": "position", "x": 0.0, "y": 0.0, "z": 0.0}),
        );
        assert_eq!(reply["type"], "error");
    }

    #[test]
    fn test_describe_lists_inherited_fields_first() {
        let (mut scene, mut session) = setup();
        let reply = send(&mut scene, &mut session, json!({"type": "query", "object": "Camera1"}));
        let names: Vec<_> = reply["data"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            names,
            vec!["Label", "CanBeDamaged", "FieldOfView", "AspectRatio", "ExposureBias"]
        );
        assert_eq!(reply["data"]["FieldOfView"], "f32");
    }

    #[test]
    fn test_duplicate_track_is_rejected() {
        let (mut scene, mut session) = setup();
        let track = json!({"type": "track", "object": "Sun", "property": "Intensity"});
        assert_eq!(send(&mut scene, &mut session, track.clone())["state"], "added");
        assert_eq!(send(&mut scene, &mut session, track)["type"], "error");

        let frames = tick(&mut scene, &mut session);
        assert_eq!(frames, vec![json!({"type": "track", "data": {"Sun.Intensity": 5000.0}})]);
    }

    #[test]
    fn test_destroyed_target_stops_telemetry() {
        let (mut scene, mut session) = setup();
        send(
            &mut scene,
            &mut session,
            json!({"type": "track", "object": "Sun", "property": "visibility"}),
        );
        assert_eq!(tick(&mut scene, &mut session).len(), 1);

        let sun = scene.find("Sun").unwrap();
        scene.destroy(sun);
        assert!(tick(&mut scene, &mut session).is_empty());
        assert!(session.tracking.is_empty());
    }

    #[test]
    fn test_unknown_spawn_creates_nothing() {
        let (mut scene, mut session) = setup();
        let before = scene.len();
        let reply = send(&mut scene, &mut session, json!({"type": "spawn", "name": "Dragon"}));
        assert_eq!(reply["type"], "error");
        assert_eq!(scene.len(), before);
        assert!(tick(&mut scene, &mut session).is_empty());
    }

    #[test]
    fn test_asset_spawn_completes_after_latency() {
        let (mut scene, mut session) = setup();
        let reply = send(
            &mut scene,
            &mut session,
            json!({"type": "spawn", "name": "Maize", "parameters": {"position": {"x": 5.0, "y": 0.0, "z": 0.0}}}),
        );
        assert_eq!(reply, json!({"type": "spawn", "name": "Maize", "state": "pending"}));

        assert!(tick(&mut scene, &mut session).is_empty());
        let frames = tick(&mut scene, &mut session);
        assert_eq!(frames, vec![json!({"type": "spawned", "name": "Maize"})]);

        let maize = scene.find("Maize").unwrap();
        let placement = scene.get(maize).unwrap().placement().unwrap();
        assert_eq!(placement.position.x, 5.0);
    }

    #[test]
    fn test_class_spawn_reports_rejected_parameters() {
        let (mut scene, mut session) = setup();
        let reply = send(
            &mut scene,
            &mut session,
            json!({"type": "spawn", "name": "PointLight", "parameters": {"Intensity": 800.0, "LightColor": 1.0}}),
        );
        assert_eq!(
            reply,
            json!({"type": "spawn", "name": "PointLight", "rejected": ["LightColor"]})
        );
        let light = scene.get(scene.find("PointLight").unwrap()).unwrap();
        assert_eq!(light.read_field("Intensity"), Some(FieldValue::F32(800.0)));
    }

    #[test]
    fn test_settings_and_console() {
        let (mut scene, mut session) = setup();
        let reply = send(
            &mut scene,
            &mut session,
            json!({"type": "settings", "settings": {"fTimeDilation": 0.5, "sWorldName": "Field"}}),
        );
        assert_eq!(reply, json!({"type": "settings", "state": "applied"}));
        assert_eq!(
            scene.world_settings().read_field("TimeDilation"),
            Some(FieldValue::F32(0.5))
        );

        let reply = send(
            &mut scene,
            &mut session,
            json!({"type": "settings", "settings": {"fTimeDilation": 2.0, "fNoSuchField": 1.0}}),
        );
        assert_eq!(reply["type"], "error");
        assert_eq!(
            scene.world_settings().read_field("TimeDilation"),
            Some(FieldValue::F32(0.5))
        );

        send(&mut scene, &mut session, json!({"type": "console", "command": "stat unit"}));
        assert_eq!(scene.console_log(), ["stat unit"]);
    }

    #[test]
    fn test_direct_geometry_becomes_actor() {
        let (mut scene, mut session) = setup();
        let points = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let normals = [Vec3::Z; 3];
        let triangles = [0i32, 1, 2];
        let uvs = [Vec2::ZERO, Vec2::X, Vec2::Y];
        let reply = send(
            &mut scene,
            &mut session,
            json!({
                "type": "directbase64",
                "id": "Leaf",
                "points": STANDARD.encode(bytemuck::cast_slice::<Vec3, u8>(&points)),
                "normals": STANDARD.encode(bytemuck::cast_slice::<Vec3, u8>(&normals)),
                "triangles": STANDARD.encode(bytemuck::cast_slice::<i32, u8>(&triangles)),
                "texcoords": STANDARD.encode(bytemuck::cast_slice::<Vec2, u8>(&uvs)),
            }),
        );
        assert_eq!(reply["state"], "complete");
        assert_eq!(reply["name"], "Leaf");

        let leaf = scene.find("Leaf").unwrap();
        let mesh = scene.mesh(leaf).unwrap();
        assert_eq!(mesh.tangents.len(), 3);
        let reply = send(
            &mut scene,
            &mut session,
            json!({"type": "query", "object": "Leaf", "property": "VertexCount"}),
        );
        assert_eq!(reply["data"], json!(3));
    }

    #[test]
    fn test_chunked_geometry_across_frames() {
        let (mut scene, mut session) = setup();
        send(
            &mut scene,
            &mut session,
            json!({"type": "geometry", "id": "Stem", "points": 3, "triangles": 3}),
        );
        let mut stream = Vec::new();
        stream.extend_from_slice(bytemuck::cast_slice::<Vec3, u8>(&[Vec3::ZERO, Vec3::X, Vec3::Y]));
        stream.extend_from_slice(bytemuck::cast_slice::<Vec3, u8>(&[Vec3::Z; 3]));
        stream.extend_from_slice(bytemuck::cast_slice::<i32, u8>(&[0, 1, 2]));
        stream.extend_from_slice(bytemuck::cast_slice::<Vec2, u8>(&[Vec2::ZERO, Vec2::X, Vec2::Y]));

        let mut last = Value::Null;
        for chunk in stream.chunks(25) {
            last = synavis_server::dispatch::handle_frame(&mut scene, &mut session, chunk);
            assert_ne!(last["type"], "error");
        }
        assert_eq!(last["state"], "complete");
        assert!(scene.find("Stem").is_some());
    }

    #[test]
    fn test_info() {
        let (mut scene, mut session) = setup();
        tick(&mut scene, &mut session);
        let reply = send(
            &mut scene,
            &mut session,
            json!({"type": "info", "frametime": true, "fps": true}),
        );
        assert!((reply["frametime"].as_f64().unwrap() - 0.016).abs() < 1e-9);
        assert!(reply["fps"].as_f64().unwrap() > 60.0);
        assert!(reply.get("memory").is_none());
        assert!(scene.objects().iter().all(|id| scene.object(*id).is_some()));
    }
}
