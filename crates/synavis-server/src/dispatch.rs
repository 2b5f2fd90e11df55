//! Command dispatcher
//!
//! Routes every inbound frame to its handler and turns the outcome into a
//! reply envelope. Failures become `{"type":"error"}` replies; none of them
//! end the connection.

use crate::assembler::{self, ChunkProgress, GeometryHeader};
use crate::environment::{Environment, SceneGraph, SceneObject};
use crate::marshal;
use crate::protocol::{reply, BufferCommand, Command, DirectGeometry, Frame, InfoRequest, ParameterUpdate};
use crate::resolver::{resolve, resolve_property, resolve_target};
use crate::session::Session;
use crate::tracking::TrackedProperty;
use serde_json::{json, Map, Value};
use synavis_core::{
    GeometryBuffer, ObjectId, PropertyValue, ReceptionState, Result, SpawnCatalog, SynavisError,
};
use tracing::{debug, info, warn};

/// Handle one inbound frame, returning its reply
pub fn handle_frame<E: Environment + ?Sized>(env: &mut E, session: &mut Session, frame: &[u8]) -> Value {
    match Frame::classify(frame) {
        Frame::Envelope(text) => handle_envelope(env, session, text),
        Frame::Payload(bytes) => handle_payload(env, session, bytes).unwrap_or_else(|e| {
            warn!("Raw frame of {} bytes rejected: {}", bytes.len(), e);
            reply::error(&e)
        }),
    }
}

/// Handle one JSON envelope
pub fn handle_envelope<E: Environment + ?Sized>(env: &mut E, session: &mut Session, text: &str) -> Value {
    let command = match Command::parse(text) {
        Ok(command) => command,
        Err(e) => {
            warn!("Rejected envelope: {}", e);
            return reply::error(&e);
        }
    };
    let kind = command.kind();
    execute(env, session, command).unwrap_or_else(|e| {
        warn!("{} failed: {}", kind, e);
        reply::error(&e)
    })
}

/// Run a decoded command
pub fn execute<E: Environment + ?Sized>(env: &mut E, session: &mut Session, command: Command) -> Result<Value> {
    match command {
        Command::Geometry {
            id,
            points,
            triangles,
        } => handle_geometry(session, id, points, triangles),
        Command::Direct(geometry) => handle_direct(env, session, "direct", geometry),
        Command::DirectBase64(geometry) => handle_direct(env, session, "directbase64", geometry),
        Command::Parameter(update) => handle_parameter(env, update),
        Command::Query {
            object,
            property,
            spawn,
        } => handle_query(&*env, &session.catalog, object, property, spawn),
        Command::Track { object, property } => handle_track(&*env, session, object, property),
        Command::Untrack { object, property } => handle_untrack(&*env, session, object, property),
        Command::Command { name } => handle_named(env, session, &name),
        Command::Info(request) => handle_info(&*env, request),
        Command::Console { command } => {
            env.console_command(&command)?;
            info!("Console: {}", command);
            Ok(json!({ "type": "console", "command": command }))
        }
        Command::Settings { settings } => {
            env.apply_settings(&settings)?;
            Ok(json!({ "type": "settings", "state": "applied" }))
        }
        Command::Spawn { name, parameters } => {
            let outcome = session
                .spawner
                .spawn(env, &session.catalog, &name, &parameters)?;
            Ok(outcome.to_reply())
        }
        Command::Buffer(command) => handle_buffer(session, command),
    }
}

/// Raw payloads feed the open legacy buffer, else the chunked assembler
fn handle_payload<E: Environment + ?Sized>(env: &mut E, session: &mut Session, bytes: &[u8]) -> Result<Value> {
    if session.buffers.is_open() {
        let (name, transit) = session.buffers.append(bytes)?;
        return Ok(json!({
            "type": "buffer",
            "name": name,
            "state": "transit",
            "received": transit.received,
            "size": transit.size,
        }));
    }

    match session.assembler.receive(bytes)? {
        ChunkProgress::Receiving {
            state,
            received,
            expected,
        } => Ok(json!({
            "type": "geometry",
            "state": state.name(),
            "received": received,
            "expected": expected,
        })),
        ChunkProgress::Complete(mesh) => build_mesh(env, "geometry", mesh.name.as_deref(), mesh.geometry),
    }
}

fn handle_geometry(
    session: &mut Session,
    id: Option<String>,
    points: Option<usize>,
    triangles: Option<usize>,
) -> Result<Value> {
    let header = match (points, triangles) {
        (Some(points), Some(triangles)) => Some(GeometryHeader { points, triangles }),
        (None, None) => None,
        _ => {
            return Err(SynavisError::MalformedValue(
                "geometry header needs both points and triangles".into(),
            ));
        }
    };
    if let Some(header) = header {
        session.assembler.capacities(header)?;
    }
    if let Some(open) = session.buffers.open_name() {
        return Err(SynavisError::UnexpectedData(format!(
            "legacy buffer '{open}' is still open"
        )));
    }

    // A bare header completes an opened reception instead of restarting it
    let follow_up = header.is_some()
        && id.is_none()
        && session.assembler.state() == ReceptionState::AwaitingHeader;
    if !follow_up {
        session.assembler.begin(id);
    }
    if let Some(header) = header {
        session.assembler.apply_header(header)?;
    }

    Ok(json!({
        "type": "geometry",
        "name": session.assembler.name(),
        "state": session.assembler.state().name(),
    }))
}

fn handle_direct<E: Environment + ?Sized>(
    env: &mut E,
    session: &mut Session,
    kind: &str,
    geometry: DirectGeometry,
) -> Result<Value> {
    let buffer = assembler::decode_direct(&geometry)?;
    if session.assembler.is_active() {
        warn!(
            "Direct geometry abandons chunked reception in state {}",
            session.assembler.state().name()
        );
        session.assembler.reset();
    }
    build_mesh(env, kind, geometry.id.as_deref(), buffer)
}

fn build_mesh<E: Environment + ?Sized>(
    env: &mut E,
    kind: &str,
    name: Option<&str>,
    geometry: GeometryBuffer,
) -> Result<Value> {
    let points = geometry.points.len();
    let indices = geometry.triangles.len();
    let range = geometry.scalar_range;
    let id = env.build_mesh(name, geometry)?;
    let name = object_name(&*env, id);
    info!("Built mesh {} ({} points, {} indices)", name, points, indices);

    let mut reply = json!({
        "type": kind,
        "state": "complete",
        "name": name,
        "points": points,
        "triangles": indices,
    });
    if let Some(range) = range {
        reply["scalars"] = json!({ "min": range.min, "max": range.max });
    }
    Ok(reply)
}

fn handle_parameter<E: Environment + ?Sized>(env: &mut E, update: ParameterUpdate) -> Result<Value> {
    let id = resolve(&*env, &update.object)?;
    let object = env
        .object_mut(id)
        .ok_or_else(|| SynavisError::NotFound(format!("object '{}'", update.object)))?;
    let property = resolve_property(object, &update.property)?;
    let value = PropertyValue::from_fragment(property.value_kind()?, &update.fragment)?;
    marshal::set(object, &property, value)?;
    let current = marshal::get(object, &property)?;
    debug!("Set {}.{} = {}", update.object, update.property, current.encode());
    Ok(json!({
        "type": "parameter",
        "object": update.object,
        "property": update.property,
        "data": current.encode(),
    }))
}

fn handle_query<G: SceneGraph + ?Sized>(
    graph: &G,
    catalog: &SpawnCatalog,
    object: Option<String>,
    property: Option<String>,
    spawn: Option<String>,
) -> Result<Value> {
    if let (Some(spawn), None) = (&spawn, &object) {
        if spawn == "any" {
            return Ok(reply::query("spawn", json!(catalog.spawnable_names())));
        }
        return Ok(reply::query("spawn", describe_spawnable(catalog, spawn)?));
    }

    match (object.as_deref(), property.as_deref()) {
        (None, None) => {
            let names: Vec<String> = graph
                .objects()
                .into_iter()
                .filter_map(|id| graph.object(id).map(|o| o.name().to_string()))
                .collect();
            Ok(reply::query("all", json!(names)))
        }
        (Some(path), None) => {
            let id = resolve(graph, path)?;
            Ok(reply::query(path, marshal::describe_all(lookup(graph, id)?)))
        }
        (Some(path), Some(name)) => {
            let target = resolve_target(graph, path, Some(name))?;
            let property = target
                .property
                .ok_or_else(|| SynavisError::NotFound(format!("property '{path}.{name}'")))?;
            let value = marshal::get(lookup(graph, target.id)?, &property)?;
            Ok(reply::query_property(path, name, value.encode()))
        }
        (None, Some(name)) => Err(SynavisError::MalformedValue(format!(
            "query for '{name}' names no object"
        ))),
    }
}

fn describe_spawnable(catalog: &SpawnCatalog, name: &str) -> Result<Value> {
    if let Some(entry) = catalog.assets.lookup(name) {
        return Ok(json!({
            "name": name,
            "kind": entry.kind,
            "source": entry.source_path,
        }));
    }
    if let Some(class) = catalog.classes.lookup(name) {
        return Ok(json!({
            "name": name,
            "kind": "class",
            "parameters": class.parameters,
        }));
    }
    Err(SynavisError::NotFound(format!("spawnable '{name}'")))
}

fn handle_track<G: SceneGraph + ?Sized>(
    graph: &G,
    session: &mut Session,
    object: String,
    property: String,
) -> Result<Value> {
    let id = resolve(graph, &object)?;
    let property = resolve_property(lookup(graph, id)?, &property)?;
    let kind = property.value_kind()?;
    let entry = TrackedProperty::new(id, &object, property, kind);
    let name = entry.display_name.clone();
    session.tracking.track(entry)?;
    info!("Tracking {} ({})", name, kind.name());
    Ok(json!({ "type": "track", "name": name, "kind": kind.name(), "state": "added" }))
}

fn handle_untrack<G: SceneGraph + ?Sized>(
    graph: &G,
    session: &mut Session,
    object: String,
    property: String,
) -> Result<Value> {
    let id = resolve(graph, &object)?;
    let removed = session.tracking.untrack(id, &property)?;
    info!("Stopped tracking {}", removed.display_name);
    Ok(json!({ "type": "untrack", "name": removed.display_name, "state": "removed" }))
}

fn handle_named<E: Environment + ?Sized>(env: &mut E, session: &mut Session, name: &str) -> Result<Value> {
    match name {
        "reset" => {
            session.reset_geometry();
            Ok(json!({ "type": "command", "name": "reset", "state": "idle" }))
        }
        "finalize" => {
            if session.assembler.state().array().is_some() {
                let mesh = session.assembler.finalize()?;
                return build_mesh(env, "geometry", mesh.name.as_deref(), mesh.geometry);
            }
            let geometry = session.buffers.take_staged()?;
            build_mesh(env, "buffer", None, geometry)
        }
        "frametime" => Ok(json!({ "type": "frametime", "value": env.frame_time() })),
        other => Err(SynavisError::UnknownCommand(format!("command '{other}'"))),
    }
}

fn handle_info<E: Environment + ?Sized>(env: &E, request: InfoRequest) -> Result<Value> {
    if request.is_empty() {
        return Err(SynavisError::MalformedValue(
            "info names none of frametime, memory, fps".into(),
        ));
    }
    let mut reply = Map::new();
    reply.insert("type".into(), json!("info"));
    if request.frametime.is_some() {
        reply.insert("frametime".into(), json!(env.frame_time()));
    }
    if request.memory.is_some() {
        reply.insert("memory".into(), json!(env.memory_usage()));
    }
    if request.fps.is_some() {
        reply.insert("fps".into(), json!(env.frame_rate()));
    }
    Ok(Value::Object(reply))
}

fn handle_buffer(session: &mut Session, command: BufferCommand) -> Result<Value> {
    match command {
        BufferCommand::Start { start, size } => {
            if session.assembler.is_active() {
                return Err(SynavisError::UnexpectedData(format!(
                    "chunked geometry in state {}",
                    session.assembler.state().name()
                )));
            }
            session.buffers.start(&start, size)?;
            Ok(reply::buffer(&start, "start"))
        }
        BufferCommand::Stop { stop } => {
            session.buffers.stop(&stop)?;
            Ok(reply::buffer(&stop, "stop"))
        }
    }
}

fn lookup<G: SceneGraph + ?Sized>(graph: &G, id: ObjectId) -> Result<&dyn SceneObject> {
    graph
        .object(id)
        .ok_or_else(|| SynavisError::NotFound(format!("object {id}")))
}

fn object_name<G: SceneGraph + ?Sized>(graph: &G, id: ObjectId) -> String {
    graph
        .object(id)
        .map(|o| o.name().to_string())
        .unwrap_or_else(|| id.to_string())
}
