//! Asset spawn resolver

use crate::environment::{Environment, LoadStatus, SceneGraph};
use crate::marshal;
use crate::protocol::reply;
use crate::resolver::resolve_property;
use serde_json::{json, Map, Value};
use synavis_core::{
    ClassEntry, LoadHandle, ObjectId, PropertyValue, Result, SpawnCatalog, SynavisError, ValueKind,
};
use tracing::{debug, info, warn};

/// Result of a `spawn` command
#[derive(Debug, Clone, PartialEq)]
pub enum SpawnOutcome {
    /// Asset load requested; a `spawned` notification follows
    Pending { name: String, handle: LoadHandle },
    /// Built-in class instantiated
    Spawned {
        id: ObjectId,
        name: String,
        rejected: Vec<String>,
    },
}

impl SpawnOutcome {
    pub fn to_reply(&self) -> Value {
        match self {
            SpawnOutcome::Pending { name, .. } => {
                json!({ "type": "spawn", "name": name, "state": "pending" })
            }
            SpawnOutcome::Spawned { name, rejected, .. } if rejected.is_empty() => {
                json!({ "type": "spawn", "name": name })
            }
            SpawnOutcome::Spawned { name, rejected, .. } => {
                json!({ "type": "spawn", "name": name, "rejected": rejected })
            }
        }
    }
}

#[derive(Debug)]
struct PendingSpawn {
    handle: LoadHandle,
    asset: String,
    parameters: Map<String, Value>,
}

/// Outstanding asset loads of one session
#[derive(Debug, Default)]
pub struct SpawnResolver {
    pending: Vec<PendingSpawn>,
}

impl SpawnResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Resolve a name against the asset catalog, then the class table
    pub fn spawn<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        catalog: &SpawnCatalog,
        name: &str,
        parameters: &Map<String, Value>,
    ) -> Result<SpawnOutcome> {
        if let Some(entry) = catalog.assets.lookup(name) {
            let handle = env.request_load(name, entry)?;
            info!("Loading {} from {} ({})", name, entry.source_path, handle);
            self.pending.push(PendingSpawn {
                handle,
                asset: name.to_string(),
                parameters: parameters.clone(),
            });
            return Ok(SpawnOutcome::Pending {
                name: name.to_string(),
                handle,
            });
        }

        if let Some(class) = catalog.classes.lookup(name) {
            let id = env.instantiate_class(class)?;
            let rejected = apply_parameters(env, id, Some(class), parameters);
            let name = object_name(&*env, id);
            info!("Spawned {} as {}", class.name, name);
            return Ok(SpawnOutcome::Spawned { id, name, rejected });
        }

        Err(SynavisError::NotFound(format!("spawnable '{name}'")))
    }

    /// Poll every pending load once, returning `spawned` notifications
    ///
    /// Failed loads are announced as `spawned` with `"state": "failed"`.
    pub fn poll<E: Environment + ?Sized>(&mut self, env: &mut E) -> Vec<Value> {
        let mut notifications = Vec::new();
        self.pending.retain(|pending| match env.poll_load(pending.handle) {
            LoadStatus::Pending => true,
            LoadStatus::Ready(asset) => {
                match env.instantiate_asset(&asset) {
                    Ok(id) => {
                        let rejected = apply_parameters(env, id, None, &pending.parameters);
                        let name = object_name(&*env, id);
                        debug!("{} ready, spawned {}", pending.handle, name);
                        let mut notification = reply::spawned(&name);
                        if !rejected.is_empty() {
                            notification["rejected"] = json!(rejected);
                        }
                        notifications.push(notification);
                    }
                    Err(e) => {
                        warn!("Failed to instantiate {}: {}", pending.asset, e);
                        notifications.push(reply::spawn_failed(&pending.asset, &e.to_string()));
                    }
                }
                false
            }
            LoadStatus::Failed(message) => {
                warn!("Loading {} failed: {}", pending.asset, message);
                notifications.push(reply::spawn_failed(
                    &pending.asset,
                    &format!("loading failed: {message}"),
                ));
                false
            }
        });
        notifications
    }
}

/// Apply spawn parameters through the marshaller
///
/// Returns the names that were not declared by the class or that the
/// marshaller refused.
pub fn apply_parameters<G: SceneGraph + ?Sized>(
    graph: &mut G,
    id: ObjectId,
    class: Option<&ClassEntry>,
    parameters: &Map<String, Value>,
) -> Vec<String> {
    let mut rejected = Vec::new();
    for (name, value) in parameters {
        if class.is_some_and(|c| !c.accepts(name)) {
            debug!("Parameter {} not declared for {:?}", name, class.map(|c| &c.name));
            rejected.push(name.clone());
            continue;
        }
        if let Err(e) = apply_parameter(graph, id, name, value) {
            debug!("Parameter {} rejected: {}", name, e);
            rejected.push(name.clone());
        }
    }
    rejected
}

fn apply_parameter<G: SceneGraph + ?Sized>(
    graph: &mut G,
    id: ObjectId,
    name: &str,
    value: &Value,
) -> Result<()> {
    let object = graph
        .object_mut(id)
        .ok_or_else(|| SynavisError::NotFound(format!("spawned object {id}")))?;
    let property = resolve_property(object, name)?;
    let value = decode_parameter(property.value_kind()?, value)?;
    marshal::set(object, &property, value)
}

/// Scalars may be given bare or as a `{"value": ..}` fragment
fn decode_parameter(kind: ValueKind, json: &Value) -> Result<PropertyValue> {
    match (kind, json) {
        (ValueKind::Vector3 | ValueKind::Rotator3 | ValueKind::Transform, _) => {
            PropertyValue::decode(kind, json)
        }
        (_, Value::Object(fragment)) => PropertyValue::from_fragment(kind, fragment),
        _ => PropertyValue::decode(kind, json),
    }
}

fn object_name<G: SceneGraph + ?Sized>(graph: &G, id: ObjectId) -> String {
    graph
        .object(id)
        .map(|o| o.name().to_string())
        .unwrap_or_else(|| id.to_string())
}
