//! Per-tick telemetry frames

use crate::environment::SceneGraph;
use crate::marshal;
use crate::tracking::TrackingRegistry;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Build the `track` frame for this tick
///
/// Entries whose target was destroyed are dropped first. Returns `None` when
/// nothing is tracked, so no frame goes out.
pub fn emit<G: SceneGraph + ?Sized>(graph: &G, registry: &mut TrackingRegistry) -> Option<Value> {
    for dropped in registry.purge(|id| graph.contains(id)) {
        debug!("Dropped tracking of {} (target destroyed)", dropped.display_name);
    }
    if registry.is_empty() {
        return None;
    }

    let mut data = Map::new();
    for entry in registry.iter() {
        let Some(object) = graph.object(entry.target) else {
            continue;
        };
        match marshal::get(object, &entry.property) {
            Ok(value) => {
                data.insert(entry.display_name.clone(), value.encode());
            }
            Err(e) => warn!("Failed to read {}: {}", entry.display_name, e),
        }
    }

    Some(json!({ "type": "track", "data": data }))
}
