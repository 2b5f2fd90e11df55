//! Tracked-property registry

use crate::resolver::PropertyRef;
use synavis_core::{ObjectId, SynavisError, ValueKind};

/// One property reported on every tick
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedProperty {
    pub target: ObjectId,
    pub property: PropertyRef,
    pub kind: ValueKind,
    /// `<object path>.<property>`, the key in telemetry frames
    pub display_name: String,
}

impl TrackedProperty {
    pub fn new(target: ObjectId, object_path: &str, property: PropertyRef, kind: ValueKind) -> Self {
        let display_name = format!("{}.{}", object_path, property.name());
        Self {
            target,
            property,
            kind,
            display_name,
        }
    }

    fn is_for(&self, target: ObjectId, property: &str) -> bool {
        self.target == target && self.property.name() == property
    }
}

/// Ordered set of tracked properties, unique per (object, property)
#[derive(Debug, Default)]
pub struct TrackingRegistry {
    entries: Vec<TrackedProperty>,
}

impl TrackingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking; the registry is unchanged on duplicates
    pub fn track(&mut self, entry: TrackedProperty) -> Result<(), TrackingError> {
        if self
            .entries
            .iter()
            .any(|e| e.is_for(entry.target, entry.property.name()))
        {
            return Err(TrackingError::AlreadyTracked(entry.display_name));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Stop tracking one property of one object
    pub fn untrack(&mut self, target: ObjectId, property: &str) -> Result<TrackedProperty, TrackingError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.is_for(target, property))
            .ok_or_else(|| TrackingError::NotTracked(format!("{target}.{property}")))?;
        Ok(self.entries.remove(index))
    }

    /// Drop entries whose target no longer exists, returning them
    pub fn purge(&mut self, alive: impl Fn(ObjectId) -> bool) -> Vec<TrackedProperty> {
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| alive(e.target));
        self.entries = kept;
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedProperty> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Already tracking {0}")]
    AlreadyTracked(String),
    #[error("Not tracking {0}")]
    NotTracked(String),
}

impl From<TrackingError> for SynavisError {
    fn from(err: TrackingError) -> Self {
        match err {
            TrackingError::AlreadyTracked(name) => SynavisError::DuplicateTracking(name),
            TrackingError::NotTracked(name) => SynavisError::NotFound(format!("tracked property {name}")),
        }
    }
}
