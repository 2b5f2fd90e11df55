//! # synavis-core
//!
//! Core types for the Synavis scene-control protocol.
//!
//! This crate provides the foundational types shared by the server, the
//! scene adapters and the client:
//! - Property values and their wire form
//! - Reflection vocabulary for scene objects
//! - Generational object handles
//! - Geometry buffers and the reception state
//! - Asset catalog and built-in class table
//! - Error taxonomy

pub mod catalog;
pub mod error;
pub mod geometry;
pub mod handle;
pub mod reflect;
pub mod value;

pub use catalog::{
    AssetCatalog, AssetCatalogEntry, AssetKind, ClassEntry, ClassTable, SpawnCatalog,
    SpawnParameter,
};
pub use error::{Result, SynavisError};
pub use geometry::{ArrayKind, GeometryBuffer, ReceptionState, ScalarRange, Tangent};
pub use handle::{LoadHandle, ObjectId};
pub use reflect::{FieldDescriptor, FieldType, FieldValue};
pub use value::{PropertyValue, Rotator3, Transform, ValueKind, Vector3};

pub use glam::{Vec2, Vec3};
