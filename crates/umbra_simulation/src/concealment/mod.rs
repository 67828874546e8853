//! Concealment: hiding spots (zones), environmental elements, registry

pub mod element;
pub mod kind;
pub mod registry;
pub mod zone;

pub use element::{ElementKind, EnvironmentalElement};
pub use kind::{ConcealmentEffect, ConcealmentQuality, ConcealmentType, ZoneCategory};
pub use registry::{ConcealmentRegistry, RegisteredObject, ZoneEvent};
pub use zone::{ConcealmentZone, EntryPath, EntryRejection, ZoneSettings, ZoneState};
