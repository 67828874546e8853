//! Общие типы: идентификаторы и мелкая математика

use bevy::prelude::*;

pub mod math;

pub use math::{clamp01, lerp, move_towards, random_in_unit_sphere};

/// Объект сцены (collider, устройство, дверь, тело)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct ObjectId(pub u32);

/// Источник света
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct LightId(pub u32);

/// Concealment zone (hiding spot) в registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct ZoneId(pub u32);

/// Environmental element (shadow/light/foliage/noise) в registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct ElementId(pub u32);

/// Кто занимает zone. `OccupantId::AGENT` - отслеживаемый игрок.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct OccupantId(pub u32);

impl OccupantId {
    pub const AGENT: OccupantId = OccupantId(0);
}

/// Выполненная команда в CommandManager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub u64);
