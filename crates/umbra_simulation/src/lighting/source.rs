//! Light source descriptors (read-only копии от host'а)

use bevy::prelude::*;

use crate::shared::{LightId, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum LightKind {
    Point,
    Spot,
    Directional,
}

/// Источник света сцены.
///
/// `direction` - куда светит (spot/directional), для point игнорируется.
/// `owner` - объект сцены, которому принадлежит лампа (SabotageLight выключает owner'а).
#[derive(Debug, Clone, PartialEq)]
pub struct LightSource {
    pub id: LightId,
    pub kind: LightKind,
    pub position: Vec3,
    pub direction: Vec3,
    pub range: f32,
    pub intensity: f32,
    /// Linear RGB
    pub color: [f32; 3],
    /// Половина угла конуса (градусы)
    pub spot_half_angle: f32,
    pub enabled: bool,
    pub is_static: bool,
    pub owner: Option<ObjectId>,
}

impl LightSource {
    pub fn point(position: Vec3, range: f32, intensity: f32) -> Self {
        Self {
            id: LightId(0),
            kind: LightKind::Point,
            position,
            direction: Vec3::NEG_Y,
            range,
            intensity,
            color: [1.0, 1.0, 1.0],
            spot_half_angle: 0.0,
            enabled: true,
            is_static: false,
            owner: None,
        }
    }

    pub fn spot(position: Vec3, direction: Vec3, range: f32, intensity: f32, half_angle_deg: f32) -> Self {
        Self {
            kind: LightKind::Spot,
            direction: direction.normalize_or_zero(),
            spot_half_angle: half_angle_deg,
            ..Self::point(position, range, intensity)
        }
    }

    pub fn directional(direction: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            direction: direction.normalize_or_zero(),
            range: f32::INFINITY,
            ..Self::point(Vec3::ZERO, 0.0, intensity)
        }
    }

    pub fn with_owner(mut self, owner: ObjectId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Расстояние до точки; directional лампы считаются "рядом" (0)
    pub fn distance_to(&self, point: Vec3) -> f32 {
        match self.kind {
            LightKind::Directional => 0.0,
            _ => self.position.distance(point),
        }
    }

    /// Ранг для отсечения лишних ламп: intensity / max(1, distance)
    pub fn importance(&self, anchor: Vec3) -> f32 {
        self.intensity / self.distance_to(anchor).max(1.0)
    }
}

/// Кэшированная копия лампы (evaluator перестраивает список целиком)
#[derive(Debug, Clone, PartialEq)]
pub struct CachedLight {
    pub source: LightSource,
    /// Elapsed time момента кэширования (секунды)
    pub cached_at: f64,
}

/// Reflection-probe-like источник непрямого света
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionProbe {
    pub position: Vec3,
    /// Радиус влияния
    pub size: f32,
    pub intensity: f32,
    pub enabled: bool,
}

impl ReflectionProbe {
    pub fn new(position: Vec3, size: f32, intensity: f32) -> Self {
        Self {
            position,
            size,
            intensity,
            enabled: true,
        }
    }
}
