//! Host interfaces
//!
//! Всё, что core получает извне, приходит через эти traits (constructor / context injection):
//! - `StealthService` + `AgentBody` - состояние игрока, которое читают и пишут команды
//! - `DetectionSink` - куда EnvironmentCoordinator отдаёт агрегированные сигналы
//! - `SpatialQuery` - overlap sphere / raycast на слоях
//! - `LightSourceProvider` - список ламп и probes
//! - `InteractionWorld` - включение/выключение объектов сцены
//!
//! Комбинированные `AgentServices` / `HostScene` нужны для `dyn` в CommandContext.

use bevy::prelude::*;

use crate::collision_layers::LayerMask;
use crate::concealment::{ConcealmentType, ElementKind};
use crate::lighting::{LightSource, ReflectionProbe};
use crate::shared::ObjectId;

/// Поза агента
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum Posture {
    #[default]
    Standing,
    Walking,
    Crouching,
    Prone,
    Running,
    InCover,
    Climbing,
}

/// Stealth state игрока (visibility / noise / concealment mode / distractions)
pub trait StealthService {
    fn player_visibility_factor(&self) -> f32;
    fn update_visibility(&mut self, value: f32);
    fn player_noise_level(&self) -> f32;
    fn update_noise_level(&mut self, value: f32);
    fn concealment_mode(&self) -> bool;
    fn set_concealment_mode(&mut self, enabled: bool);
    fn is_player_concealed(&self) -> bool;
    fn create_distraction(&mut self, position: Vec3, intensity: f32);
}

/// Тело агента (transform + поза + модификатор скорости)
pub trait AgentBody {
    fn position(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
    fn forward(&self) -> Vec3;
    fn posture(&self) -> Posture;
    fn set_posture(&mut self, posture: Posture);
    fn speed_modifier(&self) -> f32;
    fn set_speed_modifier(&mut self, modifier: f32);

    fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize_or_zero()
    }
}

pub trait AgentServices: StealthService + AgentBody {}

impl<T: StealthService + AgentBody + ?Sized> AgentServices for T {}

/// Perception/detection collaborator (внешний AI)
pub trait DetectionSink {
    fn apply_environmental_concealment(&mut self, strength: f32, source_tag: &str);
    fn apply_light_exposure(&mut self, exposure: f32, direction: Vec3);

    fn apply_noise_masking(&mut self, _level: f32) {}
}

/// Что за объект лежит в collider'е
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ObjectDescriptor {
    #[default]
    None,
    HidingSpot(ZoneDescriptor),
    Element(ElementDescriptor),
    Device(DeviceKind),
}

/// Параметры hiding spot, заданные в сцене (None = взять из config)
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDescriptor {
    pub kind: ConcealmentType,
    pub strength: Option<f32>,
    pub capacity: Option<u32>,
    pub influence_radius: Option<f32>,
    pub requires_action: bool,
}

impl ZoneDescriptor {
    pub fn new(kind: ConcealmentType) -> Self {
        Self {
            kind,
            strength: None,
            capacity: None,
            influence_radius: None,
            requires_action: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementDescriptor {
    pub kind: ElementKind,
    pub intensity: f32,
    pub radius: f32,
    pub can_toggle: bool,
    pub toggle_interval: f32,
}

impl ElementDescriptor {
    pub fn new(kind: ElementKind, intensity: f32, radius: f32) -> Self {
        Self {
            kind,
            intensity,
            radius,
            can_toggle: false,
            toggle_interval: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Camera,
    Alarm,
    Light,
    Door,
    Switch,
    Body,
}

/// Результат overlap query
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub position: Vec3,
    pub layer: LayerMask,
    pub enabled: bool,
    pub descriptor: ObjectDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub object: ObjectId,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

pub trait SpatialQuery {
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<SceneObject>;

    /// `direction` должен быть нормализован
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Option<RayHit>;

    /// Ray между двумя точками
    fn linecast(&self, from: Vec3, to: Vec3, mask: LayerMask) -> Option<RayHit> {
        let delta = to - from;
        let distance = delta.length();
        if distance <= f32::EPSILON {
            return None;
        }
        self.raycast(from, delta / distance, distance, mask)
    }
}

pub trait LightSourceProvider {
    fn light_sources(&self) -> Vec<LightSource>;

    fn reflection_probes(&self) -> Vec<ReflectionProbe> {
        Vec::new()
    }
}

pub trait InteractionWorld {
    /// None - объекта нет в сцене
    fn object_enabled(&self, id: ObjectId) -> Option<bool>;
    /// false - объекта нет в сцене
    fn set_object_enabled(&mut self, id: ObjectId, enabled: bool) -> bool;
    fn object_position(&self, id: ObjectId) -> Option<Vec3>;
}

pub trait HostScene: SpatialQuery + LightSourceProvider + InteractionWorld {}

impl<T: SpatialQuery + LightSourceProvider + InteractionWorld + ?Sized> HostScene for T {}
