//! ConcealmentZone - hiding spot с occupancy state machine.
//!
//! `Inactive → Available → Occupied(k)`, k = 1..capacity.
//! Инвариант: occupants.len() <= capacity. Occupancy меняется только через try_enter / try_exit.

use bevy::prelude::*;

use crate::concealment::kind::{ConcealmentEffect, ConcealmentQuality, ConcealmentType, ZoneCategory};
use crate::shared::{clamp01, ObjectId, OccupantId, ZoneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    Inactive,
    Available,
    Occupied(u32),
}

/// Через что пришёл запрос на вход
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPath {
    /// Агент просто зашёл в радиус
    Proximity,
    /// Явное действие (interaction command)
    ExplicitAction,
}

/// Почему вход отклонён
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRejection {
    Inactive,
    Full,
    RequiresAction,
    AlreadyInside,
}

/// Параметры создания zone
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSettings {
    pub kind: ConcealmentType,
    pub position: Vec3,
    pub strength: f32,
    pub capacity: u32,
    pub influence_radius: f32,
    pub requires_action: bool,
    pub entry_delay: f32,
    pub exit_delay: f32,
    pub effect: ConcealmentEffect,
}

impl ZoneSettings {
    /// Defaults: strength 0.8, capacity 1, radius 2, задержки из профиля типа
    pub fn new(kind: ConcealmentType, position: Vec3) -> Self {
        let effect = ConcealmentEffect::for_type(kind);
        Self {
            kind,
            position,
            strength: 0.8,
            capacity: 1,
            influence_radius: 2.0,
            requires_action: kind.is_enclosed(),
            entry_delay: 0.0,
            exit_delay: effect.exit_time,
            effect,
        }
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.influence_radius = radius;
        self
    }

    pub fn with_entry_delay(mut self, delay: f32) -> Self {
        self.entry_delay = delay;
        self
    }

    pub fn requiring_action(mut self, requires_action: bool) -> Self {
        self.requires_action = requires_action;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ConcealmentZone {
    id: ZoneId,
    object: Option<ObjectId>,
    kind: ConcealmentType,
    position: Vec3,
    strength: f32,
    capacity: u32,
    influence_radius: f32,
    requires_action: bool,
    entry_delay: f32,
    exit_delay: f32,
    active: bool,
    effect: ConcealmentEffect,
    occupants: Vec<OccupantId>,
    /// Countdown до применения эффекта к агенту
    pending_effect: Option<f32>,
}

impl ConcealmentZone {
    /// Strength зажимается в [0,1], capacity >= 1
    pub fn new(id: ZoneId, settings: ZoneSettings) -> Self {
        Self {
            id,
            object: None,
            kind: settings.kind,
            position: settings.position,
            strength: clamp01(settings.strength),
            capacity: settings.capacity.max(1),
            influence_radius: settings.influence_radius.max(0.0),
            requires_action: settings.requires_action,
            entry_delay: settings.entry_delay.max(0.0),
            exit_delay: settings.exit_delay.max(0.0),
            active: true,
            effect: settings.effect,
            occupants: Vec::new(),
            pending_effect: None,
        }
    }

    pub fn with_object(mut self, object: ObjectId) -> Self {
        self.object = Some(object);
        self
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    pub fn kind(&self) -> ConcealmentType {
        self.kind
    }

    pub fn category(&self) -> ZoneCategory {
        self.kind.category()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn quality(&self) -> ConcealmentQuality {
        ConcealmentQuality::from_strength(self.strength)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn influence_radius(&self) -> f32 {
        self.influence_radius
    }

    pub fn requires_action(&self) -> bool {
        self.requires_action
    }

    pub fn entry_delay(&self) -> f32 {
        self.entry_delay
    }

    pub fn exit_delay(&self) -> f32 {
        self.exit_delay
    }

    pub fn effect(&self) -> &ConcealmentEffect {
        &self.effect
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn occupancy(&self) -> u32 {
        self.occupants.len() as u32
    }

    pub fn occupants(&self) -> &[OccupantId] {
        &self.occupants
    }

    pub fn contains(&self, occupant: OccupantId) -> bool {
        self.occupants.contains(&occupant)
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() >= self.capacity
    }

    pub fn state(&self) -> ZoneState {
        if !self.active {
            ZoneState::Inactive
        } else if self.occupants.is_empty() {
            ZoneState::Available
        } else {
            ZoneState::Occupied(self.occupancy())
        }
    }

    /// Проверка входа без мутации
    pub fn check_entry(&self, occupant: OccupantId, path: EntryPath) -> Result<(), EntryRejection> {
        if !self.active {
            return Err(EntryRejection::Inactive);
        }
        if self.contains(occupant) {
            return Err(EntryRejection::AlreadyInside);
        }
        if self.is_full() {
            return Err(EntryRejection::Full);
        }
        if self.requires_action && path != EntryPath::ExplicitAction {
            return Err(EntryRejection::RequiresAction);
        }
        Ok(())
    }

    pub fn try_enter(&mut self, occupant: OccupantId, path: EntryPath) -> bool {
        if self.check_entry(occupant, path).is_err() {
            return false;
        }
        self.occupants.push(occupant);
        true
    }

    /// false если пусто или occupant не внутри
    pub fn try_exit(&mut self, occupant: OccupantId) -> bool {
        match self.occupants.iter().position(|o| *o == occupant) {
            Some(index) => {
                self.occupants.remove(index);
                true
            }
            None => false,
        }
    }

    /// Линейное затухание от центра: strength · (1 - d / radius)
    pub fn concealment_at(&self, point: Vec3) -> f32 {
        if !self.active || self.influence_radius <= 0.0 {
            return 0.0;
        }
        let distance = self.position.distance(point);
        if distance >= self.influence_radius {
            return 0.0;
        }
        self.strength * (1.0 - distance / self.influence_radius)
    }

    /// Единственный путь изменить strength после создания
    pub fn set_strength(&mut self, strength: f32) {
        self.strength = clamp01(strength);
    }

    /// Переключает active. Возвращает occupants, которых надо выселить (при деактивации).
    pub(crate) fn set_active(&mut self, active: bool) -> Vec<OccupantId> {
        self.active = active;
        if active {
            Vec::new()
        } else {
            self.pending_effect = None;
            std::mem::take(&mut self.occupants)
        }
    }

    pub(crate) fn start_effect_countdown(&mut self) {
        self.pending_effect = Some(self.entry_delay);
    }

    pub(crate) fn cancel_effect_countdown(&mut self) {
        self.pending_effect = None;
    }

    pub fn pending_effect(&self) -> Option<f32> {
        self.pending_effect
    }

    /// Countdown эффекта. true - задержка истекла на этом tick.
    pub(crate) fn tick_effect(&mut self, delta: f32) -> bool {
        match self.pending_effect.as_mut() {
            Some(remaining) => {
                *remaining -= delta;
                if *remaining <= 0.0 {
                    self.pending_effect = None;
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }
}
