//! ConcealmentRegistry - все zones и elements сцены.
//!
//! Отвечает за эффекты на отслеживаемого агента (`OccupantId::AGENT`):
//! 1. try_enter → Entered + countdown entry_delay
//! 2. countdown истёк (tick) → visibility override + concealment mode → ConcealmentApplied
//! 3. try_exit / деактивация → override откатывается → Exited / ForcedExit
//!
//! OccupancyChanged поднимается для любого occupant'а.
//!
//! Notifications копятся во внутренней очереди, plugin пересылает их в Bevy events.

use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;

use crate::concealment::element::{ElementKind, EnvironmentalElement};
use crate::concealment::zone::{ConcealmentZone, EntryPath, EntryRejection, ZoneSettings};
use crate::services::StealthService;
use crate::shared::{ElementId, ObjectId, OccupantId, ZoneId};

#[derive(Event, Debug, Clone, PartialEq)]
pub enum ZoneEvent {
    Entered { zone: ZoneId, occupant: OccupantId },
    Exited { zone: ZoneId, occupant: OccupantId },
    /// Entry delay истёк, эффекты наложены на агента
    ConcealmentApplied { zone: ZoneId, visibility: f32 },
    /// Zone деактивирована с occupant'ом внутри
    ForcedExit { zone: ZoneId, occupant: OccupantId },
    /// Любой вход / выход, включая не-агентов
    OccupancyChanged { zone: ZoneId, occupancy: u32 },
}

/// Что было у агента до входа
#[derive(Debug, Clone, Copy, PartialEq)]
struct VisibilityOverride {
    previous_visibility: f32,
    previous_concealment_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisteredObject {
    Zone(ZoneId),
    Element(ElementId),
}

#[derive(Resource, Debug, Default)]
pub struct ConcealmentRegistry {
    zones: BTreeMap<ZoneId, ConcealmentZone>,
    elements: BTreeMap<ElementId, EnvironmentalElement>,
    by_object: HashMap<ObjectId, RegisteredObject>,
    overrides: BTreeMap<ZoneId, VisibilityOverride>,
    events: Vec<ZoneEvent>,
    next_zone: u32,
    next_element: u32,
}

impl ConcealmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Регистрация
    // ------------------------------------------------------------------

    pub fn add_zone(&mut self, settings: ZoneSettings) -> ZoneId {
        self.next_zone += 1;
        let id = ZoneId(self.next_zone);
        self.zones.insert(id, ConcealmentZone::new(id, settings));
        id
    }

    pub fn add_zone_for_object(&mut self, object: ObjectId, settings: ZoneSettings) -> ZoneId {
        self.next_zone += 1;
        let id = ZoneId(self.next_zone);
        self.zones.insert(id, ConcealmentZone::new(id, settings).with_object(object));
        self.by_object.insert(object, RegisteredObject::Zone(id));
        id
    }

    pub fn add_element(&mut self, kind: ElementKind, position: Vec3, intensity: f32, radius: f32) -> ElementId {
        self.insert_element(None, |id| EnvironmentalElement::new(id, kind, position, intensity, radius))
    }

    /// Элемент, собранный вызывающим (toggle, привязка к объекту)
    pub fn insert_element(
        &mut self,
        object: Option<ObjectId>,
        build: impl FnOnce(ElementId) -> EnvironmentalElement,
    ) -> ElementId {
        self.next_element += 1;
        let id = ElementId(self.next_element);
        let mut element = build(id);
        if let Some(object) = object {
            element = element.with_object(object);
            self.by_object.insert(object, RegisteredObject::Element(id));
        }
        self.elements.insert(id, element);
        id
    }

    /// Удаляет пустую zone. Занятую сначала надо деактивировать.
    pub fn remove_zone(&mut self, id: ZoneId) -> Option<ConcealmentZone> {
        if self.zones.get(&id).map_or(true, |zone| zone.occupancy() > 0) {
            return None;
        }
        let zone = self.zones.remove(&id)?;
        if let Some(object) = zone.object() {
            self.by_object.remove(&object);
        }
        Some(zone)
    }

    pub fn remove_element(&mut self, id: ElementId) -> Option<EnvironmentalElement> {
        let element = self.elements.remove(&id)?;
        if let Some(object) = element.object() {
            self.by_object.remove(&object);
        }
        Some(element)
    }

    pub fn lookup_object(&self, object: ObjectId) -> Option<RegisteredObject> {
        self.by_object.get(&object).copied()
    }

    // ------------------------------------------------------------------
    // Чтение
    // ------------------------------------------------------------------

    pub fn zone(&self, id: ZoneId) -> Option<&ConcealmentZone> {
        self.zones.get(&id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &ConcealmentZone> {
        self.zones.values()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn element(&self, id: ElementId) -> Option<&EnvironmentalElement> {
        self.elements.get(&id)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut EnvironmentalElement> {
        self.elements.get_mut(&id)
    }

    pub fn elements(&self) -> impl Iterator<Item = &EnvironmentalElement> {
        self.elements.values()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Zone, в которой сидит occupant
    pub fn zone_of(&self, occupant: OccupantId) -> Option<ZoneId> {
        self.zones.values().find(|zone| zone.contains(occupant)).map(|zone| zone.id())
    }

    /// Ближайшая активная zone со свободным местом в пределах `max_distance`
    pub fn nearest_available_zone(&self, position: Vec3, max_distance: f32) -> Option<ZoneId> {
        self.zones
            .values()
            .filter(|zone| zone.is_active() && !zone.is_full())
            .map(|zone| (zone.id(), zone.position().distance(position)))
            .filter(|(_, distance)| *distance <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn zones_near(&self, position: Vec3, radius: f32) -> Vec<ZoneId> {
        self.zones
            .values()
            .filter(|zone| zone.position().distance(position) <= radius)
            .map(|zone| zone.id())
            .collect()
    }

    pub fn check_entry(&self, id: ZoneId, occupant: OccupantId, path: EntryPath) -> Option<Result<(), EntryRejection>> {
        self.zones.get(&id).map(|zone| zone.check_entry(occupant, path))
    }

    /// Наложен ли сейчас эффект zone на агента
    pub fn has_active_override(&self, id: ZoneId) -> bool {
        self.overrides.contains_key(&id)
    }

    // ------------------------------------------------------------------
    // Мутации
    // ------------------------------------------------------------------

    pub fn set_zone_strength(&mut self, id: ZoneId, strength: f32) -> bool {
        match self.zones.get_mut(&id) {
            Some(zone) => {
                zone.set_strength(strength);
                true
            }
            None => false,
        }
    }

    pub fn try_enter<A: StealthService + ?Sized>(
        &mut self,
        id: ZoneId,
        occupant: OccupantId,
        path: EntryPath,
        agent: &mut A,
    ) -> bool {
        let Some(zone) = self.zones.get_mut(&id) else {
            return false;
        };

        if let Err(reason) = zone.check_entry(occupant, path) {
            crate::log(&format!("ConcealmentZone {:?}: entry of {:?} rejected ({:?})", id, occupant, reason));
            return false;
        }
        zone.try_enter(occupant, path);
        let occupancy = zone.occupancy();

        let is_agent = occupant == OccupantId::AGENT;
        if is_agent {
            crate::log(&format!("🫥 Agent entered {:?} ({})", id, zone.kind().tag()));
            self.events.push(ZoneEvent::Entered { zone: id, occupant });
        }
        self.events.push(ZoneEvent::OccupancyChanged { zone: id, occupancy });

        if is_agent {
            if zone.entry_delay() <= 0.0 {
                self.apply_effect(id, agent);
            } else {
                zone.start_effect_countdown();
            }
        }
        true
    }

    pub fn try_exit<A: StealthService + ?Sized>(&mut self, id: ZoneId, occupant: OccupantId, agent: &mut A) -> bool {
        let Some(zone) = self.zones.get_mut(&id) else {
            return false;
        };
        if !zone.try_exit(occupant) {
            return false;
        }
        let occupancy = zone.occupancy();

        if occupant == OccupantId::AGENT {
            zone.cancel_effect_countdown();
            self.revert_effect(id, agent);
            crate::log(&format!("Agent left {:?}", id));
            self.events.push(ZoneEvent::Exited { zone: id, occupant });
        }
        self.events.push(ZoneEvent::OccupancyChanged { zone: id, occupancy });
        true
    }

    /// Деактивация занятой zone выселяет всех
    pub fn set_zone_active<A: StealthService + ?Sized>(&mut self, id: ZoneId, active: bool, agent: &mut A) -> bool {
        let Some(zone) = self.zones.get_mut(&id) else {
            return false;
        };
        let evicted = zone.set_active(active);
        let any_evicted = !evicted.is_empty();
        for occupant in evicted {
            if occupant == OccupantId::AGENT {
                self.revert_effect(id, agent);
            }
            crate::log_warning(&format!("ConcealmentZone {:?} deactivated, forcing {:?} out", id, occupant));
            self.events.push(ZoneEvent::ForcedExit { zone: id, occupant });
        }
        if any_evicted {
            self.events.push(ZoneEvent::OccupancyChanged { zone: id, occupancy: 0 });
        }
        true
    }

    /// Countdown'ы входа + auto-toggle элементов
    pub fn tick<A: StealthService + ?Sized>(&mut self, delta: f32, agent: &mut A) {
        let ready: Vec<ZoneId> = self
            .zones
            .values_mut()
            .filter_map(|zone| zone.tick_effect(delta).then(|| zone.id()))
            .collect();
        for id in ready {
            self.apply_effect(id, agent);
        }

        for element in self.elements.values_mut() {
            element.tick(delta);
        }
    }

    pub fn drain_events(&mut self) -> Vec<ZoneEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[ZoneEvent] {
        &self.events
    }

    fn apply_effect<A: StealthService + ?Sized>(&mut self, id: ZoneId, agent: &mut A) {
        let Some(zone) = self.zones.get(&id) else {
            return;
        };
        if !zone.contains(OccupantId::AGENT) || self.overrides.contains_key(&id) {
            return;
        }

        let previous_visibility = agent.player_visibility_factor();
        let visibility = previous_visibility * (1.0 - zone.effect().visibility_reduction);
        self.overrides.insert(
            id,
            VisibilityOverride {
                previous_visibility,
                previous_concealment_mode: agent.concealment_mode(),
            },
        );
        agent.update_visibility(visibility);
        agent.set_concealment_mode(true);
        self.events.push(ZoneEvent::ConcealmentApplied { zone: id, visibility });
    }

    fn revert_effect<A: StealthService + ?Sized>(&mut self, id: ZoneId, agent: &mut A) {
        if let Some(saved) = self.overrides.remove(&id) {
            agent.update_visibility(saved.previous_visibility);
            agent.set_concealment_mode(saved.previous_concealment_mode);
        }
    }
}
