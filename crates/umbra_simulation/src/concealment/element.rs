//! EnvironmentalElement - объёмы тени / света / листвы / шума.
//!
//! Влияние линейно падает от центра; вклад в detection = влияние · множитель типа
//! (light отрицательный: он раскрывает агента).

use bevy::prelude::*;

use crate::shared::{clamp01, ElementId, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ElementKind {
    Shadow,
    Light,
    Foliage,
    Noise,
}

impl ElementKind {
    /// Множитель вклада в detection
    pub fn effect_multiplier(&self) -> f32 {
        match self {
            ElementKind::Shadow => 0.8,
            ElementKind::Foliage => 0.6,
            ElementKind::Light => -0.9,
            ElementKind::Noise => 0.4,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ElementKind::Shadow => "Shadow",
            ElementKind::Light => "Light",
            ElementKind::Foliage => "Foliage",
            ElementKind::Noise => "Noise",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentalElement {
    id: ElementId,
    object: Option<ObjectId>,
    kind: ElementKind,
    position: Vec3,
    base_intensity: f32,
    intensity: f32,
    radius: f32,
    active: bool,
    can_toggle: bool,
    /// > 0 - auto-toggle с этим периодом
    toggle_interval: f32,
    toggle_timer: f32,
}

impl EnvironmentalElement {
    pub fn new(id: ElementId, kind: ElementKind, position: Vec3, intensity: f32, radius: f32) -> Self {
        let intensity = clamp01(intensity);
        Self {
            id,
            object: None,
            kind,
            position,
            base_intensity: intensity,
            intensity,
            radius: radius.max(0.0),
            active: true,
            can_toggle: false,
            toggle_interval: 0.0,
            toggle_timer: 0.0,
        }
    }

    pub fn with_object(mut self, object: ObjectId) -> Self {
        self.object = Some(object);
        self
    }

    pub fn toggleable(mut self, interval: f32) -> Self {
        self.can_toggle = true;
        self.toggle_interval = interval.max(0.0);
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn base_intensity(&self) -> f32 {
        self.base_intensity
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// (1 - d / radius) · intensity, 0 если выключен или вне радиуса
    pub fn influence_at(&self, point: Vec3) -> f32 {
        if !self.active || self.radius <= 0.0 {
            return 0.0;
        }
        let distance = self.position.distance(point);
        if distance >= self.radius {
            return 0.0;
        }
        (1.0 - distance / self.radius) * self.intensity
    }

    pub fn effect_value_at(&self, point: Vec3) -> f32 {
        self.influence_at(point) * self.kind.effect_multiplier()
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// false если элемент нельзя переключать
    pub fn toggle(&mut self) -> bool {
        if !self.can_toggle {
            return false;
        }
        self.active = !self.active;
        true
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = clamp01(intensity);
    }

    pub fn restore_intensity(&mut self) {
        self.intensity = self.base_intensity;
    }

    /// Auto-toggle. true - состояние переключилось.
    pub fn tick(&mut self, delta: f32) -> bool {
        if !self.can_toggle || self.toggle_interval <= 0.0 {
            return false;
        }
        self.toggle_timer += delta;
        if self.toggle_timer >= self.toggle_interval {
            self.toggle_timer -= self.toggle_interval;
            self.active = !self.active;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_influence_falloff() {
        let element = EnvironmentalElement::new(ElementId(1), ElementKind::Shadow, Vec3::ZERO, 0.5, 5.0);
        assert!((element.influence_at(Vec3::ZERO) - 0.5).abs() < 1e-6);
        assert!((element.influence_at(Vec3::X * 2.5) - 0.25).abs() < 1e-6);
        assert_eq!(element.influence_at(Vec3::X * 5.0), 0.0);
    }

    #[test]
    fn test_light_effect_is_negative() {
        let light = EnvironmentalElement::new(ElementId(1), ElementKind::Light, Vec3::ZERO, 1.0, 4.0);
        assert!(light.effect_value_at(Vec3::ZERO) < 0.0);
        assert!((light.effect_value_at(Vec3::ZERO) + 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_toggle_requires_flag() {
        let mut fixed = EnvironmentalElement::new(ElementId(1), ElementKind::Noise, Vec3::ZERO, 0.5, 5.0);
        assert!(!fixed.toggle());
        assert!(fixed.is_active());

        let mut flicker = EnvironmentalElement::new(ElementId(2), ElementKind::Light, Vec3::ZERO, 0.5, 5.0).toggleable(1.0);
        assert!(!flicker.tick(0.6));
        assert!(flicker.tick(0.6));
        assert!(!flicker.is_active());
        assert_eq!(flicker.influence_at(Vec3::ZERO), 0.0);
    }

    #[test]
    fn test_set_intensity_clamps() {
        let mut element = EnvironmentalElement::new(ElementId(1), ElementKind::Foliage, Vec3::ZERO, 0.5, 5.0);
        element.set_intensity(2.0);
        assert_eq!(element.intensity(), 1.0);
        element.restore_intensity();
        assert_eq!(element.intensity(), 0.5);
    }
}
