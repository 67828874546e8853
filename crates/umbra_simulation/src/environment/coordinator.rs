//! EnvironmentCoordinator - связывает zones, elements и light field с detection sink.
//!
//! Порядок `tick`:
//! 1. Throttle: работа только раз в `update_interval`
//! 2. Discovery (первый раз, смещение агента > rediscovery_distance, request_refresh)
//! 3. Вход / выход по приближению (zones без явного действия)
//! 4. Light cache evaluator'а (track)
//! 5. Агрегация в точке агента (policy из config)
//! 6. "Touched" zones + pruning
//! 7. Push в DetectionSink

use std::collections::{BTreeSet, HashMap};

use bevy::prelude::*;

use crate::collision_layers::{LAYER_HIDING_SPOT, MASK_DISCOVERY};
use crate::concealment::{
    ConcealmentRegistry, ConcealmentType, ElementKind, EntryPath, EnvironmentalElement, ZoneSettings,
};
use crate::config::{ConfigError, EnvironmentConfig};
use crate::environment::sample::EnvironmentSample;
use crate::lighting::LightFieldEvaluator;
use crate::services::{DetectionSink, LightSourceProvider, ObjectDescriptor, SpatialQuery, StealthService};
use crate::shared::{OccupantId, ZoneId};

/// Итог одного прохода discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscoveryReport {
    pub zones_added: usize,
    pub elements_added: usize,
    /// Colliders без descriptor'а, обёрнутые в zone с defaults
    pub auto_wrapped: usize,
    pub already_known: usize,
}

#[derive(Resource, Debug)]
pub struct EnvironmentCoordinator {
    config: EnvironmentConfig,
    anchor: Vec3,
    last_discovery_position: Option<Vec3>,
    refresh_requested: bool,
    accumulator: f32,
    elapsed: f64,
    /// ZoneId → время последнего касания
    touched: HashMap<ZoneId, f64>,
    /// Zones, куда агент вошёл по приближению (и откуда выйдет так же)
    proximity_zones: BTreeSet<ZoneId>,
    last_sample: EnvironmentSample,
}

impl EnvironmentCoordinator {
    pub fn new(config: EnvironmentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            anchor: Vec3::ZERO,
            last_discovery_position: None,
            refresh_requested: false,
            accumulator: 0.0,
            elapsed: 0.0,
            touched: HashMap::new(),
            proximity_zones: BTreeSet::new(),
            last_sample: EnvironmentSample::default(),
        })
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Ручной anchor (если он не следует за агентом)
    pub fn set_anchor(&mut self, anchor: Vec3) {
        self.anchor = anchor;
    }

    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    pub fn last_sample(&self) -> &EnvironmentSample {
        &self.last_sample
    }

    pub fn tracked_zone_count(&self) -> usize {
        self.touched.len()
    }

    pub fn is_tracking(&self, zone: ZoneId) -> bool {
        self.touched.contains_key(&zone)
    }

    pub fn entered_by_proximity(&self, zone: ZoneId) -> bool {
        self.proximity_zones.contains(&zone)
    }

    pub fn needs_discovery(&self) -> bool {
        match self.last_discovery_position {
            None => true,
            Some(last) => self.refresh_requested || last.distance(self.anchor) > self.config.rediscovery_distance,
        }
    }

    /// Находит hiding spots и elements вокруг anchor, регистрирует новые
    pub fn discover<S: SpatialQuery + ?Sized>(&mut self, scene: &S, registry: &mut ConcealmentRegistry) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let found = scene.overlap_sphere(self.anchor, self.config.discovery_radius, MASK_DISCOVERY);

        for object in found {
            if registry.lookup_object(object.id).is_some() {
                report.already_known += 1;
                continue;
            }

            match &object.descriptor {
                ObjectDescriptor::HidingSpot(descriptor) => {
                    let settings = ZoneSettings::new(descriptor.kind, object.position)
                        .with_strength(descriptor.strength.unwrap_or(self.config.default_concealment))
                        .with_capacity(descriptor.capacity.unwrap_or(self.config.default_capacity))
                        .with_radius(descriptor.influence_radius.unwrap_or(self.config.default_influence_radius))
                        .requiring_action(descriptor.requires_action || descriptor.kind.is_enclosed());
                    registry.add_zone_for_object(object.id, settings);
                    report.zones_added += 1;
                }
                ObjectDescriptor::Element(descriptor) => {
                    let descriptor = descriptor.clone();
                    let position = object.position;
                    registry.insert_element(Some(object.id), |id| {
                        let element = EnvironmentalElement::new(
                            id,
                            descriptor.kind,
                            position,
                            descriptor.intensity,
                            descriptor.radius,
                        );
                        if descriptor.can_toggle {
                            element.toggleable(descriptor.toggle_interval)
                        } else {
                            element
                        }
                    });
                    report.elements_added += 1;
                }
                _ if object.layer & LAYER_HIDING_SPOT != 0 => {
                    // Collider без компонента - оборачиваем с defaults
                    let settings = ZoneSettings::new(ConcealmentType::Custom, object.position)
                        .with_strength(self.config.default_concealment)
                        .with_capacity(self.config.default_capacity)
                        .with_radius(self.config.default_influence_radius);
                    registry.add_zone_for_object(object.id, settings);
                    report.auto_wrapped += 1;
                }
                _ => {}
            }
        }

        self.last_discovery_position = Some(self.anchor);
        self.refresh_requested = false;

        if report.zones_added + report.elements_added + report.auto_wrapped > 0 {
            crate::log_info(&format!(
                "🌿 Environment discovery: +{} zones, +{} elements, {} auto-wrapped ({} known)",
                report.zones_added, report.elements_added, report.auto_wrapped, report.already_known
            ));
        }
        report
    }

    /// Один tick. Some(sample) - на этом tick была агрегация и push в агента.
    pub fn tick<S, A>(
        &mut self,
        delta: f32,
        agent_position: Vec3,
        scene: &S,
        registry: &mut ConcealmentRegistry,
        mut evaluator: Option<&mut LightFieldEvaluator>,
        agent: &mut A,
    ) -> Option<EnvironmentSample>
    where
        S: SpatialQuery + LightSourceProvider + ?Sized,
        A: DetectionSink + StealthService + ?Sized,
    {
        self.elapsed += delta as f64;
        self.accumulator += delta;
        if self.accumulator < self.config.update_interval {
            return None;
        }
        self.accumulator -= self.config.update_interval;
        if self.accumulator >= self.config.update_interval {
            // Длинный кадр: не догоняем пропущенные интервалы
            self.accumulator = 0.0;
        }

        if self.config.anchor_follows_agent {
            self.anchor = agent_position;
        }
        if self.needs_discovery() {
            self.discover(scene, registry);
        }
        self.update_proximity_occupancy(agent_position, registry, agent);
        if let Some(evaluator) = evaluator.as_deref_mut() {
            evaluator.track(scene, agent_position, self.elapsed);
        }

        let sample = self.sample_at(agent_position, scene, registry, evaluator);
        self.touch_nearby(agent_position, registry);

        agent.apply_environmental_concealment(sample.concealment, sample.dominant_source.unwrap_or("None"));
        agent.apply_light_exposure(sample.light_exposure, sample.light_direction);
        agent.apply_noise_masking(sample.noise_masking);

        self.last_sample = sample.clone();
        Some(sample)
    }

    /// Агрегат в точке без side effects на sink
    pub fn sample_at<S: SpatialQuery + ?Sized>(
        &self,
        position: Vec3,
        scene: &S,
        registry: &ConcealmentRegistry,
        evaluator: Option<&mut LightFieldEvaluator>,
    ) -> EnvironmentSample {
        let config = &self.config;
        let mut concealment: Vec<(f32, &'static str)> = Vec::new();
        let mut exposure: Vec<f32> = Vec::new();
        let mut noise: Vec<f32> = Vec::new();
        let mut light_direction = Vec3::ZERO;
        let mut brightest_element = 0.0;

        for zone in registry.zones() {
            let value = zone.concealment_at(position);
            if value > config.min_influence {
                concealment.push((value, zone.kind().tag()));
            }
        }

        for element in registry.elements() {
            let influence = element.influence_at(position);
            let kind = element.kind();
            let value = influence * kind.effect_multiplier().abs();
            match kind {
                ElementKind::Shadow if influence > config.shadow_threshold => concealment.push((value, kind.tag())),
                ElementKind::Foliage if influence > config.foliage_threshold => concealment.push((value, kind.tag())),
                ElementKind::Light if influence > config.light_threshold => {
                    exposure.push(value);
                    if value > brightest_element {
                        brightest_element = value;
                        light_direction = (position - element.position()).normalize_or_zero();
                    }
                }
                ElementKind::Noise if influence > config.noise_threshold => noise.push(value),
                _ => {}
            }
        }

        if config.include_light_field {
            if let Some(evaluator) = evaluator {
                let light = evaluator.sample_at(scene, position);
                exposure.push(light.level);
                if let Some(direction) = light.dominant_direction {
                    if light.level >= brightest_element {
                        light_direction = direction;
                    }
                }
            }
        }

        let values: Vec<f32> = concealment.iter().map(|(value, _)| *value).collect();
        let dominant_source = concealment
            .iter()
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, tag)| *tag);

        EnvironmentSample {
            concealment: config.aggregation.combine(&values).clamp(0.0, 1.0),
            light_exposure: config.aggregation.combine(&exposure).clamp(0.0, 1.0),
            noise_masking: config.aggregation.combine(&noise).clamp(0.0, 1.0),
            concealment_sources: concealment.len(),
            light_sources: exposure.len(),
            dominant_source,
            light_direction,
        }
    }

    pub fn concealment_at<S: SpatialQuery + ?Sized>(
        &self,
        position: Vec3,
        scene: &S,
        registry: &ConcealmentRegistry,
    ) -> f32 {
        self.sample_at(position, scene, registry, None).concealment
    }

    pub fn light_exposure_at<S: SpatialQuery + ?Sized>(
        &self,
        position: Vec3,
        scene: &S,
        registry: &ConcealmentRegistry,
        evaluator: Option<&mut LightFieldEvaluator>,
    ) -> f32 {
        self.sample_at(position, scene, registry, evaluator).light_exposure
    }

    /// Агент занимает не больше одной zone: ближайшую доступную, если сейчас он ни в какой.
    /// Выходит по приближению только из zones, куда так же и вошёл (locker через команду не трогаем).
    fn update_proximity_occupancy<A: StealthService + ?Sized>(
        &mut self,
        position: Vec3,
        registry: &mut ConcealmentRegistry,
        agent: &mut A,
    ) {
        let entered: Vec<ZoneId> = self.proximity_zones.iter().copied().collect();
        for id in entered {
            let inside = match registry.zone(id) {
                Some(zone) if zone.contains(OccupantId::AGENT) => {
                    zone.position().distance(position) <= zone.influence_radius()
                }
                // Zone удалена или агент вышел другим путём (команда, деактивация)
                _ => {
                    self.proximity_zones.remove(&id);
                    continue;
                }
            };
            if !inside {
                registry.try_exit(id, OccupantId::AGENT, agent);
                self.proximity_zones.remove(&id);
            }
        }

        if registry.zone_of(OccupantId::AGENT).is_some() {
            return;
        }
        let nearest = registry
            .zones()
            .filter(|zone| zone.is_active() && !zone.requires_action() && !zone.is_full())
            .map(|zone| (zone.id(), zone.position().distance(position), zone.influence_radius()))
            .filter(|(_, distance, radius)| distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _, _)| id);
        if let Some(id) = nearest {
            if registry.try_enter(id, OccupantId::AGENT, EntryPath::Proximity, agent) {
                self.proximity_zones.insert(id);
            }
        }
    }

    /// Отмечает zones рядом с агентом, старые записи выкидываются сверх лимита
    fn touch_nearby(&mut self, position: Vec3, registry: &ConcealmentRegistry) {
        for zone in registry.zones_near(position, self.config.interaction_radius) {
            self.touched.insert(zone, self.elapsed);
        }

        while self.touched.len() > self.config.max_tracked_elements {
            let oldest = self
                .touched
                .iter()
                .min_by(|a, b| a.1.total_cmp(b.1).then(a.0.cmp(b.0)))
                .map(|(zone, _)| *zone);
            match oldest {
                Some(zone) => {
                    self.touched.remove(&zone);
                }
                None => break,
            }
        }
    }
}
