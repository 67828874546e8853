//! LightFieldEvaluator - освещённость точки в [0, 1].
//!
//! level = clamp01((ambient + Σ contribution · shadow + indirect) / max_level)
//!
//! Кэш ламп перестраивается целиком:
//! - при первом использовании
//! - когда агент ушёл дальше `refresh_distance` от точки последней сборки
//! - по `request_refresh()`
//!
//! Инвариант: в кэше не больше `max_lights` ламп (ранжирование по intensity / max(1, distance)).

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{ConfigError, LightingConfig};
use crate::lighting::shadow::{shadow_factor, ShadowSampling};
use crate::lighting::source::{CachedLight, LightKind, LightSource, ReflectionProbe};
use crate::services::{LightSourceProvider, SpatialQuery};
use crate::shared::{clamp01, lerp};

/// Результат sample_at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    pub level: f32,
    /// Направление света от самой сильной лампы (куда он идёт)
    pub dominant_direction: Option<Vec3>,
    pub contributing_lights: usize,
}

#[derive(Resource)]
pub struct LightFieldEvaluator {
    config: LightingConfig,
    ambient_level: f32,
    cache: Vec<CachedLight>,
    probes: Vec<ReflectionProbe>,
    last_refresh_position: Option<Vec3>,
    refresh_requested: bool,
    rng: ChaCha8Rng,
}

impl LightFieldEvaluator {
    pub fn new(config: LightingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.rng_seed;
        Ok(Self::with_seed(config, seed))
    }

    fn with_seed(config: LightingConfig, seed: u64) -> Self {
        Self {
            ambient_level: config.ambient_level,
            config,
            cache: Vec::new(),
            probes: Vec::new(),
            last_refresh_position: None,
            refresh_requested: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Пересоздаёт jitter RNG (детерминизм между прогонами)
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    pub fn ambient_level(&self) -> f32 {
        self.ambient_level
    }

    pub fn set_ambient_level(&mut self, level: f32) {
        self.ambient_level = clamp01(level);
    }

    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    pub fn active_light_count(&self) -> usize {
        self.cache.len()
    }

    pub fn cached_lights(&self) -> &[CachedLight] {
        &self.cache
    }

    pub fn needs_refresh(&self, anchor: Vec3) -> bool {
        match self.last_refresh_position {
            None => true,
            Some(last) => self.refresh_requested || last.distance(anchor) > self.config.refresh_distance,
        }
    }

    /// Пересобирает кэш если нужно. true - кэш был пересобран.
    pub fn track<P: LightSourceProvider + ?Sized>(&mut self, provider: &P, anchor: Vec3, now: f64) -> bool {
        if !self.needs_refresh(anchor) {
            return false;
        }
        self.refresh_lights(provider, anchor, now);
        true
    }

    /// Полная пересборка списка ламп (не инкрементальная)
    pub fn refresh_lights<P: LightSourceProvider + ?Sized>(&mut self, provider: &P, anchor: Vec3, now: f64) {
        let mut lights: Vec<LightSource> = provider
            .light_sources()
            .into_iter()
            .filter(|light| light.enabled && light.intensity > 0.0)
            .collect();

        let total = lights.len();
        if lights.len() > self.config.max_lights {
            lights.sort_by(|a, b| b.importance(anchor).total_cmp(&a.importance(anchor)));
            lights.truncate(self.config.max_lights);
            crate::log(&format!(
                "💡 LightField: {} active lights, keeping {} most important",
                total, self.config.max_lights
            ));
        }

        self.cache = lights
            .into_iter()
            .map(|source| CachedLight { source, cached_at: now })
            .collect();
        self.probes = provider.reflection_probes().into_iter().filter(|probe| probe.enabled).collect();
        self.last_refresh_position = Some(anchor);
        self.refresh_requested = false;
    }

    /// Освещённость точки (0..1)
    pub fn evaluate_at<Q: SpatialQuery + ?Sized>(&mut self, scene: &Q, position: Vec3) -> f32 {
        self.sample_at(scene, position).level
    }

    pub fn sample_at<Q: SpatialQuery + ?Sized>(&mut self, scene: &Q, position: Vec3) -> LightSample {
        let sampling = ShadowSampling {
            samples: self.config.shadow_samples,
            jitter: self.config.shadow_jitter,
            bias: self.config.shadow_bias,
            mask: self.config.shadow_mask,
        };

        let mut total = self.ambient_level;
        let mut strongest: Option<(f32, Vec3)> = None;
        let mut contributing = 0;

        for cached in &self.cache {
            let light = &cached.source;
            let contribution = direct_contribution(light, position, &self.config);
            // Нулевые и слабые вклады не трассируем
            if contribution <= self.config.influence_threshold {
                continue;
            }

            let origin = shadow_origin(light, position, self.config.directional_shadow_distance);
            let shadowed = contribution * shadow_factor(scene, origin, position, &sampling, &mut self.rng);
            if shadowed <= 0.0 {
                continue;
            }

            total += shadowed;
            contributing += 1;
            if strongest.map_or(true, |(best, _)| shadowed > best) {
                strongest = Some((shadowed, light_direction_at(light, position)));
            }
        }

        if self.config.include_indirect {
            total += self.indirect_at(position);
        }

        LightSample {
            level: clamp01(total / self.config.max_level),
            dominant_direction: strongest.map(|(_, direction)| direction),
            contributing_lights: contributing,
        }
    }

    /// Непрямой свет от probes (без теней)
    pub fn indirect_at(&self, position: Vec3) -> f32 {
        self.probes
            .iter()
            .filter_map(|probe| {
                let distance = probe.position.distance(position);
                (probe.size > 0.0 && distance <= probe.size)
                    .then(|| probe.intensity * (1.0 - distance / probe.size) * self.config.indirect_weight)
            })
            .sum()
    }
}

/// Вклад лампы без учёта теней
pub fn direct_contribution(light: &LightSource, position: Vec3, config: &LightingConfig) -> f32 {
    if !light.enabled {
        return 0.0;
    }

    match light.kind {
        LightKind::Directional => light.intensity,
        LightKind::Point => light.intensity * distance_falloff(light, position, config),
        LightKind::Spot => {
            let falloff = distance_falloff(light, position, config);
            if falloff <= 0.0 {
                return 0.0;
            }
            light.intensity * falloff * angular_falloff(light, position)
        }
    }
}

/// 50/50 blend квадратичного и линейного затухания, 0 начиная с range
fn distance_falloff(light: &LightSource, position: Vec3, config: &LightingConfig) -> f32 {
    let distance = light.position.distance(position).max(config.min_distance);
    if distance >= light.range {
        return 0.0;
    }
    let quadratic = 1.0 / (1.0 + distance * distance * config.quadratic_falloff);
    let linear = clamp01(1.0 - distance / light.range);
    lerp(quadratic, linear, 0.5)
}

fn angular_falloff(light: &LightSource, position: Vec3) -> f32 {
    let to_point = (position - light.position).normalize_or_zero();
    if to_point == Vec3::ZERO || light.spot_half_angle <= 0.0 {
        // Точка в самой лампе - считаем по оси конуса
        return if to_point == Vec3::ZERO { 1.0 } else { 0.0 };
    }
    let angle = light.direction.dot(to_point).clamp(-1.0, 1.0).acos().to_degrees();
    if angle > light.spot_half_angle {
        return 0.0;
    }
    let falloff = clamp01(1.0 - angle / light.spot_half_angle);
    falloff * falloff
}

fn shadow_origin(light: &LightSource, position: Vec3, directional_distance: f32) -> Vec3 {
    match light.kind {
        LightKind::Directional => position - light.direction * directional_distance,
        _ => light.position,
    }
}

fn light_direction_at(light: &LightSource, position: Vec3) -> Vec3 {
    match light.kind {
        LightKind::Directional => light.direction,
        _ => (position - light.position).normalize_or_zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::StaticScene;

    fn config() -> LightingConfig {
        LightingConfig::default()
    }

    #[test]
    fn test_point_blend_at_half_range() {
        // d=5, range=10: quad = 1/3.5, linear = 0.5
        let light = LightSource::point(Vec3::ZERO, 10.0, 1.0);
        let value = direct_contribution(&light, Vec3::new(5.0, 0.0, 0.0), &config());
        let expected = 0.5 * (1.0 / 3.5) + 0.5 * 0.5;
        assert!((value - expected).abs() < 1e-6, "got {}", value);
    }

    #[test]
    fn test_zero_at_and_beyond_range() {
        let light = LightSource::point(Vec3::ZERO, 10.0, 1.0);
        assert_eq!(direct_contribution(&light, Vec3::X * 10.0, &config()), 0.0);
        assert_eq!(direct_contribution(&light, Vec3::X * 25.0, &config()), 0.0);
    }

    #[test]
    fn test_spot_outside_cone_is_dark() {
        let light = LightSource::spot(Vec3::ZERO, Vec3::NEG_Y, 10.0, 1.0, 30.0);
        let below = direct_contribution(&light, Vec3::new(0.0, -3.0, 0.0), &config());
        let beside = direct_contribution(&light, Vec3::new(3.0, -0.5, 0.0), &config());

        assert!(below > 0.0);
        assert_eq!(beside, 0.0);
    }

    #[test]
    fn test_spot_angular_falloff_squared() {
        let light = LightSource::spot(Vec3::ZERO, Vec3::NEG_Y, 100.0, 1.0, 40.0);
        let axis = direct_contribution(&light, Vec3::new(0.0, -5.0, 0.0), &config());
        // 20° от оси на той же дистанции: angular = (1 - 20/40)² = 0.25
        let tilted_dir = Vec3::new(20f32.to_radians().sin(), -20f32.to_radians().cos(), 0.0);
        let tilted = direct_contribution(&light, tilted_dir * 5.0, &config());
        assert!((tilted / axis - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_directional_ignores_distance() {
        let light = LightSource::directional(Vec3::NEG_Y, 0.6);
        assert_eq!(direct_contribution(&light, Vec3::new(500.0, 0.0, 0.0), &config()), 0.6);
    }

    #[test]
    fn test_point_at_light_position_is_finite() {
        let light = LightSource::point(Vec3::ONE, 5.0, 1.0);
        let value = direct_contribution(&light, Vec3::ONE, &config());
        assert!(value.is_finite());
        assert!(value <= 1.0);
    }

    #[test]
    fn test_no_lights_returns_ambient() {
        let scene = StaticScene::new();
        let mut evaluator = LightFieldEvaluator::new(config()).unwrap();
        evaluator.refresh_lights(&scene, Vec3::ZERO, 0.0);

        assert!((evaluator.evaluate_at(&scene, Vec3::new(3.0, 0.0, 1.0)) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_indirect_probe_bonus() {
        let mut scene = StaticScene::new();
        scene.add_probe(ReflectionProbe::new(Vec3::ZERO, 4.0, 1.0));
        let mut evaluator = LightFieldEvaluator::new(config()).unwrap();
        evaluator.refresh_lights(&scene, Vec3::ZERO, 0.0);

        // 1 · (1 - 2/4) · 0.2 = 0.1
        assert!((evaluator.indirect_at(Vec3::X * 2.0) - 0.1).abs() < 1e-6);
        assert_eq!(evaluator.indirect_at(Vec3::X * 5.0), 0.0);
    }

    #[test]
    fn test_set_ambient_level_clamps() {
        let mut evaluator = LightFieldEvaluator::new(config()).unwrap();
        evaluator.set_ambient_level(3.0);
        assert_eq!(evaluator.ambient_level(), 1.0);
        evaluator.set_ambient_level(-1.0);
        assert_eq!(evaluator.ambient_level(), 0.0);
    }
}
