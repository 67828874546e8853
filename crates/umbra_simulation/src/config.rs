//! Конфигурация stealth core
//!
//! Один `StealthConfig` (serde, все поля с default) вместо inspector-полей.
//! `validate()` вызывается при создании каждой подсистемы.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collision_layers::{LayerMask, MASK_SHADOW_RAYS};
use crate::environment::AggregationPolicy;
use crate::lighting::ShadowJitter;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be {requirement} (got {value})")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },
    #[error("pool `{0}`: max_size must be at least 1")]
    EmptyPool(&'static str),
    #[error("pool `{0}`: prewarm_count exceeds max_size")]
    PrewarmExceedsCapacity(&'static str),
}

fn check(field: &'static str, requirement: &'static str, value: f32, ok: bool) -> Result<(), ConfigError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement,
            value: value as f64,
        })
    }
}

fn unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check(field, "in [0, 1]", value, (0.0..=1.0).contains(&value))
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check(field, "> 0", value, value > 0.0)
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check(field, ">= 0", value, value >= 0.0)
}

/// Корневой config (Resource)
#[derive(Resource, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StealthConfig {
    pub lighting: LightingConfig,
    pub environment: EnvironmentConfig,
    pub commands: CommandConfig,
}

impl StealthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lighting.validate()?;
        self.environment.validate()?;
        self.commands.validate()
    }
}

/// Light-field evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Базовая освещённость без ламп
    pub ambient_level: f32,
    /// Делитель нормализации (level = sum / max_level)
    pub max_level: f32,
    /// k в 1/(1 + d²·k)
    pub quadratic_falloff: f32,
    /// Clamp расстояния (точка внутри лампы)
    pub min_distance: f32,
    pub shadow_samples: u32,
    pub shadow_jitter: ShadowJitter,
    /// Насколько раньше точки обрывать shadow ray
    pub shadow_bias: f32,
    /// Откуда пускать rays directional лампы
    pub directional_shadow_distance: f32,
    pub shadow_mask: LayerMask,
    /// Вклады не выше порога игнорируются (и не трассируются)
    pub influence_threshold: f32,
    pub max_lights: usize,
    /// Смещение агента, после которого список ламп пересобирается
    pub refresh_distance: f32,
    pub include_indirect: bool,
    pub indirect_weight: f32,
    /// Seed jitter'а (если в App нет DeterministicRng)
    pub rng_seed: u64,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_level: 0.1,
            max_level: 1.0,
            quadratic_falloff: 0.1,
            min_distance: 0.001,
            shadow_samples: 8,
            shadow_jitter: ShadowJitter::default(),
            shadow_bias: 0.01,
            directional_shadow_distance: 100.0,
            shadow_mask: MASK_SHADOW_RAYS,
            influence_threshold: 0.01,
            max_lights: 20,
            refresh_distance: 10.0,
            include_indirect: true,
            indirect_weight: 0.2,
            rng_seed: 42,
        }
    }
}

impl LightingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit("lighting.ambient_level", self.ambient_level)?;
        positive("lighting.max_level", self.max_level)?;
        non_negative("lighting.quadratic_falloff", self.quadratic_falloff)?;
        positive("lighting.min_distance", self.min_distance)?;
        check(
            "lighting.shadow_samples",
            "between 1 and 64",
            self.shadow_samples as f32,
            (1..=64).contains(&self.shadow_samples),
        )?;
        non_negative("lighting.shadow_jitter", self.shadow_jitter.magnitude())?;
        non_negative("lighting.shadow_bias", self.shadow_bias)?;
        positive("lighting.directional_shadow_distance", self.directional_shadow_distance)?;
        unit("lighting.influence_threshold", self.influence_threshold)?;
        check("lighting.max_lights", ">= 1", self.max_lights as f32, self.max_lights >= 1)?;
        non_negative("lighting.refresh_distance", self.refresh_distance)?;
        unit("lighting.indirect_weight", self.indirect_weight)
    }
}

/// Environment coordinator + defaults для auto-wrapped zones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Период агрегации (секунды, минимум 0.016)
    pub update_interval: f32,
    pub discovery_radius: f32,
    pub rediscovery_distance: f32,
    pub anchor_follows_agent: bool,
    /// Радиус "touched" zones вокруг агента
    pub interaction_radius: f32,
    pub max_tracked_elements: usize,
    /// Минимальный вклад zone в агрегат
    pub min_influence: f32,
    pub shadow_threshold: f32,
    pub foliage_threshold: f32,
    pub light_threshold: f32,
    pub noise_threshold: f32,
    pub aggregation: AggregationPolicy,
    /// Учитывать уровень light-field в exposure
    pub include_light_field: bool,
    /// Env concealment, начиная с которого агент считается скрытым
    pub concealed_threshold: f32,
    pub default_concealment: f32,
    pub default_capacity: u32,
    pub default_influence_radius: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            update_interval: 0.1,
            discovery_radius: 25.0,
            rediscovery_distance: 10.0,
            anchor_follows_agent: true,
            interaction_radius: 3.0,
            max_tracked_elements: 50,
            min_influence: 0.01,
            shadow_threshold: 0.3,
            foliage_threshold: 0.2,
            light_threshold: 0.1,
            noise_threshold: 0.4,
            aggregation: AggregationPolicy::Mean,
            include_light_field: true,
            concealed_threshold: 0.5,
            default_concealment: 0.8,
            default_capacity: 1,
            default_influence_radius: 2.0,
        }
    }
}

impl EnvironmentConfig {
    pub const MIN_UPDATE_INTERVAL: f32 = 0.016;

    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            "environment.update_interval",
            ">= 0.016",
            self.update_interval,
            self.update_interval >= Self::MIN_UPDATE_INTERVAL,
        )?;
        positive("environment.discovery_radius", self.discovery_radius)?;
        non_negative("environment.rediscovery_distance", self.rediscovery_distance)?;
        non_negative("environment.interaction_radius", self.interaction_radius)?;
        check(
            "environment.max_tracked_elements",
            ">= 1",
            self.max_tracked_elements as f32,
            self.max_tracked_elements >= 1,
        )?;
        unit("environment.min_influence", self.min_influence)?;
        unit("environment.shadow_threshold", self.shadow_threshold)?;
        unit("environment.foliage_threshold", self.foliage_threshold)?;
        unit("environment.light_threshold", self.light_threshold)?;
        unit("environment.noise_threshold", self.noise_threshold)?;
        unit("environment.concealed_threshold", self.concealed_threshold)?;
        unit("environment.default_concealment", self.default_concealment)?;
        check(
            "environment.default_capacity",
            ">= 1",
            self.default_capacity as f32,
            self.default_capacity >= 1,
        )?;
        positive("environment.default_influence_radius", self.default_influence_radius)
    }
}

/// Размер pool'а и сколько экземпляров создать заранее
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_size: usize,
    pub prewarm_count: usize,
}

impl PoolConfig {
    /// prewarm = четверть ёмкости
    pub const fn with_quarter_prewarm(max_size: usize) -> Self {
        Self {
            max_size,
            prewarm_count: max_size / 4,
        }
    }

    pub fn validate(&self, label: &'static str) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::EmptyPool(label));
        }
        if self.prewarm_count > self.max_size {
            return Err(ConfigError::PrewarmExceedsCapacity(label));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            prewarm_count: 0,
        }
    }
}

/// CommandManager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub movement_pool: PoolConfig,
    pub interaction_pool: PoolConfig,
    pub ability_pool: PoolConfig,
    /// Глубина undo stack
    pub max_history: usize,
    /// При исчерпании pool'а коммитить самую старую команду того же вида из history
    pub recycle_history_on_exhaustion: bool,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            movement_pool: PoolConfig::with_quarter_prewarm(15),
            interaction_pool: PoolConfig::with_quarter_prewarm(20),
            ability_pool: PoolConfig::with_quarter_prewarm(10),
            max_history: 50,
            recycle_history_on_exhaustion: true,
        }
    }
}

impl CommandConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.movement_pool.validate("movement")?;
        self.interaction_pool.validate("interaction")?;
        self.ability_pool.validate("ability")?;
        check("commands.max_history", ">= 1", self.max_history as f32, self.max_history >= 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(StealthConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_default_pool_sizes() {
        let commands = CommandConfig::default();
        assert_eq!(commands.movement_pool, PoolConfig { max_size: 15, prewarm_count: 3 });
        assert_eq!(commands.interaction_pool, PoolConfig { max_size: 20, prewarm_count: 5 });
        assert_eq!(commands.ability_pool, PoolConfig { max_size: 10, prewarm_count: 2 });
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let mut config = StealthConfig::default();
        config.lighting.ambient_level = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "lighting.ambient_level", .. })
        ));

        let mut config = StealthConfig::default();
        config.environment.update_interval = 0.001;
        assert!(config.validate().is_err());

        let mut config = StealthConfig::default();
        config.commands.ability_pool.prewarm_count = 11;
        assert_eq!(config.validate(), Err(ConfigError::PrewarmExceedsCapacity("ability")));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "lighting": { "ambient_level": 0.25, "shadow_samples": 4 } }"#;
        let config: StealthConfig = serde_json::from_str(json).expect("partial config должен парситься");

        assert_eq!(config.lighting.ambient_level, 0.25);
        assert_eq!(config.lighting.shadow_samples, 4);
        assert_eq!(config.lighting.max_lights, 20);
        assert_eq!(config.environment, EnvironmentConfig::default());
        assert!(config.validate().is_ok());
    }
}
