//! UMBRA Stealth Core
//!
//! Headless stealth-симуляция на Bevy 0.16:
//! - light field (сколько света попадает в точку, с тенями)
//! - concealment zones + environmental elements (registry)
//! - environment coordinator (агрегация → detection sink агента)
//! - pooled undoable stealth commands (movement / interaction / ability)
//!
//! Движок предоставляет сцену через traits из `services`;
//! `scene::StaticScene` - reference host для headless прогонов и тестов.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod agent;
pub mod collision_layers;
pub mod commands;
pub mod concealment;
pub mod config;
pub mod environment;
pub mod lighting;
pub mod logger;
pub mod plugin;
pub mod scene;
pub mod services;
pub mod shared;

pub use logger::{init_logger, log, log_error, log_info, log_warning, LogLevel};

// Re-export основных типов
pub use agent::{Distraction, StealthAgent, StealthClock};
pub use commands::{
    AbilityKind, AbilityParams, CommandContext, CommandError, CommandManager, CommandStatistics, InteractionKind,
    InteractionParams, InteractionTarget, MovementKind, MovementParams, StealthCommand,
};
pub use concealment::{ConcealmentRegistry, ConcealmentType, ElementKind, EntryPath, ZoneEvent, ZoneSettings};
pub use config::{CommandConfig, ConfigError, EnvironmentConfig, LightingConfig, StealthConfig};
pub use environment::{AggregationPolicy, EnvironmentCoordinator, EnvironmentSample};
pub use lighting::{LightFieldEvaluator, LightSource, ShadowJitter};
pub use plugin::{StealthActionIntent, StealthActionOutcome, StealthHost, StealthPlugin};
pub use scene::StaticScene;
pub use shared::{ElementId, LightId, ObjectId, OccupantId, ZoneId};

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}
