//! Stealth Plugin
//!
//! Собирает light field, concealment registry, environment coordinator
//! и command manager в Bevy app. Все системы в FixedUpdate для детерминизма.
//!
//! Порядок выполнения:
//! 1. tick_concealment_zones - clock + entry countdown'ы зон
//! 2. update_environment - discovery, агрегация, push в агента
//! 3. process_action_intents - StealthActionIntent → команды
//! 4. tick_active_abilities - истечение abilities
//! 5. forward_zone_events - ZoneEvent наружу
//! 6. forward_distractions - Distraction наружу

use bevy::prelude::*;

use crate::agent::{Distraction, StealthAgent, StealthClock};
use crate::commands::CommandManager;
use crate::concealment::{ConcealmentRegistry, ZoneEvent};
use crate::config::StealthConfig;
use crate::environment::EnvironmentCoordinator;
use crate::lighting::LightFieldEvaluator;
use crate::services::HostScene;
use crate::DeterministicRng;

pub mod events;
pub mod systems;

pub use events::{StealthActionIntent, StealthActionOutcome};

/// Host-сцена (physics / lights / interactables), которую предоставляет движок
#[derive(Resource)]
pub struct StealthHost {
    scene: Box<dyn HostScene + Send + Sync>,
}

impl StealthHost {
    pub fn new(scene: impl HostScene + Send + Sync + 'static) -> Self {
        Self { scene: Box::new(scene) }
    }

    pub fn scene(&self) -> &(dyn HostScene + Send + Sync) {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> &mut dyn HostScene {
        self.scene.as_mut()
    }
}

#[derive(Default)]
pub struct StealthPlugin {
    pub config: StealthConfig,
}

impl StealthPlugin {
    pub fn new(config: StealthConfig) -> Self {
        Self { config }
    }
}

impl Plugin for StealthPlugin {
    fn build(&self, app: &mut App) {
        let config = match self.config.validate() {
            Ok(()) => self.config.clone(),
            Err(err) => {
                crate::log_error(&format!("❌ StealthPlugin: invalid config ({}), using defaults", err));
                StealthConfig::default()
            }
        };

        // Default config всегда валиден → ошибки здесь не ожидаются, но не паникуем
        let (mut evaluator, coordinator, manager) = match (
            LightFieldEvaluator::new(config.lighting.clone()),
            EnvironmentCoordinator::new(config.environment.clone()),
            CommandManager::new(config.commands.clone()),
        ) {
            (Ok(evaluator), Ok(coordinator), Ok(manager)) => (evaluator, coordinator, manager),
            (evaluator, coordinator, manager) => {
                let err = [evaluator.err(), coordinator.err(), manager.err()].into_iter().flatten().next();
                crate::log_error(&format!("❌ StealthPlugin: failed to build subsystems: {:?}", err));
                return;
            }
        };

        if let Some(rng) = app.world().get_resource::<DeterministicRng>() {
            evaluator.reseed(rng.seed);
        }

        let concealed_threshold = config.environment.concealed_threshold;
        if !app.world().contains_resource::<StealthAgent>() {
            app.insert_resource(StealthAgent::default().with_concealed_threshold(concealed_threshold));
        }

        app.insert_resource(config)
            .insert_resource(evaluator)
            .insert_resource(coordinator)
            .insert_resource(manager)
            .init_resource::<ConcealmentRegistry>()
            .init_resource::<StealthClock>()
            .add_event::<ZoneEvent>()
            .add_event::<Distraction>()
            .add_event::<StealthActionIntent>()
            .add_event::<StealthActionOutcome>()
            .add_systems(
                FixedUpdate,
                (
                    systems::tick_concealment_zones,
                    systems::update_environment,
                    systems::process_action_intents,
                    systems::tick_active_abilities,
                    systems::forward_zone_events,
                    systems::forward_distractions,
                )
                    .chain(),
            );

        crate::log_info("🕶️ StealthPlugin initialized");
    }
}
