//! FixedUpdate системы stealth core.
//!
//! Порядок (chain):
//! 1. tick_concealment_zones - clock, entry countdowns, auto-toggle элементов
//! 2. update_environment - агрегация по состоянию на начало tick'а
//! 3. process_action_intents - команды меняют состояние сразу (видно следующей агрегации)
//! 4. tick_active_abilities - countdown / auto-deactivate
//! 5. forward_zone_events - очередь registry → Bevy events
//! 6. forward_distractions - distractions агента → Bevy events

use bevy::prelude::*;

use crate::agent::{Distraction, StealthAgent, StealthClock};
use crate::commands::{CommandContext, CommandManager};
use crate::concealment::{ConcealmentRegistry, ZoneEvent};
use crate::environment::EnvironmentCoordinator;
use crate::lighting::LightFieldEvaluator;
use crate::plugin::events::{StealthActionIntent, StealthActionOutcome};
use crate::plugin::StealthHost;
use crate::services::AgentBody;

/// System: clock + countdown'ы зон
pub fn tick_concealment_zones(
    time: Res<Time<Fixed>>,
    mut clock: ResMut<StealthClock>,
    mut registry: ResMut<ConcealmentRegistry>,
    mut agent: ResMut<StealthAgent>,
) {
    let delta = time.delta_secs();
    clock.advance(delta);
    registry.tick(delta, &mut *agent);
}

/// System: discovery + агрегация → DetectionSink (агент)
pub fn update_environment(
    time: Res<Time<Fixed>>,
    host: Option<Res<StealthHost>>,
    mut coordinator: ResMut<EnvironmentCoordinator>,
    mut registry: ResMut<ConcealmentRegistry>,
    mut evaluator: ResMut<LightFieldEvaluator>,
    mut agent: ResMut<StealthAgent>,
) {
    let Some(host) = host else {
        return;
    };
    let position = agent.position();
    coordinator.tick(
        time.delta_secs(),
        position,
        host.scene(),
        &mut registry,
        Some(&mut *evaluator),
        &mut *agent,
    );
}

/// System: StealthActionIntent → CommandManager → StealthActionOutcome
pub fn process_action_intents(
    mut intents: EventReader<StealthActionIntent>,
    mut outcomes: EventWriter<StealthActionOutcome>,
    mut manager: ResMut<CommandManager>,
    mut registry: ResMut<ConcealmentRegistry>,
    mut clock: ResMut<StealthClock>,
    mut agent: ResMut<StealthAgent>,
    mut evaluator: ResMut<LightFieldEvaluator>,
    mut host: Option<ResMut<StealthHost>>,
) {
    for intent in intents.read() {
        let mut ctx = CommandContext::new(&mut registry, &mut clock).with_agent(&mut *agent);
        if let Some(host) = host.as_deref_mut() {
            ctx = ctx.with_scene(host.scene_mut());
        }

        let success = match intent {
            StealthActionIntent::Movement { params, name } => {
                manager.execute_movement(&mut ctx, params.clone(), name.as_deref())
            }
            StealthActionIntent::Interaction { params, name } => {
                manager.execute_interaction(&mut ctx, params.clone(), name.as_deref())
            }
            StealthActionIntent::Ability { params, name } => {
                manager.execute_ability(&mut ctx, params.clone(), name.as_deref())
            }
            StealthActionIntent::UndoLast => manager.undo_last(&mut ctx),
            StealthActionIntent::UndoNamed(name) => manager.undo_named(name, &mut ctx),
            StealthActionIntent::DeactivateAbilities => {
                manager.deactivate_all_abilities(&mut ctx);
                true
            }
            StealthActionIntent::ClearHistory => {
                manager.clear_history();
                true
            }
        };

        if success && intent.affects_lighting() {
            evaluator.request_refresh();
        }
        outcomes.write(StealthActionOutcome {
            action: intent.label(),
            success,
        });
    }
}

/// System: countdown активных abilities (реальное время, не time scale)
pub fn tick_active_abilities(
    time: Res<Time<Fixed>>,
    mut manager: ResMut<CommandManager>,
    mut registry: ResMut<ConcealmentRegistry>,
    mut clock: ResMut<StealthClock>,
    mut agent: ResMut<StealthAgent>,
    mut host: Option<ResMut<StealthHost>>,
) {
    let mut ctx = CommandContext::new(&mut registry, &mut clock).with_agent(&mut *agent);
    if let Some(host) = host.as_deref_mut() {
        ctx = ctx.with_scene(host.scene_mut());
    }
    manager.update_abilities(time.delta_secs(), &mut ctx);
}

/// System: пересылка notifications registry в Bevy events
pub fn forward_zone_events(mut registry: ResMut<ConcealmentRegistry>, mut events: EventWriter<ZoneEvent>) {
    for event in registry.drain_events() {
        events.write(event);
    }
}

/// System: distractions, созданные командами, уходят наружу (буфер агента пустеет каждый tick)
pub fn forward_distractions(mut agent: ResMut<StealthAgent>, mut events: EventWriter<Distraction>) {
    for distraction in agent.take_distractions() {
        events.write(distraction);
    }
}
