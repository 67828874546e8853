//! Stealth commands: execute / undo, pools, abilities, manager

use bevy::prelude::*;
use umbra_simulation::agent::StealthClock;
use umbra_simulation::collision_layers::{LAYER_ELECTRONICS, LAYER_INTERACTABLE};
use umbra_simulation::commands::{
    AbilityCommand, AgentSnapshot, InteractionCommand, MovementCommand, Resettable, StealthCommand,
};
use umbra_simulation::config::PoolConfig;
use umbra_simulation::services::{AgentBody, DeviceKind, InteractionWorld, ObjectDescriptor, Posture, StealthService};
use umbra_simulation::{
    AbilityKind, AbilityParams, CommandConfig, CommandContext, CommandError, CommandManager, ConcealmentRegistry,
    ConcealmentType, InteractionKind, InteractionParams, InteractionTarget, MovementKind, MovementParams, ObjectId,
    OccupantId, StaticScene, StealthAgent, ZoneSettings,
};

/// Всё, что нужно командам, в одном месте
struct Fixture {
    registry: ConcealmentRegistry,
    clock: StealthClock,
    agent: StealthAgent,
    scene: StaticScene,
}

impl Fixture {
    fn new() -> Self {
        Self {
            registry: ConcealmentRegistry::new(),
            clock: StealthClock::default(),
            agent: StealthAgent::default(),
            scene: StaticScene::new(),
        }
    }

    fn ctx(&mut self) -> CommandContext<'_> {
        CommandContext::new(&mut self.registry, &mut self.clock)
            .with_agent(&mut self.agent)
            .with_scene(&mut self.scene)
    }

    fn ctx_without_scene(&mut self) -> CommandContext<'_> {
        CommandContext::new(&mut self.registry, &mut self.clock).with_agent(&mut self.agent)
    }

    fn add_device(&mut self, kind: DeviceKind, position: Vec3) -> ObjectId {
        self.scene
            .add_sphere(LAYER_ELECTRONICS, position, 0.3, ObjectDescriptor::Device(kind))
    }
}

fn manager() -> CommandManager {
    CommandManager::new(CommandConfig::default()).unwrap()
}

fn crouch_to(x: f32) -> MovementParams {
    MovementParams::new(MovementKind::CrouchWalk, Vec3::new(x, 0.0, 0.0))
}

#[test]
fn test_movement_undo_restores_snapshot() {
    let mut fx = Fixture::new();
    let mut manager = manager();
    let before = AgentSnapshot::capture(&fx.agent);

    assert!(manager.execute_movement(&mut fx.ctx(), crouch_to(10.0), None));
    // base 4 · speed 0.5 · 1s = 2 м
    assert!((fx.agent.position.x - 2.0).abs() < 1e-5);
    assert!((fx.agent.player_visibility_factor() - 0.5).abs() < 1e-6);
    assert_eq!(fx.agent.posture(), Posture::Crouching);

    assert!(manager.undo_last(&mut fx.ctx()));
    assert_eq!(AgentSnapshot::capture(&fx.agent), before);
    assert_eq!(manager.history_len(), 0);
}

#[test]
fn test_every_movement_kind_round_trips() {
    let kinds = [
        MovementKind::SneakMode,
        MovementKind::CrouchWalk,
        MovementKind::ProneMovement,
        MovementKind::SilentSprint,
        MovementKind::StealthClimb,
        MovementKind::DistractionMove,
    ];
    for kind in kinds {
        let mut fx = Fixture::new();
        fx.agent.update_noise_level(0.5);
        let before = AgentSnapshot::capture(&fx.agent);

        let mut command = MovementCommand::default();
        command.initialize(MovementParams::new(kind, Vec3::new(3.0, 0.0, 4.0))).unwrap();
        command.execute(&mut fx.ctx()).unwrap();
        assert!(command.can_undo());
        command.undo(&mut fx.ctx()).unwrap();

        assert_eq!(AgentSnapshot::capture(&fx.agent), before, "{:?} не откатился", kind);
    }
}

#[test]
fn test_reset_returns_commands_to_default() {
    let mut fx = Fixture::new();

    let mut movement = MovementCommand::default();
    movement.initialize(crouch_to(5.0)).unwrap();
    movement.execute(&mut fx.ctx()).unwrap();
    movement.reset();
    assert_eq!(movement, MovementCommand::default());

    let camera = fx.add_device(DeviceKind::Camera, Vec3::new(1.0, 0.0, 0.0));
    let mut interaction = InteractionCommand::default();
    interaction
        .initialize(InteractionParams::new(InteractionKind::DisableCamera, InteractionTarget::Object(camera)))
        .unwrap();
    interaction.execute(&mut fx.ctx()).unwrap();
    interaction.reset();
    assert_eq!(interaction, InteractionCommand::default());

    let mut ability = AbilityCommand::default();
    ability.initialize(AbilityParams::new(AbilityKind::ThermalMasking)).unwrap();
    ability.execute(&mut fx.ctx()).unwrap();
    ability.reset();
    assert_eq!(ability, AbilityCommand::default());
}

#[test]
fn test_execute_twice_is_rejected() {
    let mut fx = Fixture::new();
    let mut command = MovementCommand::default();
    command.initialize(crouch_to(5.0)).unwrap();

    command.execute(&mut fx.ctx()).unwrap();
    assert_eq!(command.execute(&mut fx.ctx()), Err(CommandError::AlreadyExecuted));
}

#[test]
fn test_uninitialized_command_fails() {
    let mut fx = Fixture::new();
    let mut command = AbilityCommand::default();
    assert_eq!(command.execute(&mut fx.ctx()), Err(CommandError::NotInitialized));
}

#[test]
fn test_missing_services_leave_state_untouched() {
    let mut fx = Fixture::new();
    let lamp = fx.add_device(DeviceKind::Light, Vec3::new(1.0, 2.0, 0.0));
    let before = AgentSnapshot::capture(&fx.agent);

    // Без агента
    let mut movement = MovementCommand::default();
    movement.initialize(crouch_to(5.0)).unwrap();
    let mut bare = CommandContext::new(&mut fx.registry, &mut fx.clock);
    assert!(matches!(movement.execute(&mut bare), Err(CommandError::ServiceUnavailable(_))));
    assert!(!movement.is_executed());

    // Без сцены
    let mut sabotage = InteractionCommand::default();
    sabotage
        .initialize(InteractionParams::new(InteractionKind::SabotageLight, InteractionTarget::Object(lamp)))
        .unwrap();
    assert!(matches!(
        sabotage.execute(&mut fx.ctx_without_scene()),
        Err(CommandError::ServiceUnavailable(_))
    ));

    assert_eq!(AgentSnapshot::capture(&fx.agent), before);
    assert_eq!(fx.scene.object_enabled(lamp), Some(true));
}

#[test]
fn test_manager_counts_failures_without_agent() {
    let mut fx = Fixture::new();
    let mut manager = manager();

    let mut bare = CommandContext::new(&mut fx.registry, &mut fx.clock);
    assert!(!manager.execute_movement(&mut bare, crouch_to(5.0), None));

    let stats = manager.statistics();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.executed, 0);
    assert_eq!(stats.history_count, 0);
}

#[test]
fn test_invalid_parameters_rejected_at_initialize() {
    let mut ability = AbilityCommand::default();
    let result = ability.initialize(AbilityParams::new(AbilityKind::SoundDampening).with_intensity(2.0));
    assert!(matches!(result, Err(CommandError::InvalidParameters(_))));

    let mut interaction = InteractionCommand::default();
    let result = interaction.initialize(InteractionParams::new(InteractionKind::HideBody, InteractionTarget::None));
    assert!(matches!(result, Err(CommandError::InvalidParameters(_))));
}

#[test]
fn test_ability_expires_and_restores_visibility() {
    let mut fx = Fixture::new();
    fx.agent.update_visibility(0.6);
    let mut manager = manager();

    let params = AbilityParams::new(AbilityKind::InvisibilityCloak).with_duration(5.0);
    assert!(manager.execute_ability(&mut fx.ctx(), params, None));
    assert_eq!(fx.agent.player_visibility_factor(), 0.0);
    assert!(manager.is_ability_active(AbilityKind::InvisibilityCloak));

    for _ in 0..4 {
        manager.update_abilities(1.0, &mut fx.ctx());
    }
    assert!(manager.is_ability_active(AbilityKind::InvisibilityCloak));
    assert_eq!(fx.agent.player_visibility_factor(), 0.0);

    manager.update_abilities(1.0, &mut fx.ctx());
    assert!(!manager.is_ability_active(AbilityKind::InvisibilityCloak));
    assert_eq!(fx.agent.player_visibility_factor(), 0.6);
    assert!(!fx.agent.concealment_mode());
    assert_eq!(manager.statistics().active_abilities, 0);
    assert_eq!(manager.history_len(), 0);
}

#[test]
fn test_irreversible_interaction_cannot_be_undone() {
    let mut fx = Fixture::new();
    let body = fx
        .scene
        .add_sphere(LAYER_INTERACTABLE, Vec3::new(1.0, 0.0, 0.0), 0.5, ObjectDescriptor::Device(DeviceKind::Body));

    // can_undo на самой команде
    let mut command = InteractionCommand::default();
    command
        .initialize(InteractionParams::new(InteractionKind::HideBody, InteractionTarget::Object(body)))
        .unwrap();
    command.execute(&mut fx.ctx()).unwrap();
    assert!(command.is_executed());
    assert!(!command.can_undo());
    assert_eq!(command.undo(&mut fx.ctx()), Err(CommandError::UndoUnsupported));

    // Через manager: undo - no-op
    let mut fx = Fixture::new();
    let body = fx
        .scene
        .add_sphere(LAYER_INTERACTABLE, Vec3::new(1.0, 0.0, 0.0), 0.5, ObjectDescriptor::Device(DeviceKind::Body));
    let mut manager = manager();
    assert!(manager.execute_interaction(
        &mut fx.ctx(),
        InteractionParams::new(InteractionKind::HideBody, InteractionTarget::Object(body)),
        None,
    ));
    let after_execute = AgentSnapshot::capture(&fx.agent);

    assert!(!manager.undo_last(&mut fx.ctx()));
    assert_eq!(AgentSnapshot::capture(&fx.agent), after_execute);
    assert_eq!(fx.scene.object_enabled(body), Some(false), "тело остаётся спрятанным");
}

#[test]
fn test_sabotage_light_undo_reenables_lamp() {
    let mut fx = Fixture::new();
    let lamp = fx.add_device(DeviceKind::Light, Vec3::new(1.0, 2.0, 0.0));
    let mut manager = manager();

    assert!(manager.execute_interaction(
        &mut fx.ctx(),
        InteractionParams::new(InteractionKind::SabotageLight, InteractionTarget::Object(lamp)),
        Some("lamp"),
    ));
    assert_eq!(fx.scene.object_enabled(lamp), Some(false));
    assert!((fx.agent.player_visibility_factor() - 0.7).abs() < 1e-6);
    assert!((fx.agent.player_noise_level() - 0.3).abs() < 1e-6);

    assert!(manager.undo_named("lamp", &mut fx.ctx()));
    assert_eq!(fx.scene.object_enabled(lamp), Some(true));
    assert_eq!(fx.agent.player_visibility_factor(), 1.0);
    assert!(!manager.has_named("lamp"));
}

#[test]
fn test_stealth_requirements_checked_before_mutation() {
    let mut fx = Fixture::new();
    let camera = fx.add_device(DeviceKind::Camera, Vec3::new(1.0, 0.0, 0.0));
    let mut manager = manager();

    let params =
        InteractionParams::new(InteractionKind::DisableCamera, InteractionTarget::Object(camera)).requiring_stealth();
    assert!(!manager.execute_interaction(&mut fx.ctx(), params.clone(), None));
    assert_eq!(fx.scene.object_enabled(camera), Some(true));

    fx.agent.set_concealment_mode(true);
    fx.agent.update_visibility(0.5);
    assert!(manager.execute_interaction(&mut fx.ctx(), params, None));
    assert_eq!(fx.scene.object_enabled(camera), Some(false));
}

#[test]
fn test_enter_hiding_spot_and_undo() {
    let mut fx = Fixture::new();
    let locker = fx
        .registry
        .add_zone(ZoneSettings::new(ConcealmentType::Locker, Vec3::new(2.0, 0.0, 0.0)));
    let mut manager = manager();

    assert!(manager.execute_interaction(
        &mut fx.ctx(),
        InteractionParams::new(InteractionKind::EnterHidingSpot, InteractionTarget::None),
        None,
    ));
    assert_eq!(fx.registry.zone_of(OccupantId::AGENT), Some(locker));
    assert_eq!(fx.agent.position, Vec3::new(2.0, 0.0, 0.0));
    assert_eq!(fx.agent.player_visibility_factor(), 0.0);

    assert!(manager.undo_last(&mut fx.ctx()));
    assert_eq!(fx.registry.zone(locker).unwrap().occupancy(), 0);
    assert_eq!(fx.agent.position, Vec3::ZERO);
    assert_eq!(fx.agent.player_visibility_factor(), 1.0);
}

#[test]
fn test_full_hiding_spot_reports_capacity() {
    let mut fx = Fixture::new();
    let locker = fx
        .registry
        .add_zone(ZoneSettings::new(ConcealmentType::Locker, Vec3::new(1.0, 0.0, 0.0)));
    let mut guard_view = StealthAgent::default();
    fx.registry
        .try_enter(locker, OccupantId(9), umbra_simulation::EntryPath::ExplicitAction, &mut guard_view);

    let mut command = InteractionCommand::default();
    command
        .initialize(InteractionParams::new(InteractionKind::EnterHidingSpot, InteractionTarget::Zone(locker)))
        .unwrap();
    assert_eq!(command.execute(&mut fx.ctx()), Err(CommandError::CapacityExceeded));
    assert_eq!(fx.agent.position, Vec3::ZERO);
}

#[test]
fn test_pool_exhaustion_without_recycling() {
    let mut fx = Fixture::new();
    let config = CommandConfig {
        movement_pool: PoolConfig {
            max_size: 2,
            prewarm_count: 0,
        },
        recycle_history_on_exhaustion: false,
        ..Default::default()
    };
    let mut manager = CommandManager::new(config).unwrap();

    assert!(manager.execute_movement(&mut fx.ctx(), crouch_to(1.0), None));
    assert!(manager.execute_movement(&mut fx.ctx(), crouch_to(2.0), None));
    assert!(!manager.execute_movement(&mut fx.ctx(), crouch_to(3.0), None));
    assert_eq!(manager.statistics().failed, 1);

    // Undo возвращает экземпляр в pool
    assert!(manager.undo_last(&mut fx.ctx()));
    assert!(manager.execute_movement(&mut fx.ctx(), crouch_to(3.0), None));
}

#[test]
fn test_pool_exhaustion_recycles_oldest_history_entry() {
    let mut fx = Fixture::new();
    let config = CommandConfig {
        movement_pool: PoolConfig {
            max_size: 2,
            prewarm_count: 0,
        },
        ..Default::default()
    };
    let mut manager = CommandManager::new(config).unwrap();

    assert!(manager.execute_movement(&mut fx.ctx(), crouch_to(1.0), Some("first")));
    assert!(manager.execute_movement(&mut fx.ctx(), crouch_to(2.0), None));
    assert!(manager.execute_movement(&mut fx.ctx(), crouch_to(3.0), None));

    assert_eq!(manager.history_len(), 2);
    assert!(!manager.has_named("first"), "самая старая команда закоммичена");
}

#[test]
fn test_history_bounded_by_max_history() {
    let mut fx = Fixture::new();
    let mut manager = CommandManager::new(CommandConfig {
        max_history: 3,
        ..Default::default()
    })
    .unwrap();

    for i in 0..5 {
        assert!(manager.execute_movement(&mut fx.ctx(), crouch_to(i as f32), None));
    }
    assert_eq!(manager.history_len(), 3);
    assert_eq!(manager.statistics().executed, 5);
}

#[test]
fn test_time_slowdown_and_manual_deactivation() {
    let mut fx = Fixture::new();
    let mut manager = manager();

    assert!(manager.execute_ability(
        &mut fx.ctx(),
        AbilityParams::new(AbilityKind::TimeSlowdown).with_duration(10.0),
        None
    ));
    assert!((fx.clock.time_scale - 0.3).abs() < 1e-6);

    assert_eq!(manager.deactivate_all_abilities(&mut fx.ctx()), 1);
    assert_eq!(fx.clock.time_scale, 1.0);
    assert!(manager.active_abilities().is_empty());
}

#[test]
fn test_jamming_reenables_devices_on_expiry() {
    let mut fx = Fixture::new();
    let camera = fx.add_device(DeviceKind::Camera, Vec3::new(3.0, 0.0, 0.0));
    let alarm = fx.add_device(DeviceKind::Alarm, Vec3::new(-3.0, 0.0, 0.0));
    let door = fx.add_device(DeviceKind::Door, Vec3::new(0.0, 0.0, 3.0));
    let far_camera = fx.add_device(DeviceKind::Camera, Vec3::new(50.0, 0.0, 0.0));
    let mut manager = manager();

    assert!(manager.execute_ability(
        &mut fx.ctx(),
        AbilityParams::new(AbilityKind::ElectronicJamming).with_duration(2.0),
        None
    ));
    assert_eq!(fx.scene.object_enabled(camera), Some(false));
    assert_eq!(fx.scene.object_enabled(alarm), Some(false));
    assert_eq!(fx.scene.object_enabled(door), Some(true));
    assert_eq!(fx.scene.object_enabled(far_camera), Some(true));

    manager.update_abilities(2.0, &mut fx.ctx());
    assert_eq!(fx.scene.object_enabled(camera), Some(true));
    assert_eq!(fx.scene.object_enabled(alarm), Some(true));
}

#[test]
fn test_ability_without_targets_fails() {
    let mut fx = Fixture::new();
    let mut manager = manager();

    assert!(!manager.execute_ability(&mut fx.ctx(), AbilityParams::new(AbilityKind::MotionDetection), None));
    assert!(!manager.execute_ability(&mut fx.ctx(), AbilityParams::new(AbilityKind::ShadowMeld), None));
    assert_eq!(manager.statistics().failed, 2);
    assert_eq!(fx.agent.player_visibility_factor(), 1.0);
}

#[test]
fn test_quick_hide_moves_into_nearest_zone() {
    let mut fx = Fixture::new();
    let mut manager = manager();

    assert!(!manager.execute_movement(&mut fx.ctx(), MovementParams::new(MovementKind::QuickHide, Vec3::ZERO), None));

    fx.registry
        .add_zone(ZoneSettings::new(ConcealmentType::Bush, Vec3::new(0.0, 0.0, -4.0)));
    assert!(manager.execute_movement(&mut fx.ctx(), MovementParams::new(MovementKind::QuickHide, Vec3::ZERO), None));
    assert_eq!(fx.agent.position, Vec3::new(0.0, 0.0, -4.0));
    assert!((fx.agent.player_visibility_factor() - 0.1).abs() < 1e-6);
}

#[test]
fn test_statistics_track_activity() {
    let mut fx = Fixture::new();
    fx.clock.advance(3.0);
    let mut manager = manager();

    manager.execute_movement(&mut fx.ctx(), crouch_to(1.0), None);
    manager.execute_ability(&mut fx.ctx(), AbilityParams::new(AbilityKind::SoundDampening), None);
    manager.undo_last(&mut fx.ctx());

    let stats = manager.statistics();
    assert_eq!(stats.executed, 2);
    assert_eq!(stats.undone, 1);
    assert_eq!(stats.history_count, 1);
    assert_eq!(stats.active_abilities, 0);
    assert_eq!(stats.last_execution_time, Some(3.0));
    assert!(stats.pool_utilization > 0.0 && stats.pool_utilization <= 1.0);
}
