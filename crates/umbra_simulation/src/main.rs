//! Headless stealth-симуляция UMBRA
//!
//! Склад: лампа, bush у стены, locker. Агент крадётся в тень,
//! прячется в locker и глушит лампу.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use umbra_simulation::collision_layers::{LAYER_ELECTRONICS, LAYER_HIDING_SPOT, LAYER_WALL};
use umbra_simulation::services::{DeviceKind, ObjectDescriptor, StealthService, ZoneDescriptor};
use umbra_simulation::{
    create_headless_app, ConcealmentType, InteractionKind, InteractionParams, InteractionTarget, LightSource,
    MovementKind, MovementParams, StaticScene, StealthActionIntent, StealthActionOutcome, StealthAgent, StealthHost,
    StealthPlugin,
};

fn build_warehouse() -> (StaticScene, umbra_simulation::ObjectId) {
    let mut scene = StaticScene::new();

    scene.add_cuboid(LAYER_WALL, Vec3::new(0.0, 1.5, -6.0), Vec3::new(8.0, 1.5, 0.2), ObjectDescriptor::None);
    scene.add_sphere(
        LAYER_HIDING_SPOT,
        Vec3::new(-3.0, 0.5, -5.0),
        1.0,
        ObjectDescriptor::HidingSpot(ZoneDescriptor::new(ConcealmentType::Bush)),
    );
    scene.add_cuboid(
        LAYER_HIDING_SPOT,
        Vec3::new(4.0, 1.0, -5.0),
        Vec3::new(0.5, 1.0, 0.5),
        ObjectDescriptor::HidingSpot(ZoneDescriptor::new(ConcealmentType::Locker)),
    );

    let lamp = scene.add_sphere(
        LAYER_ELECTRONICS,
        Vec3::new(0.0, 3.0, 0.0),
        0.2,
        ObjectDescriptor::Device(DeviceKind::Light),
    );
    scene.add_light(LightSource::point(Vec3::new(0.0, 3.0, 0.0), 12.0, 1.0).with_owner(lamp));

    (scene, lamp)
}

fn print_agent(app: &App, label: &str) {
    let agent = app.world().resource::<StealthAgent>();
    println!(
        "[{}] pos={:?} visibility={:.3} exposure={:.3} concealment={:.3} ({}) concealed={}",
        label,
        agent.position,
        agent.player_visibility_factor(),
        agent.light_exposure(),
        agent.environmental_concealment(),
        agent.concealment_source(),
        agent.is_player_concealed(),
    );
}

fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        app.update();
    }
}

fn send(app: &mut App, intent: StealthActionIntent) {
    app.world_mut().send_event(intent);
}

fn main() {
    let seed = 42;
    println!("Starting UMBRA headless stealth simulation (seed: {})", seed);

    let (scene, lamp) = build_warehouse();
    let mut app = create_headless_app(seed);
    // Каждый update = ровно один fixed tick (60Hz), независимо от wall clock
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / 60.0)))
        .insert_resource(StealthHost::new(scene))
        .add_plugins(StealthPlugin::default());

    run_ticks(&mut app, 30);
    print_agent(&app, "start");

    send(
        &mut app,
        StealthActionIntent::movement(MovementParams::new(MovementKind::CrouchWalk, Vec3::new(-3.0, 0.0, -4.0)).with_duration(2.0)),
    );
    run_ticks(&mut app, 30);
    print_agent(&app, "crouch to bush");

    send(
        &mut app,
        StealthActionIntent::movement(MovementParams::new(MovementKind::QuickHide, Vec3::ZERO)),
    );
    run_ticks(&mut app, 30);
    print_agent(&app, "quick hide");

    send(
        &mut app,
        StealthActionIntent::interaction(InteractionParams::new(
            InteractionKind::SabotageLight,
            InteractionTarget::Object(lamp),
        )),
    );
    run_ticks(&mut app, 30);
    print_agent(&app, "lamp sabotaged");

    send(&mut app, StealthActionIntent::UndoLast);
    run_ticks(&mut app, 30);
    print_agent(&app, "undo");

    let outcomes: Vec<StealthActionOutcome> = app
        .world_mut()
        .resource_mut::<Events<StealthActionOutcome>>()
        .drain()
        .collect();
    for outcome in outcomes {
        println!("  {} → {}", outcome.action, if outcome.success { "ok" } else { "failed" });
    }

    println!("Simulation complete!");
}
