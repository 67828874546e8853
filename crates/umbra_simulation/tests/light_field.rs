//! Light field: освещённость, тени, кэш ламп

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use umbra_simulation::collision_layers::{LAYER_ELECTRONICS, LAYER_WALL, MASK_SHADOW_RAYS};
use umbra_simulation::lighting::{shadow_factor, LightFieldEvaluator, LightSource, ShadowJitter, ShadowSampling};
use umbra_simulation::services::{InteractionWorld, ObjectDescriptor};
use umbra_simulation::{LightingConfig, StaticScene};

fn evaluator() -> LightFieldEvaluator {
    LightFieldEvaluator::new(LightingConfig::default()).unwrap()
}

/// Стена между x=2.3 и x=2.7, бесконечная по y/z для практических целей
fn add_wall(scene: &mut StaticScene) {
    scene.add_cuboid(
        LAYER_WALL,
        Vec3::new(2.5, 0.0, 0.0),
        Vec3::new(0.2, 50.0, 50.0),
        ObjectDescriptor::None,
    );
}

#[test]
fn test_single_point_light_at_half_range() {
    // ambient 0.1 + 0.5·(1/3.5) + 0.5·0.5
    let mut scene = StaticScene::new();
    scene.add_light(LightSource::point(Vec3::ZERO, 10.0, 1.0));
    let mut evaluator = evaluator();
    evaluator.refresh_lights(&scene, Vec3::ZERO, 0.0);

    let level = evaluator.evaluate_at(&scene, Vec3::new(5.0, 0.0, 0.0));
    assert!((level - 0.4928571).abs() < 1e-5, "level = {}", level);
}

#[test]
fn test_level_always_in_unit_range() {
    let mut scene = StaticScene::new();
    for i in 0..6 {
        scene.add_light(LightSource::point(Vec3::new(i as f32, 1.0, 0.0), 8.0, 1.0));
    }
    scene.add_light(LightSource::directional(Vec3::NEG_Y, 1.0));
    let mut evaluator = evaluator();
    evaluator.refresh_lights(&scene, Vec3::ZERO, 0.0);

    for x in -10..=10 {
        let level = evaluator.evaluate_at(&scene, Vec3::new(x as f32, 0.0, 0.5));
        assert!((0.0..=1.0).contains(&level), "level {} вне [0, 1] при x={}", level, x);
    }
    // Суммарно больше max_level → clamp в 1
    assert_eq!(evaluator.evaluate_at(&scene, Vec3::new(2.0, 0.0, 0.0)), 1.0);
}

#[test]
fn test_moving_away_never_brightens() {
    let mut scene = StaticScene::new();
    scene.add_light(LightSource::point(Vec3::ZERO, 15.0, 1.0));
    let mut evaluator = evaluator();
    evaluator.refresh_lights(&scene, Vec3::ZERO, 0.0);

    let mut previous = f32::MAX;
    for step in 1..=20 {
        let level = evaluator.evaluate_at(&scene, Vec3::new(step as f32, 0.0, 0.0));
        assert!(level <= previous, "освещённость выросла на шаге {}", step);
        previous = level;
    }
    // За пределами range остаётся только ambient
    assert!((previous - 0.1).abs() < 1e-6);
}

#[test]
fn test_fully_occluded_point_gets_only_ambient() {
    let mut scene = StaticScene::new();
    add_wall(&mut scene);
    scene.add_light(LightSource::point(Vec3::ZERO, 10.0, 1.0));
    let mut evaluator = evaluator();
    evaluator.refresh_lights(&scene, Vec3::ZERO, 0.0);

    let behind_wall = Vec3::new(5.0, 0.0, 0.0);
    assert!((evaluator.evaluate_at(&scene, behind_wall) - 0.1).abs() < 1e-6);

    evaluator.set_ambient_level(0.0);
    assert_eq!(evaluator.evaluate_at(&scene, behind_wall), 0.0);
}

#[test]
fn test_positional_jitter_also_occludes() {
    let mut scene = StaticScene::new();
    add_wall(&mut scene);
    scene.add_light(LightSource::point(Vec3::ZERO, 10.0, 1.0));
    let config = LightingConfig {
        ambient_level: 0.0,
        shadow_jitter: ShadowJitter::Positional(0.3),
        ..Default::default()
    };
    let mut evaluator = LightFieldEvaluator::new(config).unwrap();
    evaluator.refresh_lights(&scene, Vec3::ZERO, 0.0);

    assert_eq!(evaluator.evaluate_at(&scene, Vec3::new(5.0, 0.0, 0.0)), 0.0);
}

#[test]
fn test_degenerate_jitter_falls_back_to_exact_ray() {
    // Бесконечный jitter → каждое jittered направление вырождается
    let mut scene = StaticScene::new();
    add_wall(&mut scene);
    let sampling = ShadowSampling {
        samples: 8,
        jitter: ShadowJitter::Angular(f32::INFINITY),
        bias: 0.01,
        mask: MASK_SHADOW_RAYS,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let factor = shadow_factor(&scene, Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), &sampling, &mut rng);
    assert_eq!(factor, 0.0, "вырожденные samples не должны считаться освещёнными");

    let open = shadow_factor(&scene, Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), &sampling, &mut rng);
    assert_eq!(open, 1.0);
}

#[test]
fn test_max_lights_keeps_most_important() {
    let mut scene = StaticScene::new();
    for i in 0..30 {
        scene.add_light(LightSource::point(Vec3::new(i as f32 * 2.0, 0.0, 0.0), 5.0, 1.0));
    }
    let config = LightingConfig {
        max_lights: 5,
        ..Default::default()
    };
    let mut evaluator = LightFieldEvaluator::new(config).unwrap();
    evaluator.refresh_lights(&scene, Vec3::ZERO, 0.0);

    assert_eq!(evaluator.active_light_count(), 5);
    // Ближайшие к anchor (x = 0, 2, 4, 6, 8)
    for cached in evaluator.cached_lights() {
        assert!(cached.source.position.x <= 8.0, "далёкая лампа в кэше: {:?}", cached.source.position);
    }
}

#[test]
fn test_disabled_and_dark_lights_not_cached() {
    let mut scene = StaticScene::new();
    let lamp = scene.add_sphere(LAYER_ELECTRONICS, Vec3::Y * 3.0, 0.2, ObjectDescriptor::None);
    scene.add_light(LightSource::point(Vec3::Y * 3.0, 10.0, 1.0).with_owner(lamp));
    scene.add_light(LightSource::point(Vec3::X, 10.0, 0.0));
    let switched_off = scene.add_light(LightSource::point(Vec3::Z, 10.0, 1.0));
    if let Some(light) = scene.light_mut(switched_off) {
        light.enabled = false;
    }

    let mut evaluator = evaluator();
    evaluator.refresh_lights(&scene, Vec3::ZERO, 0.0);
    assert_eq!(evaluator.active_light_count(), 1);

    // Выключили объект-владельца → лампа тоже гаснет после refresh
    assert!(scene.set_object_enabled(lamp, false));
    evaluator.request_refresh();
    assert!(evaluator.track(&scene, Vec3::ZERO, 1.0));
    assert_eq!(evaluator.active_light_count(), 0);
}

#[test]
fn test_cache_refreshes_only_after_displacement() {
    let mut scene = StaticScene::new();
    scene.add_light(LightSource::point(Vec3::ZERO, 10.0, 1.0));
    let mut evaluator = evaluator();

    assert!(evaluator.track(&scene, Vec3::ZERO, 0.0), "первый track всегда пересобирает кэш");
    assert!(!evaluator.track(&scene, Vec3::new(5.0, 0.0, 0.0), 0.5));

    scene.add_light(LightSource::point(Vec3::new(30.0, 0.0, 0.0), 10.0, 1.0));
    assert_eq!(evaluator.active_light_count(), 1, "кэш не должен меняться без refresh");

    assert!(evaluator.track(&scene, Vec3::new(10.5, 0.0, 0.0), 1.0));
    assert_eq!(evaluator.active_light_count(), 2);
    assert!(evaluator.cached_lights().iter().all(|cached| cached.cached_at == 1.0));
}

#[test]
fn test_same_seed_same_soft_shadows() {
    // Край стены: часть jittered rays проходит мимо → дробный shadow factor
    let build = || {
        let mut scene = StaticScene::new();
        scene.add_cuboid(
            LAYER_WALL,
            Vec3::new(2.5, 0.0, -1.0),
            Vec3::new(0.2, 5.0, 1.0),
            ObjectDescriptor::None,
        );
        scene.add_light(LightSource::point(Vec3::ZERO, 10.0, 1.0));
        scene
    };
    let config = LightingConfig {
        shadow_samples: 32,
        shadow_jitter: ShadowJitter::Angular(0.3),
        ..Default::default()
    };

    let run = || {
        let scene = build();
        let mut evaluator = LightFieldEvaluator::new(config.clone()).unwrap();
        evaluator.reseed(7);
        evaluator.refresh_lights(&scene, Vec3::ZERO, 0.0);
        (0..10)
            .map(|i| evaluator.evaluate_at(&scene, Vec3::new(5.0, 0.0, i as f32 * 0.05)))
            .collect::<Vec<f32>>()
    };

    assert_eq!(run(), run(), "одинаковый seed должен давать одинаковые тени");
}
