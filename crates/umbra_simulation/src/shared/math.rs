use bevy::prelude::*;
use rand::Rng;

#[inline]
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Сдвиг к цели не больше чем на `max_step` (без перелёта)
pub fn move_towards(current: Vec3, target: Vec3, max_step: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_step || distance <= f32::EPSILON {
        target
    } else {
        current + delta / distance * max_step
    }
}

/// Равномерная точка внутри единичной сферы (rejection sampling)
pub fn random_in_unit_sphere<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let candidate = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if candidate.length_squared() <= 1.0 {
            return candidate;
        }
    }
}
