//! Shadow occlusion sampling
//!
//! N rays от лампы к точке. Sample 0 - точный, остальные с jitter.
//! shadow factor = 1 - occluded / N.

use bevy::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::collision_layers::LayerMask;
use crate::services::SpatialQuery;
use crate::shared::random_in_unit_sphere;

/// Как разбрасывать jittered samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShadowJitter {
    /// Возмущение направления (без размерности): угол разброса не зависит от дистанции
    Angular(f32),
    /// Смещение целевой точки в метрах: угол разброса падает с дистанцией
    Positional(f32),
}

impl ShadowJitter {
    pub fn magnitude(&self) -> f32 {
        match self {
            ShadowJitter::Angular(value) | ShadowJitter::Positional(value) => *value,
        }
    }
}

impl Default for ShadowJitter {
    fn default() -> Self {
        ShadowJitter::Angular(0.1)
    }
}

/// Параметры одного прохода сэмплирования
#[derive(Debug, Clone, Copy)]
pub struct ShadowSampling {
    pub samples: u32,
    pub jitter: ShadowJitter,
    pub bias: f32,
    pub mask: LayerMask,
}

/// Доля незаслонённых rays от `origin` к `target`
pub fn shadow_factor<Q: SpatialQuery + ?Sized>(
    scene: &Q,
    origin: Vec3,
    target: Vec3,
    sampling: &ShadowSampling,
    rng: &mut ChaCha8Rng,
) -> f32 {
    let samples = sampling.samples.max(1);
    let exact = target - origin;
    let distance = exact.length();
    if distance <= f32::EPSILON {
        return 1.0;
    }
    let base_direction = exact / distance;
    let max_distance = (distance - sampling.bias).max(0.0);

    let mut occluded = 0u32;
    for i in 0..samples {
        let (direction, reach) = if i == 0 {
            (base_direction, max_distance)
        } else {
            match sampling.jitter {
                ShadowJitter::Angular(magnitude) => {
                    let jittered = (base_direction + random_in_unit_sphere(rng) * magnitude).normalize_or_zero();
                    (jittered, max_distance)
                }
                ShadowJitter::Positional(radius) => {
                    let offset_target = target + random_in_unit_sphere(rng) * radius;
                    let delta = offset_target - origin;
                    let length = delta.length();
                    (delta.normalize_or_zero(), (length - sampling.bias).max(0.0))
                }
            }
        };

        // Вырожденный jitter → считаем как точный ray
        let (direction, reach) = if direction == Vec3::ZERO {
            (base_direction, max_distance)
        } else {
            (direction, reach)
        };
        if scene.raycast(origin, direction, reach, sampling.mask).is_some() {
            occluded += 1;
        }
    }

    1.0 - occluded as f32 / samples as f32
}
