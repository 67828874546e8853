//! StaticScene - reference host для headless симуляции и тестов.
//!
//! Хранит colliders (sphere / AABB) на слоях, лампы и reflection probes.
//! Реализует все scene traits (`SpatialQuery`, `LightSourceProvider`, `InteractionWorld`).
//! Выключенные объекты не блокируют rays, но видны в overlap (с флагом `enabled`).

use bevy::prelude::*;

use crate::collision_layers::LayerMask;
use crate::lighting::{LightSource, ReflectionProbe};
use crate::services::{
    InteractionWorld, LightSourceProvider, ObjectDescriptor, RayHit, SceneObject, SpatialQuery,
};
use crate::shared::{LightId, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    /// Axis-aligned box
    Cuboid { half_extents: Vec3 },
}

#[derive(Debug, Clone, PartialEq)]
struct SceneEntry {
    object: SceneObject,
    shape: ColliderShape,
}

#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    entries: Vec<SceneEntry>,
    lights: Vec<LightSource>,
    probes: Vec<ReflectionProbe>,
    next_object: u32,
    next_light: u32,
}

impl StaticScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sphere(&mut self, layer: LayerMask, center: Vec3, radius: f32, descriptor: ObjectDescriptor) -> ObjectId {
        self.insert(layer, center, ColliderShape::Sphere { radius }, descriptor)
    }

    pub fn add_cuboid(
        &mut self,
        layer: LayerMask,
        center: Vec3,
        half_extents: Vec3,
        descriptor: ObjectDescriptor,
    ) -> ObjectId {
        self.insert(layer, center, ColliderShape::Cuboid { half_extents }, descriptor)
    }

    fn insert(&mut self, layer: LayerMask, position: Vec3, shape: ColliderShape, descriptor: ObjectDescriptor) -> ObjectId {
        self.next_object += 1;
        let id = ObjectId(self.next_object);
        self.entries.push(SceneEntry {
            object: SceneObject {
                id,
                position,
                layer,
                enabled: true,
                descriptor,
            },
            shape,
        });
        id
    }

    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.object.id != id);
        before != self.entries.len()
    }

    /// Регистрирует лампу, присваивает ей LightId
    pub fn add_light(&mut self, mut light: LightSource) -> LightId {
        self.next_light += 1;
        light.id = LightId(self.next_light);
        let id = light.id;
        self.lights.push(light);
        id
    }

    pub fn light_mut(&mut self, id: LightId) -> Option<&mut LightSource> {
        self.lights.iter_mut().find(|light| light.id == id)
    }

    pub fn add_probe(&mut self, probe: ReflectionProbe) {
        self.probes.push(probe);
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.entries.iter().find(|entry| entry.object.id == id).map(|entry| &entry.object)
    }

    pub fn object_count(&self) -> usize {
        self.entries.len()
    }
}

fn overlaps_sphere(entry: &SceneEntry, center: Vec3, radius: f32) -> bool {
    let position = entry.object.position;
    match entry.shape {
        ColliderShape::Sphere { radius: own } => position.distance(center) <= own + radius,
        ColliderShape::Cuboid { half_extents } => {
            let closest = center.clamp(position - half_extents, position + half_extents);
            closest.distance(center) <= radius
        }
    }
}

/// Ray vs shape: (distance, normal) ближайшего пересечения с t >= 0
fn intersect_ray(entry: &SceneEntry, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
    let center = entry.object.position;
    match entry.shape {
        ColliderShape::Sphere { radius } => {
            let offset = origin - center;
            let b = offset.dot(direction);
            let c = offset.length_squared() - radius * radius;
            let discriminant = b * b - c;
            if discriminant < 0.0 {
                return None;
            }
            let root = discriminant.sqrt();
            let mut t = -b - root;
            if t < 0.0 {
                // Origin внутри сферы
                t = -b + root;
            }
            if t < 0.0 {
                return None;
            }
            let point = origin + direction * t;
            Some((t, (point - center).normalize_or_zero()))
        }
        ColliderShape::Cuboid { half_extents } => {
            let min = center - half_extents;
            let max = center + half_extents;
            let mut t_enter = f32::NEG_INFINITY;
            let mut t_exit = f32::INFINITY;
            let mut normal = Vec3::ZERO;

            for axis in 0..3 {
                let o = origin[axis];
                let d = direction[axis];
                if d.abs() < 1e-8 {
                    if o < min[axis] || o > max[axis] {
                        return None;
                    }
                    continue;
                }
                let mut t1 = (min[axis] - o) / d;
                let mut t2 = (max[axis] - o) / d;
                let mut axis_normal = Vec3::ZERO;
                axis_normal[axis] = -d.signum();
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                if t1 > t_enter {
                    t_enter = t1;
                    normal = axis_normal;
                }
                t_exit = t_exit.min(t2);
                if t_enter > t_exit {
                    return None;
                }
            }

            if t_exit < 0.0 {
                return None;
            }
            if t_enter < 0.0 {
                // Origin внутри box
                return Some((0.0, -direction));
            }
            Some((t_enter, normal))
        }
    }
}

impl SpatialQuery for StaticScene {
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<SceneObject> {
        self.entries
            .iter()
            .filter(|entry| entry.object.layer & mask != 0)
            .filter(|entry| overlaps_sphere(entry, center, radius))
            .map(|entry| entry.object.clone())
            .collect()
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        self.entries
            .iter()
            .filter(|entry| entry.object.enabled && entry.object.layer & mask != 0)
            .filter_map(|entry| {
                let (distance, normal) = intersect_ray(entry, origin, direction)?;
                (distance <= max_distance).then(|| RayHit {
                    object: entry.object.id,
                    point: origin + direction * distance,
                    normal,
                    distance,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

impl LightSourceProvider for StaticScene {
    fn light_sources(&self) -> Vec<LightSource> {
        self.lights
            .iter()
            .map(|light| {
                let owner_enabled = light
                    .owner
                    .and_then(|owner| self.object(owner))
                    .map_or(true, |owner| owner.enabled);
                LightSource {
                    enabled: light.enabled && owner_enabled,
                    ..light.clone()
                }
            })
            .collect()
    }

    fn reflection_probes(&self) -> Vec<ReflectionProbe> {
        self.probes.clone()
    }
}

impl InteractionWorld for StaticScene {
    fn object_enabled(&self, id: ObjectId) -> Option<bool> {
        self.object(id).map(|object| object.enabled)
    }

    fn set_object_enabled(&mut self, id: ObjectId, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|entry| entry.object.id == id) {
            Some(entry) => {
                entry.object.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn object_position(&self, id: ObjectId) -> Option<Vec3> {
        self.object(id).map(|object| object.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision_layers::{LAYER_ENEMY, LAYER_WALL, MASK_ALL};

    #[test]
    fn test_raycast_hits_nearest_cuboid_face() {
        let mut scene = StaticScene::new();
        let wall = scene.add_cuboid(LAYER_WALL, Vec3::new(0.0, 0.0, -5.0), Vec3::new(2.0, 2.0, 0.5), ObjectDescriptor::None);

        let hit = scene
            .raycast(Vec3::ZERO, Vec3::NEG_Z, 10.0, LAYER_WALL)
            .expect("ray должен попасть в стену");

        assert_eq!(hit.object, wall);
        assert!((hit.distance - 4.5).abs() < 1e-5);
        assert_eq!(hit.normal, Vec3::Z);
    }

    #[test]
    fn test_raycast_respects_mask_and_distance() {
        let mut scene = StaticScene::new();
        scene.add_sphere(LAYER_ENEMY, Vec3::new(0.0, 0.0, -5.0), 1.0, ObjectDescriptor::None);

        assert!(scene.raycast(Vec3::ZERO, Vec3::NEG_Z, 10.0, LAYER_WALL).is_none());
        assert!(scene.raycast(Vec3::ZERO, Vec3::NEG_Z, 3.0, LAYER_ENEMY).is_none());

        let hit = scene.raycast(Vec3::ZERO, Vec3::NEG_Z, 10.0, MASK_ALL).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_disabled_objects_do_not_block_rays() {
        let mut scene = StaticScene::new();
        let id = scene.add_sphere(LAYER_WALL, Vec3::new(0.0, 0.0, -3.0), 1.0, ObjectDescriptor::None);
        scene.set_object_enabled(id, false);

        assert!(scene.raycast(Vec3::ZERO, Vec3::NEG_Z, 10.0, LAYER_WALL).is_none());
        // В overlap объект остаётся видимым
        assert_eq!(scene.overlap_sphere(Vec3::ZERO, 5.0, LAYER_WALL).len(), 1);
    }

    #[test]
    fn test_light_follows_owner_state() {
        let mut scene = StaticScene::new();
        let lamp = scene.add_sphere(LAYER_WALL, Vec3::Y * 3.0, 0.2, ObjectDescriptor::None);
        scene.add_light(LightSource::point(Vec3::Y * 3.0, 10.0, 1.0).with_owner(lamp));

        assert!(scene.light_sources()[0].enabled);
        scene.set_object_enabled(lamp, false);
        assert!(!scene.light_sources()[0].enabled);
    }
}
