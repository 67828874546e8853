//! Collision Layers Constants
//!
//! Слои для spatial queries host'а (overlap / raycast).
//!
//! ## Архитектура:
//! - **Layer (битовая маска):** На каком слое находится объект
//! - **Mask (битовая маска):** Какие слои видит запрос
//!
//! ## Layers:
//! - Layer 1 (0b1): Default
//! - Layer 2 (0b10): Hiding spots (lockers, bushes, containers)
//! - Layer 3 (0b100): Environment elements (shadow/light/foliage/noise volumes)
//! - Layer 4 (0b1000): Occluders (блокируют shadow rays)
//! - Layer 5 (0b1_0000): Walls (WallHug / WallPhase / тоже occluders)
//! - Layer 6 (0b10_0000): Enemies
//! - Layer 7 (0b100_0000): Electronics (cameras, alarms)
//! - Layer 8 (0b1000_0000): Interactables (doors, switches, bodies, lights)

pub type LayerMask = u32;

// ============================================================================
// Layers
// ============================================================================

pub const LAYER_DEFAULT: LayerMask = 0b1;
pub const LAYER_HIDING_SPOT: LayerMask = 0b10;
pub const LAYER_ENVIRONMENT: LayerMask = 0b100;
pub const LAYER_OCCLUDER: LayerMask = 0b1000;
pub const LAYER_WALL: LayerMask = 0b1_0000;
pub const LAYER_ENEMY: LayerMask = 0b10_0000;
pub const LAYER_ELECTRONICS: LayerMask = 0b100_0000;
pub const LAYER_INTERACTABLE: LayerMask = 0b1000_0000;

// ============================================================================
// Masks
// ============================================================================

/// Shadow rays: всё что отбрасывает тень
pub const MASK_SHADOW_RAYS: LayerMask = LAYER_OCCLUDER | LAYER_WALL;

/// Discovery coordinator'а: hiding spots + environment elements
pub const MASK_DISCOVERY: LayerMask = LAYER_HIDING_SPOT | LAYER_ENVIRONMENT;

/// Path check для CoverToCover (путь не должен пересекать врагов)
pub const MASK_PATH_BLOCKERS: LayerMask = LAYER_ENEMY;

pub const MASK_ALL: LayerMask = u32::MAX;

/// Имя слоя для логов
pub fn get_layer_name(layer: LayerMask) -> &'static str {
    match layer {
        LAYER_DEFAULT => "Default",
        LAYER_HIDING_SPOT => "HidingSpot",
        LAYER_ENVIRONMENT => "Environment",
        LAYER_OCCLUDER => "Occluder",
        LAYER_WALL => "Wall",
        LAYER_ENEMY => "Enemy",
        LAYER_ELECTRONICS => "Electronics",
        LAYER_INTERACTABLE => "Interactable",
        _ => "Mixed",
    }
}
