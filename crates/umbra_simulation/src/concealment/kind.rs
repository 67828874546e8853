//! Типы укрытий и их профили эффектов

use bevy::prelude::*;

/// Конкретный тип укрытия
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum ConcealmentType {
    // Natural
    TallGrass,
    Bush,
    Tree,
    Rock,
    WaterReeds,
    SnowDrift,
    SandDune,
    // Structural
    Locker,
    Container,
    Dumpster,
    Crate,
    Barrel,
    Doorway,
    Pillar,
    Corner,
    Alcove,
    UnderStairs,
    Ventilation,
    Ceiling,
    // Optical
    Shadow,
    Darkness,
    Fog,
    Smoke,
    // Dynamic
    MovingCrowd,
    VehicleShadow,
    // Special
    WaterSubmersion,
    #[default]
    Custom,
}

/// Грубая категория укрытия
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ZoneCategory {
    Natural,
    Structural,
    Optical,
    Dynamic,
    Special,
}

impl ConcealmentType {
    pub fn category(&self) -> ZoneCategory {
        use ConcealmentType::*;
        match self {
            TallGrass | Bush | Tree | Rock | WaterReeds | SnowDrift | SandDune => ZoneCategory::Natural,
            Locker | Container | Dumpster | Crate | Barrel | Doorway | Pillar | Corner | Alcove | UnderStairs
            | Ventilation | Ceiling => ZoneCategory::Structural,
            Shadow | Darkness | Fog | Smoke => ZoneCategory::Optical,
            MovingCrowd | VehicleShadow => ZoneCategory::Dynamic,
            WaterSubmersion | Custom => ZoneCategory::Special,
        }
    }

    /// Закрытые укрытия (внутрь надо залезть явно)
    pub fn is_enclosed(&self) -> bool {
        matches!(
            self,
            ConcealmentType::Locker | ConcealmentType::Container | ConcealmentType::Dumpster
        )
    }

    /// Tag для DetectionSink / логов
    pub fn tag(&self) -> &'static str {
        use ConcealmentType::*;
        match self {
            TallGrass => "TallGrass",
            Bush => "Bush",
            Tree => "Tree",
            Rock => "Rock",
            WaterReeds => "WaterReeds",
            SnowDrift => "SnowDrift",
            SandDune => "SandDune",
            Locker => "Locker",
            Container => "Container",
            Dumpster => "Dumpster",
            Crate => "Crate",
            Barrel => "Barrel",
            Doorway => "Doorway",
            Pillar => "Pillar",
            Corner => "Corner",
            Alcove => "Alcove",
            UnderStairs => "UnderStairs",
            Ventilation => "Ventilation",
            Ceiling => "Ceiling",
            Shadow => "Shadow",
            Darkness => "Darkness",
            Fog => "Fog",
            Smoke => "Smoke",
            MovingCrowd => "MovingCrowd",
            VehicleShadow => "VehicleShadow",
            WaterSubmersion => "WaterSubmersion",
            Custom => "Custom",
        }
    }
}

/// Что укрытие делает с агентом внутри
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcealmentEffect {
    /// Доля снижения visibility (0..1)
    pub visibility_reduction: f32,
    pub noise_dampening: f32,
    pub movement_speed_multiplier: f32,
    pub immune_to_visual: bool,
    pub immune_to_audio: bool,
    pub immune_to_thermal: bool,
    pub immune_to_motion: bool,
    /// 0 - без ограничения
    pub max_concealment_time: f32,
    pub entry_time: f32,
    pub exit_time: f32,
}

impl Default for ConcealmentEffect {
    fn default() -> Self {
        Self {
            visibility_reduction: 0.7,
            noise_dampening: 0.5,
            movement_speed_multiplier: 1.0,
            immune_to_visual: false,
            immune_to_audio: false,
            immune_to_thermal: false,
            immune_to_motion: false,
            max_concealment_time: 0.0,
            entry_time: 0.5,
            exit_time: 0.5,
        }
    }
}

impl ConcealmentEffect {
    /// Полное укрытие, двигаться нельзя
    pub fn perfect() -> Self {
        Self {
            visibility_reduction: 1.0,
            noise_dampening: 1.0,
            movement_speed_multiplier: 0.0,
            immune_to_visual: true,
            immune_to_audio: true,
            immune_to_thermal: true,
            immune_to_motion: true,
            max_concealment_time: 0.0,
            entry_time: 1.0,
            exit_time: 1.0,
        }
    }

    pub fn partial() -> Self {
        Self {
            visibility_reduction: 0.5,
            noise_dampening: 0.3,
            movement_speed_multiplier: 0.8,
            entry_time: 0.2,
            exit_time: 0.3,
            ..Self::default()
        }
    }

    fn tuned(visibility_reduction: f32, noise_dampening: f32, movement_speed_multiplier: f32, entry: f32, exit: f32) -> Self {
        Self {
            visibility_reduction,
            noise_dampening,
            movement_speed_multiplier,
            entry_time: entry,
            exit_time: exit,
            ..Self::default()
        }
    }

    /// Профиль по умолчанию для типа укрытия
    pub fn for_type(kind: ConcealmentType) -> Self {
        use ConcealmentType::*;
        match kind {
            Locker | Container | Dumpster => Self::perfect(),
            Bush => Self::tuned(0.8, 0.6, 0.6, 0.3, 0.4),
            Shadow => Self::tuned(0.7, 0.2, 0.9, 0.1, 0.2),
            Darkness => Self {
                immune_to_visual: true,
                ..Self::tuned(0.9, 0.3, 0.8, 0.2, 0.3)
            },
            TallGrass | Rock => Self::partial(),
            Pillar => Self::tuned(0.4, 0.1, 1.0, 0.1, 0.1),
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConcealmentQuality {
    Poor,
    Fair,
    Good,
    Excellent,
    Perfect,
}

impl ConcealmentQuality {
    pub fn from_strength(strength: f32) -> Self {
        match strength {
            s if s <= 0.2 => ConcealmentQuality::Poor,
            s if s <= 0.4 => ConcealmentQuality::Fair,
            s if s <= 0.6 => ConcealmentQuality::Good,
            s if s <= 0.8 => ConcealmentQuality::Excellent,
            _ => ConcealmentQuality::Perfect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enclosed_types_are_perfect() {
        for kind in [ConcealmentType::Locker, ConcealmentType::Container, ConcealmentType::Dumpster] {
            let effect = ConcealmentEffect::for_type(kind);
            assert_eq!(effect, ConcealmentEffect::perfect());
            assert_eq!(effect.movement_speed_multiplier, 0.0);
            assert_eq!(kind.category(), ZoneCategory::Structural);
        }
    }

    #[test]
    fn test_shadow_reduces_visibility_more_than_noise() {
        let effect = ConcealmentEffect::for_type(ConcealmentType::Shadow);
        assert!(effect.visibility_reduction > effect.noise_dampening);
        assert_eq!(ConcealmentType::Shadow.category(), ZoneCategory::Optical);
    }

    #[test]
    fn test_foliage_slows_movement() {
        let grass = ConcealmentEffect::for_type(ConcealmentType::TallGrass);
        assert_eq!(grass, ConcealmentEffect::partial());
        assert!(grass.movement_speed_multiplier < 1.0);
        assert!(ConcealmentEffect::for_type(ConcealmentType::Darkness).immune_to_visual);
    }

    #[test]
    fn test_quality_buckets() {
        assert_eq!(ConcealmentQuality::from_strength(0.1), ConcealmentQuality::Poor);
        assert_eq!(ConcealmentQuality::from_strength(0.4), ConcealmentQuality::Fair);
        assert_eq!(ConcealmentQuality::from_strength(0.55), ConcealmentQuality::Good);
        assert_eq!(ConcealmentQuality::from_strength(0.8), ConcealmentQuality::Excellent);
        assert_eq!(ConcealmentQuality::from_strength(0.95), ConcealmentQuality::Perfect);
    }
}
