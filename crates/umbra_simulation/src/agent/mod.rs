//! StealthAgent - reference реализация stealth state игрока.
//!
//! Один Resource реализует `StealthService`, `AgentBody` и `DetectionSink`:
//! команды пишут visibility / noise, coordinator пишет env concealment / exposure.

use bevy::prelude::*;

use crate::services::{AgentBody, DetectionSink, Posture, StealthService};
use crate::shared::clamp01;

/// Сколько distractions держим до того, как их заберут (старые вытесняются)
pub const MAX_PENDING_DISTRACTIONS: usize = 32;

/// Созданная отвлекающая точка (для внешнего AI)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct Distraction {
    pub position: Vec3,
    pub intensity: f32,
}

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct StealthAgent {
    pub position: Vec3,
    pub forward: Vec3,
    pub posture: Posture,
    pub speed_modifier: f32,
    visibility: f32,
    noise: f32,
    concealment_mode: bool,
    /// Env concealment, начиная с которого агент считается скрытым
    concealed_threshold: f32,
    environmental_concealment: f32,
    concealment_source: String,
    light_exposure: f32,
    light_direction: Vec3,
    noise_masking: f32,
    distractions: Vec<Distraction>,
}

impl Default for StealthAgent {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl StealthAgent {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            forward: Vec3::NEG_Z,
            posture: Posture::Standing,
            speed_modifier: 1.0,
            visibility: 1.0,
            noise: 0.0,
            concealment_mode: false,
            concealed_threshold: 0.5,
            environmental_concealment: 0.0,
            concealment_source: String::new(),
            light_exposure: 0.0,
            light_direction: Vec3::ZERO,
            noise_masking: 0.0,
            distractions: Vec::new(),
        }
    }

    pub fn with_concealed_threshold(mut self, threshold: f32) -> Self {
        self.concealed_threshold = clamp01(threshold);
        self
    }

    pub fn environmental_concealment(&self) -> f32 {
        self.environmental_concealment
    }

    pub fn concealment_source(&self) -> &str {
        &self.concealment_source
    }

    pub fn light_exposure(&self) -> f32 {
        self.light_exposure
    }

    pub fn light_direction(&self) -> Vec3 {
        self.light_direction
    }

    pub fn noise_masking(&self) -> f32 {
        self.noise_masking
    }

    pub fn distractions(&self) -> &[Distraction] {
        &self.distractions
    }

    pub fn take_distractions(&mut self) -> Vec<Distraction> {
        std::mem::take(&mut self.distractions)
    }
}

impl StealthService for StealthAgent {
    fn player_visibility_factor(&self) -> f32 {
        self.visibility
    }

    fn update_visibility(&mut self, value: f32) {
        self.visibility = clamp01(value);
    }

    fn player_noise_level(&self) -> f32 {
        self.noise
    }

    fn update_noise_level(&mut self, value: f32) {
        self.noise = value.max(0.0);
    }

    fn concealment_mode(&self) -> bool {
        self.concealment_mode
    }

    fn set_concealment_mode(&mut self, enabled: bool) {
        self.concealment_mode = enabled;
    }

    fn is_player_concealed(&self) -> bool {
        self.concealment_mode || self.environmental_concealment >= self.concealed_threshold
    }

    fn create_distraction(&mut self, position: Vec3, intensity: f32) {
        if self.distractions.len() >= MAX_PENDING_DISTRACTIONS {
            self.distractions.remove(0);
        }
        self.distractions.push(Distraction {
            position,
            intensity: clamp01(intensity),
        });
    }
}

impl AgentBody for StealthAgent {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn forward(&self) -> Vec3 {
        self.forward
    }

    fn posture(&self) -> Posture {
        self.posture
    }

    fn set_posture(&mut self, posture: Posture) {
        self.posture = posture;
    }

    fn speed_modifier(&self) -> f32 {
        self.speed_modifier
    }

    fn set_speed_modifier(&mut self, modifier: f32) {
        self.speed_modifier = modifier.max(0.0);
    }
}

impl DetectionSink for StealthAgent {
    fn apply_environmental_concealment(&mut self, strength: f32, source_tag: &str) {
        self.environmental_concealment = clamp01(strength);
        self.concealment_source.clear();
        self.concealment_source.push_str(source_tag);
    }

    fn apply_light_exposure(&mut self, exposure: f32, direction: Vec3) {
        self.light_exposure = clamp01(exposure);
        self.light_direction = direction;
    }

    fn apply_noise_masking(&mut self, level: f32) {
        self.noise_masking = clamp01(level);
    }
}

/// Время stealth-симуляции + глобальный time scale (TimeSlowdown)
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct StealthClock {
    pub elapsed: f64,
    pub time_scale: f32,
}

impl Default for StealthClock {
    fn default() -> Self {
        Self {
            elapsed: 0.0,
            time_scale: 1.0,
        }
    }
}

impl StealthClock {
    pub fn advance(&mut self, delta: f32) {
        self.elapsed += delta as f64;
    }
}
