//! AbilityCommand - time-boxed способности.
//!
//! Длительность - countdown поле, уменьшается в `update_ability(dt)`.
//! Истечение и ручная деактивация идут одним путём: откат visibility / noise / mode,
//! time scale и заглушённых устройств. Undo дополнительно возвращает позицию и позу.

use bevy::prelude::*;

use crate::collision_layers::{LAYER_ELECTRONICS, LAYER_ENEMY, LAYER_ENVIRONMENT, LAYER_WALL};
use crate::commands::context::{require, AgentSnapshot, CommandContext, SCENE_SERVICE, STEALTH_SERVICE};
use crate::commands::error::CommandError;
use crate::commands::pool::Resettable;
use crate::commands::StealthCommand;
use crate::services::{DeviceKind, ObjectDescriptor};
use crate::shared::{clamp01, ObjectId};

pub const MOTION_DETECTION_RADIUS: f32 = 20.0;
pub const JAMMING_RADIUS: f32 = 10.0;
pub const WALL_PHASE_REACH: f32 = 5.0;
pub const WALL_PHASE_EXIT_OFFSET: f32 = 2.0;
pub const DISTRACTION_PROJECTION_RANGE: f32 = 10.0;
pub const CAMOUFLAGE_RADIUS: f32 = 5.0;
/// Нижняя граница time scale при TimeSlowdown
pub const MIN_TIME_SCALE: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AbilityKind {
    #[default]
    InvisibilityCloak,
    SoundDampening,
    MotionDetection,
    ThermalMasking,
    ElectronicJamming,
    TimeSlowdown,
    WallPhase,
    ShadowMeld,
    DistractionProjection,
    EnvironmentalCamouflage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbilityParams {
    pub kind: AbilityKind,
    /// Секунды
    pub duration: f32,
    /// 0..1
    pub intensity: f32,
    pub target: Option<Vec3>,
}

impl Default for AbilityParams {
    fn default() -> Self {
        Self {
            kind: AbilityKind::InvisibilityCloak,
            duration: 5.0,
            intensity: 1.0,
            target: None,
        }
    }
}

impl AbilityParams {
    pub fn new(kind: AbilityKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = Some(target);
        self
    }

    fn validate(&self) -> Result<(), CommandError> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(CommandError::InvalidParameters(format!("duration must be > 0, got {}", self.duration)));
        }
        if !(0.0..=1.0).contains(&self.intensity) {
            return Err(CommandError::InvalidParameters(format!(
                "intensity must be in [0, 1], got {}",
                self.intensity
            )));
        }
        if self.target.is_some_and(|target| !target.is_finite()) {
            return Err(CommandError::InvalidParameters("target is not finite".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbilityCommand {
    params: Option<AbilityParams>,
    snapshot: Option<AgentSnapshot>,
    previous_time_scale: Option<f32>,
    jammed: Vec<ObjectId>,
    detected: Vec<ObjectId>,
    remaining: f32,
    activated_at: Option<f64>,
    active: bool,
    executed: bool,
}

impl Resettable for AbilityCommand {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl AbilityCommand {
    pub fn initialize(&mut self, params: AbilityParams) -> Result<(), CommandError> {
        if let Err(err) = params.validate() {
            crate::log_error(&format!("AbilityCommand: {}", err));
            self.params = None;
            return Err(err);
        }
        self.params = Some(params);
        Ok(())
    }

    pub fn params(&self) -> Option<&AbilityParams> {
        self.params.as_ref()
    }

    pub fn kind(&self) -> Option<AbilityKind> {
        self.params.as_ref().map(|params| params.kind)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn activated_at(&self) -> Option<f64> {
        self.activated_at
    }

    /// Враги, найденные MotionDetection
    pub fn detected(&self) -> &[ObjectId] {
        &self.detected
    }

    pub fn jammed(&self) -> &[ObjectId] {
        &self.jammed
    }

    /// Countdown. false - способность больше не активна.
    pub fn update_ability(&mut self, delta: f32, ctx: &mut CommandContext<'_>) -> bool {
        if !self.active {
            return false;
        }
        self.remaining -= delta;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            crate::log(&format!("⏱ Ability {:?} expired", self.kind()));
            self.deactivate(ctx);
            return false;
        }
        true
    }

    /// Ручная отмена = тот же откат, что и при истечении
    pub fn deactivate(&mut self, ctx: &mut CommandContext<'_>) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Some(scale) = self.previous_time_scale.take() {
            ctx.clock.time_scale = scale;
        }
        if !self.jammed.is_empty() {
            match ctx.scene.as_deref_mut() {
                Some(scene) => {
                    for device in self.jammed.drain(..) {
                        scene.set_object_enabled(device, true);
                    }
                }
                None => crate::log_warning("Ability deactivation: scene unavailable, devices stay jammed"),
            }
        }
        match (ctx.agent.as_deref_mut(), self.snapshot) {
            (Some(agent), Some(snapshot)) => snapshot.restore_stealth(agent),
            _ => crate::log_warning("Ability deactivation: stealth service unavailable, state not restored"),
        }
    }

    fn is_jammable(descriptor: &ObjectDescriptor) -> bool {
        matches!(
            descriptor,
            ObjectDescriptor::Device(DeviceKind::Camera) | ObjectDescriptor::Device(DeviceKind::Alarm)
        )
    }
}

impl StealthCommand for AbilityCommand {
    fn name(&self) -> &'static str {
        "ability"
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        if self.executed {
            return Err(CommandError::AlreadyExecuted);
        }
        let params = self.params.clone().ok_or(CommandError::NotInitialized)?;
        let intensity = params.intensity;

        // Проверки и запросы до мутаций
        let mut to_jam = Vec::new();
        let mut detected = Vec::new();
        let mut phase_destination = None;
        let mut camouflage_count = 0usize;
        {
            let agent = require(ctx.agent.as_deref(), STEALTH_SERVICE)?;
            let position = agent.position();
            match params.kind {
                AbilityKind::MotionDetection => {
                    let scene = require(ctx.scene.as_deref(), SCENE_SERVICE)?;
                    detected = scene
                        .overlap_sphere(position, MOTION_DETECTION_RADIUS * intensity, LAYER_ENEMY)
                        .into_iter()
                        .map(|object| object.id)
                        .collect();
                    if detected.is_empty() {
                        return Err(CommandError::InvalidTarget("no enemies in range".into()));
                    }
                }
                AbilityKind::ElectronicJamming => {
                    let scene = require(ctx.scene.as_deref(), SCENE_SERVICE)?;
                    to_jam = scene
                        .overlap_sphere(position, JAMMING_RADIUS * intensity, LAYER_ELECTRONICS)
                        .into_iter()
                        .filter(|object| object.enabled && Self::is_jammable(&object.descriptor))
                        .map(|object| object.id)
                        .collect();
                    if to_jam.is_empty() {
                        return Err(CommandError::InvalidTarget("no electronics in range".into()));
                    }
                }
                AbilityKind::WallPhase => {
                    let scene = require(ctx.scene.as_deref(), SCENE_SERVICE)?;
                    let direction = params
                        .target
                        .map(|target| (target - position).normalize_or_zero())
                        .filter(|direction| *direction != Vec3::ZERO)
                        .unwrap_or_else(|| agent.forward());
                    let hit = scene
                        .raycast(position, direction, WALL_PHASE_REACH * intensity, LAYER_WALL)
                        .ok_or_else(|| CommandError::InvalidTarget("no wall to phase through".into()))?;
                    phase_destination = Some(hit.point + direction * WALL_PHASE_EXIT_OFFSET);
                }
                AbilityKind::ShadowMeld if !agent.is_player_concealed() => {
                    return Err(CommandError::StealthRequirementsNotMet);
                }
                AbilityKind::EnvironmentalCamouflage => {
                    let scene = require(ctx.scene.as_deref(), SCENE_SERVICE)?;
                    camouflage_count = scene.overlap_sphere(position, CAMOUFLAGE_RADIUS, LAYER_ENVIRONMENT).len();
                    if camouflage_count == 0 {
                        return Err(CommandError::InvalidTarget("nothing to blend with".into()));
                    }
                }
                _ => {}
            }
        }

        let agent = require(ctx.agent.as_deref_mut(), STEALTH_SERVICE)?;
        let snapshot = AgentSnapshot::capture(&*agent);
        let visibility = snapshot.visibility;

        match params.kind {
            AbilityKind::InvisibilityCloak => {
                agent.update_visibility(clamp01(1.0 - intensity));
                agent.set_concealment_mode(true);
            }
            AbilityKind::SoundDampening => {
                agent.update_noise_level(snapshot.noise * (1.0 - intensity * 0.9));
            }
            AbilityKind::MotionDetection => {
                crate::log_info(&format!("📡 Motion detection: {} enemies", detected.len()));
            }
            AbilityKind::ThermalMasking => {
                agent.update_visibility(visibility * 0.3);
            }
            AbilityKind::ElectronicJamming => {
                if let Some(scene) = ctx.scene.as_deref_mut() {
                    for device in &to_jam {
                        scene.set_object_enabled(*device, false);
                    }
                }
            }
            AbilityKind::TimeSlowdown => {
                self.previous_time_scale = Some(ctx.clock.time_scale);
                ctx.clock.time_scale = (1.0 - intensity * 0.7).max(MIN_TIME_SCALE);
            }
            AbilityKind::WallPhase => {
                if let Some(destination) = phase_destination {
                    agent.set_position(destination);
                }
            }
            AbilityKind::ShadowMeld => {
                agent.update_visibility(0.05);
                agent.update_noise_level(0.0);
            }
            AbilityKind::DistractionProjection => {
                let point = params
                    .target
                    .unwrap_or_else(|| snapshot.position + agent.forward() * DISTRACTION_PROJECTION_RANGE);
                agent.create_distraction(point, intensity);
            }
            AbilityKind::EnvironmentalCamouflage => {
                let effectiveness = intensity.min(camouflage_count as f32 * 0.2);
                agent.update_visibility(visibility * (1.0 - effectiveness));
            }
        }

        crate::log(&format!("✨ Ability {:?} active for {:.1}s", params.kind, params.duration));
        self.snapshot = Some(snapshot);
        self.jammed = to_jam;
        self.detected = detected;
        self.remaining = params.duration;
        self.activated_at = Some(ctx.clock.elapsed);
        self.active = true;
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        if !self.can_undo() {
            return Err(CommandError::UndoUnsupported);
        }
        let snapshot = self.snapshot.ok_or(CommandError::UndoUnsupported)?;
        require(ctx.agent.as_deref(), STEALTH_SERVICE)?;

        self.deactivate(ctx);
        if let Some(agent) = ctx.agent.as_deref_mut() {
            snapshot.restore(agent);
        }
        self.executed = false;
        Ok(())
    }

    fn can_undo(&self) -> bool {
        self.executed
    }

    fn is_executed(&self) -> bool {
        self.executed
    }
}
