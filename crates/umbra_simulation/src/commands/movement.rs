//! MovementCommand - stealth postures.
//!
//! | kind            | visibility | noise | speed | posture   | условие                        |
//! |-----------------|------------|-------|-------|-----------|--------------------------------|
//! | SneakMode       | ×0.7       | ×0.3  | 0.3   | Walking   |                                |
//! | CrouchWalk      | ×0.5       | ×0.2  | 0.5   | Crouching |                                |
//! | ProneMovement   | ×0.2       | ×0.1  | 0.1   | Prone     |                                |
//! | QuickHide       | =0.1       | -     | 1.5   | Crouching | свободная zone рядом           |
//! | SilentSprint    | ×1.2       | ×0.4  | 2.0   | Running   |                                |
//! | WallHug         | ×0.6       | ×0.3  | 0.8   | Crouching | стена в пределах 2 м           |
//! | CoverToCover    | ×0.4       | ×0.2  | 1.0   | InCover   | путь не пересекает врагов      |
//! | StealthClimb    | ×0.8       | ×0.5  | 0.5   | Climbing  |                                |
//! | ShadowMove      | ×0.3       | ×0.2  | 0.8   | Crouching | агент скрыт                    |
//! | DistractionMove | ×0.9       | -     | 1.2   | Crouching | distraction в 5 м сбоку        |

use bevy::prelude::*;

use crate::collision_layers::{LAYER_WALL, MASK_PATH_BLOCKERS};
use crate::commands::context::{require, AgentSnapshot, CommandContext, SCENE_SERVICE, STEALTH_SERVICE};
use crate::commands::error::CommandError;
use crate::commands::pool::Resettable;
use crate::commands::StealthCommand;
use crate::services::{AgentServices, Posture};
use crate::shared::{clamp01, move_towards};

pub const DEFAULT_BASE_SPEED: f32 = 4.0;
pub const QUICK_HIDE_SEARCH_RADIUS: f32 = 10.0;
pub const WALL_PROBE_DISTANCE: f32 = 2.0;
pub const DISTRACTION_OFFSET: f32 = 5.0;
pub const DISTRACTION_MOVE_INTENSITY: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MovementKind {
    #[default]
    SneakMode,
    CrouchWalk,
    ProneMovement,
    QuickHide,
    SilentSprint,
    WallHug,
    CoverToCover,
    StealthClimb,
    ShadowMove,
    DistractionMove,
}

/// Модификаторы позы
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureProfile {
    pub visibility: VisibilityChange,
    /// None - шум не меняется
    pub noise_multiplier: Option<f32>,
    pub speed: f32,
    /// None - поза не меняется
    pub posture: Option<Posture>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisibilityChange {
    Scale(f32),
    Set(f32),
}

impl MovementKind {
    pub fn profile(&self) -> PostureProfile {
        use MovementKind::*;
        let (visibility, noise_multiplier, speed, posture) = match self {
            SneakMode => (VisibilityChange::Scale(0.7), Some(0.3), 0.3, Posture::Walking),
            CrouchWalk => (VisibilityChange::Scale(0.5), Some(0.2), 0.5, Posture::Crouching),
            ProneMovement => (VisibilityChange::Scale(0.2), Some(0.1), 0.1, Posture::Prone),
            QuickHide => (VisibilityChange::Set(0.1), None, 1.5, Posture::Crouching),
            SilentSprint => (VisibilityChange::Scale(1.2), Some(0.4), 2.0, Posture::Running),
            WallHug => (VisibilityChange::Scale(0.6), Some(0.3), 0.8, Posture::Crouching),
            CoverToCover => (VisibilityChange::Scale(0.4), Some(0.2), 1.0, Posture::InCover),
            StealthClimb => (VisibilityChange::Scale(0.8), Some(0.5), 0.5, Posture::Climbing),
            ShadowMove => (VisibilityChange::Scale(0.3), Some(0.2), 0.8, Posture::Crouching),
            DistractionMove => (VisibilityChange::Scale(0.9), None, 1.2, Posture::Crouching),
        };
        PostureProfile {
            visibility,
            noise_multiplier,
            speed,
            posture: Some(posture),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementParams {
    pub kind: MovementKind,
    pub target: Vec3,
    /// Сколько секунд длится перемещение (определяет пройденную дистанцию)
    pub duration: f32,
    pub speed_multiplier: f32,
    pub base_speed: f32,
    pub maintain_stealth: bool,
}

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            kind: MovementKind::SneakMode,
            target: Vec3::ZERO,
            duration: 1.0,
            speed_multiplier: 1.0,
            base_speed: DEFAULT_BASE_SPEED,
            maintain_stealth: true,
        }
    }
}

impl MovementParams {
    pub fn new(kind: MovementKind, target: Vec3) -> Self {
        Self {
            kind,
            target,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_speed_multiplier(mut self, multiplier: f32) -> Self {
        self.speed_multiplier = multiplier;
        self
    }

    fn validate(&self) -> Result<(), CommandError> {
        if !self.target.is_finite() {
            return Err(CommandError::InvalidParameters("movement target is not finite".into()));
        }
        for (name, value) in [
            ("duration", self.duration),
            ("speed_multiplier", self.speed_multiplier),
            ("base_speed", self.base_speed),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CommandError::InvalidParameters(format!("{} must be >= 0, got {}", name, value)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementCommand {
    params: Option<MovementParams>,
    snapshot: Option<AgentSnapshot>,
    executed: bool,
    undone: bool,
}

impl Resettable for MovementCommand {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl MovementCommand {
    /// Невалидные параметры оставляют команду неинициализированной
    pub fn initialize(&mut self, params: MovementParams) -> Result<(), CommandError> {
        if let Err(err) = params.validate() {
            crate::log_error(&format!("MovementCommand: {}", err));
            self.params = None;
            return Err(err);
        }
        self.params = Some(params);
        Ok(())
    }

    pub fn params(&self) -> Option<&MovementParams> {
        self.params.as_ref()
    }

    pub fn snapshot(&self) -> Option<&AgentSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_undone(&self) -> bool {
        self.undone
    }

    /// Проверки условий до любой мутации. Возвращает куда идти.
    fn resolve_target(
        params: &MovementParams,
        agent: &dyn AgentServices,
        ctx: &CommandContext<'_>,
    ) -> Result<Vec3, CommandError> {
        let position = agent.position();
        match params.kind {
            MovementKind::QuickHide => {
                let zone = ctx
                    .zones
                    .nearest_available_zone(position, QUICK_HIDE_SEARCH_RADIUS)
                    .and_then(|id| ctx.zones.zone(id))
                    .ok_or_else(|| CommandError::InvalidTarget("no hiding spot nearby".into()))?;
                Ok(zone.position())
            }
            MovementKind::WallHug => {
                let scene = require(ctx.scene.as_deref(), SCENE_SERVICE)?;
                let forward = agent.forward();
                let right = agent.right();
                let touches_wall = [forward, -forward, right, -right]
                    .into_iter()
                    .filter(|direction| *direction != Vec3::ZERO)
                    .any(|direction| scene.raycast(position, direction, WALL_PROBE_DISTANCE, LAYER_WALL).is_some());
                if touches_wall {
                    Ok(params.target)
                } else {
                    Err(CommandError::InvalidTarget("no wall within reach".into()))
                }
            }
            MovementKind::CoverToCover => {
                let scene = require(ctx.scene.as_deref(), SCENE_SERVICE)?;
                if scene.linecast(position, params.target, MASK_PATH_BLOCKERS).is_some() {
                    Err(CommandError::InvalidTarget("path to cover is blocked by an enemy".into()))
                } else {
                    Ok(params.target)
                }
            }
            MovementKind::ShadowMove if !agent.is_player_concealed() => Err(CommandError::StealthRequirementsNotMet),
            _ => Ok(params.target),
        }
    }
}

impl StealthCommand for MovementCommand {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        if self.executed {
            return Err(CommandError::AlreadyExecuted);
        }
        let params = self.params.clone().ok_or(CommandError::NotInitialized)?;

        let target = {
            let agent = require(ctx.agent.as_deref(), STEALTH_SERVICE)?;
            Self::resolve_target(&params, agent, ctx)?
        };
        let agent = require(ctx.agent.as_deref_mut(), STEALTH_SERVICE)?;

        let snapshot = AgentSnapshot::capture(&*agent);
        let profile = params.kind.profile();

        let visibility = match profile.visibility {
            VisibilityChange::Scale(factor) => snapshot.visibility * factor,
            VisibilityChange::Set(value) => value,
        };
        agent.update_visibility(clamp01(visibility));
        if let Some(factor) = profile.noise_multiplier {
            agent.update_noise_level(snapshot.noise * factor);
        }
        if let Some(posture) = profile.posture {
            agent.set_posture(posture);
        }

        let speed = profile.speed * params.speed_multiplier;
        agent.set_speed_modifier(speed);
        let step = params.base_speed * speed * params.duration;
        let destination = if params.kind == MovementKind::QuickHide {
            target
        } else {
            move_towards(snapshot.position, target, step)
        };
        agent.set_position(destination);

        if params.kind == MovementKind::DistractionMove {
            let right = agent.right();
            agent.create_distraction(snapshot.position + right * DISTRACTION_OFFSET, DISTRACTION_MOVE_INTENSITY);
        }

        crate::log(&format!("🚶 {:?} → {:?}", params.kind, destination));
        self.snapshot = Some(snapshot);
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        if !self.can_undo() {
            return Err(CommandError::UndoUnsupported);
        }
        let snapshot = self.snapshot.ok_or(CommandError::UndoUnsupported)?;
        let agent = require(ctx.agent.as_deref_mut(), STEALTH_SERVICE)?;
        snapshot.restore(agent);
        self.executed = false;
        self.undone = true;
        Ok(())
    }

    fn can_undo(&self) -> bool {
        self.executed
    }

    fn is_executed(&self) -> bool {
        self.executed
    }
}
