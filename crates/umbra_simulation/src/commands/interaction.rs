//! InteractionCommand - действия с окружением.
//!
//! HideBody необратим (`can_undo() == false`): спрятанное тело не "распрятать".
//! Все проверки (stealth, target, capacity) делаются до snapshot'а и мутаций.

use bevy::prelude::*;

use crate::commands::context::{require, AgentSnapshot, CommandContext, SCENE_SERVICE, STEALTH_SERVICE};
use crate::commands::error::CommandError;
use crate::commands::pool::Resettable;
use crate::commands::StealthCommand;
use crate::concealment::{EntryPath, EntryRejection};
use crate::services::AgentServices;
use crate::shared::{clamp01, ObjectId, OccupantId, ZoneId};

/// Радиус поиска hiding spot, если zone не указана явно
pub const HIDING_SPOT_REACH: f32 = 3.0;
pub const THROW_DISTRACTION_INTENSITY: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InteractionKind {
    #[default]
    ThrowObject,
    HideBody,
    SabotageLight,
    DisableCamera,
    OperateDoor,
    OperateSwitch,
    EnterHidingSpot,
    ExitHidingSpot,
}

impl InteractionKind {
    /// Уровень шума, который производит действие
    pub fn noise(&self) -> f32 {
        match self {
            InteractionKind::DisableCamera => 0.1,
            InteractionKind::SabotageLight => 0.3,
            InteractionKind::ThrowObject => 0.8,
            InteractionKind::HideBody => 0.2,
            InteractionKind::OperateDoor => 0.4,
            InteractionKind::OperateSwitch => 0.1,
            InteractionKind::EnterHidingSpot | InteractionKind::ExitHidingSpot => 0.2,
        }
    }

    pub fn is_reversible(&self) -> bool {
        *self != InteractionKind::HideBody
    }

    /// Порог visibility (строго меньше) при requires_stealth
    fn visibility_limit(&self) -> Option<f32> {
        match self {
            InteractionKind::HideBody => Some(0.3),
            InteractionKind::OperateDoor | InteractionKind::OperateSwitch => Some(0.7),
            InteractionKind::DisableCamera | InteractionKind::SabotageLight => Some(0.8),
            InteractionKind::EnterHidingSpot => Some(0.5),
            InteractionKind::ThrowObject | InteractionKind::ExitHidingSpot => None,
        }
    }

    fn targets_object(&self) -> bool {
        matches!(
            self,
            InteractionKind::HideBody
                | InteractionKind::SabotageLight
                | InteractionKind::DisableCamera
                | InteractionKind::OperateDoor
                | InteractionKind::OperateSwitch
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionTarget {
    #[default]
    None,
    Object(ObjectId),
    Zone(ZoneId),
    Position(Vec3),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractionParams {
    pub kind: InteractionKind,
    pub target: InteractionTarget,
    pub requires_stealth: bool,
}

impl InteractionParams {
    pub fn new(kind: InteractionKind, target: InteractionTarget) -> Self {
        Self {
            kind,
            target,
            requires_stealth: false,
        }
    }

    pub fn requiring_stealth(mut self) -> Self {
        self.requires_stealth = true;
        self
    }

    fn validate(&self) -> Result<(), CommandError> {
        match (self.kind, self.target) {
            (_, InteractionTarget::Position(position)) if !position.is_finite() => {
                Err(CommandError::InvalidParameters("target position is not finite".into()))
            }
            (kind, InteractionTarget::Object(_)) if kind.targets_object() || kind == InteractionKind::ThrowObject => Ok(()),
            (kind, target) if kind.targets_object() => Err(CommandError::InvalidParameters(format!(
                "{:?} needs an object target, got {:?}",
                kind, target
            ))),
            (InteractionKind::ThrowObject, InteractionTarget::Position(_)) => Ok(()),
            (InteractionKind::ThrowObject, target) => Err(CommandError::InvalidParameters(format!(
                "ThrowObject needs a position or object, got {:?}",
                target
            ))),
            (InteractionKind::EnterHidingSpot | InteractionKind::ExitHidingSpot, InteractionTarget::Zone(_))
            | (InteractionKind::EnterHidingSpot | InteractionKind::ExitHidingSpot, InteractionTarget::None) => Ok(()),
            (kind, target) => Err(CommandError::InvalidParameters(format!("{:?} cannot target {:?}", kind, target))),
        }
    }
}

/// Цель после проверок
#[derive(Debug, Clone, Copy, PartialEq)]
enum Resolved {
    Object { id: ObjectId, was_enabled: bool },
    Point(Vec3),
    Zone(ZoneId),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionCommand {
    params: Option<InteractionParams>,
    snapshot: Option<AgentSnapshot>,
    resolved: Option<Resolved>,
    executed: bool,
    undone: bool,
}

impl Resettable for InteractionCommand {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl InteractionCommand {
    pub fn initialize(&mut self, params: InteractionParams) -> Result<(), CommandError> {
        if let Err(err) = params.validate() {
            crate::log_error(&format!("InteractionCommand: {}", err));
            self.params = None;
            return Err(err);
        }
        self.params = Some(params);
        Ok(())
    }

    pub fn params(&self) -> Option<&InteractionParams> {
        self.params.as_ref()
    }

    pub fn kind(&self) -> Option<InteractionKind> {
        self.params.as_ref().map(|params| params.kind)
    }

    pub fn is_undone(&self) -> bool {
        self.undone
    }

    fn check_stealth(params: &InteractionParams, agent: &dyn AgentServices) -> Result<(), CommandError> {
        if !params.requires_stealth {
            return Ok(());
        }
        if !agent.concealment_mode() {
            return Err(CommandError::StealthRequirementsNotMet);
        }
        if params.kind == InteractionKind::HideBody && !agent.is_player_concealed() {
            return Err(CommandError::StealthRequirementsNotMet);
        }
        match params.kind.visibility_limit() {
            Some(limit) if agent.player_visibility_factor() >= limit => Err(CommandError::StealthRequirementsNotMet),
            _ => Ok(()),
        }
    }

    fn resolve(params: &InteractionParams, agent: &dyn AgentServices, ctx: &CommandContext<'_>) -> Result<Resolved, CommandError> {
        let kind = params.kind;
        match (kind, params.target) {
            (InteractionKind::ThrowObject, InteractionTarget::Position(point)) => Ok(Resolved::Point(point)),
            (InteractionKind::ThrowObject, InteractionTarget::Object(id)) => {
                let scene = require(ctx.scene.as_deref(), SCENE_SERVICE)?;
                scene
                    .object_position(id)
                    .map(Resolved::Point)
                    .ok_or_else(|| CommandError::InvalidTarget(format!("{:?} not in scene", id)))
            }
            (InteractionKind::EnterHidingSpot, target) => {
                let zone = match target {
                    InteractionTarget::Zone(zone) => zone,
                    _ => ctx
                        .zones
                        .nearest_available_zone(agent.position(), HIDING_SPOT_REACH)
                        .ok_or_else(|| CommandError::InvalidTarget("no hiding spot in reach".into()))?,
                };
                match ctx.zones.check_entry(zone, OccupantId::AGENT, EntryPath::ExplicitAction) {
                    Some(Ok(())) => Ok(Resolved::Zone(zone)),
                    Some(Err(EntryRejection::Full)) => Err(CommandError::CapacityExceeded),
                    Some(Err(reason)) => Err(CommandError::InvalidTarget(format!("{:?}: {:?}", zone, reason))),
                    None => Err(CommandError::InvalidTarget(format!("{:?} does not exist", zone))),
                }
            }
            (InteractionKind::ExitHidingSpot, target) => {
                let zone = match target {
                    InteractionTarget::Zone(zone) => Some(zone),
                    _ => ctx.zones.zone_of(OccupantId::AGENT),
                };
                zone.filter(|id| ctx.zones.zone(*id).is_some_and(|zone| zone.contains(OccupantId::AGENT)))
                    .map(Resolved::Zone)
                    .ok_or_else(|| CommandError::InvalidTarget("agent is not hiding".into()))
            }
            (_, InteractionTarget::Object(id)) => {
                let scene = require(ctx.scene.as_deref(), SCENE_SERVICE)?;
                let was_enabled = scene
                    .object_enabled(id)
                    .ok_or_else(|| CommandError::InvalidTarget(format!("{:?} not in scene", id)))?;
                let needs_enabled = matches!(
                    kind,
                    InteractionKind::HideBody | InteractionKind::DisableCamera | InteractionKind::SabotageLight
                );
                if needs_enabled && !was_enabled {
                    return Err(CommandError::InvalidTarget(format!("{:?} already disabled", id)));
                }
                Ok(Resolved::Object { id, was_enabled })
            }
            (kind, target) => Err(CommandError::InvalidTarget(format!("{:?} cannot target {:?}", kind, target))),
        }
    }
}

impl StealthCommand for InteractionCommand {
    fn name(&self) -> &'static str {
        "interaction"
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        if self.executed {
            return Err(CommandError::AlreadyExecuted);
        }
        let params = self.params.clone().ok_or(CommandError::NotInitialized)?;

        let resolved = {
            let agent = require(ctx.agent.as_deref(), STEALTH_SERVICE)?;
            Self::check_stealth(&params, agent)?;
            Self::resolve(&params, agent, ctx)?
        };
        if matches!(resolved, Resolved::Object { .. }) {
            require(ctx.scene.as_deref(), SCENE_SERVICE)?;
        }

        let agent = require(ctx.agent.as_deref_mut(), STEALTH_SERVICE)?;
        let snapshot = AgentSnapshot::capture(&*agent);
        let visibility = snapshot.visibility;

        match (params.kind, resolved) {
            (InteractionKind::ThrowObject, Resolved::Point(point)) => {
                agent.create_distraction(point, THROW_DISTRACTION_INTENSITY);
                agent.update_visibility(visibility * 0.8);
            }
            (InteractionKind::EnterHidingSpot, Resolved::Zone(zone)) => {
                if !ctx.zones.try_enter(zone, OccupantId::AGENT, EntryPath::ExplicitAction, agent) {
                    return Err(CommandError::CapacityExceeded);
                }
                if let Some(spot) = ctx.zones.zone(zone) {
                    agent.set_position(spot.position());
                }
            }
            (InteractionKind::ExitHidingSpot, Resolved::Zone(zone)) => {
                if !ctx.zones.try_exit(zone, OccupantId::AGENT, agent) {
                    return Err(CommandError::InvalidTarget("agent is not hiding".into()));
                }
            }
            (kind, Resolved::Object { id, was_enabled }) => {
                let scene = require(ctx.scene.as_deref_mut(), SCENE_SERVICE)?;
                match kind {
                    InteractionKind::DisableCamera => {
                        scene.set_object_enabled(id, false);
                        agent.update_visibility(clamp01(visibility + 0.3));
                    }
                    InteractionKind::SabotageLight => {
                        scene.set_object_enabled(id, false);
                        agent.update_visibility(visibility * 0.7);
                    }
                    InteractionKind::HideBody => {
                        scene.set_object_enabled(id, false);
                        agent.update_visibility(visibility * 0.9);
                    }
                    _ => {
                        scene.set_object_enabled(id, !was_enabled);
                    }
                }
            }
            (kind, resolved) => {
                return Err(CommandError::InvalidTarget(format!("{:?} cannot use {:?}", kind, resolved)));
            }
        }

        agent.update_noise_level(params.kind.noise());
        crate::log(&format!("🖐 Interaction {:?} on {:?}", params.kind, resolved));

        self.snapshot = Some(snapshot);
        self.resolved = Some(resolved);
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        if !self.can_undo() {
            return Err(CommandError::UndoUnsupported);
        }
        let (Some(snapshot), Some(resolved)) = (self.snapshot, self.resolved) else {
            return Err(CommandError::UndoUnsupported);
        };

        if let Resolved::Object { .. } = resolved {
            require(ctx.scene.as_deref(), SCENE_SERVICE)?;
        }
        if let Resolved::Zone(zone) = resolved {
            if self.kind() == Some(InteractionKind::ExitHidingSpot) {
                if let Some(Err(_)) | None = ctx.zones.check_entry(zone, OccupantId::AGENT, EntryPath::ExplicitAction) {
                    return Err(CommandError::CapacityExceeded);
                }
            }
        }
        let agent = require(ctx.agent.as_deref_mut(), STEALTH_SERVICE)?;

        match resolved {
            Resolved::Object { id, was_enabled } => {
                if let Some(scene) = ctx.scene.as_deref_mut() {
                    scene.set_object_enabled(id, was_enabled);
                }
            }
            Resolved::Zone(zone) => match self.kind() {
                Some(InteractionKind::EnterHidingSpot) => {
                    ctx.zones.try_exit(zone, OccupantId::AGENT, agent);
                }
                Some(InteractionKind::ExitHidingSpot) => {
                    ctx.zones.try_enter(zone, OccupantId::AGENT, EntryPath::ExplicitAction, agent);
                }
                _ => {}
            },
            Resolved::Point(_) => {}
        }

        snapshot.restore(agent);
        self.executed = false;
        self.undone = true;
        Ok(())
    }

    fn can_undo(&self) -> bool {
        self.executed && self.kind().is_some_and(|kind| kind.is_reversible())
    }

    fn is_executed(&self) -> bool {
        self.executed
    }
}
