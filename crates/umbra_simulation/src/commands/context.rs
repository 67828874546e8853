//! Что команда видит во время execute / undo / update.
//!
//! Сервисы опциональны: отсутствие → `ServiceUnavailable` без мутаций.

use bevy::prelude::*;

use crate::agent::StealthClock;
use crate::commands::error::CommandError;
use crate::concealment::ConcealmentRegistry;
use crate::services::{AgentServices, HostScene, Posture};

pub struct CommandContext<'a> {
    pub agent: Option<&'a mut dyn AgentServices>,
    pub scene: Option<&'a mut dyn HostScene>,
    pub zones: &'a mut ConcealmentRegistry,
    pub clock: &'a mut StealthClock,
}

impl<'a> CommandContext<'a> {
    pub fn new(zones: &'a mut ConcealmentRegistry, clock: &'a mut StealthClock) -> Self {
        Self {
            agent: None,
            scene: None,
            zones,
            clock,
        }
    }

    pub fn with_agent(mut self, agent: &'a mut dyn AgentServices) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn with_scene(mut self, scene: &'a mut dyn HostScene) -> Self {
        self.scene = Some(scene);
        self
    }
}

pub(crate) const STEALTH_SERVICE: &str = "stealth service";
pub(crate) const SCENE_SERVICE: &str = "scene queries";

pub(crate) fn require<T>(service: Option<T>, name: &'static str) -> Result<T, CommandError> {
    service.ok_or_else(|| {
        crate::log_warning(&format!("Command aborted: {} unavailable", name));
        CommandError::ServiceUnavailable(name)
    })
}

/// Состояние агента до execute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshot {
    pub position: Vec3,
    pub visibility: f32,
    pub noise: f32,
    pub concealment_mode: bool,
    pub posture: Posture,
    pub speed_modifier: f32,
}

impl AgentSnapshot {
    pub fn capture<A: AgentServices + ?Sized>(agent: &A) -> Self {
        Self {
            position: agent.position(),
            visibility: agent.player_visibility_factor(),
            noise: agent.player_noise_level(),
            concealment_mode: agent.concealment_mode(),
            posture: agent.posture(),
            speed_modifier: agent.speed_modifier(),
        }
    }

    /// Только stealth state (visibility / noise / mode) - путь expiry у abilities
    pub fn restore_stealth<A: AgentServices + ?Sized>(&self, agent: &mut A) {
        agent.update_visibility(self.visibility);
        agent.update_noise_level(self.noise);
        agent.set_concealment_mode(self.concealment_mode);
    }

    pub fn restore<A: AgentServices + ?Sized>(&self, agent: &mut A) {
        self.restore_stealth(agent);
        agent.set_position(self.position);
        agent.set_posture(self.posture);
        agent.set_speed_modifier(self.speed_modifier);
    }
}
