//! CommandManager - pools, undo stack, named commands, активные abilities.
//!
//! Все ошибки обрабатываются здесь: лог + bool, ничего не пробрасывается наружу.
//! Неудачная команда сразу возвращается в свой pool.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::commands::ability::{AbilityCommand, AbilityKind, AbilityParams};
use crate::commands::context::CommandContext;
use crate::commands::error::CommandError;
use crate::commands::interaction::{InteractionCommand, InteractionParams};
use crate::commands::movement::{MovementCommand, MovementParams};
use crate::commands::pool::CommandPool;
use crate::commands::StealthCommand;
use crate::config::{CommandConfig, ConfigError};
use crate::shared::CommandId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Movement,
    Interaction,
    Ability,
}

#[derive(Debug)]
enum LiveCommand {
    Movement(MovementCommand),
    Interaction(InteractionCommand),
    Ability(AbilityCommand),
}

impl LiveCommand {
    fn family(&self) -> Family {
        match self {
            LiveCommand::Movement(_) => Family::Movement,
            LiveCommand::Interaction(_) => Family::Interaction,
            LiveCommand::Ability(_) => Family::Ability,
        }
    }

    fn can_undo(&self) -> bool {
        match self {
            LiveCommand::Movement(command) => command.can_undo(),
            LiveCommand::Interaction(command) => command.can_undo(),
            LiveCommand::Ability(command) => command.can_undo(),
        }
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        match self {
            LiveCommand::Movement(command) => command.undo(ctx),
            LiveCommand::Interaction(command) => command.undo(ctx),
            LiveCommand::Ability(command) => command.undo(ctx),
        }
    }

    fn is_active_ability(&self) -> bool {
        matches!(self, LiveCommand::Ability(ability) if ability.is_active())
    }
}

enum UndoOutcome {
    Undone,
    Unsupported,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommandStatistics {
    pub executed: u64,
    pub undone: u64,
    pub failed: u64,
    pub active_abilities: usize,
    pub history_count: usize,
    pub last_execution_time: Option<f64>,
    /// Одновременно на руках / всего выдано
    pub pool_utilization: f32,
}

#[derive(Resource)]
pub struct CommandManager {
    config: CommandConfig,
    movement_pool: CommandPool<MovementCommand>,
    interaction_pool: CommandPool<InteractionCommand>,
    ability_pool: CommandPool<AbilityCommand>,
    live: HashMap<CommandId, LiveCommand>,
    /// LIFO undo stack
    history: Vec<CommandId>,
    named: HashMap<String, CommandId>,
    active_abilities: Vec<CommandId>,
    next_id: u64,
    executed: u64,
    undone: u64,
    failed: u64,
    last_execution_time: Option<f64>,
    last_command: Option<CommandId>,
}

impl CommandManager {
    pub fn new(config: CommandConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            movement_pool: CommandPool::new("movement", config.movement_pool),
            interaction_pool: CommandPool::new("interaction", config.interaction_pool),
            ability_pool: CommandPool::new("ability", config.ability_pool),
            config,
            live: HashMap::new(),
            history: Vec::new(),
            named: HashMap::new(),
            active_abilities: Vec::new(),
            next_id: 0,
            executed: 0,
            undone: 0,
            failed: 0,
            last_execution_time: None,
            last_command: None,
        })
    }

    // ------------------------------------------------------------------
    // Execute
    // ------------------------------------------------------------------

    pub fn execute_movement(&mut self, ctx: &mut CommandContext<'_>, params: MovementParams, name: Option<&str>) -> bool {
        let Some(mut command) = self.acquire(Family::Movement, |manager| manager.movement_pool.get()) else {
            return self.reject(CommandError::PoolExhausted("movement"));
        };
        let kind = params.kind;
        let result = command.initialize(params).and_then(|_| command.execute(ctx));
        match result {
            Ok(()) => self.record(LiveCommand::Movement(command), name, ctx),
            Err(err) => {
                self.movement_pool.give_back(command);
                self.reject_with(&format!("{:?}", kind), err)
            }
        }
    }

    pub fn execute_interaction(
        &mut self,
        ctx: &mut CommandContext<'_>,
        params: InteractionParams,
        name: Option<&str>,
    ) -> bool {
        let Some(mut command) = self.acquire(Family::Interaction, |manager| manager.interaction_pool.get()) else {
            return self.reject(CommandError::PoolExhausted("interaction"));
        };
        let kind = params.kind;
        let result = command.initialize(params).and_then(|_| command.execute(ctx));
        match result {
            Ok(()) => self.record(LiveCommand::Interaction(command), name, ctx),
            Err(err) => {
                self.interaction_pool.give_back(command);
                self.reject_with(&format!("{:?}", kind), err)
            }
        }
    }

    pub fn execute_ability(&mut self, ctx: &mut CommandContext<'_>, params: AbilityParams, name: Option<&str>) -> bool {
        let Some(mut command) = self.acquire(Family::Ability, |manager| manager.ability_pool.get()) else {
            return self.reject(CommandError::PoolExhausted("ability"));
        };
        let kind = params.kind;
        let result = command.initialize(params).and_then(|_| command.execute(ctx));
        match result {
            Ok(()) => self.record(LiveCommand::Ability(command), name, ctx),
            Err(err) => {
                self.ability_pool.give_back(command);
                self.reject_with(&format!("{:?}", kind), err)
            }
        }
    }

    /// Берёт экземпляр; при исчерпании может закоммитить самую старую запись history того же вида
    fn acquire<T>(&mut self, family: Family, get: impl Fn(&mut Self) -> Option<T>) -> Option<T> {
        if let Some(command) = get(self) {
            return Some(command);
        }
        if self.config.recycle_history_on_exhaustion && self.commit_oldest(family) {
            return get(self);
        }
        None
    }

    fn record(&mut self, command: LiveCommand, name: Option<&str>, ctx: &CommandContext<'_>) -> bool {
        self.next_id += 1;
        let id = CommandId(self.next_id);

        if command.is_active_ability() {
            self.active_abilities.push(id);
        }
        self.live.insert(id, command);
        self.history.push(id);
        if let Some(name) = name {
            self.named.insert(name.to_string(), id);
        }
        self.executed += 1;
        self.last_execution_time = Some(ctx.clock.elapsed);
        self.last_command = Some(id);

        while self.history.len() > self.config.max_history {
            let oldest = self.history.remove(0);
            self.commit(oldest);
        }
        true
    }

    fn reject(&mut self, err: CommandError) -> bool {
        self.failed += 1;
        crate::log_warning(&format!("CommandManager: {}", err));
        false
    }

    fn reject_with(&mut self, label: &str, err: CommandError) -> bool {
        self.failed += 1;
        crate::log(&format!("CommandManager: {} failed: {}", label, err));
        false
    }

    // ------------------------------------------------------------------
    // Undo
    // ------------------------------------------------------------------

    /// Откатывает последнюю команду. Необратимая команда снимается со стека без отката.
    pub fn undo_last(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        let Some(&id) = self.history.last() else {
            return false;
        };
        match self.try_undo(id, ctx) {
            UndoOutcome::Undone => {
                self.history.pop();
                true
            }
            UndoOutcome::Unsupported => {
                self.history.pop();
                self.commit(id);
                false
            }
            UndoOutcome::Failed => false,
        }
    }

    /// Откат по имени. Необратимая команда остаётся как есть.
    pub fn undo_named(&mut self, name: &str, ctx: &mut CommandContext<'_>) -> bool {
        let Some(&id) = self.named.get(name) else {
            crate::log_warning(&format!("CommandManager: no command named '{}'", name));
            return false;
        };
        match self.try_undo(id, ctx) {
            UndoOutcome::Undone => {
                self.history.retain(|entry| *entry != id);
                true
            }
            UndoOutcome::Unsupported | UndoOutcome::Failed => false,
        }
    }

    fn try_undo(&mut self, id: CommandId, ctx: &mut CommandContext<'_>) -> UndoOutcome {
        let Some(command) = self.live.get_mut(&id) else {
            return UndoOutcome::Failed;
        };
        if !command.can_undo() {
            crate::log_warning(&format!("CommandManager: {:?} - {}", id, CommandError::UndoUnsupported));
            return UndoOutcome::Unsupported;
        }
        match command.undo(ctx) {
            Ok(()) => {
                self.undone += 1;
                self.release(id);
                UndoOutcome::Undone
            }
            Err(err) => {
                crate::log_warning(&format!("CommandManager: undo of {:?} failed: {}", id, err));
                UndoOutcome::Failed
            }
        }
    }

    // ------------------------------------------------------------------
    // History / abilities
    // ------------------------------------------------------------------

    pub fn clear_history(&mut self) {
        let history = std::mem::take(&mut self.history);
        for id in history {
            self.commit(id);
        }
        self.named.clear();
    }

    /// Ручная отмена всех активных abilities (тот же откат, что и при истечении)
    pub fn deactivate_all_abilities(&mut self, ctx: &mut CommandContext<'_>) -> usize {
        let active = std::mem::take(&mut self.active_abilities);
        let count = active.len();
        for id in active {
            if let Some(LiveCommand::Ability(ability)) = self.live.get_mut(&id) {
                ability.deactivate(ctx);
            }
            self.history.retain(|entry| *entry != id);
            self.release(id);
        }
        if count > 0 {
            crate::log_info(&format!("CommandManager: deactivated {} abilities", count));
        }
        count
    }

    /// Countdown активных abilities; истёкшие возвращаются в pool
    pub fn update_abilities(&mut self, delta: f32, ctx: &mut CommandContext<'_>) {
        let active = self.active_abilities.clone();
        for id in active {
            let still_active = match self.live.get_mut(&id) {
                Some(LiveCommand::Ability(ability)) => ability.update_ability(delta, ctx),
                _ => false,
            };
            if !still_active {
                self.history.retain(|entry| *entry != id);
                self.release(id);
            }
        }
    }

    /// Убирает команду из учёта. Активная ability остаётся тикать до истечения.
    fn commit(&mut self, id: CommandId) {
        self.named.retain(|_, entry| *entry != id);
        if self.live.get(&id).is_some_and(LiveCommand::is_active_ability) {
            return;
        }
        self.release(id);
    }

    /// Самая старая запись history нужного вида (не активная ability)
    fn commit_oldest(&mut self, family: Family) -> bool {
        let candidate = self.history.iter().position(|id| {
            self.live
                .get(id)
                .is_some_and(|command| command.family() == family && !command.is_active_ability())
        });
        match candidate {
            Some(index) => {
                let id = self.history.remove(index);
                self.commit(id);
                true
            }
            None => false,
        }
    }

    fn release(&mut self, id: CommandId) {
        self.active_abilities.retain(|entry| *entry != id);
        self.named.retain(|_, entry| *entry != id);
        match self.live.remove(&id) {
            Some(LiveCommand::Movement(command)) => self.movement_pool.give_back(command),
            Some(LiveCommand::Interaction(command)) => self.interaction_pool.give_back(command),
            Some(LiveCommand::Ability(command)) => self.ability_pool.give_back(command),
            None => {}
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn active_abilities(&self) -> Vec<&AbilityCommand> {
        self.active_abilities
            .iter()
            .filter_map(|id| match self.live.get(id) {
                Some(LiveCommand::Ability(ability)) => Some(ability),
                _ => None,
            })
            .collect()
    }

    pub fn is_ability_active(&self, kind: AbilityKind) -> bool {
        self.active_abilities().iter().any(|ability| ability.kind() == Some(kind))
    }

    pub fn has_named(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    pub fn named_command(&self, name: &str) -> Option<CommandId> {
        self.named.get(name).copied()
    }

    pub fn last_command(&self) -> Option<CommandId> {
        self.last_command
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub fn statistics(&self) -> CommandStatistics {
        let in_use = self.movement_pool.in_use() + self.interaction_pool.in_use() + self.ability_pool.in_use();
        let issued = self.movement_pool.statistics().total_gets
            + self.interaction_pool.statistics().total_gets
            + self.ability_pool.statistics().total_gets;

        CommandStatistics {
            executed: self.executed,
            undone: self.undone,
            failed: self.failed,
            active_abilities: self.active_abilities.len(),
            history_count: self.history.len(),
            last_execution_time: self.last_execution_time,
            pool_utilization: if issued == 0 { 0.0 } else { in_use as f32 / issued as f32 },
        }
    }
}
