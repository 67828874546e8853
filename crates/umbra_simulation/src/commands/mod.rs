//! Pooled stealth commands с snapshot / undo.
//!
//! Lifecycle: `Pooled → Initialized → Executed → [Undone] → Reset → Pooled`.

pub mod ability;
pub mod context;
pub mod error;
pub mod interaction;
pub mod manager;
pub mod movement;
pub mod pool;

pub use ability::{AbilityCommand, AbilityKind, AbilityParams};
pub use context::{AgentSnapshot, CommandContext};
pub use error::CommandError;
pub use interaction::{InteractionCommand, InteractionKind, InteractionParams, InteractionTarget};
pub use manager::{CommandManager, CommandStatistics};
pub use movement::{MovementCommand, MovementKind, MovementParams};
pub use pool::{CommandPool, PoolStatistics, Resettable};

/// Общий контракт команд
///
/// - `execute`: `AlreadyExecuted` если уже выполнена; при любой ошибке состояние не меняется
/// - `undo`: только если `can_undo()`; восстанавливает snapshot точно
pub trait StealthCommand: Resettable {
    fn name(&self) -> &'static str;
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError>;
    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError>;
    fn can_undo(&self) -> bool;
    fn is_executed(&self) -> bool;
}
