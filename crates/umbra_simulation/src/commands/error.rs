use thiserror::Error;

/// Почему команда не выполнилась / не откатилась.
///
/// Наружу из CommandManager не выходит: логируется и превращается в bool.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("required service unavailable: {0}")]
    ServiceUnavailable(&'static str),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("concealment zone is full")]
    CapacityExceeded,
    #[error("command cannot be undone")]
    UndoUnsupported,
    #[error("{0} pool exhausted")]
    PoolExhausted(&'static str),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("stealth requirements not met")]
    StealthRequirementsNotMet,
    #[error("command already executed")]
    AlreadyExecuted,
    #[error("command not initialized")]
    NotInitialized,
}
