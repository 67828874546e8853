use bevy::prelude::*;

use crate::commands::{AbilityParams, InteractionKind, InteractionParams, MovementParams};

/// Запрос gameplay/input слоя на stealth-действие
#[derive(Event, Debug, Clone, PartialEq)]
pub enum StealthActionIntent {
    Movement { params: MovementParams, name: Option<String> },
    Interaction { params: InteractionParams, name: Option<String> },
    Ability { params: AbilityParams, name: Option<String> },
    UndoLast,
    UndoNamed(String),
    DeactivateAbilities,
    ClearHistory,
}

impl StealthActionIntent {
    pub fn movement(params: MovementParams) -> Self {
        StealthActionIntent::Movement { params, name: None }
    }

    pub fn interaction(params: InteractionParams) -> Self {
        StealthActionIntent::Interaction { params, name: None }
    }

    pub fn ability(params: AbilityParams) -> Self {
        StealthActionIntent::Ability { params, name: None }
    }

    /// Короткая метка для outcome / логов
    pub fn label(&self) -> String {
        match self {
            StealthActionIntent::Movement { params, .. } => format!("movement:{:?}", params.kind),
            StealthActionIntent::Interaction { params, .. } => format!("interaction:{:?}", params.kind),
            StealthActionIntent::Ability { params, .. } => format!("ability:{:?}", params.kind),
            StealthActionIntent::UndoLast => "undo_last".into(),
            StealthActionIntent::UndoNamed(name) => format!("undo:{}", name),
            StealthActionIntent::DeactivateAbilities => "deactivate_abilities".into(),
            StealthActionIntent::ClearHistory => "clear_history".into(),
        }
    }

    /// Действие могло погасить лампу → light cache надо пересобрать
    pub(crate) fn affects_lighting(&self) -> bool {
        matches!(
            self,
            StealthActionIntent::Interaction { params, .. }
                if matches!(params.kind, InteractionKind::SabotageLight | InteractionKind::OperateSwitch)
        ) || matches!(self, StealthActionIntent::UndoLast | StealthActionIntent::UndoNamed(_))
    }
}

/// Результат обработки intent'а
#[derive(Event, Debug, Clone, PartialEq)]
pub struct StealthActionOutcome {
    pub action: String,
    pub success: bool,
}
