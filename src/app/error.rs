use crate::domain::models::ActionId;
use thiserror::Error;

/// Configuration defects found while building the grammar. These halt startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("action `{0}` is already registered")]
    DuplicateAction(ActionId),
    #[error("invalid pattern for `{action}`: {reason}")]
    InvalidPattern { action: ActionId, reason: String },
    #[error("parameter `{param}` of `{action}` has no matching slot or schema entry")]
    UnknownParam { action: ActionId, param: String },
    #[error("enum parameter `{param}` of `{action}` declares no values")]
    EmptyEnum { action: ActionId, param: String },
}

/// Everything that can go wrong between a submitted line and a finished action.
/// Always converted to a failed `ActionResult` before it reaches the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty input")]
    EmptyInput,
    #[error("no command matches the input")]
    Unmatched,
    #[error("input matches several commands: {candidates:?}")]
    Ambiguous { candidates: Vec<ActionId> },
    #[error("validation failed: {0}")]
    ValidationFailure(String),
    #[error("not permitted")]
    Unauthorized,
    #[error("action failed: {0}")]
    ActionFault(String),
    #[error("timed out")]
    Timeout,
}

impl CommandError {
    /// Short label used in logs and the state machine.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::Unmatched => "unmatched",
            Self::Ambiguous { .. } => "ambiguous",
            Self::ValidationFailure(_) => "validation_failure",
            Self::Unauthorized => "unauthorized",
            Self::ActionFault(_) => "action_fault",
            Self::Timeout => "timeout",
        }
    }

    /// Rejections happen before anything is dispatched.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::Unmatched | Self::Ambiguous { .. })
    }
}
