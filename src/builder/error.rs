//! Errors raised while declaring machines, actions and sub-machines.

use thiserror::Error;

/// A machine, action or sub-machine declaration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("'{0}' is reserved and cannot name an action or sub-machine")]
    ReservedName(String),

    #[error("Names must not be empty")]
    EmptyName,

    #[error("Action name not specified. Call .name(name) before .build()")]
    MissingName,

    #[error("Action '{0}' has no body. Call .sync(..), .sync_fn(..) or .sequence(..)")]
    MissingBody(String),

    #[error("A sub-machine named '{0}' is already attached")]
    DuplicateChild(String),

    #[error("'{0}' names both an action and a sub-machine")]
    NameConflict(String),

    #[error("Machine is already attached as '{0}'")]
    AlreadyAttached(String),

    #[error("Attaching '{0}' would make a machine its own ancestor")]
    Cycle(String),

    #[error("Initial state must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("Invalid machine configuration: {0}")]
    Parse(String),

    #[error("{} configuration errors", .0.len())]
    Multiple(Vec<ConfigurationError>),
}

impl ConfigurationError {
    /// The individual problems, flattening [`ConfigurationError::Multiple`].
    pub fn problems(&self) -> Vec<&ConfigurationError> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.problems()).collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_reports_its_size() {
        let err = ConfigurationError::Multiple(vec![
            ConfigurationError::EmptyName,
            ConfigurationError::ReservedName("log".to_string()),
        ]);
        assert_eq!(err.to_string(), "2 configuration errors");
        assert_eq!(err.problems().len(), 2);
    }

    #[test]
    fn single_error_is_its_own_problem() {
        let err = ConfigurationError::Cycle("up".to_string());
        assert_eq!(err.problems(), vec![&err]);
        assert!(err.to_string().contains("'up'"));
    }
}
