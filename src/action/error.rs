//! Action error types.

use thiserror::Error;

/// Error produced by an action body.
///
/// Bodies return this to reject the invocation; the runner reports it to
/// the caller wrapped in [`ActionError::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionFailure {
    message: String,
}

impl ActionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Capture any error's display text.
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        Self::new(error.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for ActionFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ActionFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for ActionFailure {
    fn from(error: serde_json::Error) -> Self {
        Self::from_error(&error)
    }
}

/// Errors observed by the caller of an action handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("No action named '{0}'")]
    Unknown(String),

    #[error("Action '{action}' failed: {failure}")]
    Failed {
        action: String,
        failure: ActionFailure,
    },

    #[error("Action '{action}' panicked: {message}")]
    Panicked { action: String, message: String },

    #[error("Action '{action}' cannot write '{field}': it mirrors a sub-machine")]
    ReadOnlyField { action: String, field: String },
}

impl ActionError {
    /// Name of the action that failed, if the action exists.
    pub fn action(&self) -> Option<&str> {
        match self {
            Self::Unknown(_) => None,
            Self::Failed { action, .. }
            | Self::Panicked { action, .. }
            | Self::ReadOnlyField { action, .. } => Some(action.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_displays_message() {
        let failure = ActionFailure::from("Intentionally broken");
        assert_eq!(failure.to_string(), "Intentionally broken");
        assert_eq!(failure.message(), "Intentionally broken");
    }

    #[test]
    fn failed_error_names_action() {
        let error = ActionError::Failed {
            action: "start".to_string(),
            failure: ActionFailure::new("boom"),
        };
        assert_eq!(error.to_string(), "Action 'start' failed: boom");
        assert_eq!(error.action(), Some("start"));
        assert_eq!(ActionError::Unknown("x".to_string()).action(), None);
    }

    #[test]
    fn json_errors_convert() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let failure = ActionFailure::from(err);
        assert!(!failure.message().is_empty());
    }
}
