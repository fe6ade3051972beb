//! Dispatcher error types

use contracts::ContractError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// No strategy registered under the receiver name (reject policy only)
    #[error("no emission strategy registered for receiver '{receiver}'")]
    UnknownReceiver { receiver: String },

    /// Strategy returned an error (from contract)
    #[error("emission error: {0}")]
    Emission(#[from] ContractError),

    /// Strategy task panicked or was cancelled
    #[error("emission task for receiver '{receiver}' failed: {message}")]
    TaskFailed { receiver: String, message: String },

    /// More than one error collected
    #[error("{} emission errors: {}", .0.len(), join_messages(.0))]
    Multiple(Vec<DispatcherError>),
}

impl DispatcherError {
    /// Create an unknown receiver error
    pub fn unknown_receiver(receiver: impl Into<String>) -> Self {
        Self::UnknownReceiver {
            receiver: receiver.into(),
        }
    }

    /// Create a task failure error
    pub fn task_failed(receiver: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskFailed {
            receiver: receiver.into(),
            message: message.into(),
        }
    }

    /// Flatten into the individual errors
    pub fn into_errors(self) -> Vec<DispatcherError> {
        match self {
            Self::Multiple(errors) => errors.into_iter().flat_map(Self::into_errors).collect(),
            other => vec![other],
        }
    }
}

fn join_messages(errors: &[DispatcherError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_display() {
        let err = DispatcherError::Multiple(vec![
            DispatcherError::unknown_receiver("statd"),
            DispatcherError::task_failed("statsd", "panicked"),
        ]);
        let shown = err.to_string();
        assert!(shown.starts_with("2 emission errors: "));
        assert!(shown.contains("'statd'"));
        assert!(shown.contains("; "));
    }

    #[test]
    fn test_into_errors_flattens() {
        let nested = DispatcherError::Multiple(vec![
            DispatcherError::unknown_receiver("a"),
            DispatcherError::Multiple(vec![
                DispatcherError::unknown_receiver("b"),
                DispatcherError::unknown_receiver("c"),
            ]),
        ]);
        assert_eq!(nested.into_errors().len(), 3);
    }
}
