//! Error types for scenario-sim.
//!
//! Simulator actions never fail: a rejected action is a guarded no-op and is
//! reported through [`crate::fsm::Transition`]. The errors below only occur at
//! the boundaries, when configuration is loaded or when a renderer sends an
//! intent that cannot be decoded.

use thiserror::Error;

/// Validation errors for configuration and user-supplied names.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Delay '{field}' must be greater than zero")]
    ZeroDelay {
        field: String,
    },

    #[error("Field '{field}' must be greater than zero")]
    ZeroValue {
        field: String,
    },

    #[error("Unknown {kind} '{value}'")]
    UnknownVariant {
        kind: &'static str,
        value: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Errors raised while decoding or delivering an intent.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Malformed intent for {widget}: {message}")]
    MalformedIntent {
        widget: &'static str,
        message: String,
    },

    #[error("Unknown widget: {name}")]
    UnknownWidget {
        name: String,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },
}

/// Top-level error type for scenario-sim.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl SimError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a dispatch error.
    #[must_use]
    pub const fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for scenario-sim operations.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_zero_delay() {
        let err = ValidationError::ZeroDelay {
            field: "csrf_outcome_clear_ms".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("csrf_outcome_clear_ms"));
        assert!(msg.contains("greater than zero"));
    }

    #[test]
    fn test_validation_error_unknown_variant() {
        let err = ValidationError::UnknownVariant {
            kind: "policy",
            value: "Loose".to_string(),
        };
        assert_eq!(format!("{err}"), "Unknown policy 'Loose'");
    }

    #[test]
    fn test_dispatch_error_malformed() {
        let err = DispatchError::MalformedIntent {
            widget: "oauth",
            message: "expected value".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("oauth"));
        assert!(msg.contains("expected value"));
    }

    #[test]
    fn test_sim_error_from_validation() {
        let err: SimError = ValidationError::ZeroValue {
            field: "csrf_attack_amount".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert!(!err.is_dispatch());
    }

    #[test]
    fn test_sim_error_from_dispatch() {
        let err: SimError = DispatchError::UnknownWidget {
            name: "carousel".to_string(),
        }
        .into();
        assert!(err.is_dispatch());
        assert!(format!("{err}").contains("carousel"));
    }

    #[test]
    fn test_sim_error_internal() {
        let err = SimError::internal("worker vanished");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("worker vanished"));
    }
}
