use thiserror::Error;

/// Error taxonomy for the progression core.
///
/// `Validation` and `NotFound` are raised before any mutation; `Conflict` is
/// only surfaced after the engine's retry policy is exhausted; `Fatal` wraps
/// storage failures and always aborts the whole event.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Fatal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    /// Stable machine code for transport layers.
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Fatal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller can recover by correcting and resubmitting.
    pub fn is_operational(&self) -> bool {
        !matches!(self, Self::Fatal(_))
    }
}
