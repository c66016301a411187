use crate::engine::protocol::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{context}: {code}")]
    Rejected { code: ErrorCode, context: String },

    #[error("{code} [{name}={value}]")]
    Option {
        name: String,
        value: String,
        code: ErrorCode,
    },

    #[error("failed to start engine: {0}")]
    Spawn(std::io::Error),

    #[error("engine connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed engine message: {0}")]
    Protocol(String),

    #[error("subscriptions can only be registered before the engine starts")]
    SubscriptionsFrozen,

    #[error("engine is not running")]
    NotRunning,
}

impl EngineError {
    pub fn rejected(code: ErrorCode, context: impl Into<String>) -> Self {
        EngineError::Rejected {
            code,
            context: context.into(),
        }
    }

    /// The engine status code carried by this error, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            EngineError::Rejected { code, .. } | EngineError::Option { code, .. } => Some(*code),
            EngineError::NotRunning => Some(ErrorCode::Uninitialized),
            _ => None,
        }
    }

    /// Negative integer status, as reported by the engine protocol.
    pub fn status(&self) -> i32 {
        self.code().map(ErrorCode::as_raw).unwrap_or(ErrorCode::Generic.as_raw())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
