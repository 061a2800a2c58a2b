use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Langbase API errors
#[derive(Debug, Error)]
pub enum LangbaseError {
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure of a single oracle call.
///
/// Never fatal to an engine invocation: `Unavailable` isolates the affected
/// branch, candidate or evaluator, and `Cancelled` turns into a partial result.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle unavailable: {message}")]
    Unavailable { message: String },

    #[error("Oracle call cancelled")]
    Cancelled,
}

/// Errors surfaced to engine callers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {field} - {reason}")]
    Configuration { field: String, reason: String },
}

impl EngineError {
    pub(crate) fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<LangbaseError> for OracleError {
    fn from(err: LangbaseError) -> Self {
        OracleError::Unavailable {
            message: err.to_string(),
        }
    }
}

impl From<OracleError> for AppError {
    fn from(err: OracleError) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for oracle calls
pub type OracleResult<T> = Result<T, OracleError>;

/// Result type alias for engine entry points
pub type EngineResult<T> = Result<T, EngineError>;
