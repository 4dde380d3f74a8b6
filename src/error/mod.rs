use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),
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

/// Failures of the text-generation capability during expansion.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Generation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Generation unavailable: {message}")]
    Unavailable { message: String },

    #[error("Generation returned empty content")]
    EmptyContent,

    #[error("Backend error: {0}")]
    Langbase(#[from] LangbaseError),
}

/// Errors raised inside the pure reasoning stages.
///
/// These never cross the controller boundary; they are converted into
/// documented fallbacks and recorded on the outcome.
#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("Invalid input: {field} = {value} ({reason})")]
    InvalidInput {
        field: String,
        value: f64,
        reason: String,
    },
}

impl ReasoningError {
    /// Build an `InvalidInput` error for a value outside [0, 1].
    pub fn out_of_unit_range(field: impl Into<String>, value: f64) -> Self {
        let reason = if value.is_nan() {
            "not a number".to_string()
        } else {
            "outside [0, 1]".to_string()
        };
        ReasoningError::InvalidInput {
            field: field.into(),
            value,
            reason,
        }
    }
}

/// Reject anything that is not a finite value in [0, 1].
pub(crate) fn ensure_unit(field: &str, value: f64) -> ReasoningResult<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ReasoningError::out_of_unit_range(field, value))
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for generation calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias for reasoning stages
pub type ReasoningResult<T> = Result<T, ReasoningError>;
