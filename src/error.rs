use thiserror::Error;

/// Main error type for the log report pipeline
#[derive(Debug, Error)]
pub enum ReportError {
    // Log source errors
    #[error("Log source unavailable: {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    // Rendering errors
    #[error("Failed to render report {0}: {1}")]
    RenderFailure(String, String),

    #[error("Failed to write report file: {0}")]
    OutputError(String),

    // Mail delivery errors
    #[error("Failed to send report mail: {0}")]
    TransportFailure(String),

    #[error("Invalid mail address {0}: {1}")]
    InvalidAddress(String, String),

    #[error("Failed to build report mail: {0}")]
    MessageError(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Scheduling errors
    #[error("Invalid schedule expression '{0}': {1}")]
    InvalidSchedule(String, String),

    #[error("Scheduler already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("Signal error: {0}")]
    SignalError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// True for errors raised while loading or validating configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ReportError::ConfigError(_)
                | ReportError::InvalidConfig(_)
                | ReportError::MissingConfigField(_)
                | ReportError::ConfigValidationError(_)
                | ReportError::InvalidSchedule(_, _)
                | ReportError::InvalidAddress(_, _)
        )
    }
}

/// Result type alias for report operations
pub type Result<T> = std::result::Result<T, ReportError>;
