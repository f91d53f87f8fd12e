//! Error types for Gati

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Gati error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (parse or validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Threshold pair violates `high > low >= 0`
    #[error("Invalid thresholds: high={high}, low={low} (need high > low >= 0)")]
    InvalidThresholds {
        /// Upper (enter motion) threshold
        high: f64,
        /// Lower (leave motion) threshold
        low: f64,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No sensor on this platform can feed the requested source
    #[error("Sensor not available: {0}")]
    SensorUnavailable(String),

    /// Transition sink reported a failure
    #[error("Sink error: {0}")]
    Sink(String),

    /// Worker thread could not be spawned or joined
    #[error("Thread error: {0}")]
    Thread(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
