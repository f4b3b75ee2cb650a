/// Domain-specific error types for the EV engine.
/// Every variant is terminal for the run that raised it. The numerical
/// conditions are deterministic, so nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("implied volatility error: {0}")]
    ImpliedVolatility(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("aggregation error: {0}")]
    Aggregation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("options chain API error: {status} {body}")]
    ChainApi { status: u16, body: String },

    #[error("io error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<chrono::ParseError> for EngineError {
    fn from(e: chrono::ParseError) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
