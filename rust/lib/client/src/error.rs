use ucsb_core::ConfigError;
use ucsb_core::error::error_code;

/// Client-side API error.
///
/// `Clone` so a single failed fetch can be handed to every task waiting
/// on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("auth: {0}")]
    Auth(String),

    #[error("decode: {0}")]
    Decode(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// HTTP status of a server rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Server { status: 401, .. } => error_code::UNAUTHENTICATED,
            ApiError::Server { status: 403, .. } => error_code::PERMISSION_DENIED,
            ApiError::Server { status: 404, .. } => error_code::NOT_FOUND,
            ApiError::Server { .. } => error_code::SERVER_REJECTED,
            ApiError::Network(_) => error_code::NETWORK,
            ApiError::Timeout => error_code::TIMEOUT,
            ApiError::Auth(_) => error_code::UNAUTHENTICATED,
            ApiError::Decode(_) => error_code::DECODE,
            ApiError::Config(e) => e.error_code(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}
