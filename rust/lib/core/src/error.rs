use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Presentation layers match on
// these, never on the human-readable message string.

/// Stable error code constants shared by every client-side failure type.
pub mod error_code {
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const SERVER_REJECTED: &str = "SERVER_REJECTED";
    pub const NETWORK: &str = "NETWORK";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const DECODE: &str = "DECODE";
    pub const INVALID_CONFIG: &str = "INVALID_CONFIG";
}

// ── ConfigError ─────────────────────────────────────────────────────

/// Client configuration is unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Base URL is empty or not an http(s) URL.
    #[error("invalid base url '{0}': expected http:// or https://")]
    BaseUrl(String),

    /// Request timeout must be at least one second.
    #[error("invalid timeout: {0}s")]
    Timeout(u64),
}

impl ConfigError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        error_code::INVALID_CONFIG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::BaseUrl("ftp://x".into()).to_string(),
            "invalid base url 'ftp://x': expected http:// or https://"
        );
        assert_eq!(ConfigError::Timeout(0).to_string(), "invalid timeout: 0s");
        assert_eq!(ConfigError::Timeout(0).error_code(), "INVALID_CONFIG");
    }
}
