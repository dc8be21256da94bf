use crate::ConfigError;

/// Connection settings shared by every client binary.
///
/// Binaries build this from command-line flags or a stored context, then
/// hand it to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://localhost:8080`. API paths are appended.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Bearer token sent with every request, if any.
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            token: None,
        }
    }
}

impl ClientConfig {
    /// Parse configuration from command-line arguments.
    ///
    /// Supported flags:
    /// - `--base-url=URL`
    /// - `--timeout=SECS`
    /// - `--token=TOKEN`
    ///
    /// Unknown flags and unparsable timeouts are ignored.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = ClientConfig::default();

        for arg in args {
            if let Some(val) = arg.strip_prefix("--base-url=") {
                config.base_url = val.to_string();
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                if let Ok(secs) = val.parse() {
                    config.timeout_secs = secs;
                }
            } else if let Some(val) = arg.strip_prefix("--token=") {
                config.token = (!val.is_empty()).then(|| val.to_string());
            }
        }

        config
    }

    /// Base URL without a trailing slash.
    pub fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Check the settings are usable before any request is issued.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.origin();
        let has_host = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"))
            .is_some_and(|rest| !rest.is_empty());
        if !has_host {
            return Err(ConfigError::BaseUrl(self.base_url.clone()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Timeout(self.timeout_secs));
        }
        Ok(())
    }
}
