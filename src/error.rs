//! Error types and handling for `PalatePilot`

use thiserror::Error;

/// Main error type for the `PalatePilot` library
#[derive(Error, Debug)]
pub enum PalatePilotError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Geocoding, forecast, search or scrape requests that did not complete
    #[error("Network error: {message}")]
    Network { message: String },

    /// The agent-execution service reported a failed execution
    #[error("Service error: {message}")]
    Service { message: String },

    /// A polling deadline elapsed
    #[error("Timed out: {message}")]
    Timeout { message: String },

    /// Malformed JSON or unexpected response shape
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PalatePilotError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new service error
    pub fn service<S: Into<String>>(message: S) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PalatePilotError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            PalatePilotError::Network { .. } => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            PalatePilotError::Service { message } => {
                format!("The tour service could not complete the request: {message}")
            }
            PalatePilotError::Timeout { .. } => {
                "The tour service took too long to answer. Please try again later.".to_string()
            }
            PalatePilotError::Parse { .. } => {
                "Received an unexpected response from an external service.".to_string()
            }
            PalatePilotError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for PalatePilotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PalatePilotError::timeout(err.to_string())
        } else if err.is_decode() {
            PalatePilotError::parse(err.to_string())
        } else {
            PalatePilotError::network(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for PalatePilotError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            reqwest_middleware::Error::Middleware(err) => PalatePilotError::network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for PalatePilotError {
    fn from(err: serde_json::Error) -> Self {
        PalatePilotError::parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = PalatePilotError::config("missing API key");
        assert!(matches!(config_err, PalatePilotError::Config { .. }));

        let network_err = PalatePilotError::network("connection failed");
        assert!(matches!(network_err, PalatePilotError::Network { .. }));

        let timeout_err = PalatePilotError::timeout("execution exceeded 60s");
        assert!(matches!(timeout_err, PalatePilotError::Timeout { .. }));
    }

    #[test]
    fn test_user_messages() {
        let config_err = PalatePilotError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let network_err = PalatePilotError::network("test");
        assert!(network_err.user_message().contains("Unable to connect"));

        let service_err = PalatePilotError::service("quota exceeded");
        assert!(service_err.user_message().contains("quota exceeded"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PalatePilotError = io_err.into();
        assert!(matches!(err, PalatePilotError::Io { .. }));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let err: PalatePilotError = json_err.into();
        assert!(matches!(err, PalatePilotError::Parse { .. }));
    }
}
