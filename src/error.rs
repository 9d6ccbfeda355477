use thiserror::Error;

/// Rejected repository identifier. Raised before anything touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please use the format: owner/repo (got '{0}')")]
    MissingSeparator(String),

    #[error("Repository '{0}' must contain exactly one '/'")]
    TooManySeparators(String),

    #[error("Repository '{0}' has an empty owner or name")]
    EmptyPart(String),

    #[error("Repository '{0}' is already being watched")]
    Duplicate(String),
}

/// Failure while producing a snapshot for one repository.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Rate limit exceeded (60/hr). Try again later.")]
    RateLimited { message: String },

    #[error("{message}")]
    Service {
        message: String,
        status: Option<u16>,
    },
}

impl FetchError {
    /// Classify a service failure. A 403 status or a message mentioning
    /// "rate limit" (any case) becomes `RateLimited`.
    pub fn from_service(message: impl Into<String>, status: Option<u16>) -> Self {
        let message = message.into();
        if status == Some(403) || is_rate_limit_message(&message) {
            FetchError::RateLimited { message }
        } else {
            FetchError::Service { message, status }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }

    /// The message as received from the service, before any friendly rewording.
    pub fn raw_message(&self) -> &str {
        match self {
            FetchError::RateLimited { message } => message,
            FetchError::Service { message, .. } => message,
        }
    }
}

fn is_rate_limit_message(message: &str) -> bool {
    message.to_lowercase().contains("rate limit") || message.contains("403")
}
