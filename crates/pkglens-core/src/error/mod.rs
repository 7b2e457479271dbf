//! Error types and result aliases for pkglens operations.
//!
//! A single error type covers the whole lookup path. It is `Clone` so that one
//! failed origin fetch can be handed to every caller that was coalesced onto it.

use std::sync::Arc;

use thiserror::Error;

/// Boxed source error shared between clones of an [`Error`].
pub type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

/// Unified error type for all pkglens operations
#[derive(Error, Debug, Clone)]
pub enum Error {
    // Input errors
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    // Origin errors
    #[error("'{resource}' does not exist upstream")]
    NotFound { resource: String },

    #[error("Origin unavailable: {message}")]
    OriginUnavailable {
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    // Cache errors
    #[error("Cache unavailable: {message}")]
    CacheUnavailable {
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    #[error("Malformed cache entry: {message}")]
    Codec { message: String },

    // Config errors
    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    #[error("Failed to parse {path}: {message}")]
    ConfigParse { path: String, message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Result type alias for pkglens operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an origin error from any error type
    pub fn origin<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::OriginUnavailable {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Create a cache error from any error type
    pub fn cache<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::CacheUnavailable {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the upstream reported that the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this error is recoverable by trying again later
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::OriginUnavailable { .. } | Error::CacheUnavailable { .. } | Error::Io { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::NotFound { .. } => Some("Check the package name spelling"),
            Error::OriginUnavailable { .. } => {
                Some("The upstream service may be down, try again in a moment")
            },
            Error::CacheUnavailable { .. } => Some("Check that the Redis URL is reachable"),
            Error::ConfigValidation { .. } | Error::ConfigParse { .. } => {
                Some("Run 'pkglens check' to validate pkglens.toml")
            },
            Error::InvalidInput { .. } => Some("Identifying parameters must not be empty"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = Error::origin("registry request failed", io);

        assert!(std::error::Error::source(&err).is_some());
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "Origin unavailable: registry request failed");
    }

    #[test]
    fn test_clone_shares_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = Error::cache("GET failed", io);
        let cloned = err.clone();

        match (err, cloned) {
            (
                Error::CacheUnavailable { source: Some(a), .. },
                Error::CacheUnavailable { source: Some(b), .. },
            ) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("Expected CacheUnavailable with source"),
        }
    }

    #[test]
    fn test_not_found_is_not_recoverable() {
        let err = Error::NotFound {
            resource: "left-pad".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_recoverable());
        assert!(err.suggestion().is_some());
    }
}
