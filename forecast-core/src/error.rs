//! Error types for the forecast core.

use std::path::PathBuf;

use thiserror::Error;

/// A forecast request that did not produce a usable response.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Malformed forecast payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl FetchError {
    /// Connectivity or timeout, as opposed to the provider rejecting the request.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Message for display. Both failure classes read the same to the user.
    pub fn user_message(&self) -> &'static str {
        "Could not load the forecast"
    }
}

/// Reading or writing the preference file failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Preference file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Failed to decode preferences: {0}")]
    Decode(#[from] toml::de::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let err = FetchError::Provider {
            status: 404,
            body: "city not found".into(),
        };
        assert!(!err.is_network());
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("city not found"));
    }

    #[test]
    fn malformed_and_provider_share_user_message() {
        let malformed = FetchError::from(serde_json::from_str::<u8>("x").unwrap_err());
        let provider = FetchError::Provider {
            status: 500,
            body: String::new(),
        };

        assert_eq!(malformed.user_message(), provider.user_message());
    }

    #[test]
    fn storage_error_mentions_path() {
        let err = StorageError::io(
            "/tmp/prefs.toml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/prefs.toml"));
    }
}
