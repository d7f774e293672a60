// src/infra/errors.rs — Error types for storytime

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryError {
    // Provider errors (retriable)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // User errors
    #[error("No API key found. Set {var} in your environment.")]
    NoApiKey { var: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoryError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            StoryError::Provider {
                retriable: true,
                ..
            } | StoryError::RateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_provider_error() {
        let err = StoryError::Provider {
            provider: "openai".into(),
            message: "HTTP 503".into(),
            retriable: true,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn test_rate_limit_is_retriable() {
        let err = StoryError::RateLimited {
            provider: "openai".into(),
            retry_after_ms: 1000,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn test_user_errors_not_retriable() {
        assert!(!StoryError::InvalidInput("empty".into()).is_retriable());
        assert!(!StoryError::NoApiKey {
            var: "OPENAI_API_KEY".into()
        }
        .is_retriable());
    }

    #[test]
    fn test_no_api_key_message_names_variable() {
        let err = StoryError::NoApiKey {
            var: "OPENAI_API_KEY".into(),
        };
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
