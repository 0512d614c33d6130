use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error: {status} - {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("webhook id is required to be updated")]
    MissingHookId,

    #[error("invalid webhook id '{0}'")]
    InvalidHookId(String),

    #[error("git provider '{0}' is not supported")]
    UnsupportedProvider(String),

    #[error("invalid provider base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ScmResult<T> = Result<T, ScmError>;

impl ScmError {
    /// Errors that need a change to the resource rather than a retry
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScmError::UnsupportedProvider(_)
                | ScmError::InvalidHookId(_)
                | ScmError::InvalidBaseUrl(_)
        )
    }

    /// True when the provider answered 404
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScmError::Api { status: 404, .. })
    }
}
