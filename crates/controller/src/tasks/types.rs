use crate::tasks::config::ControllerConfig;
use crate::tasks::githook::GitHookReconciler;
use std::sync::Arc;

/// Finalizer guarding the remote webhook registration
pub const FINALIZER_NAME: &str = "githook-controller";

/// Owner kind indexed when looking up a `GitHook`'s receiver
pub const OWNER_KIND: &str = "GitHook";

/// Label carrying the owning `GitHook`'s name on its receiver
pub const RECEIVER_LABEL: &str = "receive-adapter";

/// Shared controller context
#[derive(Clone)]
pub struct Context {
    pub config: Arc<ControllerConfig>,
    pub reconciler: Arc<GitHookReconciler>,
}

/// Error types for the controller
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Git provider error: {0}")]
    ScmError(#[from] scm::ScmError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid project URL '{url}': {reason}")]
    InvalidProjectUrl { url: String, reason: String },

    #[error("Secret error: {0}")]
    SecretError(String),

    #[error("Receiver {0} not ready")]
    ReceiverNotReady(String),

    #[error("Pipeline error: {0}")]
    PipelineError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing object key")]
    MissingObjectKey,
}

impl Error {
    /// Errors that cannot clear without a change to the resource or its
    /// referenced secrets
    pub fn is_config_error(&self) -> bool {
        match self {
            Error::ConfigError(_) | Error::InvalidProjectUrl { .. } | Error::SecretError(_) => true,
            Error::ScmError(e) => e.is_config_error(),
            Error::MissingObjectKey => true,
            _ => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
