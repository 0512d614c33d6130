//! Capability set shared by every provider client

use crate::error::ScmResult;
use crate::options::HookOptions;
use async_trait::async_trait;

/// Outcome of comparing the remote hook with the desired options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookValidation {
    /// A hook with the recorded id exists on the provider
    pub exists: bool,
    /// The remote URL or event set differs from the desired one
    pub changed: bool,
}

impl HookValidation {
    pub const MISSING: HookValidation = HookValidation {
        exists: false,
        changed: false,
    };

    pub const IN_SYNC: HookValidation = HookValidation {
        exists: true,
        changed: false,
    };

    pub const DRIFTED: HookValidation = HookValidation {
        exists: true,
        changed: true,
    };
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// Look up the recorded hook without mutating remote state
    async fn validate(&self, options: &HookOptions) -> ScmResult<HookValidation>;

    /// Register a new hook and return its id
    async fn create(&self, options: &HookOptions) -> ScmResult<String>;

    /// Edit the recorded hook in place and return its id
    async fn update(&self, options: &HookOptions) -> ScmResult<String>;

    /// Remove the recorded hook; a missing id or missing hook is a no-op
    async fn delete(&self, options: &HookOptions) -> ScmResult<()>;
}
