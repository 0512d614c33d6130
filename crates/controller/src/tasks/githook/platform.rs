//! Seams between the reconciler and the systems it drives
//!
//! Each trait has a Kubernetes- or HTTP-backed implementation used by the
//! running controller; tests substitute in-memory fakes.

use crate::crds::{GitHook, KnativeService, SecretKeyRef};
use crate::tasks::types::Result;
use async_trait::async_trait;
use scm::{GitProvider, HookOptions, ScmResult, Webhook};
use std::time::Duration;

/// Read and write `GitHook` resources
#[async_trait]
pub trait GitHookStore: Send + Sync {
    /// `None` when the resource no longer exists
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<GitHook>>;

    /// Write back status and finalizers
    async fn persist(&self, githook: &GitHook) -> Result<()>;
}

/// Resolve individual secret values
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, namespace: &str, key_ref: &SecretKeyRef) -> Result<String>;
}

/// Knative Services backing the receivers
#[async_trait]
pub trait ReceiverPlatform: Send + Sync {
    async fn list(&self, namespace: &str) -> Result<Vec<KnativeService>>;

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<KnativeService>>;

    async fn create(&self, namespace: &str, service: &KnativeService) -> Result<KnativeService>;

    async fn replace(&self, namespace: &str, service: &KnativeService) -> Result<KnativeService>;
}

/// Build the provider facade for one pass
pub trait WebhookClientFactory: Send + Sync {
    fn build(&self, provider: GitProvider, options: &HookOptions) -> ScmResult<Webhook>;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Builds the REST client matching the declared provider
#[derive(Debug, Clone)]
pub struct ScmWebhookFactory {
    request_timeout: Duration,
}

impl ScmWebhookFactory {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl WebhookClientFactory for ScmWebhookFactory {
    fn build(&self, provider: GitProvider, options: &HookOptions) -> ScmResult<Webhook> {
        Webhook::for_provider(provider, options, self.request_timeout)
    }
}
