//! Uniform entry point over the provider clients

use crate::client::{HookValidation, WebhookClient};
use crate::error::ScmResult;
use crate::github::GithubClient;
use crate::gitlab::GitlabClient;
use crate::gogs::GogsClient;
use crate::options::HookOptions;
use crate::provider::GitProvider;
use std::sync::Arc;
use std::time::Duration;

/// Thin wrapper delegating to the client selected for a provider
#[derive(Clone)]
pub struct Webhook {
    provider: Option<GitProvider>,
    client: Arc<dyn WebhookClient>,
}

impl Webhook {
    /// Build the client for `provider`, authenticated with the options' access token
    pub fn for_provider(
        provider: GitProvider,
        options: &HookOptions,
        timeout: Duration,
    ) -> ScmResult<Self> {
        let token = options.access_token.clone();
        let client: Arc<dyn WebhookClient> = match provider {
            GitProvider::Github => {
                Arc::new(GithubClient::with_timeout(&options.base_url, token, timeout)?)
            }
            GitProvider::Gitlab => {
                Arc::new(GitlabClient::with_timeout(&options.base_url, token, timeout)?)
            }
            GitProvider::Gogs => Arc::new(GogsClient::with_timeout(&options.base_url, token, timeout)?),
        };

        Ok(Self {
            provider: Some(provider),
            client,
        })
    }

    /// Wrap an already constructed client
    pub fn from_client(client: Arc<dyn WebhookClient>) -> Self {
        Self {
            provider: None,
            client,
        }
    }

    #[must_use]
    pub fn provider(&self) -> Option<GitProvider> {
        self.provider
    }

    pub async fn validate(&self, options: &HookOptions) -> ScmResult<HookValidation> {
        self.client.validate(options).await
    }

    pub async fn create(&self, options: &HookOptions) -> ScmResult<String> {
        self.client.create(options).await
    }

    pub async fn update(&self, options: &HookOptions) -> ScmResult<String> {
        self.client.update(options).await
    }

    pub async fn delete(&self, options: &HookOptions) -> ScmResult<()> {
        self.client.delete(options).await
    }
}

impl std::fmt::Debug for Webhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webhook")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}
