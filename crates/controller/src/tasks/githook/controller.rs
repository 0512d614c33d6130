use super::hook::{build_hook_options, sync_webhook, webhook_url};
use super::platform::{GitHookStore, ReceiverPlatform, SecretStore, Sleeper, WebhookClientFactory};
use super::receiver;
use crate::crds::{GitHook, GitHookStatus};
use crate::tasks::config::ControllerConfig;
use crate::tasks::types::{Error, Result, FINALIZER_NAME};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use scm::{GitProvider, HookOptions};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub const PHASE_READY: &str = "Ready";
pub const PHASE_PENDING: &str = "Pending";
pub const PHASE_FAILED: &str = "Failed";
pub const PHASE_DELETING: &str = "Deleting";

/// Drives one `GitHook` through a full reconcile pass
pub struct GitHookReconciler {
    githooks: Arc<dyn GitHookStore>,
    secrets: Arc<dyn SecretStore>,
    receivers: Arc<dyn ReceiverPlatform>,
    webhooks: Arc<dyn WebhookClientFactory>,
    sleeper: Arc<dyn Sleeper>,
    config: Arc<ControllerConfig>,
}

impl GitHookReconciler {
    pub fn new(
        githooks: Arc<dyn GitHookStore>,
        secrets: Arc<dyn SecretStore>,
        receivers: Arc<dyn ReceiverPlatform>,
        webhooks: Arc<dyn WebhookClientFactory>,
        sleeper: Arc<dyn Sleeper>,
        config: Arc<ControllerConfig>,
    ) -> Self {
        Self {
            githooks,
            secrets,
            receivers,
            webhooks,
            sleeper,
            config,
        }
    }

    /// Reconcile the `GitHook` identified by `namespace`/`name`.
    ///
    /// Status and finalizers are written back after every pass, including
    /// failed ones, so progress made before the failure is kept.
    #[instrument(skip(self), fields(githook = %name, namespace = %namespace))]
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<Action> {
        let Some(mut githook) = self.githooks.get(namespace, name).await? else {
            debug!("GitHook {}/{} not found, nothing to do", namespace, name);
            return Ok(Action::await_change());
        };

        let previous = githook.status.clone().unwrap_or_default();
        let deleting = githook.metadata.deletion_timestamp.is_some();

        let outcome = if !deleting {
            self.converge(&mut githook).await
        } else if has_finalizer(&githook) {
            self.teardown(&mut githook).await
        } else {
            Ok(())
        };

        record_outcome(&mut githook, &previous, deleting, outcome.as_ref().err());

        if let Err(persist_err) = self.githooks.persist(&githook).await {
            return match outcome {
                Ok(()) => Err(persist_err),
                Err(e) => {
                    error!("Failed to persist GitHook {} status: {}", name, persist_err);
                    Err(e)
                }
            };
        }

        outcome?;
        Ok(Action::requeue(self.config.reconcile.resync()))
    }

    async fn converge(&self, githook: &mut GitHook) -> Result<()> {
        let namespace = githook.namespace().ok_or(Error::MissingObjectKey)?;

        // 1. receiver
        let service = receiver::ensure(self.receivers.as_ref(), githook, &self.config).await?;
        let service_name = service.name_any();
        status_mut(githook).receiver_name = Some(service_name.clone());

        // 2. readiness
        let service = receiver::wait_until_ready(
            self.receivers.as_ref(),
            self.sleeper.as_ref(),
            &self.config,
            &namespace,
            &service_name,
        )
        .await?;

        // 3. callback URL
        let reported = service
            .status
            .as_ref()
            .and_then(|s| s.reported_address())
            .ok_or_else(|| Error::ReceiverNotReady(service_name.clone()))?;
        let callback_url = webhook_url(reported, githook.spec.ssl_verify);

        // 4. secrets and options
        let options = self.hook_options(githook, &namespace, callback_url.clone()).await?;

        // 5. provider dispatch
        let provider: GitProvider = githook.spec.git_provider.parse()?;
        let webhook = self.webhooks.build(provider, &options)?;
        let (id, action) = sync_webhook(&webhook, &options).await?;
        debug!("Webhook dispatch for {}: {:?}", githook.name_any(), action);

        // 6. record
        let status = status_mut(githook);
        status.id = Some(id);
        status.webhook_url = Some(callback_url);
        add_finalizer(githook);

        Ok(())
    }

    /// Remove the remote webhook and release the finalizer.
    ///
    /// Configuration errors can never clear on their own, so they release
    /// the finalizer too; anything else keeps it for a retry.
    async fn teardown(&self, githook: &mut GitHook) -> Result<()> {
        match self.delete_webhook(githook).await {
            Ok(()) => {
                info!("Webhook for GitHook {} removed", githook.name_any());
            }
            Err(e) if e.is_config_error() => {
                warn!(
                    "Cannot remove webhook for GitHook {}, releasing finalizer: {}",
                    githook.name_any(),
                    e
                );
            }
            Err(e) => return Err(e),
        }

        remove_finalizer(githook);
        Ok(())
    }

    async fn delete_webhook(&self, githook: &GitHook) -> Result<()> {
        if githook.hook_id().is_none() {
            debug!("GitHook {} never registered a webhook", githook.name_any());
            return Ok(());
        }

        let namespace = githook.namespace().ok_or(Error::MissingObjectKey)?;
        let callback_url = githook
            .status
            .as_ref()
            .and_then(|s| s.webhook_url.clone())
            .unwrap_or_default();
        let options = self.hook_options(githook, &namespace, callback_url).await?;

        let provider: GitProvider = githook.spec.git_provider.parse()?;
        let webhook = self.webhooks.build(provider, &options)?;
        webhook.delete(&options).await?;
        Ok(())
    }

    async fn hook_options(
        &self,
        githook: &GitHook,
        namespace: &str,
        callback_url: String,
    ) -> Result<HookOptions> {
        let access_token = self
            .secrets
            .get(namespace, &githook.spec.access_token.secret_key_ref)
            .await?;
        let secret_token = self
            .secrets
            .get(namespace, &githook.spec.secret_token.secret_key_ref)
            .await?;
        build_hook_options(githook, access_token, secret_token, callback_url)
    }
}

fn status_mut(githook: &mut GitHook) -> &mut GitHookStatus {
    githook.status.get_or_insert_with(GitHookStatus::default)
}

fn has_finalizer(githook: &GitHook) -> bool {
    githook.finalizers().iter().any(|f| f == FINALIZER_NAME)
}

fn add_finalizer(githook: &mut GitHook) {
    if !has_finalizer(githook) {
        githook.finalizers_mut().push(FINALIZER_NAME.to_string());
    }
}

fn remove_finalizer(githook: &mut GitHook) {
    githook.finalizers_mut().retain(|f| f != FINALIZER_NAME);
}

/// Set phase and message for the pass; `lastUpdate` only moves when the
/// observable status changed, so a converged resource is written unchanged
fn record_outcome(
    githook: &mut GitHook,
    previous: &GitHookStatus,
    deleting: bool,
    error: Option<&Error>,
) {
    let status = status_mut(githook);

    let (phase, message) = match error {
        None if deleting => (PHASE_DELETING, "Webhook removed".to_string()),
        None => (
            PHASE_READY,
            format!(
                "Webhook {} delivers to {}",
                status.id.as_deref().unwrap_or_default(),
                status.webhook_url.as_deref().unwrap_or_default()
            ),
        ),
        Some(e) if e.is_config_error() => (PHASE_FAILED, e.to_string()),
        Some(e) => (PHASE_PENDING, e.to_string()),
    };
    status.phase = phase.to_string();
    status.message = Some(message);
    status.last_update.clone_from(&previous.last_update);

    if *status != *previous {
        status.last_update = Some(chrono::Utc::now().to_rfc3339());
    }
}
