use crate::crds::{GitHook, KnativeService};
use futures::StreamExt;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn, Instrument};

pub mod config;
pub mod githook;
pub mod pipeline;
pub mod types;

// Re-export commonly used items
pub use config::ControllerConfig;
pub use githook::GitHookReconciler;
pub use types::{Error, Result};

use githook::{
    KubeGitHookStore, KubeReceiverPlatform, KubeSecretStore, ScmWebhookFactory, TokioSleeper,
};
use types::Context;

/// Build the reconciler backed by the Kubernetes API and the provider REST clients
pub fn kube_reconciler(client: &Client, config: Arc<ControllerConfig>) -> GitHookReconciler {
    GitHookReconciler::new(
        Arc::new(KubeGitHookStore::new(client.clone())),
        Arc::new(KubeSecretStore::new(client.clone())),
        Arc::new(KubeReceiverPlatform::new(client.clone())),
        Arc::new(ScmWebhookFactory::new(config.http.request_timeout())),
        Arc::new(TokioSleeper),
        config,
    )
}

/// Main entry point for the GitHook controller
#[instrument(skip(client, config))]
pub async fn run_githook_controller(client: Client, config: Arc<ControllerConfig>) -> Result<()> {
    if let Err(validation_error) = config.validate() {
        error!("Configuration validation failed: {}", validation_error);
        return Err(Error::ConfigError(validation_error.to_string()));
    }

    let (githooks, receivers): (Api<GitHook>, Api<KnativeService>) =
        match config.reconcile.watch_namespace.as_deref() {
            Some(namespace) => {
                info!("Watching GitHooks in namespace {}", namespace);
                (
                    Api::namespaced(client.clone(), namespace),
                    Api::namespaced(client.clone(), namespace),
                )
            }
            None => {
                info!("Watching GitHooks in all namespaces");
                (Api::all(client.clone()), Api::all(client.clone()))
            }
        };

    let context = Arc::new(Context {
        config: config.clone(),
        reconciler: Arc::new(kube_reconciler(&client, config)),
    });
    debug!("Controller context created");

    let watcher_config = Config::default().any_semantic();

    Controller::new(githooks, watcher_config.clone())
        .owns(receivers, watcher_config)
        .shutdown_on_signal()
        .run(reconcile_githook, error_policy, context)
        .for_each(|reconciliation_result| {
            let span = tracing::info_span!("githook_reconciliation_result");
            async move {
                match reconciliation_result {
                    Ok((object, _action)) => {
                        debug!(resource = ?object, "GitHook reconciliation successful");
                    }
                    Err(reconciliation_err) => {
                        warn!(error = ?reconciliation_err, "GitHook reconciliation error");
                    }
                }
            }
            .instrument(span)
        })
        .await;

    info!("GitHook controller shutting down");
    Ok(())
}

async fn reconcile_githook(githook: Arc<GitHook>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = githook.namespace().ok_or(Error::MissingObjectKey)?;
    ctx.reconciler.reconcile(&namespace, &githook.name_any()).await
}

/// Configuration errors wait for the resource to change; everything else is retried
#[instrument(skip(githook, ctx), fields(githook = %githook.name_any()))]
fn error_policy(githook: Arc<GitHook>, err: &Error, ctx: Arc<Context>) -> Action {
    if err.is_config_error() {
        error!(error = %err, "GitHook is misconfigured, waiting for a change");
        return Action::await_change();
    }

    warn!(
        error = %err,
        "GitHook reconciliation failed, retrying in {}s",
        ctx.config.reconcile.requeue_seconds
    );
    Action::requeue(ctx.config.reconcile.requeue())
}
