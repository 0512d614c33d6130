//! `GitHook` reconciliation: receiver, readiness, webhook and finalizer

pub mod controller;
pub mod hook;
pub mod kube_platform;
pub mod platform;
pub mod receiver;

pub use controller::GitHookReconciler;
pub use kube_platform::{KubeGitHookStore, KubeReceiverPlatform, KubeSecretStore};
pub use platform::{
    GitHookStore, ReceiverPlatform, ScmWebhookFactory, SecretStore, Sleeper, TokioSleeper,
    WebhookClientFactory,
};
