//! Kubernetes-backed implementations of the reconciler seams

use super::platform::{GitHookStore, ReceiverPlatform, SecretStore};
use crate::crds::{GitHook, KnativeService, SecretKeyRef};
use crate::tasks::types::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::{debug, instrument};

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

#[derive(Clone)]
pub struct KubeGitHookStore {
    client: Client,
}

impl KubeGitHookStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GitHookStore for KubeGitHookStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<GitHook>> {
        let api: Api<GitHook> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    #[instrument(skip(self, githook), fields(githook = %githook.name_any()))]
    async fn persist(&self, githook: &GitHook) -> Result<()> {
        let namespace = githook.namespace().ok_or(Error::MissingObjectKey)?;
        let name = githook.metadata.name.as_deref().ok_or(Error::MissingObjectKey)?;
        let api: Api<GitHook> = Api::namespaced(self.client.clone(), &namespace);

        // Status first: once the last finalizer is gone the object may vanish
        if let Some(status) = &githook.status {
            let patch = json!({ "status": status });
            match api
                .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await
            {
                Ok(_) => {}
                Err(e) if is_not_found(&e) => {
                    debug!("GitHook {} gone before status update", name);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }

        let finalizers = githook.finalizers().to_vec();
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        match api
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, key_ref: &SecretKeyRef) -> Result<String> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api.get_opt(&key_ref.name).await?.ok_or_else(|| {
            Error::SecretError(format!("secret {namespace}/{} not found", key_ref.name))
        })?;

        secret_value(&secret, namespace, key_ref)
    }
}

/// Value stored under `key_ref.key`, byte for byte
fn secret_value(secret: &Secret, namespace: &str, key_ref: &SecretKeyRef) -> Result<String> {
    let bytes = secret
        .data
        .as_ref()
        .and_then(|data| data.get(&key_ref.key))
        .ok_or_else(|| {
            Error::SecretError(format!(
                "key '{}' missing from secret {namespace}/{}",
                key_ref.key, key_ref.name
            ))
        })?;

    String::from_utf8(bytes.0.clone()).map_err(|e| {
        Error::SecretError(format!(
            "key '{}' of secret {namespace}/{} is not UTF-8: {e}",
            key_ref.key, key_ref.name
        ))
    })
}

#[derive(Clone)]
pub struct KubeReceiverPlatform {
    client: Client,
}

impl KubeReceiverPlatform {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<KnativeService> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ReceiverPlatform for KubeReceiverPlatform {
    async fn list(&self, namespace: &str) -> Result<Vec<KnativeService>> {
        Ok(self.api(namespace).list(&ListParams::default()).await?.items)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<KnativeService>> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn create(&self, namespace: &str, service: &KnativeService) -> Result<KnativeService> {
        Ok(self
            .api(namespace)
            .create(&PostParams::default(), service)
            .await?)
    }

    async fn replace(&self, namespace: &str, service: &KnativeService) -> Result<KnativeService> {
        let name = service.metadata.name.as_deref().ok_or(Error::MissingObjectKey)?;
        Ok(self
            .api(namespace)
            .replace(name, &PostParams::default(), service)
            .await?)
    }
}
