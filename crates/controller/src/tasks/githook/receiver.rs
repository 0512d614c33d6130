//! Receiver Service reconciliation
//!
//! Each `GitHook` owns exactly one Knative Service running the receive
//! adapter. The service is found again through its controller owner
//! reference, never by name, since it is created with `generateName`.

use super::platform::{ReceiverPlatform, Sleeper};
use crate::crds::{GitHook, KnativeService, KnativeServiceSpec, RevisionSpec, RevisionTemplateSpec};
use crate::tasks::config::ControllerConfig;
use crate::tasks::types::{Error, Result, OWNER_KIND, RECEIVER_LABEL};
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

/// Receivers in one namespace keyed by the name of their controlling `GitHook`
#[derive(Debug, Default)]
pub struct OwnerIndex {
    by_owner: HashMap<String, KnativeService>,
}

impl OwnerIndex {
    /// Index `services` in listing order; the first service per owner wins
    pub fn build(services: impl IntoIterator<Item = KnativeService>) -> Self {
        let mut by_owner = HashMap::new();
        for service in services {
            let Some(owner) = controller_owner(&service) else {
                continue;
            };
            let owner = owner.name.clone();
            if by_owner.contains_key(&owner) {
                warn!(
                    "GitHook {} controls more than one receiver, ignoring {}",
                    owner,
                    service.name_any()
                );
                continue;
            }
            by_owner.insert(owner, service);
        }
        Self { by_owner }
    }

    pub fn take(&mut self, owner: &str) -> Option<KnativeService> {
        self.by_owner.remove(owner)
    }

    pub fn len(&self) -> usize {
        self.by_owner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
    }
}

fn controller_owner(service: &KnativeService) -> Option<&OwnerReference> {
    service
        .owner_references()
        .iter()
        .find(|o| o.controller == Some(true) && o.kind == OWNER_KIND)
}

fn owner_reference(githook: &GitHook) -> Result<OwnerReference> {
    let uid = githook.metadata.uid.clone().ok_or(Error::MissingObjectKey)?;
    Ok(OwnerReference {
        api_version: GitHook::api_version(&()).to_string(),
        kind: GitHook::kind(&()).to_string(),
        name: githook.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Desired receiver for `githook`; pure apart from serializing the run spec
pub fn desired_receiver(githook: &GitHook, config: &ControllerConfig) -> Result<KnativeService> {
    let name = githook.name_any();
    let namespace = githook.namespace().ok_or(Error::MissingObjectKey)?;
    let spec = &githook.spec;
    let run_spec_json = serde_json::to_string(&spec.run_spec)?;

    let container: Container = serde_json::from_value(json!({
        "image": config.receiver.image.reference(),
        "args": [
            format!("--gitprovider={}", spec.git_provider),
            format!("--namespace={namespace}"),
            format!("--name={name}"),
            format!("--runSpecJSON={run_spec_json}"),
        ],
        "env": [{
            "name": config.receiver.secret_env_var,
            "valueFrom": {
                "secretKeyRef": {
                    "name": spec.secret_token.secret_key_ref.name,
                    "key": spec.secret_token.secret_key_ref.key,
                }
            }
        }]
    }))?;

    let service_account = spec
        .service_account_name
        .clone()
        .filter(|sa| !sa.is_empty())
        .unwrap_or_else(|| config.receiver.service_account_name.clone());

    let mut labels = BTreeMap::new();
    labels.insert(RECEIVER_LABEL.to_string(), name.clone());

    let mut service = KnativeService::new(
        "",
        KnativeServiceSpec {
            template: RevisionTemplateSpec {
                metadata: None,
                spec: RevisionSpec {
                    service_account_name: Some(service_account),
                    containers: vec![container],
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        },
    );
    service.metadata = ObjectMeta {
        generate_name: Some(format!("{name}-webhook-")),
        namespace: Some(namespace),
        labels: Some(labels),
        owner_references: Some(vec![owner_reference(githook)?]),
        ..ObjectMeta::default()
    };

    Ok(service)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Every field `desired` sets is matched by `live`. Fields only `live` carries
/// are ignored, and empty counts the same as absent.
fn is_semantic_subset(desired: &Value, live: &Value) -> bool {
    if is_empty_value(desired) {
        return true;
    }

    match (desired, live) {
        (Value::Object(want), Value::Object(have)) => want.iter().all(|(key, value)| {
            have.get(key)
                .map_or_else(|| is_empty_value(value), |live| is_semantic_subset(value, live))
        }),
        (Value::Array(want), Value::Array(have)) => {
            want.len() == have.len()
                && want
                    .iter()
                    .zip(have)
                    .all(|(value, live)| is_semantic_subset(value, live))
        }
        _ => desired == live,
    }
}

/// True when the live pod template no longer satisfies the desired one
pub fn pod_template_drifted(desired: &RevisionTemplateSpec, live: &RevisionTemplateSpec) -> bool {
    let (Ok(desired), Ok(live)) = (serde_json::to_value(desired), serde_json::to_value(live)) else {
        return true;
    };
    !is_semantic_subset(&desired, &live)
}

/// Copy the managed pod fields of `desired` onto `live`, leaving everything
/// else on the live service untouched
fn apply_pod_template(live: &mut KnativeService, desired: KnativeService) {
    let managed = desired.spec.template.spec;
    let pod = &mut live.spec.template.spec;
    pod.containers = managed.containers;
    pod.service_account_name = managed.service_account_name;
}

/// Create the receiver, or update its pod template in place when it drifted
#[instrument(skip_all, fields(githook = %githook.name_any()))]
pub async fn ensure(
    platform: &dyn ReceiverPlatform,
    githook: &GitHook,
    config: &ControllerConfig,
) -> Result<KnativeService> {
    let namespace = githook.namespace().ok_or(Error::MissingObjectKey)?;
    let desired = desired_receiver(githook, config)?;

    let mut index = OwnerIndex::build(platform.list(&namespace).await?);
    let Some(mut live) = index.take(&githook.name_any()) else {
        let created = platform.create(&namespace, &desired).await?;
        info!("Created receiver {} for GitHook {}", created.name_any(), githook.name_any());
        return Ok(created);
    };

    if !pod_template_drifted(&desired.spec.template, &live.spec.template) {
        debug!("Receiver {} is up to date", live.name_any());
        return Ok(live);
    }

    apply_pod_template(&mut live, desired);
    let updated = platform.replace(&namespace, &live).await?;
    info!("Updated receiver {} pod template", updated.name_any());
    Ok(updated)
}

/// Poll until the receiver routes are ready, re-fetching on every attempt
#[instrument(skip(platform, sleeper, config), fields(receiver = %name))]
pub async fn wait_until_ready(
    platform: &dyn ReceiverPlatform,
    sleeper: &dyn Sleeper,
    config: &ControllerConfig,
    namespace: &str,
    name: &str,
) -> Result<KnativeService> {
    let attempts = config.readiness.attempts;

    for attempt in 1..=attempts {
        if let Some(service) = platform.get(namespace, name).await? {
            if service.routes_ready() {
                debug!("Receiver {} ready after {} attempt(s)", name, attempt);
                return Ok(service);
            }
        }

        if attempt < attempts {
            sleeper.sleep(config.readiness.interval()).await;
        }
    }

    Err(Error::ReceiverNotReady(name.to_string()))
}
