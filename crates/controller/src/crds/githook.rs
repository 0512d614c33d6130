//! `GitHook` Custom Resource Definition
//!
//! A `GitHook` declares a webhook on a git provider project plus the pipeline
//! run template the receiver instantiates when that webhook fires.

use kube::CustomResource;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to one key of a Secret in the `GitHook`'s namespace
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct SecretKeyRef {
    /// Name of the secret
    pub name: String,
    /// Key within the secret
    pub key: String,
}

/// Value sourced from a secret
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct SecretValueFromSource {
    #[serde(rename = "secretKeyRef")]
    pub secret_key_ref: SecretKeyRef,
}

/// `GitHook` CRD binding a git project webhook to a Tekton pipeline
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(group = "tools.githook.dev", version = "v1alpha1", kind = "GitHook")]
#[kube(namespaced)]
#[kube(status = "GitHookStatus")]
#[kube(printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.gitProvider"}"#)]
#[kube(printcolumn = r#"{"name":"Project","type":"string","jsonPath":".spec.projectUrl"}"#)]
#[kube(printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#)]
#[kube(printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#)]
pub struct GitHookSpec {
    /// Git provider hosting the project: github, gitlab or gogs
    #[serde(rename = "gitProvider")]
    pub git_provider: String,

    /// Project URL, e.g. https://gitlab.example.com/group/app.git
    #[serde(rename = "projectUrl")]
    pub project_url: String,

    /// Events that trigger the webhook
    #[serde(rename = "eventTypes", default)]
    pub event_types: Vec<scm::HookEvent>,

    /// Token used to manage webhooks on the provider
    #[serde(rename = "accessToken")]
    pub access_token: SecretValueFromSource,

    /// Shared secret the provider signs deliveries with
    #[serde(rename = "secretToken")]
    pub secret_token: SecretValueFromSource,

    /// Verify TLS on delivery; also selects an https callback URL
    #[serde(rename = "sslVerify", default)]
    pub ssl_verify: bool,

    /// ServiceAccount for the receiver pods
    #[serde(rename = "serviceAccountName", default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    /// PipelineRun spec template instantiated per delivery
    #[serde(rename = "runSpec", default)]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub run_spec: serde_json::Value,
}

/// Status of the `GitHook`
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct GitHookStatus {
    /// Identifier of the webhook on the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Callback URL last registered with the provider
    #[serde(rename = "webhookUrl", default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Name of the owned receiver service
    #[serde(rename = "receiverName", default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,

    /// Outcome of the last reconcile pass (Ready, Pending, Failed)
    #[serde(default)]
    pub phase: String,

    /// Human-readable message about the current state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Timestamp of the last status change
    #[serde(rename = "lastUpdate", default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
}

fn preserve_unknown_object(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..SchemaObject::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}

impl GitHook {
    /// Hook id recorded in status, `None` when unset or empty
    pub fn hook_id(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::CustomResourceExt;
    use serde_json::json;

    #[test]
    fn deserializes_manifest_spec() {
        let spec: GitHookSpec = serde_json::from_value(json!({
            "gitProvider": "gitlab",
            "projectUrl": "https://gitlab.example.com/group/app.git",
            "eventTypes": ["push", "pull_request"],
            "accessToken": { "secretKeyRef": { "name": "gitlab", "key": "accessToken" } },
            "secretToken": { "secretKeyRef": { "name": "gitlab", "key": "secretToken" } },
            "runSpec": { "pipelineRef": { "name": "build" } }
        }))
        .unwrap();

        assert_eq!(spec.git_provider, "gitlab");
        assert!(!spec.ssl_verify);
        assert_eq!(spec.event_types, vec![scm::HookEvent::Push, scm::HookEvent::PullRequest]);
        assert_eq!(spec.secret_token.secret_key_ref.key, "secretToken");
        assert_eq!(spec.run_spec["pipelineRef"]["name"], "build");
    }

    #[test]
    fn crd_uses_expected_group_and_kind() {
        let crd = GitHook::crd();
        assert_eq!(crd.spec.group, "tools.githook.dev");
        assert_eq!(crd.spec.names.kind, "GitHook");
        assert_eq!(crd.spec.versions[0].name, "v1alpha1");
    }

    #[test]
    fn empty_status_id_counts_as_unset() {
        let spec: GitHookSpec = serde_json::from_value(json!({
            "gitProvider": "github",
            "projectUrl": "https://github.com/acme/app",
            "accessToken": { "secretKeyRef": { "name": "gh", "key": "token" } },
            "secretToken": { "secretKeyRef": { "name": "gh", "key": "secret" } }
        }))
        .unwrap();
        let mut hook = GitHook::new("app", spec);
        assert_eq!(hook.hook_id(), None);

        hook.status = Some(GitHookStatus {
            id: Some(String::new()),
            ..GitHookStatus::default()
        });
        assert_eq!(hook.hook_id(), None);

        hook.status = Some(GitHookStatus {
            id: Some("42".to_string()),
            ..GitHookStatus::default()
        });
        assert_eq!(hook.hook_id(), Some("42"));
    }
}
