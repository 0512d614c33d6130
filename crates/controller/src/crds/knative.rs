//! Knative `serving.knative.dev/v1` Service, the subset the receiver needs
//!
//! The CRD is owned by Knative, so no schema is generated here.

use k8s_openapi::api::core::v1::Container;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Condition type signalling the service's routes are programmed
pub const ROUTES_READY: &str = "RoutesReady";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "serving.knative.dev",
    version = "v1",
    kind = "Service",
    root = "KnativeService",
    namespaced,
    status = "KnativeServiceStatus",
    schema = "disabled"
)]
pub struct KnativeServiceSpec {
    #[serde(default)]
    pub template: RevisionTemplateSpec,

    /// Fields managed by Knative or the user (traffic, ...), kept on replace
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct RevisionTemplateSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
    #[serde(default)]
    pub spec: RevisionSpec,

    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_concurrency: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,

    /// Remaining pod spec fields (volumes, imagePullSecrets, ...)
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct KnativeCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Addressable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct KnativeServiceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<KnativeCondition>>,

    /// Externally reachable URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Cluster-internal address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Addressable>,

    /// Bare domain reported by older Knative releases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl KnativeServiceStatus {
    fn condition(&self, type_: &str) -> Option<&KnativeCondition> {
        self.conditions
            .as_deref()
            .and_then(|conds| conds.iter().find(|c| c.type_ == type_))
    }

    /// `RoutesReady` is `True` and an address to deliver to has been assigned
    pub fn routes_ready(&self) -> bool {
        let routes = self
            .condition(ROUTES_READY)
            .is_some_and(|c| c.status == "True");
        routes && self.reported_address().is_some()
    }

    /// Address the provider should deliver to: the legacy domain when set,
    /// otherwise the service URL
    pub fn reported_address(&self) -> Option<&str> {
        self.domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .or_else(|| self.url.as_deref().filter(|u| !u.is_empty()))
    }
}

impl KnativeService {
    pub fn routes_ready(&self) -> bool {
        self.status.as_ref().is_some_and(KnativeServiceStatus::routes_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(value: serde_json::Value) -> KnativeServiceStatus {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn ready_requires_condition_and_address() {
        let ready = status(json!({
            "conditions": [{ "type": "RoutesReady", "status": "True" }],
            "address": { "url": "http://app-webhook-x.default.svc.cluster.local" },
            "url": "http://app-webhook-x.default.example.com"
        }));
        assert!(ready.routes_ready());

        let legacy = status(json!({
            "conditions": [{ "type": "RoutesReady", "status": "True" }],
            "domain": "app-webhook-x.default.example.com"
        }));
        assert!(legacy.routes_ready());

        let no_address = status(json!({
            "conditions": [{ "type": "RoutesReady", "status": "True" }]
        }));
        assert!(!no_address.routes_ready());

        let internal_only = status(json!({
            "conditions": [{ "type": "RoutesReady", "status": "True" }],
            "address": { "url": "http://app-webhook-x.default.svc.cluster.local" }
        }));
        assert!(!internal_only.routes_ready());
        assert!(internal_only.reported_address().is_none());

        let not_routed = status(json!({
            "conditions": [{ "type": "RoutesReady", "status": "Unknown" }],
            "address": { "url": "http://app.default.svc.cluster.local" }
        }));
        assert!(!not_routed.routes_ready());
    }

    #[test]
    fn legacy_domain_takes_precedence() {
        let legacy = status(json!({
            "domain": "app.default.example.com",
            "url": "http://app.default.example.com"
        }));
        assert_eq!(legacy.reported_address(), Some("app.default.example.com"));

        let modern = status(json!({ "domain": "", "url": "http://app.default.example.com" }));
        assert_eq!(modern.reported_address(), Some("http://app.default.example.com"));
    }

    #[test]
    fn unmodelled_fields_survive_a_round_trip() {
        let raw = json!({
            "template": {
                "metadata": { "annotations": { "autoscaling.knative.dev/minScale": "1" } },
                "spec": {
                    "containers": [{ "name": "receiver", "image": "receiver:v1" }],
                    "volumes": [{ "name": "certs", "secret": { "secretName": "ca" } }]
                }
            },
            "traffic": [{ "latestRevision": true, "percent": 100 }]
        });

        let spec: KnativeServiceSpec = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(spec.extra["traffic"][0]["percent"], 100);
        assert_eq!(spec.template.spec.extra["volumes"][0]["name"], "certs");
        assert_eq!(serde_json::to_value(&spec).unwrap(), raw);
    }
}
