//! Tekton `tekton.dev/v1alpha1` PipelineResource and PipelineRun
//!
//! Only the fields the trigger client reads or writes are typed; the rest of
//! a run spec travels through untouched.

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const GIT_RESOURCE_TYPE: &str = "git";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceParam {
    pub name: String,
    pub value: String,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "tekton.dev",
    version = "v1alpha1",
    kind = "PipelineResource",
    namespaced,
    schema = "disabled"
)]
pub struct PipelineResourceSpec {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub params: Vec<ResourceParam>,
}

impl PipelineResourceSpec {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineResourceRef {
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineResourceBinding {
    pub name: String,
    #[serde(rename = "resourceRef")]
    pub resource_ref: PipelineResourceRef,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "tekton.dev",
    version = "v1alpha1",
    kind = "PipelineRun",
    namespaced,
    schema = "disabled"
)]
pub struct PipelineRunSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<PipelineResourceBinding>,

    /// pipelineRef, params, serviceAccount and anything else the template sets
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_spec_keeps_unknown_fields() {
        let template = json!({
            "pipelineRef": { "name": "build" },
            "params": [{ "name": "image", "value": "app" }]
        });
        let spec: PipelineRunSpec = serde_json::from_value(template.clone()).unwrap();
        assert!(spec.resources.is_empty());
        assert_eq!(serde_json::to_value(&spec).unwrap(), template);
    }

    #[test]
    fn run_spec_reads_resource_bindings() {
        let spec: PipelineRunSpec = serde_json::from_value(json!({
            "pipelineRef": { "name": "build" },
            "resources": [{ "name": "source", "resourceRef": { "name": "repo" } }]
        }))
        .unwrap();
        assert_eq!(spec.resources[0].resource_ref.name, "repo");
        assert!(spec.extra.contains_key("pipelineRef"));
        assert!(!spec.extra.contains_key("resources"));
    }
}
