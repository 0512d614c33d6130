//! Pipeline Trigger Client
//!
//! Turns a `GitHook` run spec template plus the details of one delivery into
//! a Tekton PipelineRun. Runs are fire-and-forget: nothing is tracked after
//! creation.

use super::vars::replace_vars;
use crate::crds::{
    PipelineResource, PipelineResourceBinding, PipelineResourceRef, PipelineResourceSpec,
    PipelineRun, PipelineRunSpec, ResourceParam, GIT_RESOURCE_TYPE,
};
use crate::tasks::types::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Binding name the git source is injected under
pub const GIT_SOURCE_BINDING: &str = "git-source";

/// Everything needed to start one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub namespace: String,
    /// Name prefix for generated objects, usually the `GitHook` name
    pub prefix: String,
    pub git_url: String,
    pub git_revision: String,
    pub git_commit: String,
    /// PipelineRun spec template, JSON
    pub run_spec_json: String,
}

/// Tekton objects the trigger client reads and creates
#[async_trait]
pub trait PipelinePlatform: Send + Sync {
    async fn list_resources(&self, namespace: &str) -> Result<Vec<PipelineResource>>;

    async fn create_resource(
        &self,
        namespace: &str,
        resource: &PipelineResource,
    ) -> Result<PipelineResource>;

    async fn create_run(&self, namespace: &str, run: &PipelineRun) -> Result<PipelineRun>;
}

pub struct PipelineTrigger {
    platform: Arc<dyn PipelinePlatform>,
}

impl PipelineTrigger {
    pub fn new(platform: Arc<dyn PipelinePlatform>) -> Self {
        Self { platform }
    }

    /// Instantiate the run template and create the PipelineRun
    #[instrument(skip(self, options), fields(namespace = %options.namespace, prefix = %options.prefix))]
    pub async fn create_pipeline_run(&self, options: &PipelineOptions) -> Result<PipelineRun> {
        let expanded = replace_vars(&options.run_spec_json, options);
        let mut spec: PipelineRunSpec = serde_json::from_str(&expanded)
            .map_err(|e| Error::PipelineError(format!("invalid run spec template: {e}")))?;

        if spec.resources.is_empty() {
            let source = self.git_source(options).await?;
            spec.resources = vec![PipelineResourceBinding {
                name: GIT_SOURCE_BINDING.to_string(),
                resource_ref: PipelineResourceRef { name: source },
            }];
        }

        let mut run = PipelineRun::new("", spec);
        run.metadata = ObjectMeta {
            generate_name: Some(format!("{}-", options.prefix)),
            namespace: Some(options.namespace.clone()),
            ..ObjectMeta::default()
        };

        let created = self.platform.create_run(&options.namespace, &run).await?;
        info!("Created PipelineRun {}", created.name_any());
        Ok(created)
    }

    /// Name of a git PipelineResource for the options' URL, created on miss
    async fn git_source(&self, options: &PipelineOptions) -> Result<String> {
        let existing = self.platform.list_resources(&options.namespace).await?;
        if let Some(resource) = existing.iter().find(|r| {
            r.spec.type_ == GIT_RESOURCE_TYPE && r.spec.param("url") == Some(options.git_url.as_str())
        }) {
            debug!("Reusing git source {}", resource.name_any());
            return Ok(resource.name_any());
        }

        let mut resource = PipelineResource::new(
            "",
            PipelineResourceSpec {
                type_: GIT_RESOURCE_TYPE.to_string(),
                params: vec![
                    ResourceParam {
                        name: "url".to_string(),
                        value: options.git_url.clone(),
                    },
                    ResourceParam {
                        name: "revision".to_string(),
                        value: options.git_revision.clone(),
                    },
                ],
            },
        );
        resource.metadata = ObjectMeta {
            generate_name: Some(format!("{}-git-source-", options.prefix)),
            namespace: Some(options.namespace.clone()),
            ..ObjectMeta::default()
        };

        let created = self
            .platform
            .create_resource(&options.namespace, &resource)
            .await?;
        let name = created
            .metadata
            .name
            .clone()
            .ok_or_else(|| Error::PipelineError("created git source has no name".to_string()))?;
        info!("Created git source {} for {}", name, options.git_url);
        Ok(name)
    }
}

/// PipelineResources and PipelineRuns through the Kubernetes API
#[derive(Clone)]
pub struct KubePipelinePlatform {
    client: Client,
}

impl KubePipelinePlatform {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PipelinePlatform for KubePipelinePlatform {
    async fn list_resources(&self, namespace: &str) -> Result<Vec<PipelineResource>> {
        let api: Api<PipelineResource> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn create_resource(
        &self,
        namespace: &str,
        resource: &PipelineResource,
    ) -> Result<PipelineResource> {
        let api: Api<PipelineResource> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.create(&PostParams::default(), resource).await?)
    }

    async fn create_run(&self, namespace: &str, run: &PipelineRun) -> Result<PipelineRun> {
        let api: Api<PipelineRun> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.create(&PostParams::default(), run).await?)
    }
}
