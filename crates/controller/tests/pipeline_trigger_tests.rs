//! PipelineRun creation against an in-memory Tekton API

use async_trait::async_trait;
use controller::crds::{PipelineResource, PipelineResourceSpec, PipelineRun, ResourceParam};
use controller::tasks::pipeline::{PipelineOptions, PipelinePlatform, PipelineTrigger};
use controller::{Error, Result};
use kube::ResourceExt;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeTekton {
    resources: Mutex<Vec<PipelineResource>>,
    runs: Mutex<Vec<PipelineRun>>,
    listed: Mutex<usize>,
}

impl FakeTekton {
    fn with_git_resource(name: &str, url: &str) -> Self {
        let mut resource = PipelineResource::new(
            name,
            PipelineResourceSpec {
                type_: "git".to_string(),
                params: vec![ResourceParam {
                    name: "url".to_string(),
                    value: url.to_string(),
                }],
            },
        );
        resource.metadata.namespace = Some("ci".to_string());
        let fake = Self::default();
        fake.resources.lock().unwrap().push(resource);
        fake
    }
}

fn assign_name<K: kube::Resource>(object: &mut K, suffix: &str) {
    let meta = object.meta_mut();
    let prefix = meta.generate_name.clone().unwrap_or_default();
    meta.name = Some(format!("{prefix}{suffix}"));
}

#[async_trait]
impl PipelinePlatform for FakeTekton {
    async fn list_resources(&self, _namespace: &str) -> Result<Vec<PipelineResource>> {
        *self.listed.lock().unwrap() += 1;
        Ok(self.resources.lock().unwrap().clone())
    }

    async fn create_resource(
        &self,
        _namespace: &str,
        resource: &PipelineResource,
    ) -> Result<PipelineResource> {
        let mut created = resource.clone();
        assign_name(&mut created, "x7k2p");
        self.resources.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn create_run(&self, _namespace: &str, run: &PipelineRun) -> Result<PipelineRun> {
        let mut created = run.clone();
        assign_name(&mut created, "q9w3e");
        self.runs.lock().unwrap().push(created.clone());
        Ok(created)
    }
}

fn options(run_spec_json: &str) -> PipelineOptions {
    PipelineOptions {
        namespace: "ci".to_string(),
        prefix: "app".to_string(),
        git_url: "https://github.com/acme/app.git".to_string(),
        git_revision: "refs/heads/main".to_string(),
        git_commit: "9fceb02d0ae598e95dc970b74767f19372d61af8".to_string(),
        run_spec_json: run_spec_json.to_string(),
    }
}

#[tokio::test]
async fn creates_git_source_when_template_has_no_resources() {
    let tekton = Arc::new(FakeTekton::default());
    let trigger = PipelineTrigger::new(tekton.clone());

    let run = trigger
        .create_pipeline_run(&options(
            r#"{"pipelineRef":{"name":"build"},"params":[{"name":"tag","value":"$COMMIT"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(run.name_any(), "app-q9w3e");
    assert_eq!(run.metadata.generate_name.as_deref(), Some("app-"));
    assert_eq!(run.spec.resources.len(), 1);
    assert_eq!(run.spec.resources[0].name, "git-source");
    assert_eq!(run.spec.resources[0].resource_ref.name, "app-git-source-x7k2p");
    assert_eq!(run.spec.extra["params"][0]["value"], "9fceb02d0a");
    assert_eq!(run.spec.extra["pipelineRef"]["name"], "build");

    let resources = tekton.resources.lock().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(
        resources[0].metadata.generate_name.as_deref(),
        Some("app-git-source-")
    );
    assert_eq!(resources[0].spec.type_, "git");
    assert_eq!(
        resources[0].spec.param("url"),
        Some("https://github.com/acme/app.git")
    );
    assert_eq!(resources[0].spec.param("revision"), Some("refs/heads/main"));
}

#[tokio::test]
async fn reuses_git_source_with_matching_url() {
    let tekton = Arc::new(FakeTekton::with_git_resource(
        "shared-source",
        "https://github.com/acme/app.git",
    ));
    let trigger = PipelineTrigger::new(tekton.clone());

    let run = trigger
        .create_pipeline_run(&options(r#"{"pipelineRef":{"name":"build"}}"#))
        .await
        .unwrap();

    assert_eq!(run.spec.resources[0].resource_ref.name, "shared-source");
    assert_eq!(tekton.resources.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn other_urls_do_not_match() {
    let tekton = Arc::new(FakeTekton::with_git_resource(
        "other-source",
        "https://github.com/acme/other.git",
    ));
    let trigger = PipelineTrigger::new(tekton.clone());

    let run = trigger
        .create_pipeline_run(&options(r#"{"pipelineRef":{"name":"build"}}"#))
        .await
        .unwrap();

    assert_eq!(run.spec.resources[0].resource_ref.name, "app-git-source-x7k2p");
    assert_eq!(tekton.resources.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn explicit_bindings_skip_git_source_lookup() {
    let tekton = Arc::new(FakeTekton::default());
    let trigger = PipelineTrigger::new(tekton.clone());

    let run = trigger
        .create_pipeline_run(&options(
            r#"{"pipelineRef":{"name":"build"},"resources":[{"name":"source","resourceRef":{"name":"pinned"}}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(run.spec.resources[0].name, "source");
    assert_eq!(run.spec.resources[0].resource_ref.name, "pinned");
    assert_eq!(*tekton.listed.lock().unwrap(), 0);
}

#[tokio::test]
async fn malformed_template_is_rejected_without_side_effects() {
    let tekton = Arc::new(FakeTekton::default());
    let trigger = PipelineTrigger::new(tekton.clone());

    let err = trigger
        .create_pipeline_run(&options(r#"{"pipelineRef": "#))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PipelineError(_)));
    assert!(tekton.runs.lock().unwrap().is_empty());
    assert!(tekton.resources.lock().unwrap().is_empty());
}
