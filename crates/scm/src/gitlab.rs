//! GitLab project hooks (REST v4)
//!
//! GitLab has no event-name list on a hook, only one boolean per category.
//! A unified `push` maps to both `push_events` and `tag_push_events`; reading a
//! hook back, either flag reports `push`. `create`, `delete` and `fork` have no
//! GitLab flag and are dropped on both sides of the comparison.

use crate::client::{HookValidation, WebhookClient};
use crate::error::{ScmError, ScmResult};
use crate::events::{events_differ, EventSet, HookEvent};
use crate::http::{build_http_client, ensure_success, json_or_error, trim_base, DEFAULT_TIMEOUT};
use crate::options::HookOptions;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const PROVIDER: &str = "GitLab";

#[derive(Clone)]
pub struct GitlabClient {
    http_client: HttpClient,
    api_base: String,
    token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectHook {
    id: u64,
    url: String,
    push_events: bool,
    tag_push_events: bool,
    issues_events: bool,
    merge_requests_events: bool,
    note_events: bool,
    releases_events: bool,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
struct ProjectHookBody<'a> {
    url: &'a str,
    token: &'a str,
    push_events: bool,
    tag_push_events: bool,
    issues_events: bool,
    merge_requests_events: bool,
    note_events: bool,
    releases_events: bool,
    enable_ssl_verification: bool,
}

impl GitlabClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> ScmResult<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> ScmResult<Self> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            api_base: format!("{}/api/v4", trim_base(base_url)?),
            token: token.into(),
        })
    }

    fn hooks_url(&self, options: &HookOptions) -> String {
        let pid = format!("{}/{}", options.owner, options.project);
        format!("{}/projects/{}/hooks", self.api_base, urlencoding::encode(&pid))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("PRIVATE-TOKEN", &self.token)
    }

    async fn get_hook(&self, options: &HookOptions, id: u64) -> ScmResult<Option<ProjectHook>> {
        let url = format!("{}/{id}", self.hooks_url(options));
        let response = self.request(Method::GET, &url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Hook {} not found on {}/{}", id, options.owner, options.project);
            return Ok(None);
        }

        json_or_error(PROVIDER, response).await.map(Some)
    }
}

fn has_gitlab_flag(event: HookEvent) -> bool {
    !matches!(
        event,
        HookEvent::Create | HookEvent::Delete | HookEvent::Fork
    )
}

/// Desired events GitLab can represent
fn representable(events: &EventSet) -> EventSet {
    events.iter().copied().filter(|e| has_gitlab_flag(*e)).collect()
}

fn hook_to_events(hook: &ProjectHook) -> EventSet {
    let mut events = EventSet::new();
    if hook.push_events || hook.tag_push_events {
        events.insert(HookEvent::Push);
    }
    if hook.issues_events {
        events.insert(HookEvent::Issues);
    }
    if hook.merge_requests_events {
        events.insert(HookEvent::PullRequest);
    }
    if hook.note_events {
        events.insert(HookEvent::IssueComment);
    }
    if hook.releases_events {
        events.insert(HookEvent::Release);
    }
    events
}

fn hook_body(options: &HookOptions) -> ProjectHookBody<'_> {
    let mut body = ProjectHookBody {
        url: &options.url,
        token: &options.secret_token,
        enable_ssl_verification: options.ssl_verify,
        ..ProjectHookBody::default()
    };

    for event in options.event_set() {
        match event {
            HookEvent::Push => {
                body.push_events = true;
                body.tag_push_events = true;
            }
            HookEvent::Issues => body.issues_events = true,
            HookEvent::PullRequest => body.merge_requests_events = true,
            HookEvent::IssueComment => body.note_events = true,
            HookEvent::Release => body.releases_events = true,
            HookEvent::Create | HookEvent::Delete | HookEvent::Fork => {
                warn!("GitLab has no '{}' hook event, skipping", event);
            }
        }
    }

    body
}

#[async_trait]
impl WebhookClient for GitlabClient {
    #[instrument(skip(self, options), fields(owner = %options.owner, project = %options.project))]
    async fn validate(&self, options: &HookOptions) -> ScmResult<HookValidation> {
        let Some(id) = options.numeric_hook_id()? else {
            return Ok(HookValidation::MISSING);
        };

        let Some(hook) = self.get_hook(options, id).await? else {
            return Ok(HookValidation::MISSING);
        };

        if hook.url != options.url {
            return Ok(HookValidation::DRIFTED);
        }

        if events_differ(&hook_to_events(&hook), &representable(&options.event_set())) {
            return Ok(HookValidation::DRIFTED);
        }

        Ok(HookValidation::IN_SYNC)
    }

    #[instrument(skip(self, options), fields(owner = %options.owner, project = %options.project))]
    async fn create(&self, options: &HookOptions) -> ScmResult<String> {
        let response = self
            .request(Method::POST, &self.hooks_url(options))
            .json(&hook_body(options))
            .send()
            .await?;

        let hook: ProjectHook = json_or_error(PROVIDER, response).await?;
        info!("Created GitLab hook {} on {}/{}", hook.id, options.owner, options.project);
        Ok(hook.id.to_string())
    }

    #[instrument(skip(self, options), fields(owner = %options.owner, project = %options.project))]
    async fn update(&self, options: &HookOptions) -> ScmResult<String> {
        let id = options.numeric_hook_id()?.ok_or(ScmError::MissingHookId)?;
        let url = format!("{}/{id}", self.hooks_url(options));

        let response = self
            .request(Method::PUT, &url)
            .json(&hook_body(options))
            .send()
            .await?;

        let hook: ProjectHook = json_or_error(PROVIDER, response).await?;
        info!("Updated GitLab hook {} on {}/{}", hook.id, options.owner, options.project);
        Ok(hook.id.to_string())
    }

    #[instrument(skip(self, options), fields(owner = %options.owner, project = %options.project))]
    async fn delete(&self, options: &HookOptions) -> ScmResult<()> {
        let Some(id) = options.numeric_hook_id()? else {
            return Ok(());
        };
        let url = format!("{}/{id}", self.hooks_url(options));
        let response = self.request(Method::DELETE, &url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Hook {} already gone from {}/{}", id, options.owner, options.project);
            return Ok(());
        }

        ensure_success(PROVIDER, response).await?;
        info!("Deleted GitLab hook {} from {}/{}", id, options.owner, options.project);
        Ok(())
    }
}
