//! Gogs repository webhooks (REST v1)
//!
//! Gogs exposes no single-hook GET, so lookups list the repository's hooks
//! and match on id.

use crate::client::{HookValidation, WebhookClient};
use crate::error::{ScmError, ScmResult};
use crate::events::{events_differ, parse_native_events};
use crate::http::{build_http_client, ensure_success, json_or_error, trim_base, DEFAULT_TIMEOUT};
use crate::options::HookOptions;
use async_trait::async_trait;
use reqwest::{header, Client as HttpClient, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

const PROVIDER: &str = "Gogs";

#[derive(Clone)]
pub struct GogsClient {
    http_client: HttpClient,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct GogsHook {
    id: u64,
    #[serde(default)]
    events: Vec<String>,
    #[serde(default)]
    config: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct GogsHookBody<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    config: HashMap<&'static str, &'a str>,
    events: Vec<&'static str>,
    active: bool,
}

impl GogsClient {
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
            api_base: format!("{}/api/v1", trim_base(base_url)?),
            token: token.into(),
        })
    }

    fn hooks_url(&self, options: &HookOptions) -> String {
        format!(
            "{}/repos/{}/{}/hooks",
            self.api_base,
            urlencoding::encode(&options.owner),
            urlencoding::encode(&options.project)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("token {}", self.token))
    }

    async fn find_hook(&self, options: &HookOptions, id: u64) -> ScmResult<Option<GogsHook>> {
        let response = self
            .request(Method::GET, &self.hooks_url(options))
            .send()
            .await?;
        let hooks: Vec<GogsHook> = json_or_error(PROVIDER, response).await?;
        Ok(hooks.into_iter().find(|hook| hook.id == id))
    }
}

fn hook_body(options: &HookOptions, with_type: bool) -> GogsHookBody<'_> {
    let config = HashMap::from([
        ("content_type", "json"),
        ("url", options.url.as_str()),
        ("secret", options.secret_token.as_str()),
    ]);

    GogsHookBody {
        kind: with_type.then_some("gogs"),
        config,
        events: options.event_set().into_iter().map(|e| e.as_str()).collect(),
        active: true,
    }
}

#[async_trait]
impl WebhookClient for GogsClient {
    #[instrument(skip(self, options), fields(owner = %options.owner, project = %options.project))]
    async fn validate(&self, options: &HookOptions) -> ScmResult<HookValidation> {
        let Some(id) = options.numeric_hook_id()? else {
            return Ok(HookValidation::MISSING);
        };

        let Some(hook) = self.find_hook(options, id).await? else {
            debug!("Hook {} not listed on {}/{}", id, options.owner, options.project);
            return Ok(HookValidation::MISSING);
        };

        if hook.config.get("url").map(String::as_str) != Some(options.url.as_str()) {
            return Ok(HookValidation::DRIFTED);
        }

        let remote_events = parse_native_events(hook.events.iter().map(String::as_str));
        if events_differ(&remote_events, &options.event_set()) {
            return Ok(HookValidation::DRIFTED);
        }

        Ok(HookValidation::IN_SYNC)
    }

    #[instrument(skip(self, options), fields(owner = %options.owner, project = %options.project))]
    async fn create(&self, options: &HookOptions) -> ScmResult<String> {
        let response = self
            .request(Method::POST, &self.hooks_url(options))
            .json(&hook_body(options, true))
            .send()
            .await?;

        let hook: GogsHook = json_or_error(PROVIDER, response).await?;
        info!("Created Gogs hook {} on {}/{}", hook.id, options.owner, options.project);
        Ok(hook.id.to_string())
    }

    #[instrument(skip(self, options), fields(owner = %options.owner, project = %options.project))]
    async fn update(&self, options: &HookOptions) -> ScmResult<String> {
        let id = options.numeric_hook_id()?.ok_or(ScmError::MissingHookId)?;
        let url = format!("{}/{id}", self.hooks_url(options));

        let response = self
            .request(Method::PATCH, &url)
            .json(&hook_body(options, false))
            .send()
            .await?;

        // Gogs returns the edited hook, but the id cannot change
        ensure_success(PROVIDER, response).await?;
        info!("Updated Gogs hook {} on {}/{}", id, options.owner, options.project);
        Ok(id.to_string())
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
        info!("Deleted Gogs hook {} from {}/{}", id, options.owner, options.project);
        Ok(())
    }
}
