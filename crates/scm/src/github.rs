//! GitHub repository webhooks (REST v3)

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

const PROVIDER: &str = "GitHub";
const PUBLIC_API: &str = "https://api.github.com";

#[derive(Clone)]
pub struct GithubClient {
    http_client: HttpClient,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct GithubHook {
    id: u64,
    #[serde(default)]
    events: Vec<String>,
    #[serde(default)]
    config: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct HookConfig<'a> {
    url: &'a str,
    content_type: &'static str,
    secret: &'a str,
    insecure_ssl: &'static str,
}

#[derive(Debug, Serialize)]
struct HookBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'static str>,
    active: bool,
    events: Vec<&'static str>,
    config: HookConfig<'a>,
}

impl GithubClient {
    /// Client for the GitHub instance hosting `base_url` (github.com or Enterprise)
    pub fn new(base_url: &str, token: impl Into<String>) -> ScmResult<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> ScmResult<Self> {
        let api_base = api_base_for(base_url)?;
        Ok(Self {
            http_client: build_http_client(timeout)?,
            api_base,
            token: token.into(),
        })
    }

    /// Client talking to an explicit REST root, bypassing host detection
    pub fn with_api_base(api_base: &str, token: impl Into<String>) -> ScmResult<Self> {
        Ok(Self {
            http_client: build_http_client(DEFAULT_TIMEOUT)?,
            api_base: trim_base(api_base)?,
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
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/vnd.github+json")
    }

    async fn get_hook(&self, options: &HookOptions, id: u64) -> ScmResult<Option<GithubHook>> {
        let url = format!("{}/{id}", self.hooks_url(options));
        let response = self.request(Method::GET, &url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Hook {} not found on {}/{}", id, options.owner, options.project);
            return Ok(None);
        }

        json_or_error(PROVIDER, response).await.map(Some)
    }
}

/// Resolve the REST root for a git server base URL
pub fn api_base_for(base_url: &str) -> ScmResult<String> {
    let base = trim_base(base_url)?;
    let host = reqwest::Url::parse(&base)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .ok_or_else(|| ScmError::InvalidBaseUrl(base_url.to_string()))?;

    if host == "github.com" || host == "www.github.com" {
        Ok(PUBLIC_API.to_string())
    } else {
        Ok(format!("{base}/api/v3"))
    }
}

fn hook_body(options: &HookOptions, with_name: bool) -> HookBody<'_> {
    let events = options.event_set().into_iter().map(|e| e.as_str()).collect();

    HookBody {
        name: with_name.then_some("web"),
        active: true,
        events,
        config: HookConfig {
            url: &options.url,
            content_type: "json",
            secret: &options.secret_token,
            insecure_ssl: if options.ssl_verify { "0" } else { "1" },
        },
    }
}

#[async_trait]
impl WebhookClient for GithubClient {
    #[instrument(skip(self, options), fields(owner = %options.owner, project = %options.project))]
    async fn validate(&self, options: &HookOptions) -> ScmResult<HookValidation> {
        let Some(id) = options.numeric_hook_id()? else {
            return Ok(HookValidation::MISSING);
        };

        let Some(hook) = self.get_hook(options, id).await? else {
            return Ok(HookValidation::MISSING);
        };

        let remote_url = hook.config.get("url").and_then(|v| v.as_str()).unwrap_or("");
        if remote_url != options.url {
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

        let hook: GithubHook = json_or_error(PROVIDER, response).await?;
        info!("Created GitHub hook {} on {}/{}", hook.id, options.owner, options.project);
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

        let hook: GithubHook = json_or_error(PROVIDER, response).await?;
        info!("Updated GitHub hook {} on {}/{}", hook.id, options.owner, options.project);
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
        info!("Deleted GitHub hook {} from {}/{}", id, options.owner, options.project);
        Ok(())
    }
}
