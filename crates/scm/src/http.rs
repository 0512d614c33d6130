//! Shared HTTP plumbing for the provider clients

use crate::error::{ScmError, ScmResult};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub(crate) const USER_AGENT: &str = "githook-controller/1.0";
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

pub(crate) fn build_http_client(timeout: Duration) -> ScmResult<HttpClient> {
    Ok(HttpClient::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

pub(crate) fn trim_base(base_url: &str) -> ScmResult<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() || reqwest::Url::parse(trimmed).is_err() {
        return Err(ScmError::InvalidBaseUrl(base_url.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Decode a successful response body, or turn a failure into `ScmError::Api`
pub(crate) async fn json_or_error<T: DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> ScmResult<T> {
    let response = ensure_success(provider, response).await?;
    Ok(response.json::<T>().await?)
}

pub(crate) async fn ensure_success(provider: &'static str, response: Response) -> ScmResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(api_error(provider, status, response).await)
}

async fn api_error(provider: &'static str, status: StatusCode, response: Response) -> ScmError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ProviderErrorBody>(&body)
        .ok()
        .and_then(|parsed| {
            parsed
                .message
                .map(|m| match m {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .or(parsed.error)
        })
        .unwrap_or(body);

    ScmError::Api {
        provider,
        status: status.as_u16(),
        message,
    }
}
