//! Controller Configuration
//!
//! Loaded from the YAML file mounted into the controller pod. Every section
//! has defaults so a partial file (or none at all) still yields a usable
//! configuration, apart from the receiver image which must be provided.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Mount point of the controller `ConfigMap`
pub const DEFAULT_CONFIG_PATH: &str = "/config/config.yaml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`]
pub const CONFIG_PATH_ENV: &str = "CONTROLLER_CONFIG_PATH";

/// Main controller configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    /// Receiver (Knative Service) template settings
    #[serde(default)]
    pub receiver: ReceiverConfig,

    /// Receiver readiness polling
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Reconcile scheduling
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// HTTP client and health server settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// Image configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ImageConfig {
    /// Image repository (e.g., "ghcr.io/5dlabs/githook-receiver")
    #[serde(default)]
    pub repository: String,

    /// Image tag (e.g., "latest", "v0.3.1")
    #[serde(default)]
    pub tag: String,
}

impl ImageConfig {
    /// Returns `true` when both repository and tag are populated.
    pub fn is_configured(&self) -> bool {
        !self.repository.trim().is_empty() && !self.tag.trim().is_empty()
    }

    /// Full image reference, `repository:tag`
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository.trim(), self.tag.trim())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverConfig {
    #[serde(default)]
    pub image: ImageConfig,

    /// ServiceAccount used when a `GitHook` does not name one
    #[serde(default = "default_service_account")]
    pub service_account_name: String,

    /// Environment variable the receiver reads the shared secret from
    #[serde(default = "default_secret_env_var")]
    pub secret_env_var: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessConfig {
    #[serde(default = "default_readiness_attempts")]
    pub attempts: u32,

    #[serde(default = "default_readiness_interval")]
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileConfig {
    /// Delay before retrying a pass that failed with a transient error
    #[serde(default = "default_requeue_seconds")]
    pub requeue_seconds: u64,

    /// Delay before re-checking a converged `GitHook` for remote drift
    #[serde(default = "default_resync_seconds")]
    pub resync_seconds: u64,

    /// Restrict the watch to one namespace; all namespaces when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// Timeout applied to every git provider API request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Bind address of the health server
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_service_account() -> String {
    "pipeline-runner".to_string()
}

fn default_secret_env_var() -> String {
    "SECRET_TOKEN".to_string()
}

fn default_readiness_attempts() -> u32 {
    4
}

fn default_readiness_interval() -> u64 {
    2
}

fn default_requeue_seconds() -> u64 {
    30
}

fn default_resync_seconds() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            image: ImageConfig::default(),
            service_account_name: default_service_account(),
            secret_env_var: default_secret_env_var(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            attempts: default_readiness_attempts(),
            interval_seconds: default_readiness_interval(),
        }
    }
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            requeue_seconds: default_requeue_seconds(),
            resync_seconds: default_resync_seconds(),
            watch_namespace: None,
        }
    }
}

impl ReconcileConfig {
    pub fn requeue(&self) -> Duration {
        Duration::from_secs(self.requeue_seconds)
    }

    pub fn resync(&self) -> Duration {
        Duration::from_secs(self.resync_seconds)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            listen_addr: default_listen_addr(),
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl ControllerConfig {
    /// Validate that configuration has required fields
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.receiver.image.is_configured() {
            return Err(anyhow::anyhow!(
                "Receiver image is not configured. Provide receiver.image.repository and receiver.image.tag."
            ));
        }

        if self.readiness.attempts == 0 {
            return Err(anyhow::anyhow!("readiness.attempts must be at least 1"));
        }

        if self.receiver.secret_env_var.trim().is_empty() {
            return Err(anyhow::anyhow!("receiver.secretEnvVar must not be empty"));
        }

        Ok(())
    }

    /// Load configuration from mounted `ConfigMap` file
    pub fn from_mounted_file(config_path: &str) -> Result<Self, anyhow::Error> {
        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {config_path}: {e}"))?;

        serde_yaml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {e}"))
    }

    /// Path to load from: the override when it names an existing file
    pub fn resolve_path() -> String {
        std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|path| Path::new(path).exists())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load from the resolved path, falling back to defaults
    pub fn load() -> Self {
        let config_path = Self::resolve_path();
        match Self::from_mounted_file(&config_path) {
            Ok(cfg) => {
                info!("Loaded controller configuration from {}", config_path);
                cfg
            }
            Err(err) => {
                warn!(
                    "Failed to load configuration from {}: {}. Using defaults.",
                    config_path, err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = ControllerConfig::default();
        assert_eq!(config.receiver.service_account_name, "pipeline-runner");
        assert_eq!(config.receiver.secret_env_var, "SECRET_TOKEN");
        assert_eq!(config.readiness.attempts, 4);
        assert_eq!(config.readiness.interval(), Duration::from_secs(2));
        assert_eq!(config.reconcile.requeue(), Duration::from_secs(30));
        assert_eq!(config.reconcile.resync(), Duration::from_secs(300));
        assert_eq!(config.http.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.http.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn default_config_needs_an_image() {
        let err = ControllerConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("receiver.image"));
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = r"
receiver:
  image:
    repository: ghcr.io/5dlabs/githook-receiver
    tag: v0.3.1
reconcile:
  watchNamespace: ci
";
        let config: ControllerConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.receiver.image.reference(),
            "ghcr.io/5dlabs/githook-receiver:v0.3.1"
        );
        assert_eq!(config.receiver.service_account_name, "pipeline-runner");
        assert_eq!(config.reconcile.watch_namespace.as_deref(), Some("ci"));
        assert_eq!(config.reconcile.requeue_seconds, 30);
        assert_eq!(config.readiness.attempts, 4);
    }

    #[test]
    fn loads_from_mounted_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "receiver:\n  image:\n    repository: receiver\n    tag: latest\nreadiness:\n  attempts: 6\n  intervalSeconds: 1"
        )
        .unwrap();

        let config = ControllerConfig::from_mounted_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.readiness.attempts, 6);
        assert_eq!(config.readiness.interval_seconds, 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(ControllerConfig::from_mounted_file("/nonexistent/config.yaml").is_err());
    }

    #[test]
    #[serial]
    fn override_path_is_used_when_present() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "receiver:\n  image:\n    repository: receiver\n    tag: v2\nhttp:\n  listenAddr: 127.0.0.1:9090"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        std::env::set_var(CONFIG_PATH_ENV, &path);
        assert_eq!(ControllerConfig::resolve_path(), path);
        let config = ControllerConfig::load();
        std::env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(config.receiver.image.tag, "v2");
        assert_eq!(config.http.listen_addr, "127.0.0.1:9090");
    }

    #[test]
    #[serial]
    fn nonexistent_override_falls_back_to_mount_point() {
        std::env::set_var(CONFIG_PATH_ENV, "/nonexistent/override.yaml");
        assert_eq!(ControllerConfig::resolve_path(), DEFAULT_CONFIG_PATH);
        std::env::remove_var(CONFIG_PATH_ENV);
    }
}
