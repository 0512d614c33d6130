use crate::error::{ScmError, ScmResult};
use crate::events::{EventSet, HookEvent};

/// Fully resolved parameters for one webhook operation.
///
/// Recomputed on every reconciliation pass and never persisted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HookOptions {
    /// Scheme and host of the git server, e.g. `https://gitlab.example.com`
    pub base_url: String,
    pub owner: String,
    pub project: String,
    pub access_token: String,
    pub secret_token: String,
    /// Callback URL the provider delivers events to
    pub url: String,
    pub events: Vec<HookEvent>,
    /// Provider hook id from a previous registration
    pub id: Option<String>,
    /// Ask the provider to verify the receiver's TLS certificate
    pub ssl_verify: bool,
}

impl HookOptions {
    #[must_use]
    pub fn event_set(&self) -> EventSet {
        self.events.iter().copied().collect()
    }

    /// The recorded id, treating an empty string as absent
    #[must_use]
    pub fn hook_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Recorded id parsed as the numeric id every supported provider uses
    pub fn numeric_hook_id(&self) -> ScmResult<Option<u64>> {
        self.hook_id()
            .map(|id| {
                id.trim()
                    .parse::<u64>()
                    .map_err(|_| ScmError::InvalidHookId(id.to_string()))
            })
            .transpose()
    }
}

// Tokens never reach logs
impl std::fmt::Debug for HookOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookOptions")
            .field("base_url", &self.base_url)
            .field("owner", &self.owner)
            .field("project", &self.project)
            .field("url", &self.url)
            .field("events", &self.events)
            .field("id", &self.id)
            .field("ssl_verify", &self.ssl_verify)
            .finish_non_exhaustive()
    }
}
