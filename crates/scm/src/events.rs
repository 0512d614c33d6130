//! Canonical webhook event vocabulary
//!
//! Every provider client translates to and from this closed set. Comparison of
//! desired and remote subscriptions always happens on [`EventSet`], so the
//! order in which events are declared never matters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    Create,
    Delete,
    Fork,
    Push,
    Issues,
    IssueComment,
    PullRequest,
    Release,
}

impl HookEvent {
    pub const ALL: [HookEvent; 8] = [
        HookEvent::Create,
        HookEvent::Delete,
        HookEvent::Fork,
        HookEvent::Push,
        HookEvent::Issues,
        HookEvent::IssueComment,
        HookEvent::PullRequest,
        HookEvent::Release,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HookEvent::Create => "create",
            HookEvent::Delete => "delete",
            HookEvent::Fork => "fork",
            HookEvent::Push => "push",
            HookEvent::Issues => "issues",
            HookEvent::IssueComment => "issue_comment",
            HookEvent::PullRequest => "pull_request",
            HookEvent::Release => "release",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("unknown webhook event '{s}'"))
    }
}

/// Order-independent set of events
pub type EventSet = BTreeSet<HookEvent>;

/// Parse provider-native event names, skipping names outside the vocabulary.
///
/// Providers may report events this controller never subscribes to (GitHub's
/// `*`, Gogs' `pull_request_review`); those are not part of the canonical set.
pub fn parse_native_events<'a, I>(names: I) -> EventSet
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| name.parse::<HookEvent>().ok())
        .collect()
}

/// True when the sets disagree in either direction
#[must_use]
pub fn events_differ(remote: &EventSet, desired: &EventSet) -> bool {
    remote.symmetric_difference(desired).next().is_some()
}
