/*
 * 5D Labs GitHook - Git provider webhook abstraction
 * Copyright (C) 2025 5D Labs
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

#![allow(clippy::missing_errors_doc, clippy::doc_markdown)]

//! Git provider webhook abstraction
//!
//! One [`WebhookClient`] implementation per hosting provider (GitHub, GitLab,
//! Gogs), all driven by a fully resolved [`HookOptions`]. The [`Webhook`]
//! facade picks the right client from a [`GitProvider`].

pub mod client;
pub mod error;
pub mod events;
pub mod github;
pub mod gitlab;
pub mod gogs;
mod http;
pub mod options;
pub mod provider;
pub mod webhook;

pub use client::{HookValidation, WebhookClient};
pub use error::{ScmError, ScmResult};
pub use events::{EventSet, HookEvent};
pub use options::HookOptions;
pub use provider::GitProvider;
pub use webhook::Webhook;

#[cfg(any(test, feature = "mocks"))]
pub use client::MockWebhookClient;
