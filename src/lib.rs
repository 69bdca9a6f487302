//! ContriBot - Reward contributors for merged pull requests
//!
//! Watches a repository's webhook feed and walks each first-time contributor
//! through claiming a reward: an invitation comment on the merged pull
//! request, a GitHub OAuth sign-in, and a one-shot shipping form that fans
//! out to the configured reward backends.
//!
//! # How it works
//!
//! 1. GitHub delivers a `pull_request` webhook when a PR is merged
//! 2. The contributor is recorded once and invited via a PR comment
//! 3. The invite links to `/auth`, which runs the GitHub OAuth web flow
//! 4. `/award` shows the shipping form to authorized contributors
//! 5. Exactly one submission is accepted and handed to every reward backend
//!
//! # Anti-abuse measures
//!
//! - A contributor is only ever invited once, however often GitHub redelivers
//! - The form only opens for logins GitHub itself authenticated
//! - Each contributor's submission is accepted exactly once (first one wins)

pub mod backends;
pub mod config;
pub mod dispatch;
pub mod events;
pub mod github;
pub mod oauth;
pub mod pages;
pub mod server;
pub mod sessions;
pub mod status;
pub mod store;
pub mod webhook;

pub use config::Config;
pub use dispatch::{RewardBackend, RewardDispatcher, Submission};
pub use github::GitHubClient;
pub use oauth::{AuthError, GitHubOAuth};
pub use server::{create_router, run_server, AppState};
pub use status::{decide_award, AwardDecision, EligibilityStatus};
pub use store::ContributorStore;
