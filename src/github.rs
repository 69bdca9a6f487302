//! Outbound GitHub API client.
//!
//! Posts the reward invitation comment on the pull request thread that made a
//! contributor eligible. Invitations run detached from the webhook response;
//! a failure here is logged and the contributor stays eligible to
//! authenticate through other channels.

use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tracing::{info, warn};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

const USER_AGENT: &str = "contribot/0.1.0";

/// Bound on every outbound call; a stalled GitHub must not pin tasks forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Self {
        if token.is_some() {
            info!("GitHub client initialized with authentication token");
        } else {
            warn!("GitHub client initialized WITHOUT token - invitation comments will be rejected by most repos");
        }
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            token,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn build_post(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(url)
            .timeout(REQUEST_TIMEOUT)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");

        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        req
    }

    /// Comments on `repo_full_name`'s PR thread, inviting the contributor to
    /// claim a reward via `claim_url`.
    pub async fn post_reward_invite(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        claim_url: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/repos/{}/issues/{}/comments",
            self.api_base, repo_full_name, pr_number
        );

        let response = self
            .build_post(&url)
            .json(&json!({ "body": invite_comment(claim_url) }))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!(
                "invitation comment on {} #{} failed: {}",
                repo_full_name,
                pr_number,
                response.status()
            );
        }

        info!(
            "Posted reward invitation on {} #{}",
            repo_full_name, pr_number
        );
        Ok(())
    }
}

fn invite_comment(claim_url: &str) -> String {
    format!(
        "Hey! Awesome job! We wish to reward you! Please follow the link below. \
         It will ask you to authenticate with your GitHub account; after that, \
         just submit some info and you will be rewarded!\n\n\
         [Click here!]({claim_url})\n\n\
         Once again, you are AWESOME!"
    )
}
