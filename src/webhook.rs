//! Inbound GitHub webhook.
//!
//! GitHub retries deliveries that do not come back 2xx, and a retried
//! delivery can never become acceptable, so this endpoint answers 200 no
//! matter what arrived. Anything unusable is logged and dropped.

use crate::events::{parse_pull_request_event, PayloadError, PullRequestEvent, PULL_REQUEST_EVENT};
use crate::server::AppState;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const GITHUB_EVENT_HEADER: &str = "X-GitHub-Event";

/// Form-encoded delivery body; GitHub puts the JSON document under `payload`.
#[derive(Debug, Deserialize)]
pub struct HookForm {
    #[serde(default)]
    pub payload: Option<String>,
}

fn decode_delivery(payload: Option<String>) -> Result<PullRequestEvent, PayloadError> {
    let raw = payload.ok_or(PayloadError::MissingPayload)?;
    parse_pull_request_event(&raw)
}

pub async fn hook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<HookForm>, FormRejection>,
) -> StatusCode {
    let event_kind = headers
        .get(GITHUB_EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if event_kind != PULL_REQUEST_EVENT {
        debug!("Ignoring {:?} webhook delivery", event_kind);
        return StatusCode::OK;
    }

    let payload = match form {
        Ok(Form(hook)) => hook.payload,
        Err(rejection) => {
            warn!("Discarding unreadable webhook delivery: {}", rejection);
            return StatusCode::OK;
        }
    };

    let event = match decode_delivery(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("Discarding pull_request delivery: {}", e);
            return StatusCode::OK;
        }
    };

    if !event.pull_request.merged {
        debug!(
            "Pull request {}#{} not merged, nothing to do",
            event.repository.full_name, event.pull_request.number
        );
        return StatusCode::OK;
    }

    let login = event.pull_request.user.login;
    match state.store.schedule_contributor(&login) {
        Ok(true) => {
            info!(
                "Merged pull request {}#{} by {} qualifies for a reward",
                event.repository.full_name, event.pull_request.number, login
            );
            let github = state.github.clone();
            let repo = event.repository.full_name;
            let number = event.pull_request.number;
            let claim_url = format!("{}/auth", state.config.domain());
            // The invite rides on a detached task; delivery acknowledgement
            // must not wait on the GitHub API.
            tokio::spawn(async move {
                if let Err(e) = github.post_reward_invite(&repo, number, &claim_url).await {
                    warn!("Posting reward invite to {}#{} failed: {:#}", repo, number, e);
                }
            });
        }
        Ok(false) => {
            debug!("Contributor {} already tracked, no new invite", login);
        }
        Err(e) => {
            error!("Failed recording contributor {}: {:#}", login, e);
        }
    }

    StatusCode::OK
}
