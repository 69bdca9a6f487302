//! ContriBot HTTP server
//!
//! Wires the webhook intake, the OAuth flow, and the award surface into one
//! router. Handlers stay thin: eligibility decisions live in [`crate::status`]
//! and persistence in [`crate::store`].

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Form, Query, State,
    },
    http::{header, HeaderMap, Method, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};

use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::backends::backends_from_config;
use crate::config::Config;
use crate::dispatch::{RewardDispatcher, Submission};
use crate::github::{GitHubClient, GITHUB_API_BASE};
use crate::oauth::{extract_single_code, AuthError, GitHubOAuth};
use crate::pages;
use crate::sessions::{SessionStore, SESSION_COOKIE};
use crate::status::{decide_award, AwardDecision, EligibilityStatus};
use crate::store::ContributorStore;
use crate::webhook::hook_handler;

const NOT_AUTHENTICATED: &str = "There was an error authenticating your account.";
const NO_RECORDS: &str = "Can't seem to find records of you :/";
const ALREADY_AWARDED: &str = "Hey buddy, it seems you have been awarded before.";
const BAD_SUBMISSION: &str = "Something went wrong :'(";
const INTERNAL: &str = "Uh oh! Please report this :(";

pub struct AppState {
    pub config: Config,
    pub store: Arc<ContributorStore>,
    pub sessions: Arc<SessionStore>,
    pub github: GitHubClient,
    pub oauth: GitHubOAuth,
    pub dispatcher: Arc<RewardDispatcher>,
    pub started_at: Instant,
}

impl AppState {
    /// Wires every component from the configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Arc<Self>> {
        let store = Arc::new(ContributorStore::new(config.database_path())?);
        let sessions = Arc::new(SessionStore::new(config.session_ttl()));
        let github = GitHubClient::new(GITHUB_API_BASE, config.github_api_token());
        let oauth = GitHubOAuth::new(
            config.github_client_id().unwrap_or_default(),
            config.github_client_secret().unwrap_or_default(),
        );
        let dispatcher = Arc::new(RewardDispatcher::new(backends_from_config(&config)));

        Ok(Arc::new(Self {
            config,
            store,
            sessions,
            github,
            oauth,
            dispatcher,
            started_at: Instant::now(),
        }))
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/hook", post(hook_handler))
        .route("/auth", get(auth_redirect_handler))
        .route(
            "/auth/callback",
            get(auth_callback_handler).post(auth_callback_handler),
        )
        .route("/award", get(award_page_handler).post(submission_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_page_response(state: &AppState, status: StatusCode, message: &str) -> Response {
    let html = pages::error_page(&state.config.contact.url, &state.config.contact.value, message);
    (status, Html(html)).into_response()
}

/// Login behind the request's session cookie, if the session is still live.
fn session_login(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let token = cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })?;
    state.sessions.resolve(&token)
}

async fn auth_redirect_handler(State(state): State<Arc<AppState>>) -> Redirect {
    let callback = format!("{}/auth/callback", state.config.domain());
    Redirect::to(&state.oauth.authorize_redirect_url(&callback))
}

async fn auth_callback_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    match authenticate(&state, method, query, form).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Authentication failed: {}", e);
            error_page_response(&state, e.status(), e.public_message())
        }
    }
}

async fn authenticate(
    state: &AppState,
    method: Method,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Response, AuthError> {
    let Query(mut params) = query.map_err(|_| AuthError::BadRequest)?;
    // A POST callback may carry the code in its body; those pairs count
    // toward the same single-code rule as the query string.
    if method == Method::POST {
        match form {
            Ok(Form(body)) => params.extend(body),
            Err(FormRejection::InvalidFormContentType(_)) => {}
            Err(_) => return Err(AuthError::BadRequest),
        }
    }
    let code = extract_single_code(&params)?;
    let token = state.oauth.exchange_code(code).await?;
    let login = state.oauth.fetch_login(&token).await?;
    info!("Contributor {} authenticated", login);

    let session = state.sessions.create(&login);
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session
    );
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to("/award"),
    )
        .into_response())
}

async fn award_page_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(login) = session_login(&state, &headers) else {
        return error_page_response(&state, StatusCode::UNAUTHORIZED, NOT_AUTHENTICATED);
    };

    let status = match state.store.status_of(&login) {
        Ok(status) => status,
        Err(e) => {
            error!("Status lookup for {} failed: {:#}", login, e);
            return error_page_response(&state, StatusCode::INTERNAL_SERVER_ERROR, INTERNAL);
        }
    };

    match decide_award(status) {
        AwardDecision::NoRecord => {
            error_page_response(&state, StatusCode::UNAUTHORIZED, NO_RECORDS)
        }
        AwardDecision::PromoteAndShowForm => {
            if let Err(e) = state.store.mark_authorized(&login) {
                error!("Promoting {} failed: {:#}", login, e);
                return error_page_response(&state, StatusCode::INTERNAL_SERVER_ERROR, INTERNAL);
            }
            Html(pages::form_page()).into_response()
        }
        AwardDecision::ShowForm => Html(pages::form_page()).into_response(),
        AwardDecision::AlreadyAwarded => {
            error_page_response(&state, StatusCode::UNAUTHORIZED, ALREADY_AWARDED)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmissionForm {
    pub name: String,
    pub address: String,
    pub email: String,
    pub size: String,
}

async fn submission_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<SubmissionForm>, FormRejection>,
) -> Response {
    let Some(login) = session_login(&state, &headers) else {
        return error_page_response(&state, StatusCode::UNAUTHORIZED, NOT_AUTHENTICATED);
    };

    let Ok(Form(form)) = form else {
        warn!("Discarding malformed submission from {}", login);
        return error_page_response(&state, StatusCode::BAD_REQUEST, BAD_SUBMISSION);
    };

    let submission = Submission {
        name: form.name,
        address: form.address,
        email: form.email,
        size: form.size,
    };

    match state.store.record_submission(&login, &submission) {
        Ok(true) => {
            info!("Accepted reward submission from {}", login);
            state.dispatcher.dispatch(submission);
            Html(pages::success_page()).into_response()
        }
        Ok(false) => {
            warn!("Rejected submission from {}: not currently authorized", login);
            // The update refused; re-read the row only to choose the copy.
            let message = match state.store.status_of(&login) {
                Ok(EligibilityStatus::Awarded) => ALREADY_AWARDED,
                Ok(EligibilityStatus::Unknown) => NO_RECORDS,
                _ => BAD_SUBMISSION,
            };
            error_page_response(&state, StatusCode::UNAUTHORIZED, message)
        }
        Err(e) => {
            error!("Recording submission from {} failed: {:#}", login, e);
            error_page_response(&state, StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub uptime_secs: u64,
    pub version: String,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.store.status_counts() {
        Ok(counts) => Json(serde_json::json!({
            "invited": counts.invited,
            "authorized": counts.authorized,
            "awarded": counts.awarded,
            "total": counts.total(),
        })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// Run the server
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting ContriBot server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
