//! GitHub web-flow OAuth.
//!
//! Drives the three-legged flow: redirect to GitHub's authorize endpoint,
//! exchange the returned code for an access token, then resolve the token to a
//! login. The failure classes stay separate because each points an operator at
//! a different problem: a retry, a credential check, or a provider outage.

use axum::http::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
pub const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const GITHUB_USER_URL: &str = "https://api.github.com/user";

/// Scope requested from GitHub; resolving the login only needs `user`.
const OAUTH_SCOPE: &str = "user";

const USER_AGENT: &str = "contribot/0.1.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything that can go wrong between the callback and a resolved login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The callback request itself could not be parsed.
    #[error("malformed callback request")]
    BadRequest,

    /// No authorization code in the callback.
    #[error("authorization code missing from callback")]
    MissingCode,

    /// More than one authorization code in the callback.
    #[error("multiple authorization codes in callback")]
    DuplicateCode,

    /// GitHub could not be reached at all.
    #[error("identity provider unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// GitHub answered but the body could not be read.
    #[error("failed reading identity provider response: {0}")]
    Read(#[source] reqwest::Error),

    /// The body was not the JSON shape GitHub documents.
    #[error("unexpected identity provider response: {0}")]
    Decode(#[from] serde_json::Error),

    /// GitHub answered fine but refused to grant a token for the code.
    #[error("identity provider declined the authorization code")]
    Declined,

    /// The identity response carried no login.
    #[error("identity response did not include a login")]
    MissingLogin,
}

impl AuthError {
    /// Status for the error surface shown to the contributor.
    ///
    /// `Declined` intentionally renders with 200: the request pipeline worked,
    /// GitHub just said no, and a retry with a fresh code is the fix.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::BadRequest => StatusCode::BAD_REQUEST,
            AuthError::MissingCode | AuthError::DuplicateCode => StatusCode::UNAUTHORIZED,
            AuthError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Read(_) | AuthError::Decode(_) | AuthError::MissingLogin => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthError::Declined => StatusCode::OK,
        }
    }

    /// Message for the error surface; details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::BadRequest
            | AuthError::MissingCode
            | AuthError::DuplicateCode
            | AuthError::Declined => "There was an error authenticating your account.",
            AuthError::Transport(_) => "GitHub seems to have troubles :/",
            AuthError::Read(_) | AuthError::Decode(_) | AuthError::MissingLogin => {
                "Uh oh! Please report this :("
            }
        }
    }
}

/// Requires exactly one `code` parameter among the callback's query pairs.
pub fn extract_single_code(params: &[(String, String)]) -> Result<&str, AuthError> {
    let mut codes = params
        .iter()
        .filter(|(key, _)| key == "code")
        .map(|(_, value)| value.as_str());
    let code = codes.next().ok_or(AuthError::MissingCode)?;
    if codes.next().is_some() {
        return Err(AuthError::DuplicateCode);
    }
    Ok(code)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenResponse {
    Granted {
        access_token: String,
    },
    Declined {
        #[serde(default)]
        error: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    #[serde(default)]
    login: Option<String>,
}

#[derive(Clone)]
pub struct GitHubOAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    authorize_url: String,
    token_url: String,
    user_url: String,
}

impl GitHubOAuth {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: GITHUB_AUTHORIZE_URL.to_string(),
            token_url: GITHUB_TOKEN_URL.to_string(),
            user_url: GITHUB_USER_URL.to_string(),
        }
    }

    /// Points the client at a different provider host (GitHub Enterprise,
    /// local stubs in tests).
    pub fn with_endpoints(
        mut self,
        authorize_url: impl Into<String>,
        token_url: impl Into<String>,
        user_url: impl Into<String>,
    ) -> Self {
        self.authorize_url = authorize_url.into();
        self.token_url = token_url.into();
        self.user_url = user_url.into();
        self
    }

    /// Step 1: the URL the contributor is redirected to.
    pub fn authorize_redirect_url(&self, callback_url: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}",
            self.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(callback_url),
            urlencoding::encode(OAUTH_SCOPE)
        )
    }

    /// Step 2: exchange the authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .timeout(REQUEST_TIMEOUT)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
            }))
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let body = response.text().await.map_err(AuthError::Read)?;
        match serde_json::from_str(&body)? {
            TokenResponse::Granted { access_token } => Ok(access_token),
            TokenResponse::Declined { error } => {
                debug!("GitHub declined the authorization code: {:?}", error);
                Err(AuthError::Declined)
            }
        }
    }

    /// Step 3: resolve the access token to the caller's login.
    pub async fn fetch_login(&self, access_token: &str) -> Result<String, AuthError> {
        let url = format!(
            "{}?access_token={}",
            self.user_url,
            urlencoding::encode(access_token)
        );

        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let body = response.text().await.map_err(AuthError::Read)?;
        let user: UserResponse = serde_json::from_str(&body)?;
        match user.login {
            Some(login) => Ok(login),
            None => {
                warn!("Obtaining the login from the identity response failed");
                Err(AuthError::MissingLogin)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_single_code() {
        let params = pairs(&[("state", "x"), ("code", "abc123")]);
        assert_eq!(extract_single_code(&params).unwrap(), "abc123");

        let none = pairs(&[("state", "x")]);
        assert!(matches!(
            extract_single_code(&none),
            Err(AuthError::MissingCode)
        ));

        let twice = pairs(&[("code", "abc"), ("code", "def")]);
        assert!(matches!(
            extract_single_code(&twice),
            Err(AuthError::DuplicateCode)
        ));
    }

    #[test]
    fn test_authorize_redirect_url_encodes_parameters() {
        let oauth = GitHubOAuth::new("client&id", "secret");
        let url = oauth.authorize_redirect_url("http://localhost:8080/auth/callback");

        assert!(url.starts_with(GITHUB_AUTHORIZE_URL));
        assert!(url.contains("client_id=client%26id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fcallback"));
        assert!(url.contains("scope=user"));
    }

    #[test]
    fn test_error_surface_mapping() {
        assert_eq!(AuthError::MissingCode.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::DuplicateCode.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Declined.status(), StatusCode::OK);
        assert_eq!(
            AuthError::MissingLogin.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::MissingLogin.public_message(),
            "Uh oh! Please report this :("
        );
    }

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn stubbed(base: &str) -> GitHubOAuth {
        GitHubOAuth::new("id", "secret").with_endpoints(
            format!("{base}/authorize"),
            format!("{base}/token"),
            format!("{base}/user"),
        )
    }

    #[tokio::test]
    async fn test_exchange_code_happy_path() {
        let router = Router::new().route(
            "/token",
            post(|| async { Json(serde_json::json!({"access_token": "t0ken"})) }),
        );
        let base = spawn_stub(router).await;

        let token = stubbed(&base).exchange_code("abc123").await.unwrap();
        assert_eq!(token, "t0ken");
    }

    #[tokio::test]
    async fn test_exchange_code_declined() {
        let router = Router::new().route(
            "/token",
            post(|| async { Json(serde_json::json!({"error": "bad_verification_code"})) }),
        );
        let base = spawn_stub(router).await;

        let err = stubbed(&base).exchange_code("stale").await.unwrap_err();
        assert!(matches!(err, AuthError::Declined));
        assert_eq!(err.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_exchange_code_malformed_body() {
        let router = Router::new().route("/token", post(|| async { "got that wrong" }));
        let base = spawn_stub(router).await;

        let err = stubbed(&base).exchange_code("abc").await.unwrap_err();
        assert!(matches!(err, AuthError::Decode(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_exchange_code_transport_failure() {
        // Nothing listens on the discard port.
        let oauth = GitHubOAuth::new("id", "secret").with_endpoints(
            "http://127.0.0.1:9/authorize",
            "http://127.0.0.1:9/token",
            "http://127.0.0.1:9/user",
        );

        let err = oauth.exchange_code("abc").await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_fetch_login_happy_path() {
        let router = Router::new().route(
            "/user",
            get(|| async { Json(serde_json::json!({"login": "alice", "id": 1})) }),
        );
        let base = spawn_stub(router).await;

        let login = stubbed(&base).fetch_login("t0ken").await.unwrap();
        assert_eq!(login, "alice");
    }

    #[tokio::test]
    async fn test_fetch_login_missing_field() {
        let router = Router::new().route(
            "/user",
            get(|| async { Json(serde_json::json!({"id": 1})) }),
        );
        let base = spawn_stub(router).await;

        let err = stubbed(&base).fetch_login("t0ken").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingLogin));
    }
}
