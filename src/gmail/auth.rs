//! OAuth authentication for Gmail API
//!
//! Handles OAuth 2.0 authentication flow including:
//! - Loading client credentials
//! - Interactive browser-based authentication
//! - Token storage and refresh

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use yup_oauth2::ApplicationSecret;

use crate::config::Config;
use crate::error::{AuthError, GmailMcpError, Result};

/// Refresh tokens this many seconds before they expire
const EXPIRY_MARGIN_SECS: i64 = 300;

const CALLBACK_OK: &str =
    "<html><body><h1>Authentication successful!</h1><p>You can close this window.</p></body></html>";
const CALLBACK_DENIED: &str =
    "<html><body><h1>Authentication cancelled</h1><p>Access was not granted. You can close this window.</p></body></html>";
const CALLBACK_NO_CODE: &str =
    "<html><body><h1>Authentication failed</h1><p>No authorization code received.</p></body></html>";

/// Stored OAuth token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    /// Access token
    pub access_token: String,

    /// Refresh token
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry timestamp (Unix seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Scopes
    #[serde(default)]
    pub scope: String,
}

impl StoredToken {
    /// Whether the token expires within the refresh margin
    pub fn needs_refresh(&self, now: i64) -> bool {
        self.expiry_date
            .map(|expiry| expiry - now < EXPIRY_MARGIN_SECS)
            .unwrap_or(false)
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token response from OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: String,
}

impl TokenResponse {
    fn into_stored(self, fallback_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(fallback_refresh),
            token_type: self.token_type,
            expiry_date: self.expires_in.map(|e| unix_now() + e),
            scope: self.scope,
        }
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Read the consent redirect's query: `Ok(code)` on consent, `Err(reason)`
/// when Google sent `error=`, `None` when it carried neither
fn callback_outcome(
    params: &HashMap<String, String>,
) -> Option<std::result::Result<String, String>> {
    match (params.get("code"), params.get("error")) {
        (Some(code), _) => Some(Ok(code.clone())),
        (None, Some(error)) => Some(Err(error.clone())),
        (None, None) => None,
    }
}

fn authorization_code(outcome: std::result::Result<String, String>) -> Result<String> {
    outcome.map_err(|reason| {
        GmailMcpError::Auth(AuthError::CallbackError {
            message: format!("authorization denied: {}", reason),
        })
    })
}

/// Parse a Google client secret file ("installed" or "web" credentials)
pub fn parse_client_secret(content: &str) -> Result<ApplicationSecret> {
    yup_oauth2::parse_application_secret(content).map_err(|e| {
        GmailMcpError::Auth(AuthError::InvalidCredentials {
            message: e.to_string(),
        })
    })
}

/// OAuth authenticator
pub struct Authenticator {
    /// Configuration
    config: Config,

    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth client credentials
    secret: ApplicationSecret,

    /// Current token
    token: Arc<RwLock<Option<StoredToken>>>,
}

impl Authenticator {
    /// Create a new authenticator
    pub async fn new(config: Config) -> Result<Self> {
        if let Ok(cwd) = std::env::current_dir() {
            if config.adopt_local_credentials(&cwd)? {
                info!("Copied credentials.json into {}", config.credentials_path.display());
            }
        }

        let secret = Self::load_client_secret(&config.credentials_path)?;

        let auth = Self {
            config,
            http_client: reqwest::Client::new(),
            secret,
            token: Arc::new(RwLock::new(None)),
        };

        if auth.config.token_exists() {
            match auth.load_token().await {
                Ok(token) => {
                    info!("Loaded existing token from {}", auth.config.token_path.display());
                    *auth.token.write().await = Some(token);
                }
                Err(e) => warn!("Failed to load token: {}", e),
            }
        }

        Ok(auth)
    }

    /// Load OAuth client credentials from file
    fn load_client_secret(path: &Path) -> Result<ApplicationSecret> {
        if !path.exists() {
            return Err(GmailMcpError::Auth(AuthError::CredentialsFileNotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        parse_client_secret(&content)
    }

    /// Load stored token from file
    async fn load_token(&self) -> Result<StoredToken> {
        let content = tokio::fs::read_to_string(&self.config.token_path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save token to file
    async fn save_token(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.config.token_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.config.token_path, content).await?;
        info!("Saved token to {}", self.config.token_path.display());
        Ok(())
    }

    /// Check if we have a token
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Get a valid access token, refreshing if necessary
    pub async fn get_access_token(&self) -> Result<String> {
        let needs_refresh = match self.token.read().await.as_ref() {
            Some(token) if !token.needs_refresh(unix_now()) => {
                return Ok(token.access_token.clone());
            }
            Some(_) => true,
            None => false,
        };

        if needs_refresh {
            return self.refresh_token().await;
        }

        Err(GmailMcpError::Auth(AuthError::TokenNotFound {
            path: self.config.token_path.display().to_string(),
        }))
    }

    /// Refresh the access token using the refresh token
    async fn refresh_token(&self) -> Result<String> {
        let refresh_token = self
            .token
            .read()
            .await
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .ok_or_else(|| {
                GmailMcpError::Auth(AuthError::TokenRefreshFailed {
                    message: "No refresh token available".to_string(),
                })
            })?;

        let token_response = self
            .token_request(
                &[
                    ("refresh_token", refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ],
                |message| AuthError::TokenRefreshFailed { message },
            )
            .await?;
        let token = token_response.into_stored(Some(refresh_token));

        self.save_token(&token).await?;
        *self.token.write().await = Some(token.clone());
        info!("Refreshed expired access token");

        Ok(token.access_token)
    }

    /// POST a grant to the token endpoint with the client credentials attached
    async fn token_request(
        &self,
        grant: &[(&str, &str)],
        on_failure: impl FnOnce(String) -> AuthError,
    ) -> Result<TokenResponse> {
        let mut form = vec![
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http_client
            .post(&self.secret.token_uri)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Auth(on_failure(format!("{}: {}", status, text))));
        }

        Ok(response.json().await?)
    }

    /// Generate the authorization URL
    pub fn generate_auth_url(&self) -> String {
        let scopes = self.config.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.secret.auth_uri,
            urlencoding::encode(&self.secret.client_id),
            urlencoding::encode(&self.config.oauth_callback_url),
            urlencoding::encode(&scopes)
        )
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken> {
        let token_response = self
            .token_request(
                &[
                    ("code", code),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", self.config.oauth_callback_url.as_str()),
                ],
                |message| AuthError::TokenExchangeFailed { message },
            )
            .await?;
        let token = token_response.into_stored(None);

        self.save_token(&token).await?;
        *self.token.write().await = Some(token.clone());

        Ok(token)
    }

    /// Run interactive authentication flow with local HTTP server
    pub async fn authenticate_interactive(&self) -> Result<()> {
        use axum::{extract::Query, response::Html, routing::get, Router};
        use tokio::sync::oneshot;

        let auth_url = self.generate_auth_url();
        eprintln!("\nPlease visit this URL to authenticate:");
        eprintln!("{}\n", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Could not open browser automatically: {}", e);
            eprintln!("Please open the URL manually.");
        }

        let (tx, rx) = oneshot::channel::<std::result::Result<String, String>>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let callback_handler = move |Query(params): Query<HashMap<String, String>>| async move {
            let Some(outcome) = callback_outcome(&params) else {
                return Html(CALLBACK_NO_CODE);
            };
            let page = if outcome.is_ok() {
                CALLBACK_OK
            } else {
                CALLBACK_DENIED
            };
            if let Some(tx) = tx.lock().ok().and_then(|mut guard| guard.take()) {
                let _ = tx.send(outcome);
            }
            Html(page)
        };

        let app = Router::new().route("/oauth2callback", get(callback_handler));

        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.config.oauth_callback_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        eprintln!(
            "Waiting for authentication callback on port {}...",
            self.config.oauth_callback_port
        );

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    return Err(GmailMcpError::Auth(AuthError::CallbackError {
                        message: e.to_string(),
                    }));
                }
            }
            outcome = rx => {
                let outcome = outcome.map_err(|_| GmailMcpError::Auth(AuthError::NoAuthCode))?;
                let code = authorization_code(outcome)?;
                eprintln!("Received authorization code, exchanging for tokens...");
                self.exchange_code(&code).await?;
            }
        }

        Ok(())
    }
}
