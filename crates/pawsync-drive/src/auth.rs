//! OAuth2 PKCE authorization flow for Google Drive
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) for a native
//! desktop client. The consent page is opened in the user's browser and the
//! redirect is received by a short-lived HTTP listener on the loopback
//! interface.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Client id, secret, endpoints and scopes
//! - [`PKCEFlow`] - Authorization URL, code exchange and token refresh
//! - [`LocalCallbackServer`] - Loopback listener for the OAuth redirect
//! - [`GoogleConsentAdapter`] - Implements [`IConsentProvider`] on top of the above

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse,
    TokenUrl,
};
use pawsync_core::config::AuthConfig;
use pawsync_core::domain::AccessToken;
use pawsync_core::ports::{ConsentError, Grant, IConsentProvider};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

/// Google OAuth2 authorization endpoint
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google OAuth2 revocation endpoint
const REVOCATION_URL: &str = "https://oauth2.googleapis.com/revoke";

/// Per-file access: the app only sees files it created
const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Path the loopback listener answers on
const CALLBACK_PATH: &str = "/callback";

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// How long the user has to finish the consent page
const DEFAULT_CALLBACK_TIMEOUT: StdDuration = StdDuration::from_secs(300);

/// Bind attempts before the callback listener is reported as not ready
const BIND_ATTEMPTS: u32 = 5;

/// Delay before the first bind retry; doubled after each attempt
const BIND_INITIAL_BACKOFF: StdDuration = StdDuration::from_millis(100);

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 PKCE authorization flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// OAuth client ID from the Google Cloud console
    pub client_id: String,
    /// Client secret; Google issues one even for desktop clients
    pub client_secret: Option<String>,
    /// Loopback port for the redirect (0 picks a free port)
    pub redirect_port: u16,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub revocation_url: String,
}

impl OAuth2Config {
    /// Creates a config for the given client id with Google's endpoints
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_port: 8400,
            scopes: vec![DRIVE_FILE_SCOPE.to_string()],
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            revocation_url: REVOCATION_URL.to_string(),
        }
    }

    /// Builds the config from the `auth` section
    ///
    /// # Errors
    /// [`ConsentError::NotConfigured`] when no client id is set
    pub fn from_auth_config(auth: &AuthConfig) -> Result<Self, ConsentError> {
        let client_id = auth
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ConsentError::NotConfigured)?;

        let mut config = Self::new(client_id).with_redirect_port(auth.redirect_port);
        if let Some(secret) = auth.client_secret.as_deref().filter(|s| !s.is_empty()) {
            config = config.with_client_secret(secret);
        }
        Ok(config)
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Overrides the authority endpoints (useful for testing)
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        revocation_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self.revocation_url = revocation_url.into();
        self
    }
}

/// Redirect URI for a loopback listener on `port`
pub fn redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{port}{CALLBACK_PATH}")
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
///
/// Handles generating authorization URLs with PKCE challenges,
/// exchanging authorization codes for tokens, and refreshing tokens.
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    scopes: Vec<String>,
    http: reqwest::Client,
}

impl PKCEFlow {
    /// Creates a flow for `config` that redirects to `redirect_uri`
    pub fn new(config: &OAuth2Config, redirect_uri: &str) -> Result<Self, ConsentError> {
        if config.client_id.trim().is_empty() {
            return Err(ConsentError::NotConfigured);
        }

        let invalid = |what: &str, e: oauth2::url::ParseError| {
            ConsentError::Failed(format!("Invalid {what}: {e}"))
        };

        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(
                AuthUrl::new(config.auth_url.clone()).map_err(|e| invalid("authorization URL", e))?,
            )
            .set_token_uri(
                TokenUrl::new(config.token_url.clone()).map_err(|e| invalid("token URL", e))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(redirect_uri.to_string()).map_err(|e| invalid("redirect URI", e))?,
            );
        if let Some(secret) = &config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConsentError::NotReady(format!("HTTP client unavailable: {e}")))?;

        Ok(Self {
            client,
            scopes: config.scopes.clone(),
            http,
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Requests offline access and forces the consent prompt so that Google
    /// hands out a refresh token on every connect.
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    /// The `pkce_verifier` must be kept until the code exchange step.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self.client.authorize_url(CsrfToken::new_random);
        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for tokens
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Grant, ConsentError> {
        info!("Exchanging authorization code for tokens");

        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http)
            .await
            .map_err(|e| ConsentError::Failed(format!("Token exchange failed: {e}")))?;

        grant_from_response(&response)
    }

    /// Obtains a new access token with a refresh token, without user interaction
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Grant, ConsentError> {
        debug!("Refreshing access token");

        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| ConsentError::Failed(format!("Token refresh failed: {e}")))?;

        grant_from_response(&response)
    }
}

fn grant_from_response(response: &BasicTokenResponse) -> Result<Grant, ConsentError> {
    let access_token = AccessToken::new(response.access_token().secret().as_str())
        .map_err(|e| ConsentError::Failed(e.to_string()))?;

    let expires_in = response
        .expires_in()
        .and_then(|d| Duration::from_std(d).ok())
        .unwrap_or_else(|| Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));

    Ok(Grant {
        access_token,
        refresh_token: response.refresh_token().map(|t| t.secret().to_string()),
        expires_in,
    })
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// What the authority sent back to the redirect URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackParams {
    /// Consent granted
    Code { code: String, state: String },
    /// Consent refused or failed on the authority's side
    Error {
        error: String,
        description: Option<String>,
        state: String,
    },
}

impl CallbackParams {
    pub fn state(&self) -> &str {
        match self {
            CallbackParams::Code { state, .. } | CallbackParams::Error { state, .. } => state,
        }
    }
}

/// Minimal HTTP server that listens on the loopback interface for the OAuth2 redirect.
///
/// Binding happens before the browser is opened, so a port that is still
/// held by a previous run is detected up front and reported as
/// [`ConsentError::NotReady`].
pub struct LocalCallbackServer {
    listener: TcpListener,
    port: u16,
}

impl LocalCallbackServer {
    /// Binds `127.0.0.1:port`, retrying with exponential backoff
    pub async fn bind(port: u16) -> Result<Self, ConsentError> {
        let mut delay = BIND_INITIAL_BACKOFF;
        let mut attempt = 1;

        loop {
            match TcpListener::bind(("127.0.0.1", port)).await {
                Ok(listener) => {
                    let port = listener
                        .local_addr()
                        .map_err(|e| ConsentError::NotReady(e.to_string()))?
                        .port();
                    info!(port, "OAuth callback listener ready");
                    return Ok(Self { listener, port });
                }
                Err(e) if attempt < BIND_ATTEMPTS => {
                    debug!(port, attempt, error = %e, "Callback listener bind failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ConsentError::NotReady(format!(
                        "cannot listen on 127.0.0.1:{port}: {e}"
                    )));
                }
            }
        }
    }

    /// Port the listener is bound to
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serves connections until the redirect arrives or `timeout` elapses
    ///
    /// Requests for other paths (e.g. `/favicon.ico`) get a 404 and do not
    /// end the wait.
    pub async fn wait_for_callback(
        self,
        timeout: StdDuration,
    ) -> Result<CallbackParams, ConsentError> {
        let (tx, mut rx) = oneshot::channel::<CallbackParams>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(ConsentError::Failed(
                        "timed out waiting for the authorization callback".to_string(),
                    ));
                }
                received = &mut rx => {
                    let params = received.map_err(|_| {
                        ConsentError::Failed("callback channel closed".to_string())
                    })?;
                    info!("Received OAuth callback");
                    return Ok(params);
                }
                accepted = self.listener.accept() => {
                    let (stream, _addr) = accepted.map_err(|e| {
                        ConsentError::Failed(format!("callback listener failed: {e}"))
                    })?;
                    let tx = tx.clone();
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let tx = tx.clone();
                        async move { Ok::<_, Infallible>(handle_callback(req, tx).await) }
                    });
                    tokio::spawn(async move {
                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            warn!("Callback server connection error: {}", e);
                        }
                    });
                }
            }
        }
    }
}

async fn handle_callback(
    req: Request<hyper::body::Incoming>,
    tx: Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>,
) -> Response<Full<Bytes>> {
    debug!("Callback server received request: {}", req.uri().path());

    if req.uri().path() != CALLBACK_PATH {
        return html_response(StatusCode::NOT_FOUND, error_html("Not found"));
    }

    let Some(params) = req.uri().query().and_then(parse_callback_params) else {
        return html_response(
            StatusCode::BAD_REQUEST,
            error_html("Missing authorization code in callback"),
        );
    };

    let page = match &params {
        CallbackParams::Code { .. } => html_response(StatusCode::OK, success_html()),
        CallbackParams::Error { error, .. } if error == "access_denied" => html_response(
            StatusCode::OK,
            error_html("Access to Google Drive was denied."),
        ),
        CallbackParams::Error { error, .. } => {
            html_response(StatusCode::OK, error_html(&format!("Authorization failed: {error}")))
        }
    };

    if let Some(sender) = tx.lock().await.take() {
        let _ = sender.send(params);
    }
    page
}

/// Parses the callback query string (without the leading `?`)
pub fn parse_callback_params(query: &str) -> Option<CallbackParams> {
    let mut code = None;
    let mut error = None;
    let mut description = None;
    let mut state = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    let state = state.unwrap_or_default();
    match (code, error) {
        (_, Some(error)) => Some(CallbackParams::Error {
            error,
            description,
            state,
        }),
        (Some(code), None) => Some(CallbackParams::Code { code, state }),
        (None, None) => None,
    }
}

fn html_response(status: StatusCode, html: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(html)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// Returns the HTML for a successful authorization page
fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>PawSync - Google Drive Connected</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Google Drive Connected</h1>
    <p>PawSync can now back up your training sessions.</p>
    <p>You can close this window and return to the terminal.</p>
</body>
</html>"#
        .to_string()
}

/// Escapes text for embedding in an HTML element body
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Returns the HTML for an authorization error page; `message` is escaped
fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>PawSync - Authorization Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Error</h1>
    <p>{}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#,
        escape_html(message)
    )
}

// ============================================================================
// GoogleConsentAdapter
// ============================================================================

/// Callback invoked with the authorization URL before waiting for the redirect
pub type AuthorizeUrlHook = Arc<dyn Fn(&str) + Send + Sync>;

/// [`IConsentProvider`] implementation for Google
///
/// 1. Binds the loopback listener
/// 2. Generates a PKCE-secured authorization URL
/// 3. Opens the browser (or hands the URL to the hook)
/// 4. Waits for the redirect and checks the CSRF state
/// 5. Exchanges the authorization code for tokens
pub struct GoogleConsentAdapter {
    config: OAuth2Config,
    open_browser: bool,
    callback_timeout: StdDuration,
    on_authorize_url: Option<AuthorizeUrlHook>,
    http: reqwest::Client,
}

impl GoogleConsentAdapter {
    pub fn new(config: OAuth2Config) -> Self {
        Self {
            config,
            open_browser: true,
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            on_authorize_url: None,
            http: reqwest::Client::new(),
        }
    }

    /// Builds the adapter from the `auth` section
    pub fn from_auth_config(auth: &AuthConfig) -> Result<Self, ConsentError> {
        Ok(Self::new(OAuth2Config::from_auth_config(auth)?).with_open_browser(auth.open_browser))
    }

    pub fn with_open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: StdDuration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Registers a hook that receives the authorization URL
    pub fn with_authorize_url_hook(mut self, hook: AuthorizeUrlHook) -> Self {
        self.on_authorize_url = Some(hook);
        self
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }
}

#[async_trait::async_trait]
impl IConsentProvider for GoogleConsentAdapter {
    async fn request_consent(&self) -> Result<Grant, ConsentError> {
        info!("Starting OAuth2 PKCE consent flow");

        // Bind first: the redirect URI must carry the real port
        let server = LocalCallbackServer::bind(self.config.redirect_port).await?;
        let flow = PKCEFlow::new(&self.config, &redirect_uri(server.port()))?;
        let (auth_url, csrf_token, pkce_verifier) = flow.generate_auth_url();

        if let Some(hook) = &self.on_authorize_url {
            hook(&auth_url);
        }
        if self.open_browser {
            info!("Opening browser for authorization");
            webbrowser::open(&auth_url)
                .map_err(|e| ConsentError::BrowserUnavailable(e.to_string()))?;
        }

        let params = server.wait_for_callback(self.callback_timeout).await?;
        if params.state() != csrf_token.secret().as_str() {
            return Err(ConsentError::Failed(
                "state parameter mismatch in callback".to_string(),
            ));
        }

        match params {
            CallbackParams::Code { code, .. } => {
                let grant = flow.exchange_code(code, pkce_verifier).await?;
                info!("OAuth2 consent completed");
                Ok(grant)
            }
            CallbackParams::Error {
                error, description, ..
            } => {
                let detail = description.unwrap_or_else(|| error.clone());
                if error == "access_denied" {
                    Err(ConsentError::Denied(detail))
                } else {
                    Err(ConsentError::Failed(detail))
                }
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Grant, ConsentError> {
        let flow = PKCEFlow::new(&self.config, &redirect_uri(self.config.redirect_port))?;
        flow.refresh_token(refresh_token).await
    }

    async fn revoke(&self, token: &AccessToken) -> Result<(), ConsentError> {
        let response = self
            .http
            .post(&self.config.revocation_url)
            .form(&[("token", token.secret())])
            .send()
            .await
            .map_err(|e| ConsentError::Failed(format!("Revocation request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConsentError::Failed(format!(
                "Revocation failed ({}): {}",
                status.as_u16(),
                body
            )));
        }

        info!("Revoked Google Drive token");
        Ok(())
    }
}
