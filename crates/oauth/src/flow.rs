use std::{
    net::{SocketAddr, ToSocketAddrs},
    sync::{Arc, Mutex},
};

use {
    axum::{
        Router,
        extract::{Query, State},
        http::StatusCode,
        response::{Html, IntoResponse, Response},
        routing::get,
    },
    secrecy::{ExposeSecret, SecretString},
    serde::Deserialize,
    tokio::sync::{Notify, oneshot},
    tracing::{info, warn},
    url::Url,
};

use jiro_config::Config;

use crate::{
    discovery::{self, ATLASSIAN_ISSUER_URL},
    error::FlowError,
    pkce,
    storage::TokenStore,
    types::{PkceChallenge, TokenResponse, TokenSet, now_epoch_secs},
};

/// Audience required for tokens that may call the Atlassian API gateway.
const AUDIENCE: &str = "api.atlassian.com";

const SUCCESS_PAGE: &str =
    "<h1>Authorization complete</h1><p>You can close this window and return to the terminal.</p>";

/// Authorization flow states, observable while a flow is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    NotStarted,
    AwaitingUserConsent,
    AwaitingCallback,
    Completed,
    Failed,
}

// ── Flow driver ──────────────────────────────────────────────────────────────

/// Drives one OAuth 2.0 authorization-code exchange with PKCE.
///
/// The flow opens the consent URL in the user's browser, catches the
/// redirect on a short-lived local listener, exchanges the code for
/// tokens and persists them. [`AuthorizationFlow::run`] resolves only
/// once the listener has fully shut down, so the process can exit
/// safely afterwards.
pub struct AuthorizationFlow {
    config: Config,
    store: TokenStore,
    http: reqwest::Client,
    issuer_url: String,
    open_browser: bool,
    state: Arc<Mutex<FlowState>>,
    authorize_url: Mutex<Option<String>>,
}

impl AuthorizationFlow {
    pub fn new(config: Config, store: TokenStore) -> Self {
        Self {
            config,
            store,
            http: reqwest::Client::new(),
            issuer_url: ATLASSIAN_ISSUER_URL.to_string(),
            open_browser: true,
            state: Arc::new(Mutex::new(FlowState::NotStarted)),
            authorize_url: Mutex::new(None),
        }
    }

    /// Point discovery at a different issuer (useful for testing).
    pub fn with_issuer_url(mut self, issuer_url: impl Into<String>) -> Self {
        self.issuer_url = issuer_url.into();
        self
    }

    /// Suppress the browser launch; the consent URL is still logged and
    /// available through [`AuthorizationFlow::authorization_url`].
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    /// Current state of this flow.
    pub fn state(&self) -> FlowState {
        *self.state.lock().unwrap()
    }

    /// Consent URL of the in-flight attempt, once it has been built.
    pub fn authorization_url(&self) -> Option<String> {
        self.authorize_url.lock().unwrap().clone()
    }

    /// Run the flow to completion.
    ///
    /// Suspends until the callback listener has closed; that closure is
    /// the sole termination condition, whichever of completed or failed
    /// settles it.
    pub async fn run(&self) -> Result<TokenSet, FlowError> {
        let result = self.drive().await;
        let final_state = match result {
            Ok(_) => FlowState::Completed,
            Err(_) => FlowState::Failed,
        };
        *self.state.lock().unwrap() = final_state;
        result
    }

    async fn drive(&self) -> Result<TokenSet, FlowError> {
        self.config.require_flow_fields()?;
        *self.state.lock().unwrap() = FlowState::AwaitingUserConsent;

        let redirect = RedirectTarget::parse(&self.config.redirect_uri)?;

        // A second login against the same port must fail here, with a
        // clear error, before any browser opens.
        let listener = match tokio::net::TcpListener::bind(redirect.addr).await {
            Ok(listener) => listener,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                return Err(FlowError::CallbackInUse {
                    addr: redirect.addr,
                    source: e,
                });
            },
            Err(e) => {
                return Err(FlowError::CallbackBind {
                    addr: redirect.addr,
                    source: e,
                });
            },
        };

        let metadata = discovery::discover(&self.http, &self.issuer_url).await?;
        let challenge = PkceChallenge::generate();
        let state_param = pkce::generate_state();
        let authorize_url = self.build_authorize_url(&metadata.authorization_endpoint, &challenge, &state_param);
        *self.authorize_url.lock().unwrap() = Some(authorize_url.clone());

        info!(url = %authorize_url, "opening browser for authorization");
        if self.open_browser
            && let Err(e) = open::that(&authorize_url)
        {
            warn!(error = %e, "could not open browser; visit the URL above to continue");
        }

        let (outcome_tx, mut outcome_rx) = oneshot::channel();
        let shutdown = Arc::new(Notify::new());
        let ctx = Arc::new(CallbackContext {
            exchange: ExchangeContext {
                http: self.http.clone(),
                token_endpoint: metadata.token_endpoint,
                client_id: self.config.client_id.clone(),
                client_secret: self.config.client_secret.clone(),
                redirect_uri: self.config.redirect_uri.clone(),
                verifier: challenge.verifier,
                expected_state: state_param,
                store: self.store.clone(),
            },
            flow_state: Arc::clone(&self.state),
            outcome: Mutex::new(Some(outcome_tx)),
            shutdown: Arc::clone(&shutdown),
        });

        let app = Router::new()
            .route(&redirect.path, get(callback))
            .fallback(not_found)
            .with_state(ctx);

        *self.state.lock().unwrap() = FlowState::AwaitingCallback;

        // The callback handler settles the outcome exactly once and
        // triggers shutdown as a side effect of settling. Awaiting the
        // server therefore awaits full listener closure.
        axum::serve(listener, app)
            .with_graceful_shutdown({
                let shutdown = Arc::clone(&shutdown);
                async move { shutdown.notified().await }
            })
            .await
            .map_err(FlowError::Listener)?;

        match outcome_rx.try_recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(FlowError::ListenerClosed),
        }
    }

    fn build_authorize_url(
        &self,
        authorization_endpoint: &str,
        challenge: &PkceChallenge,
        state: &str,
    ) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scope())
            .append_pair("state", state)
            .append_pair("code_challenge", &challenge.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("audience", AUDIENCE)
            // Force the consent screen instead of reusing a stale session.
            .append_pair("prompt", "consent")
            .finish();
        format!("{authorization_endpoint}?{query}")
    }
}

// ── Callback listener ────────────────────────────────────────────────────────

/// Host/port/path the local listener serves, parsed from the redirect URI.
struct RedirectTarget {
    addr: SocketAddr,
    path: String,
}

impl RedirectTarget {
    fn parse(redirect_uri: &str) -> Result<Self, FlowError> {
        let invalid = |reason: String| FlowError::InvalidRedirectUri {
            uri: redirect_uri.to_string(),
            reason,
        };

        let url = Url::parse(redirect_uri).map_err(|e| invalid(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("host does not resolve".to_string()))?;

        Ok(Self {
            addr,
            path: url.path().to_string(),
        })
    }
}

struct CallbackContext {
    exchange: ExchangeContext,
    flow_state: Arc<Mutex<FlowState>>,
    outcome: Mutex<Option<oneshot::Sender<Result<TokenSet, FlowError>>>>,
    shutdown: Arc<Notify>,
}

struct ExchangeContext {
    http: reqwest::Client,
    token_endpoint: String,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    verifier: String,
    expected_state: String,
    store: TokenStore,
}

/// Query parameters the authorization server appends to the redirect.
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(ctx): State<Arc<CallbackContext>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    // Only the first callback settles the flow; a stray duplicate after
    // settling is treated like any other unmatched request.
    let Some(outcome_tx) = ctx.outcome.lock().unwrap().take() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let result = exchange(&ctx.exchange, params).await;
    let response = match &result {
        Ok(_) => {
            *ctx.flow_state.lock().unwrap() = FlowState::Completed;
            Html(SUCCESS_PAGE).into_response()
        },
        Err(e) => {
            warn!(error = %e, "authorization callback failed");
            *ctx.flow_state.lock().unwrap() = FlowState::Failed;
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Authorization error: {e}"))
                .into_response()
        },
    };

    let _ = outcome_tx.send(result);
    ctx.shutdown.notify_one();
    response
}

/// Anything off the callback path gets a 404 and leaves the flow alone.
async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn exchange(ctx: &ExchangeContext, params: CallbackParams) -> Result<TokenSet, FlowError> {
    if let Some(error) = params.error {
        return Err(FlowError::Denied {
            error,
            description: params.error_description.unwrap_or_default(),
        });
    }
    let code = params.code.ok_or(FlowError::MissingCode)?;
    if params.state.as_deref() != Some(ctx.expected_state.as_str()) {
        return Err(FlowError::StateMismatch);
    }

    let form = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("redirect_uri", ctx.redirect_uri.as_str()),
        ("client_id", ctx.client_id.as_str()),
        ("client_secret", ctx.client_secret.expose_secret().as_str()),
        ("code_verifier", ctx.verifier.as_str()),
    ];
    let resp = ctx
        .http
        .post(&ctx.token_endpoint)
        .form(&form)
        .send()
        .await
        .map_err(FlowError::ExchangeTransport)?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FlowError::Exchange {
            status: status.as_u16(),
            body,
        });
    }
    let parsed: TokenResponse = resp.json().await.map_err(FlowError::ExchangeTransport)?;

    let tokens = TokenSet::from_response(parsed, now_epoch_secs());
    ctx.store.save(&tokens).map_err(FlowError::Store)?;
    info!("authorization complete, tokens stored");
    Ok(tokens)
}
