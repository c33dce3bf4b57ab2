use std::net::SocketAddr;

/// Issuer metadata discovery failures.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to fetch issuer metadata: {0}")]
    Http(#[from] reqwest::Error),

    #[error("issuer metadata endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },
}

/// Token lifecycle failures outside a browser flow.
///
/// Fatal: the operator has to re-run `jiro auth login`. Nothing here
/// triggers a flow automatically.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token record exists yet.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The stored token is stale and cannot be refreshed.
    #[error("reauthentication required")]
    ReauthenticationRequired,

    #[error("token store error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Authorization-code flow failures. Only the in-flight flow fails;
/// stored tokens and process state are untouched.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Config(#[from] jiro_config::ConfigError),

    #[error("redirect_uri `{uri}` is not usable: {reason}")]
    InvalidRedirectUri { uri: String, reason: String },

    #[error("callback address {addr} is already in use (is another login still running?)")]
    CallbackInUse {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind callback listener on {addr}: {source}")]
    CallbackBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("authorization server denied the request: {error} {description}")]
    Denied { error: String, description: String },

    #[error("callback request is missing the authorization code")]
    MissingCode,

    #[error("callback `state` does not match this authorization attempt")]
    StateMismatch,

    #[error("token exchange failed with {status}: {body}")]
    Exchange { status: u16, body: String },

    #[error("token exchange request failed: {0}")]
    ExchangeTransport(#[source] reqwest::Error),

    #[error("failed to persist tokens: {0}")]
    Store(#[source] anyhow::Error),

    #[error("callback listener failed: {0}")]
    Listener(#[source] std::io::Error),

    #[error("callback listener closed before authorization completed")]
    ListenerClosed,
}
