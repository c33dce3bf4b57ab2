use {
    secrecy::ExposeSecret,
    tracing::{debug, warn},
};

use jiro_config::Config;

use crate::{
    discovery::{self, ATLASSIAN_ISSUER_URL},
    error::AuthError,
    storage::TokenStore,
    types::{TokenResponse, TokenSet, now_epoch_secs},
};

/// Keeps a stored token usable.
///
/// Performs at most one refresh-grant exchange per stale detection and
/// never falls back to a full authorization flow; that decision belongs
/// to the caller.
pub struct TokenRefresher {
    http: reqwest::Client,
    config: Config,
    store: TokenStore,
    issuer_url: String,
}

impl TokenRefresher {
    pub fn new(http: reqwest::Client, config: Config, store: TokenStore) -> Self {
        Self {
            http,
            config,
            store,
            issuer_url: ATLASSIAN_ISSUER_URL.to_string(),
        }
    }

    /// Point discovery at a different issuer (useful for testing).
    pub fn with_issuer_url(mut self, issuer_url: impl Into<String>) -> Self {
        self.issuer_url = issuer_url.into();
        self
    }

    /// Return `tokens` untouched while it is still fresh; otherwise
    /// exchange the refresh token, persist the merged record, and
    /// return it.
    ///
    /// A fresh token means zero network calls. Stale without a refresh
    /// token, or any failed exchange, requires the operator to log in
    /// again.
    pub async fn ensure_fresh(&self, tokens: TokenSet) -> Result<TokenSet, AuthError> {
        if !tokens.is_stale(now_epoch_secs()) {
            return Ok(tokens);
        }
        let Some(refresh_token) = tokens.refresh_token.clone() else {
            warn!("access token is stale and no refresh token is stored");
            return Err(AuthError::ReauthenticationRequired);
        };

        debug!(expires_at = tokens.expires_at, "access token stale, refreshing");
        let metadata = match discovery::discover(&self.http, &self.issuer_url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(error = %e, "issuer discovery failed during refresh");
                return Err(AuthError::ReauthenticationRequired);
            },
        };

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            (
                "client_secret",
                self.config.client_secret.expose_secret().as_str(),
            ),
            ("refresh_token", refresh_token.expose_secret().as_str()),
        ];
        let resp = match self.http.post(&metadata.token_endpoint).form(&form).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "refresh exchange request failed");
                return Err(AuthError::ReauthenticationRequired);
            },
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "token endpoint rejected refresh");
            return Err(AuthError::ReauthenticationRequired);
        }
        let parsed: TokenResponse = match resp.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "malformed refresh response");
                return Err(AuthError::ReauthenticationRequired);
            },
        };

        let merged = tokens.merge_refresh(parsed, now_epoch_secs());
        self.store.save(&merged).map_err(AuthError::Store)?;
        Ok(merged)
    }
}
