use {
    reqwest::{Method, StatusCode, header::HeaderMap},
    secrecy::ExposeSecret,
    serde_json::Value,
    tracing::debug,
};

use {
    jiro_config::Config,
    jiro_oauth::{AuthError, TokenRefresher, TokenSet, TokenStore},
};

use crate::{
    error::ApiError,
    resources::{API_BASE_URL, CloudResource, ResourceResolver},
};

/// The single entry point external callers use for authenticated calls.
///
/// Each request walks the same pipeline: stored token → refresh when
/// stale → cloud ID resolution → gateway call. The client never starts
/// an authorization flow on its own; with no stored token it fails and
/// leaves the login decision to the operator.
pub struct ApiClient {
    http: reqwest::Client,
    store: TokenStore,
    refresher: TokenRefresher,
    resolver: ResourceResolver,
    api_base_url: String,
}

impl ApiClient {
    pub fn new(config: Config) -> Self {
        let http = reqwest::Client::new();
        let store = TokenStore::new(&config.token_store_dir);
        let refresher = TokenRefresher::new(http.clone(), config.clone(), store.clone());
        let resolver = ResourceResolver::new(http.clone(), config.base_url.clone());

        Self {
            http,
            store,
            refresher,
            resolver,
            api_base_url: API_BASE_URL.to_string(),
        }
    }

    /// Point token refresh at a different issuer (useful for testing).
    pub fn with_issuer_url(mut self, issuer_url: impl Into<String>) -> Self {
        self.refresher = self.refresher.with_issuer_url(issuer_url);
        self
    }

    /// Point resolution at a different endpoint (useful for testing).
    pub fn with_resources_url(mut self, resources_url: impl Into<String>) -> Self {
        self.resolver = self.resolver.with_resources_url(resources_url);
        self
    }

    /// Point gateway calls at a different base URL (useful for testing).
    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    /// Issue an authenticated call against the configured site.
    ///
    /// `path` is the site-relative REST path (e.g.
    /// `/rest/api/3/myself`). A 204 yields `Ok(None)`; any other 2xx is
    /// parsed as JSON; a non-2xx is an [`ApiError`] carrying status and
    /// raw body. Caller headers are applied before `Authorization`, so
    /// they can never override it.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: Option<HeaderMap>,
    ) -> Result<Option<Value>, ApiError> {
        let tokens = self.current_tokens().await?;
        let resource = self.resolver.resolve(&tokens.access_token).await?;

        let url = format!("{}/ex/jira/{}{}", self.api_base_url, resource.id, path);
        debug!(method = %method, %url, "api request");

        let mut req = self
            .http
            .request(method, &url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(mut headers) = headers {
            // Callers can add or replace anything except Authorization.
            headers.remove(reqwest::header::AUTHORIZATION);
            req = req.headers(headers);
        }
        req = req.bearer_auth(tokens.access_token.expose_secret());
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(resp.json().await?))
    }

    /// All sites the current token can address. Backs `jiro whoami`.
    pub async fn accessible_resources(&self) -> Result<Vec<CloudResource>, ApiError> {
        let tokens = self.current_tokens().await?;
        Ok(self.resolver.list(&tokens.access_token).await?)
    }

    /// Yes/no gate for callers that only need to know whether calls can
    /// proceed. The one place an [`AuthError`] is intentionally
    /// swallowed.
    pub async fn ensure_authenticated(&self) -> bool {
        match self.current_tokens().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "not authenticated");
                false
            },
        }
    }

    /// Stored token, refreshed when stale. Absence of a token record
    /// fails here, before any network traffic.
    async fn current_tokens(&self) -> Result<TokenSet, AuthError> {
        let tokens = self
            .store
            .load()
            .map_err(AuthError::Store)?
            .ok_or(AuthError::NotAuthenticated)?;
        self.refresher.ensure_fresh(tokens).await
    }
}
