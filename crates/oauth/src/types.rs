use {
    secrecy::{ExposeSecret, SecretString},
    serde::{Deserialize, Serialize, Serializer},
};

/// Safety margin before expiry. A token inside this window counts as
/// stale so an in-flight request cannot outlive its token.
pub const STALE_MARGIN_SECS: u64 = 60;

/// Current time as epoch seconds.
pub fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Serialize secret contents. Writing secret material requires this
/// explicit opt-in; `Debug` and friends stay redacted.
pub fn serialize_secret<S: Serializer>(
    secret: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

pub fn serialize_option_secret<S: Serializer>(
    secret: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// A PKCE verifier/challenge pair for one authorization attempt.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

/// Wire shape of a token endpoint response. The authorization-code and
/// refresh-token grants share it.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, relative to now.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// The persisted token record.
///
/// Replaced wholesale on every successful authorization or refresh,
/// never partially updated across unrelated fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: SecretString,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<SecretString>,
    /// Absolute expiry in epoch seconds.
    pub expires_at: u64,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Stale iff the token expires within [`STALE_MARGIN_SECS`] of `now`.
    pub fn is_stale(&self, now: u64) -> bool {
        self.expires_at <= now + STALE_MARGIN_SECS
    }

    /// Build a fresh record from a token endpoint response.
    pub fn from_response(resp: TokenResponse, now: u64) -> Self {
        Self {
            access_token: SecretString::new(resp.access_token),
            refresh_token: resp.refresh_token.map(SecretString::new),
            expires_at: now + resp.expires_in.unwrap_or(0),
            token_type: resp.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: resp.scope,
        }
    }

    /// Merge a refresh response onto `self`.
    ///
    /// The new access token and expiry always win; the refresh token and
    /// scope are carried over when the response omits them; the token
    /// type falls back to `"Bearer"`.
    pub fn merge_refresh(&self, resp: TokenResponse, now: u64) -> Self {
        Self {
            access_token: SecretString::new(resp.access_token),
            refresh_token: resp
                .refresh_token
                .map(SecretString::new)
                .or_else(|| self.refresh_token.clone()),
            expires_at: now + resp.expires_in.unwrap_or(0),
            token_type: resp.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: resp.scope.or_else(|| self.scope.clone()),
        }
    }
}
