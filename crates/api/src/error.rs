use jiro_oauth::AuthError;

/// Cloud ID resolution failures. An unmatched base URL is always a
/// configuration error, never a default.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("accessible-resources request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("accessible-resources endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("no accessible resource matches configured base_url {base_url}; check account and app access")]
    NoMatch { base_url: String },
}

/// Gateway failures, fatal per call.
///
/// Non-2xx responses carry the status and raw body for the caller to
/// inspect; earlier pipeline stages surface through the wrapping
/// variants unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("api request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error {status}: {body}")]
    Status { status: u16, body: String },
}
