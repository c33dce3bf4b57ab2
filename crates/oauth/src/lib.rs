//! OAuth 2.0 authorization-code flow with PKCE against Atlassian Cloud.
//!
//! The pieces compose bottom-up: [`TokenStore`] persists the single token
//! record, [`AuthorizationFlow`] drives a browser consent exchange through
//! a short-lived local callback listener, and [`TokenRefresher`] keeps a
//! stored token usable without ever starting a new flow on its own.

pub mod discovery;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod refresh;
pub mod storage;
pub mod types;

pub use {
    discovery::{ATLASSIAN_ISSUER_URL, IssuerMetadata, discover},
    error::{AuthError, DiscoveryError, FlowError},
    flow::{AuthorizationFlow, FlowState},
    pkce::generate_state,
    refresh::TokenRefresher,
    storage::TokenStore,
    types::{
        PkceChallenge, TokenResponse, TokenSet, now_epoch_secs, serialize_option_secret,
        serialize_secret,
    },
};
