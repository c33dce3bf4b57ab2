//! Authenticated REST access to Jira Cloud.
//!
//! [`ApiClient::request`] is the single entry point external callers use:
//! it loads the stored token, refreshes it when stale, resolves the
//! tenant cloud ID, and proxies the call to the Atlassian API gateway.

pub mod client;
pub mod error;
pub mod resources;

pub use {
    client::ApiClient,
    error::{ApiError, ResolutionError},
    resources::{ACCESSIBLE_RESOURCES_URL, API_BASE_URL, CloudResource, ResourceResolver},
};
