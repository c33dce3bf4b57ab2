use {
    secrecy::{ExposeSecret, SecretString},
    serde::Deserialize,
};

use crate::error::ResolutionError;

/// The Atlassian API gateway.
pub const API_BASE_URL: &str = "https://api.atlassian.com";

/// Fixed well-known endpoint listing the sites a token can address.
pub const ACCESSIBLE_RESOURCES_URL: &str =
    "https://api.atlassian.com/oauth/token/accessible-resources";

/// One tenant the current token can address. Never persisted;
/// re-resolved on each gateway call.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudResource {
    /// Tenant-routing identifier (cloud ID).
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Maps an access token to the cloud ID behind the configured site.
pub struct ResourceResolver {
    http: reqwest::Client,
    base_url: String,
    resources_url: String,
}

impl ResourceResolver {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self {
            http,
            base_url,
            resources_url: ACCESSIBLE_RESOURCES_URL.to_string(),
        }
    }

    /// Point at a different resources endpoint (useful for testing).
    pub fn with_resources_url(mut self, resources_url: impl Into<String>) -> Self {
        self.resources_url = resources_url.into();
        self
    }

    /// All sites the token can address, in server order.
    pub async fn list(
        &self,
        access_token: &SecretString,
    ) -> Result<Vec<CloudResource>, ResolutionError> {
        let resp = self
            .http
            .get(&self.resources_url)
            .bearer_auth(access_token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ResolutionError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    /// The first site whose URL starts with the configured base URL,
    /// compared case-insensitively.
    pub async fn resolve(
        &self,
        access_token: &SecretString,
    ) -> Result<CloudResource, ResolutionError> {
        let wanted = self.base_url.to_lowercase();
        self.list(access_token)
            .await?
            .into_iter()
            .find(|r| r.url.to_lowercase().starts_with(&wanted))
            .ok_or_else(|| ResolutionError::NoMatch {
                base_url: self.base_url.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> SecretString {
        SecretString::new("access-1".into())
    }

    fn resolver(server: &mockito::Server, base_url: &str) -> ResourceResolver {
        ResourceResolver::new(reqwest::Client::new(), base_url.to_string())
            .with_resources_url(format!("{}/oauth/token/accessible-resources", server.url()))
    }

    #[tokio::test]
    async fn resolves_case_insensitively() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/oauth/token/accessible-resources")
            .match_header("authorization", "Bearer access-1")
            .with_status(200)
            .with_body(
                serde_json::json!([
                    {"id": "cloud-other", "url": "https://other.atlassian.net", "name": "other"},
                    {"id": "cloud-1", "url": "https://Example.Atlassian.net", "name": "example"},
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let resource = resolver(&server, "https://example.atlassian.net")
            .resolve(&token())
            .await
            .unwrap();
        assert_eq!(resource.id, "cloud-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn first_match_wins() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/oauth/token/accessible-resources")
            .with_status(200)
            .with_body(
                serde_json::json!([
                    {"id": "cloud-a", "url": "https://example.atlassian.net"},
                    {"id": "cloud-b", "url": "https://example.atlassian.net/extra"},
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let resource = resolver(&server, "https://example.atlassian.net")
            .resolve(&token())
            .await
            .unwrap();
        assert_eq!(resource.id, "cloud-a");
    }

    #[tokio::test]
    async fn unmatched_base_url_is_a_hard_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/oauth/token/accessible-resources")
            .with_status(200)
            .with_body(
                serde_json::json!([
                    {"id": "cloud-1", "url": "https://other.atlassian.net"},
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let err = resolver(&server, "https://example.atlassian.net")
            .resolve(&token())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NoMatch { .. }));
        // The configured base URL is surfaced verbatim for diagnosis.
        assert!(err.to_string().contains("https://example.atlassian.net"));
    }

    #[tokio::test]
    async fn non_2xx_surfaces_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/oauth/token/accessible-resources")
            .with_status(401)
            .with_body("expired")
            .create_async()
            .await;

        let err = resolver(&server, "https://example.atlassian.net")
            .resolve(&token())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::Endpoint { status: 401, ref body } if body == "expired"
        ));
    }
}
