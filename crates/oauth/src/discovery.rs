use serde::Deserialize;

use crate::error::DiscoveryError;

/// Atlassian's authorization server. Fixed, not user-configurable.
pub const ATLASSIAN_ISSUER_URL: &str = "https://auth.atlassian.com";

/// Subset of the issuer's well-known metadata the flows need.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
}

/// Fetch `<issuer>/.well-known/openid-configuration`.
///
/// Fetched per flow or refresh, never cached or persisted.
pub async fn discover(
    http: &reqwest::Client,
    issuer_url: &str,
) -> Result<IssuerMetadata, DiscoveryError> {
    let url = format!(
        "{}/.well-known/openid-configuration",
        issuer_url.trim_end_matches('/')
    );
    let resp = http.get(&url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(DiscoveryError::Endpoint {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_wellknown_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "issuer": "https://auth.example.com",
                    "authorization_endpoint": "https://auth.example.com/authorize",
                    "token_endpoint": "https://auth.example.com/oauth/token",
                    "registration_endpoint": "https://auth.example.com/oidc/register",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let metadata = discover(&reqwest::Client::new(), &server.url())
            .await
            .unwrap();
        assert_eq!(metadata.issuer, "https://auth.example.com");
        assert_eq!(
            metadata.token_endpoint,
            "https://auth.example.com/oauth/token"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_is_an_endpoint_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let err = discover(&reqwest::Client::new(), &server.url())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::Endpoint { status: 503, ref body } if body == "maintenance"
        ));
    }
}
