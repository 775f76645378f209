use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use serde::Deserialize;

use bff_slo::{errors, Result};

const TOKEN_PATH: &str =
    "/computeMetadata/v1/instance/service-accounts/default/token";
const IDENTITY_PATH: &str =
    "/computeMetadata/v1/instance/service-accounts/default/identity";

/// Credentials the service account presents to Google APIs and to
/// IAM-protected Cloud Run services.
#[automock]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// OAuth2 access token for Google APIs.
    async fn access_token(&self) -> Result<String>;
    /// OIDC identity token whose `aud` is `audience`.
    async fn identity_token(&self, audience: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct MetadataServer {
    client: reqwest::Client,
    base: String,
}

impl MetadataServer {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(errors::any)?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_owned(),
        })
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        self.client
            .get(format!("{}{}", self.base, path))
            .header("Metadata-Flavor", "Google")
            .query(query)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| errors::downstream(&err))
    }
}

#[async_trait]
impl CredentialSource for MetadataServer {
    async fn access_token(&self) -> Result<String> {
        let token = self
            .get(TOKEN_PATH, &[])
            .await?
            .json::<AccessToken>()
            .await
            .map_err(|err| errors::downstream(&err))?;
        Ok(token.access_token)
    }

    async fn identity_token(&self, audience: &str) -> Result<String> {
        self.get(IDENTITY_PATH, &[("audience", audience)])
            .await?
            .text()
            .await
            .map_err(|err| errors::downstream(&err))
    }
}

#[cfg(test)]
mod tests {
    use bff_slo::errors::Code;
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    #[tokio::test]
    async fn access_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOKEN_PATH))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.c.b0Aa",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let source =
            MetadataServer::new(&server.uri(), Duration::from_secs(1)).unwrap();
        assert_eq!(source.access_token().await.unwrap(), "ya29.c.b0Aa");
    }

    #[tokio::test]
    async fn identity_token_for_audience() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(IDENTITY_PATH))
            .and(header("Metadata-Flavor", "Google"))
            .and(query_param("audience", "https://api2.example.run.app"))
            .respond_with(ResponseTemplate::new(200).set_body_string("eyJ.id"))
            .mount(&server)
            .await;

        let source = MetadataServer::new(
            &format!("{}/", server.uri()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            source
                .identity_token("https://api2.example.run.app")
                .await
                .unwrap(),
            "eyJ.id"
        );
    }

    #[tokio::test]
    async fn unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source =
            MetadataServer::new(&server.uri(), Duration::from_secs(1)).unwrap();
        let err = source.access_token().await.unwrap_err();
        assert!(matches!(err.kind(), Code::DownstreamUnavailable(_)));
    }
}
