use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderName, HeaderValue};
use mockall::automock;
use tracing::warn;

use bff_slo::{errors, Result};

use super::metadata::CredentialSource;

#[derive(Debug, Clone, Default)]
pub struct Relayed {
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

#[automock]
#[async_trait]
pub trait ProxyTarget: Send + Sync {
    /// GETs the target with `token` attached under the forwarding header.
    async fn get(&self, token: &str) -> Result<Relayed>;
}

/// Calls an IAM-protected service with an identity token minted for its
/// base URL.
pub struct IdTokenProxy {
    client: reqwest::Client,
    url: String,
    forward_header: HeaderName,
    credentials: Arc<dyn CredentialSource>,
}

impl IdTokenProxy {
    pub fn new(
        url: &str,
        forward_header: &str,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(errors::any)?;
        let forward_header = HeaderName::from_bytes(forward_header.as_bytes())
            .map_err(errors::any)?;
        Ok(Self {
            client,
            url: url.to_owned(),
            forward_header,
            credentials,
        })
    }
}

#[async_trait]
impl ProxyTarget for IdTokenProxy {
    async fn get(&self, token: &str) -> Result<Relayed> {
        let id_token = self.credentials.identity_token(&self.url).await?;
        let resp = self
            .client
            .get(&self.url)
            .header(self.forward_header.clone(), token)
            .bearer_auth(id_token)
            .send()
            .await
            .map_err(|err| errors::downstream(&err))?;
        if !resp.status().is_success() {
            warn!("{} answered {}", self.url, resp.status());
        }
        let content_type = resp.headers().get(CONTENT_TYPE).cloned();
        let body = resp
            .bytes()
            .await
            .map_err(|err| errors::downstream(&err))?;
        Ok(Relayed { content_type, body })
    }
}
