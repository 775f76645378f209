mod cache;
mod resolver;

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use bff_slo::{errors, Result};

pub use cache::{CertificateCache, NoCache, TtlCache};
pub use resolver::resolve_certificate;

pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Signing keys published by the identity provider, in document order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeySet {
    pub keys: Vec<KeyRecord>,
}

impl KeySet {
    /// First record whose `kid` equals `kid` exactly.
    pub fn find(&self, kid: &str) -> Option<&KeyRecord> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyRecord {
    #[serde(default)]
    pub kty: Option<String>,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    #[serde(default)]
    pub x5c: Vec<String>,
    // auth0 publishes a single thumbprint string, older documents a list
    #[serde(default, deserialize_with = "one_or_many")]
    pub x5t: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(v)) => vec![v],
        Some(OneOrMany::Many(v)) => v,
    })
}

#[automock]
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    async fn fetch(&self) -> Result<KeySet>;
}

/// Fetches the key directory over HTTP on every call.
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpKeySetFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(errors::any)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Targets `https://<domain>/.well-known/jwks.json`.
    pub fn for_domain(domain: &str, timeout: Duration) -> Result<Self> {
        let url = reqwest::Url::parse(&format!("https://{domain}{JWKS_PATH}"))
            .map_err(errors::any)?;
        let valid = url
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(domain))
            && url.port().is_none()
            && url.query().is_none()
            && url.path() == JWKS_PATH;
        if !valid {
            return Err(errors::anyhow(anyhow::anyhow!(
                "`{domain}` isn't a valid identity provider host name"
            )));
        }
        Self::new(url, timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch(&self) -> Result<KeySet> {
        debug!("fetching signing keys from {}", self.url);
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| errors::key_fetch_transport(&err))?;
        let body = resp
            .bytes()
            .await
            .map_err(|err| errors::key_fetch_transport(&err))?;
        let keys = serde_json::from_slice::<KeySet>(&body)
            .map_err(|err| errors::key_fetch_decode(&err))?;
        debug!("fetched {} signing keys", keys.keys.len());
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use bff_slo::errors::Code;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    const AUTH0_JWKS: &str = r#"{
        "keys": [
            {
                "kty": "RSA",
                "use": "sig",
                "n": "yKqY",
                "e": "AQAB",
                "kid": "gqXHXxLyCCA8GpVMsABcS",
                "x5t": "Zn6JVXlWOVyQz9VfrL2gAJXIHfE",
                "x5c": ["MIIDHTCCAgWgAwIBAgIJ", "MIIDBTCCAe2gAwIBAgIJ"],
                "alg": "RS256"
            },
            {
                "kty": "RSA",
                "kid": "legacy",
                "x5t": ["a", "b"],
                "x5c": []
            }
        ]
    }"#;

    #[test]
    fn decode_provider_document() {
        let keys: KeySet = serde_json::from_str(AUTH0_JWKS).unwrap();
        assert_eq!(keys.keys.len(), 2);
        let first = &keys.keys[0];
        assert_eq!(first.kty.as_deref(), Some("RSA"));
        assert_eq!(first.key_use.as_deref(), Some("sig"));
        assert_eq!(first.x5t, vec!["Zn6JVXlWOVyQz9VfrL2gAJXIHfE"]);
        assert_eq!(first.x5c.len(), 2);
        assert_eq!(keys.keys[1].x5t, vec!["a", "b"]);
        assert!(keys.keys[1].x5c.is_empty());
    }

    #[test]
    fn find_is_exact() {
        let keys: KeySet = serde_json::from_str(AUTH0_JWKS).unwrap();
        assert!(keys.find("legacy").is_some());
        assert!(keys.find("LEGACY").is_none());
        assert!(keys.find("leg").is_none());
    }

    #[test]
    fn domain_url() {
        let fetcher = HttpKeySetFetcher::for_domain(
            "dev-tenant.us.auth0.com",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            fetcher.url(),
            "https://dev-tenant.us.auth0.com/.well-known/jwks.json"
        );
        for bad in ["", "host/path", "host?x=1", "host:8443", "a b"] {
            assert!(
                HttpKeySetFetcher::for_domain(bad, Duration::from_secs(1))
                    .is_err(),
                "{bad} accepted"
            );
        }
    }

    async fn fetcher_for(server: &MockServer) -> HttpKeySetFetcher {
        HttpKeySetFetcher::new(
            format!("{}{}", server.uri(), JWKS_PATH),
            Duration::from_millis(500),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(AUTH0_JWKS),
            )
            .expect(1)
            .mount(&server)
            .await;

        let keys = fetcher_for(&server).await.fetch().await.unwrap();
        assert_eq!(keys.keys.len(), 2);
    }

    #[tokio::test]
    async fn fetch_every_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(AUTH0_JWKS),
            )
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server).await;
        fetcher.fetch().await.unwrap();
        fetcher.fetch().await.unwrap();
    }

    #[tokio::test]
    async fn fetch_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;

        let err = fetcher_for(&server).await.fetch().await.unwrap_err();
        assert!(matches!(err.kind(), Code::KeyFetchDecode(_)));
    }

    #[tokio::test]
    async fn fetch_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).await.fetch().await.unwrap_err();
        assert!(matches!(err.kind(), Code::KeyFetchTransport(_)));
    }

    #[tokio::test]
    async fn fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(AUTH0_JWKS)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = fetcher_for(&server).await.fetch().await.unwrap_err();
        assert!(matches!(err.kind(), Code::KeyFetchTransport(_)));
    }

    #[tokio::test]
    async fn fetch_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpKeySetFetcher::new(
            format!("http://{addr}{JWKS_PATH}"),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err.kind(), Code::KeyFetchTransport(_)));
    }
}
