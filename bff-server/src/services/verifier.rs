use async_trait::async_trait;
use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken as jwt;
use mockall::automock;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info};

use bff_slo::{
    errors::{self, Code},
    Result,
};

use super::jwks::{resolve_certificate, CertificateCache, KeySetFetcher, NoCache};

/// Signing methods accepted from the identity provider.
pub const RSA_ALGORITHMS: [jwt::Algorithm; 3] = [
    jwt::Algorithm::RS256,
    jwt::Algorithm::RS384,
    jwt::Algorithm::RS512,
];

#[derive(Debug, Clone, Default, Deserialize)]
struct RegisteredClaims {
    #[serde(default)]
    exp: Option<f64>,
    #[serde(default)]
    nbf: Option<f64>,
    #[serde(default)]
    aud: Option<Audience>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn contains(&self, aud: &str) -> bool {
        match self {
            Self::One(v) => v == aud,
            Self::Many(v) => v.iter().any(|v| v == aud),
        }
    }
}

/// The header as the caller declared it. `alg` stays a plain string so a
/// method unknown to the signing library, `none` included, is still reported
/// by name.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// A compact token split once into its parts. The header and time claims are
/// decoded eagerly, the signature is only checked by [`Self::verify_signature`].
#[derive(Debug)]
pub struct ParsedToken<'a> {
    pub header: TokenHeader,
    claims: RegisteredClaims,
    message: &'a str,
    signature: &'a str,
}

impl<'a> ParsedToken<'a> {
    pub fn parse(token: &'a str) -> Result<Self> {
        let (message, signature) = token
            .rsplit_once('.')
            .ok_or_else(|| errors::token_parse("token contains no `.`"))?;
        let (header, payload) = message
            .split_once('.')
            .ok_or_else(|| errors::token_parse("token has two segments"))?;
        if payload.contains('.') || signature.is_empty() {
            return Err(errors::token_parse("token must have three segments"));
        }
        Ok(Self {
            header: decode_segment(header)?,
            claims: decode_segment(payload)?,
            message,
            signature,
        })
    }

    pub fn kid(&self) -> Option<&str> {
        self.header.kid.as_deref().filter(|kid| !kid.is_empty())
    }

    /// The declared signing method, if it is one of [`RSA_ALGORITHMS`].
    pub fn algorithm(&self) -> Result<jwt::Algorithm> {
        self.header
            .alg
            .parse::<jwt::Algorithm>()
            .ok()
            .filter(|alg| RSA_ALGORITHMS.contains(alg))
            .ok_or_else(|| errors::algorithm_mismatch(&self.header.alg))
    }

    /// Rejects any algorithm outside [`RSA_ALGORITHMS`] before touching the
    /// key, then checks the signature over `header.payload`.
    pub fn verify_signature(&self, key: &jwt::DecodingKey) -> Result<bool> {
        let alg = self.algorithm()?;
        jwt::crypto::verify(self.signature, self.message.as_bytes(), key, alg)
            .map_err(|err| errors::token_parse(&err))
    }

    fn validate_claims(
        &self,
        now: i64,
        leeway: i64,
        audience: Option<&str>,
    ) -> Result<()> {
        if let Some(exp) = self.claims.exp {
            if (exp as i64) < now - leeway {
                return Err(errors::token_claims("token has expired"));
            }
        }
        if let Some(nbf) = self.claims.nbf {
            if (nbf as i64) > now + leeway {
                return Err(errors::token_claims("token is not valid yet"));
            }
        }
        if let Some(audience) = audience {
            let matched = self
                .claims
                .aud
                .as_ref()
                .is_some_and(|aud| aud.contains(audience));
            if !matched {
                return Err(errors::token_claims(&format!(
                    "token audience does not include {audience}"
                )));
            }
        }
        Ok(())
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T> {
    let raw = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|err| errors::token_parse(&err))?;
    serde_json::from_slice(&raw).map_err(|err| errors::token_parse(&err))
}

#[derive(Debug, Clone)]
pub struct Verified {
    pub kid: String,
    pub algorithm: jwt::Algorithm,
}

#[automock]
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Verified>;
}

pub struct TokenVerifier<F, C = NoCache> {
    fetcher: F,
    cache: C,
    leeway: i64,
    audience: Option<String>,
}

impl<F, C> TokenVerifier<F, C> {
    pub fn new(fetcher: F, cache: C) -> Self {
        Self {
            fetcher,
            cache,
            leeway: 60,
            audience: None,
        }
    }

    pub fn with_leeway(mut self, leeway: i64) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }
}

impl<F, C> TokenVerifier<F, C>
where
    F: KeySetFetcher,
    C: CertificateCache,
{
    /// Only certificates that parse into a key are offered to the cache.
    async fn decoding_key(&self, kid: &str) -> Result<jwt::DecodingKey> {
        if let Some(pem) = self.cache.get(kid) {
            debug!("certificate for {} served from cache", kid);
            return parse_certificate(&pem);
        }
        let keys = self.fetcher.fetch().await?;
        let pem = resolve_certificate(&keys, kid)?;
        let key = parse_certificate(&pem)?;
        self.cache.put(kid, &pem);
        Ok(key)
    }

    /// `false` only when the signature does not match; every other failure
    /// is still returned as an error.
    pub async fn is_authentic(&self, token: &str) -> Result<bool> {
        match self.verify(token).await {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.kind(), Code::SignatureInvalid) => {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl<F, C> Verifier for TokenVerifier<F, C>
where
    F: KeySetFetcher,
    C: CertificateCache,
{
    async fn verify(&self, token: &str) -> Result<Verified> {
        let parsed = ParsedToken::parse(token)?;
        let kid = parsed
            .kid()
            .ok_or_else(|| errors::key_not_found("token header has no kid"))?;

        let key = self.decoding_key(kid).await?;

        if !parsed.verify_signature(&key)? {
            return Err(errors::signature_invalid());
        }
        parsed.validate_claims(
            Utc::now().timestamp(),
            self.leeway,
            self.audience.as_deref(),
        )?;

        info!("token signed by {} verified", kid);
        Ok(Verified {
            kid: kid.to_owned(),
            algorithm: parsed.algorithm()?,
        })
    }
}

fn parse_certificate(pem: &str) -> Result<jwt::DecodingKey> {
    jwt::DecodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|err| errors::certificate_parse(&err))
}
