use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken as jwt;
use serde_json::{json, Value};

use super::jwks::{KeyRecord, KeySet};

pub(crate) const SIGNER_KID: &str = "gqXHXxLyCCA8GpVMsABcS";
pub(crate) const OTHER_KID: &str = "nIhfmc3Wb6Ux5cYu9VB3n";
pub(crate) const SIGNER_X5C: &str =
    include_str!("../../tests/fixtures/signer.x5c");
pub(crate) const OTHER_X5C: &str =
    include_str!("../../tests/fixtures/other.x5c");
const SIGNER_KEY: &[u8] = include_bytes!("../../tests/fixtures/signer.key.pem");

pub(crate) fn record(kid: &str, x5c: &str) -> KeyRecord {
    KeyRecord {
        kty: Some("RSA".to_owned()),
        kid: Some(kid.to_owned()),
        key_use: Some("sig".to_owned()),
        x5c: vec![x5c.to_owned()],
        ..Default::default()
    }
}

/// The provider document: an unrelated key first, then the signer.
pub(crate) fn key_set() -> KeySet {
    KeySet {
        keys: vec![record(OTHER_KID, OTHER_X5C), record(SIGNER_KID, SIGNER_X5C)],
    }
}

pub(crate) fn claims() -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": "https://dev-tenant.us.auth0.com/",
        "sub": "auth0|6543",
        "aud": "https://bff.example.dev/",
        "iat": now,
        "exp": now + 3600,
    })
}

pub(crate) fn sign_with(header: &jwt::Header, claims: &Value) -> String {
    let key = match header.alg {
        jwt::Algorithm::HS256
        | jwt::Algorithm::HS384
        | jwt::Algorithm::HS512 => jwt::EncodingKey::from_secret(b"AllYourBase"),
        _ => jwt::EncodingKey::from_rsa_pem(SIGNER_KEY).unwrap(),
    };
    jwt::encode(header, claims, &key).unwrap()
}

/// RS256 token with the signer's key id.
pub(crate) fn sign(claims: &Value) -> String {
    let mut header = jwt::Header::new(jwt::Algorithm::RS256);
    header.kid = Some(SIGNER_KID.to_owned());
    sign_with(&header, claims)
}

/// Unsigned token declaring `alg`, which need not be a method the signing
/// library knows.
pub(crate) fn forge(alg: &str, claims: &Value) -> String {
    let header = json!({ "alg": alg, "typ": "JWT", "kid": SIGNER_KID });
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string()),
        URL_SAFE_NO_PAD.encode(b"signature"),
    )
}

/// Same token with the first signature byte flipped.
pub(crate) fn tamper(token: &str) -> String {
    let (message, signature) = token.rsplit_once('.').unwrap();
    let mut raw = URL_SAFE_NO_PAD.decode(signature).unwrap();
    raw[0] ^= 0x01;
    format!("{message}.{}", URL_SAFE_NO_PAD.encode(raw))
}
