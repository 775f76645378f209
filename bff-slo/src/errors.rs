use std::{error::Error as StdError, fmt};

use backtrace::Backtrace;
use http::StatusCode;
use thiserror::Error;

pub trait ErrorCode: StdError + 'static {
    fn code(&self) -> (StatusCode, &'static str);
}

/// Every failure the gateway can report to a caller.
///
/// The `Display` text is what callers see, so it stays short. Provider and
/// collaborator detail lives in the `String` payloads and only reaches the
/// logs through `Debug`.
#[derive(Error, Debug)]
pub enum Code {
    #[error("Internal server error")]
    Any(#[from] anyhow::Error),
    #[error("Not found. {0}")]
    NotFound(String),
    #[error("Authentication is required to access this resource")]
    Unauthorized,
    #[error("The token could not be parsed")]
    TokenParse(String),
    #[error("No signing key matches the token")]
    KeyNotFound(String),
    #[error("The signing certificate could not be parsed")]
    CertificateParse(String),
    #[error("Unexpected signing method: {0}")]
    AlgorithmMismatch(String),
    #[error("The token signature is invalid")]
    SignatureInvalid,
    #[error("The token claims were rejected")]
    TokenClaims(String),
    #[error("The signing keys could not be fetched")]
    KeyFetchTransport(String),
    #[error("The signing keys could not be decoded")]
    KeyFetchDecode(String),
    #[error("The downstream service is unavailable")]
    DownstreamUnavailable(String),
}

impl ErrorCode for Code {
    fn code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Any(_) => (StatusCode::INTERNAL_SERVER_ERROR, "1010001"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "1010002"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "1010003"),
            Self::TokenParse(_) => (StatusCode::UNAUTHORIZED, "1010004"),
            Self::KeyNotFound(_) => (StatusCode::UNAUTHORIZED, "1010005"),
            Self::AlgorithmMismatch(_) => {
                (StatusCode::UNAUTHORIZED, "1010006")
            }
            Self::SignatureInvalid => (StatusCode::UNAUTHORIZED, "1010007"),
            Self::TokenClaims(_) => (StatusCode::UNAUTHORIZED, "1010008"),
            Self::CertificateParse(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "1010009")
            }
            Self::KeyFetchTransport(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "1010010")
            }
            Self::KeyFetchDecode(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "1010011")
            }
            Self::DownstreamUnavailable(_) => {
                (StatusCode::BAD_GATEWAY, "1010012")
            }
        }
    }
}

pub struct WithBacktrace {
    source: Code,
    backtrace: Backtrace,
}

impl WithBacktrace {
    pub fn kind(&self) -> &Code {
        &self.source
    }
}

impl fmt::Debug for WithBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithBacktrace")
            .field("source", &self.source)
            .field("backtrace", &self.backtrace)
            .finish()
    }
}

impl fmt::Display for WithBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl StdError for WithBacktrace {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

impl From<Code> for WithBacktrace {
    fn from(code: Code) -> Self {
        WithBacktrace {
            source: code,
            backtrace: Backtrace::new(),
        }
    }
}

impl From<WithBacktrace> for Code {
    fn from(value: WithBacktrace) -> Self {
        value.source
    }
}

impl PartialEq for WithBacktrace {
    fn eq(&self, other: &Self) -> bool {
        let (_, src_code) = self.source.code();
        let (_, dst_code) = other.source.code();
        src_code == dst_code
    }
}

#[inline]
pub fn any<E: StdError>(err: E) -> WithBacktrace {
    Code::Any(anyhow::anyhow!("{}", err.to_string())).into()
}

#[inline]
pub fn anyhow(err: anyhow::Error) -> WithBacktrace {
    Code::Any(err).into()
}

#[inline]
pub fn not_found<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::NotFound(err.to_string()).into()
}

#[inline]
pub fn unauthorized() -> WithBacktrace {
    Code::Unauthorized.into()
}

#[inline]
pub fn token_parse<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::TokenParse(err.to_string()).into()
}

#[inline]
pub fn key_not_found<S: ToString + ?Sized>(kid: &S) -> WithBacktrace {
    Code::KeyNotFound(kid.to_string()).into()
}

#[inline]
pub fn certificate_parse<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::CertificateParse(err.to_string()).into()
}

#[inline]
pub fn algorithm_mismatch<S: ToString + ?Sized>(alg: &S) -> WithBacktrace {
    Code::AlgorithmMismatch(alg.to_string()).into()
}

#[inline]
pub fn signature_invalid() -> WithBacktrace {
    Code::SignatureInvalid.into()
}

#[inline]
pub fn token_claims<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::TokenClaims(err.to_string()).into()
}

#[inline]
pub fn key_fetch_transport<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::KeyFetchTransport(err.to_string()).into()
}

#[inline]
pub fn key_fetch_decode<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::KeyFetchDecode(err.to_string()).into()
}

#[inline]
pub fn downstream<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::DownstreamUnavailable(err.to_string()).into()
}

#[cfg(feature = "axum-resp")]
mod axum {
    use axum::response::IntoResponse;
    use serde_json::json;

    use super::ErrorCode;

    impl IntoResponse for super::WithBacktrace {
        fn into_response(self) -> axum::response::Response {
            let (status_code, code) = self.source.code();
            if status_code.is_server_error() {
                tracing::error!("{:?}", self);
            } else {
                tracing::warn!("{:?}", self.source);
            }

            let payload = json!({
                "code": code,
                "message": self.to_string(),
            });

            (status_code, axum::Json(payload)).into_response()
        }
    }
}
