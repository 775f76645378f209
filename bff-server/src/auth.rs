use axum::extract::{FromRef, FromRequestParts};
use http::{request::Parts, HeaderMap};

use bff_slo::{
    errors::{self, WithBacktrace},
    Result,
};

use crate::{services::verifier::Verified, AppState};

/// The caller's token, present only once its signature has been verified.
/// Handlers taking this extractor never run for unauthenticated requests.
#[derive(Debug)]
pub struct Auth0Token {
    pub token: String,
    pub verified: Verified,
}

impl<S> FromRequestParts<S> for Auth0Token
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WithBacktrace;
    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let token = caller_token(&parts.headers, &app.config.token_header)?;
        let verified = app.verifier.verify(&token).await?;
        Ok(Self { token, verified })
    }
}

fn caller_token(headers: &HeaderMap, name: &str) -> Result<String> {
    let value = headers
        .get(name)
        .ok_or_else(errors::unauthorized)?
        .to_str()
        .map_err(|err| errors::token_parse(&err))?
        .trim();
    // the gateway forwards the original Authorization value verbatim
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => {
            rest.trim_start()
        }
        _ if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };
    if token.is_empty() {
        return Err(errors::unauthorized());
    }
    Ok(token.to_owned())
}
