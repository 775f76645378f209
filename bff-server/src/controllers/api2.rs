use axum::{
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use http::{header::CONTENT_TYPE, StatusCode};

use bff_slo::Result;

use crate::{auth::Auth0Token, AppState};

pub fn new_router(state: AppState) -> Router {
    Router::new().route("/api2", any(forward)).with_state(state)
}

async fn forward(app: AppState, auth: Auth0Token) -> Result<Response> {
    let relayed = app.proxy.get(&auth.token).await?;
    let mut resp = (StatusCode::OK, relayed.body).into_response();
    if let Some(content_type) = relayed.content_type {
        resp.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(resp)
}
