use axum::{routing::any, Json, Router};
use tracing::info;

use bff_slo::Result;

use crate::{
    auth::Auth0Token,
    services::workflow::{execution_argument, Execution},
    AppState,
};

pub fn new_router(state: AppState) -> Router {
    Router::new()
        .route("/workflow", any(create_execution))
        .with_state(state)
}

async fn create_execution(
    app: AppState,
    auth: Auth0Token,
) -> Result<Json<Execution>> {
    let argument = execution_argument(&auth.token)?;
    let execution = app
        .workflow
        .create_execution(&app.config.workflow_parent(), &argument)
        .await?;
    info!("workflow execution {} is {}", execution.name, execution.state);
    Ok(execution.into())
}
