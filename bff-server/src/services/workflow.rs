use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use bff_slo::{errors, Result};

use super::metadata::CredentialSource;

/// Handle returned by the Workflows Executions API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_revision_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

/// Execution argument carrying the caller's token.
pub fn execution_argument(token: &str) -> Result<String> {
    serde_json::to_string(&json!({ "auth0-token": token }))
        .map_err(errors::any)
}

#[automock]
#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    /// Starts an execution of the workflow at `parent`
    /// (`projects/*/locations/*/workflows/*`).
    async fn create_execution(
        &self,
        parent: &str,
        argument: &str,
    ) -> Result<Execution>;
}

pub struct WorkflowExecutions {
    client: reqwest::Client,
    api: String,
    credentials: Arc<dyn CredentialSource>,
}

impl WorkflowExecutions {
    pub fn new(
        api: &str,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(errors::any)?;
        Ok(Self {
            client,
            api: api.trim_end_matches('/').to_owned(),
            credentials,
        })
    }
}

#[async_trait]
impl WorkflowTrigger for WorkflowExecutions {
    async fn create_execution(
        &self,
        parent: &str,
        argument: &str,
    ) -> Result<Execution> {
        let access_token = self.credentials.access_token().await?;
        self.client
            .post(format!("{}/v1/{}/executions", self.api, parent))
            .bearer_auth(access_token)
            .json(&json!({ "argument": argument }))
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| errors::downstream(&err))?
            .json::<Execution>()
            .await
            .map_err(|err| errors::downstream(&err))
    }
}
