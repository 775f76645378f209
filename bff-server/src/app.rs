use std::{ops::Deref, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::info;

use bff_slo::errors;

use crate::{
    services::{
        jwks::{CertificateCache, HttpKeySetFetcher, NoCache, TtlCache},
        metadata::{CredentialSource, MetadataServer},
        proxy::{IdTokenProxy, ProxyTarget},
        verifier::{TokenVerifier, Verifier},
        workflow::{WorkflowExecutions, WorkflowTrigger},
    },
    AppConfig,
};

pub struct App {
    pub config: AppConfig,
    pub verifier: Box<dyn Verifier>,
    pub workflow: Box<dyn WorkflowTrigger>,
    pub proxy: Box<dyn ProxyTarget>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("initializing utility services...");

        let fetcher = HttpKeySetFetcher::for_domain(
            &config.provider_domain,
            Duration::from_secs(config.jwks_timeout),
        )?;
        info!("signing keys are fetched from {}", fetcher.url());

        let cache: Box<dyn CertificateCache> = if config.jwks_cache_ttl > 0 {
            info!(
                "caching certificates for {}s, at most {}",
                config.jwks_cache_ttl, config.jwks_cache_size
            );
            Box::new(TtlCache::new(
                Duration::from_secs(config.jwks_cache_ttl),
                config.jwks_cache_size,
            ))
        } else {
            Box::new(NoCache)
        };
        let verifier = TokenVerifier::new(fetcher, cache)
            .with_leeway(config.leeway)
            .with_audience(config.audience.clone());

        let timeout = Duration::from_secs(config.downstream_timeout);
        let credentials: Arc<dyn CredentialSource> =
            Arc::new(MetadataServer::new(&config.metadata_url, timeout)?);
        let workflow = WorkflowExecutions::new(
            &config.workflow_api,
            Arc::clone(&credentials),
            timeout,
        )?;
        let proxy = IdTokenProxy::new(
            &config.api2_url,
            &config.forward_header,
            credentials,
            timeout,
        )?;

        info!("feature services successfully initialized!");
        Ok(Self::with_services(
            config,
            Box::new(verifier),
            Box::new(workflow),
            Box::new(proxy),
        ))
    }

    pub fn with_services(
        config: AppConfig,
        verifier: Box<dyn Verifier>,
        workflow: Box<dyn WorkflowTrigger>,
        proxy: Box<dyn ProxyTarget>,
    ) -> Self {
        Self {
            config,
            verifier,
            workflow,
            proxy,
        }
    }
}

#[derive(Clone)]
pub struct AppState(pub Arc<App>);

// deref so you can still access the inner fields easily
impl Deref for AppState {
    type Target = App;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AppState
where
    Self: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = errors::WithBacktrace;
    async fn from_request_parts(
        _: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_ref(state))
    }
}
