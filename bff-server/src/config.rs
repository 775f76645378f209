use std::{fs, ops::RangeInclusive};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug, Clone, Deserialize)]
#[command(name = "bff")]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    #[clap(long)]
    #[arg(short = 'c')]
    #[serde(default)]
    pub config: Option<String>,
    #[clap(long, env)]
    #[arg(default_value_t = String::from("bff_server=info,bff=info,tower_http=info"))]
    #[serde(default = "default_rust_log")]
    pub rust_log: String,
    #[clap(long, env = "PORT")]
    #[arg(value_parser = port_in_range, short = 'p', default_value_t = 8080)]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Identity provider host serving `/.well-known/jwks.json`.
    #[clap(long, env)]
    pub provider_domain: String,
    /// Seconds before a key-set fetch is abandoned.
    #[clap(long, env)]
    #[arg(default_value_t = 5)]
    #[serde(default = "default_jwks_timeout")]
    pub jwks_timeout: u64,
    /// Seconds a resolved certificate stays cached, 0 disables caching.
    #[clap(long, env)]
    #[arg(default_value_t = 0)]
    #[serde(default)]
    pub jwks_cache_ttl: u64,
    #[clap(long, env)]
    #[arg(default_value_t = 16)]
    #[serde(default = "default_jwks_cache_size")]
    pub jwks_cache_size: usize,
    /// Expected `aud` claim, unchecked when unset.
    #[clap(long, env)]
    #[serde(default)]
    pub audience: Option<String>,
    /// Clock skew tolerated on `exp` and `nbf`, in seconds.
    #[clap(long, env)]
    #[arg(default_value_t = 60)]
    #[serde(default = "default_leeway")]
    pub leeway: i64,

    #[clap(long, env)]
    #[arg(default_value_t = String::from("X-Forwarded-Authorization"))]
    #[serde(default = "default_token_header")]
    pub token_header: String,
    #[clap(long, env)]
    #[arg(default_value_t = String::from("auth0-token"))]
    #[serde(default = "default_forward_header")]
    pub forward_header: String,

    #[clap(long, env)]
    pub api2_url: String,
    #[clap(long, env)]
    pub project_id: String,
    #[clap(long, env)]
    pub location: String,
    #[clap(long, env)]
    pub workflow_name: String,
    #[clap(long, env)]
    #[arg(default_value_t = String::from("https://workflowexecutions.googleapis.com"))]
    #[serde(default = "default_workflow_api")]
    pub workflow_api: String,
    #[clap(long, env)]
    #[arg(default_value_t = String::from("http://metadata.google.internal"))]
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
    #[clap(long, env)]
    #[arg(default_value_t = 30)]
    #[serde(default = "default_downstream_timeout")]
    pub downstream_timeout: u64,
}

impl AppConfig {
    pub fn workflow_parent(&self) -> String {
        format!(
            "projects/{}/locations/{}/workflows/{}",
            self.project_id, self.location, self.workflow_name
        )
    }
}

fn default_rust_log() -> String {
    String::from("bff_server=info,bff=info,tower_http=info")
}

fn default_port() -> u16 {
    8080
}

fn default_jwks_timeout() -> u64 {
    5
}

fn default_jwks_cache_size() -> usize {
    16
}

fn default_leeway() -> i64 {
    60
}

fn default_token_header() -> String {
    String::from("X-Forwarded-Authorization")
}

fn default_forward_header() -> String {
    String::from("auth0-token")
}

fn default_workflow_api() -> String {
    String::from("https://workflowexecutions.googleapis.com")
}

fn default_metadata_url() -> String {
    String::from("http://metadata.google.internal")
}

fn default_downstream_timeout() -> u64 {
    30
}

const PORT_RANGE: RangeInclusive<usize> = 1..=65535;

fn port_in_range(s: &str) -> Result<u16, String> {
    let port: usize = s
        .parse()
        .map_err(|_| format!("`{s}` isn't a port number"))?;
    if PORT_RANGE.contains(&port) {
        Ok(port as u16)
    } else {
        Err(format!(
            "port not in range {}-{}",
            PORT_RANGE.start(),
            PORT_RANGE.end()
        ))
    }
}

pub fn load(cfg: &str) -> Result<AppConfig> {
    let content =
        fs::read_to_string(cfg).context("could not read config file")?;
    toml::from_str(&content).context("could not parse config file")
}
