use anyhow::{Context, Result};
use reqwest::Url;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "/api";
pub const DEFAULT_API_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin that relative base URLs resolve against
    pub api_origin: String,
    pub api_base_url: Url,
    pub token_file: PathBuf,
    pub poll_interval: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let base = env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let origin = env::var("API_ORIGIN").unwrap_or_else(|_| DEFAULT_API_ORIGIN.to_string());

        Self::new(
            &base,
            origin,
            env::var("DASHBOARD_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_token_file()),
            Duration::from_millis(
                env::var("POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()
                    .context("POLL_INTERVAL_MS must be a valid number")?,
            ),
        )
    }

    pub fn new(
        base: &str,
        origin: impl Into<String>,
        token_file: PathBuf,
        poll_interval: Duration,
    ) -> Result<Self> {
        let api_origin = origin.into();
        Ok(Self {
            api_base_url: resolve_base_url(base, &api_origin)?,
            api_origin,
            token_file,
            poll_interval,
        })
    }

    /// Replaces the API base, resolving a relative one against `api_origin`.
    pub fn set_api_base_url(&mut self, base: &str) -> Result<()> {
        self.api_base_url = resolve_base_url(base, &self.api_origin)?;
        Ok(())
    }
}

/// Resolves the API base, which may be relative (`/api`), against `origin`.
/// The result always ends in `/` so endpoint paths append to it.
pub fn resolve_base_url(base: &str, origin: &str) -> Result<Url> {
    let mut url = match Url::parse(base) {
        Ok(url) => url,
        Err(_) => Url::parse(origin)
            .with_context(|| format!("API_ORIGIN is not a valid URL: {}", origin))?
            .join(base)
            .with_context(|| format!("API_BASE_URL is not a valid path: {}", base))?,
    };

    if url.cannot_be_a_base() {
        anyhow::bail!("API_BASE_URL cannot be used as a base URL: {}", base);
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn default_token_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("settlement-dashboard")
        .join("token")
}
